use serde::Serialize;

use crate::{Error, Result, search::fusion};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
	Exponential,
	Linear,
}
impl CalibrationMethod {
	pub fn parse(raw: &str) -> Result<Self> {
		match raw {
			"exponential" => Ok(Self::Exponential),
			"linear" => Ok(Self::Linear),
			other => Err(Error::InvalidRequest {
				message: format!("Unknown calibration method {other}."),
			}),
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct CalibrationPolicy {
	pub enabled: bool,
	pub method: CalibrationMethod,
	pub alpha: f32,
	pub max_cap: f32,
}

/// Maps one query's final scores to display scores in `[0, max_cap)`.
///
/// The mapping is monotonic non-decreasing in the input score, so ordering by display score never
/// contradicts ordering by internal score. With calibration disabled the scores pass through.
pub fn calibrate(scores: &[f32], policy: &CalibrationPolicy) -> Vec<f32> {
	if !policy.enabled {
		return scores.to_vec();
	}

	let below_cap = below(policy.max_cap);

	fusion::min_max_normalize(scores)
		.into_iter()
		.map(|x| {
			let y = match policy.method {
				CalibrationMethod::Exponential => 1.0 - (-policy.alpha * x).exp(),
				CalibrationMethod::Linear => x,
			};

			y.clamp(0.0, below_cap)
		})
		.collect()
}

// Largest f32 strictly below `cap`, so no result ever displays the cap itself.
fn below(cap: f32) -> f32 {
	if cap <= 0.0 {
		return 0.0;
	}

	f32::from_bits(cap.to_bits() - 1)
}
