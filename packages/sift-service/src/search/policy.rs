use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
	Error, Result,
	search::{
		CalibrationMethod, CalibrationPolicy, LexicalGatePolicy, PersonPolicy, RerankPolicy,
	},
};
use sift_config::{Search, SearchTimeouts};
use sift_domain::Channel;

/// Per-request override of the content channel weights. Must sum to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ChannelWeights {
	pub transcript: f32,
	pub visual: f32,
	pub summary: f32,
	pub lexical: f32,
}
impl ChannelWeights {
	pub fn validate(&self) -> Result<()> {
		sift_config::validate_weights(
			"weights",
			&[
				("transcript", self.transcript),
				("visual", self.visual),
				("summary", self.summary),
				("lexical", self.lexical),
			],
		)
		.map_err(|err| Error::InvalidWeights { message: err.to_string() })
	}

	pub fn to_map(self) -> BTreeMap<Channel, f32> {
		BTreeMap::from([
			(Channel::Transcript, self.transcript),
			(Channel::Visual, self.visual),
			(Channel::Summary, self.summary),
			(Channel::Lexical, self.lexical),
		])
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct FusionPolicy {
	pub weights: BTreeMap<Channel, f32>,
	pub pool_size: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct ChannelTimeouts {
	pub embedding: Duration,
	pub transcript: Duration,
	pub summary: Duration,
	pub visual: Duration,
	pub lexical: Duration,
	pub person: Duration,
	pub rerank: Duration,
}
impl ChannelTimeouts {
	pub fn from_config(cfg: &SearchTimeouts) -> Self {
		Self {
			embedding: Duration::from_millis(cfg.embedding_ms),
			transcript: Duration::from_millis(cfg.transcript_ms),
			summary: Duration::from_millis(cfg.summary_ms),
			visual: Duration::from_millis(cfg.visual_ms),
			lexical: Duration::from_millis(cfg.lexical_ms),
			person: Duration::from_millis(cfg.person_ms),
			rerank: Duration::from_millis(cfg.rerank_ms),
		}
	}

	pub fn for_channel(&self, channel: Channel) -> Duration {
		match channel {
			Channel::Transcript => self.transcript,
			Channel::Visual => self.visual,
			Channel::Summary => self.summary,
			Channel::Lexical => self.lexical,
			Channel::Person => self.person,
		}
	}
}

/// Every tunable one search runs with, resolved from config and the request.
#[derive(Clone, Debug, Serialize)]
pub struct SearchPolicy {
	pub fusion: FusionPolicy,
	pub lexical_gate: LexicalGatePolicy,
	pub rerank: RerankPolicy,
	pub person: PersonPolicy,
	pub calibration: CalibrationPolicy,
	pub limit: u32,
	pub min_score: f32,
}
impl SearchPolicy {
	/// Stable fingerprint of the resolved policy, for comparing runs.
	pub fn hash(&self) -> Result<String> {
		let raw = serde_json::to_vec(self).map_err(|err| Error::InvalidRequest {
			message: format!("Failed to encode policy snapshot: {err}"),
		})?;

		Ok(blake3::hash(&raw).to_hex().to_string())
	}
}

pub fn resolve_policy(
	cfg: &Search,
	weights: Option<&ChannelWeights>,
	limit: Option<u32>,
	min_score: Option<f32>,
) -> Result<SearchPolicy> {
	let weights = match weights {
		Some(weights) => {
			weights.validate()?;

			weights.to_map()
		},
		None => ChannelWeights {
			transcript: cfg.weights.transcript,
			visual: cfg.weights.visual,
			summary: cfg.weights.summary,
			lexical: cfg.weights.lexical,
		}
		.to_map(),
	};
	let min_score = min_score.unwrap_or(cfg.min_score);

	if !min_score.is_finite() || min_score < 0.0 {
		return Err(Error::InvalidRequest {
			message: "min_score must be a finite number, zero or greater.".to_string(),
		});
	}

	let limit = limit.unwrap_or(cfg.default_limit).clamp(1, cfg.max_limit.max(1));

	Ok(SearchPolicy {
		fusion: FusionPolicy { weights, pool_size: cfg.pool_size },
		lexical_gate: LexicalGatePolicy {
			enabled: cfg.lexical_gate.enabled,
			min_hits: cfg.lexical_gate.min_hits,
			pool_size: cfg.lexical_gate.pool_size,
		},
		rerank: RerankPolicy {
			enabled: cfg.rerank.enabled,
			pool_size: cfg.rerank.pool_size,
			blend_weight: cfg.rerank.blend_weight,
			min_score_range: cfg.rerank.min_score_range,
		},
		person: PersonPolicy {
			enabled: cfg.person.enabled,
			content_weight: cfg.person.content_weight,
			person_weight: cfg.person.person_weight,
			pool_size: cfg.person.pool_size,
			max_known_people: cfg.person.max_known_people,
		},
		calibration: CalibrationPolicy {
			enabled: cfg.calibration.enabled,
			method: CalibrationMethod::parse(&cfg.calibration.method)?,
			alpha: cfg.calibration.alpha,
			max_cap: cfg.calibration.max_cap,
		},
		limit,
		min_score,
	})
}
