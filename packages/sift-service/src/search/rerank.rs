use std::collections::HashMap;

use serde::Serialize;

use crate::search::{FusedResult, fusion};

#[derive(Clone, Debug, Serialize)]
pub struct RerankPolicy {
	pub enabled: bool,
	pub pool_size: u32,
	pub blend_weight: f32,
	pub min_score_range: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankSkipReason {
	/// The visual mode does not ask for a rerank pass.
	NotRequested,
	Disabled,
	/// The vision-grounded query vector could not be produced.
	MissingVector,
	/// The batch lookup failed or timed out.
	Unavailable,
	NoScores,
	FlatScores,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RerankOutcome {
	Applied { scored: usize, score_range: f32 },
	Skipped { reason: RerankSkipReason, score_range: Option<f32> },
}
impl RerankOutcome {
	pub fn skipped(reason: RerankSkipReason) -> Self {
		Self::Skipped { reason, score_range: None }
	}
}

/// Scene ids of the rerank pool, in ranking order.
pub fn rerank_pool(fused: &[FusedResult], policy: &RerankPolicy) -> Vec<String> {
	fused.iter().take(policy.pool_size as usize).map(|result| result.scene_id.clone()).collect()
}

/// Blends vision-grounded scores into the top of the fused ranking.
///
/// `scores` holds the batch lookup for the pool returned by [`rerank_pool`]. Scenes without a
/// score keep their fused score. When the score range is below `min_score_range` the input is
/// returned unchanged.
pub fn rerank(
	mut fused: Vec<FusedResult>,
	scores: &HashMap<String, f32>,
	policy: &RerankPolicy,
) -> (Vec<FusedResult>, RerankOutcome) {
	let pool = policy.pool_size as usize;
	let scored: Vec<(usize, f32)> = fused
		.iter()
		.take(pool)
		.enumerate()
		.filter_map(|(idx, result)| {
			let score = scores.get(&result.scene_id).copied()?;

			score.is_finite().then_some((idx, score))
		})
		.collect();

	if scored.is_empty() {
		return (fused, RerankOutcome::skipped(RerankSkipReason::NoScores));
	}

	let raw: Vec<f32> = scored.iter().map(|(_, score)| *score).collect();
	let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
	let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
	let score_range = max - min;

	if score_range < policy.min_score_range {
		tracing::info!(
			score_range,
			min_score_range = policy.min_score_range,
			candidate_count = scored.len(),
			"Rerank skipped because visual scores are too flat."
		);

		return (
			fused,
			RerankOutcome::Skipped {
				reason: RerankSkipReason::FlatScores,
				score_range: Some(score_range),
			},
		);
	}

	let normalized = fusion::min_max_normalize(&raw);
	let weight = policy.blend_weight;

	for ((idx, raw_score), norm) in scored.iter().zip(normalized) {
		let result = &mut fused[*idx];

		result.rerank_score = Some(*raw_score);
		result.fused_score = (1.0 - weight) * result.fused_score + weight * norm;
	}

	fusion::sort_results(&mut fused);

	(fused, RerankOutcome::Applied { scored: scored.len(), score_range })
}
