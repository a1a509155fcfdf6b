use std::collections::BTreeSet;

use serde::Serialize;

use crate::search::{ChannelCandidateSet, MatchQuality};
use sift_domain::IntentDecision;

#[derive(Clone, Debug, Serialize)]
pub struct LexicalGatePolicy {
	pub enabled: bool,
	pub min_hits: u32,
	/// How many lexical hits the gate pass fetches; all of them become the allowlist.
	pub pool_size: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GateDecision {
	/// Whether the gate ran at all for this query.
	pub active: bool,
	pub allowlist: Option<BTreeSet<String>>,
	pub match_quality: MatchQuality,
	pub lexical_hits: usize,
}
impl GateDecision {
	pub fn inactive() -> Self {
		Self {
			active: false,
			allowlist: None,
			match_quality: MatchQuality::Supported,
			lexical_hits: 0,
		}
	}
}

/// Lexical soft gate for lookup queries.
///
/// With enough lexical hits the hit ids become an allowlist for every other channel. Otherwise
/// nothing is restricted and results are marked as best guesses.
pub fn gate(
	intent: &IntentDecision,
	lexical: &ChannelCandidateSet,
	policy: &LexicalGatePolicy,
) -> GateDecision {
	if !intent.lookup || !policy.enabled {
		return GateDecision::inactive();
	}

	let lexical_hits = lexical.len();

	if lexical_hits >= policy.min_hits as usize && lexical_hits > 0 {
		return GateDecision {
			active: true,
			allowlist: Some(lexical.scene_ids().map(str::to_string).collect()),
			match_quality: MatchQuality::Supported,
			lexical_hits,
		};
	}

	GateDecision {
		active: true,
		allowlist: None,
		match_quality: MatchQuality::BestGuess,
		lexical_hits,
	}
}
