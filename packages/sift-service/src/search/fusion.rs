use std::{
	cmp::Ordering,
	collections::{BTreeMap, HashMap, HashSet},
};

use serde::Serialize;

use crate::SceneHit;
use sift_domain::Channel;

/// Score assigned to every member of a multi-element set whose scores are all equal.
pub const NEUTRAL_SCORE: f32 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
	pub scene_id: String,
	pub raw_score: f32,
	pub channel: Channel,
}

/// Candidates of one channel, sorted by descending raw score with no duplicate scene ids.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelCandidateSet {
	channel: Channel,
	candidates: Vec<Candidate>,
}
impl ChannelCandidateSet {
	pub fn empty(channel: Channel) -> Self {
		Self { channel, candidates: Vec::new() }
	}

	/// Builds a set from raw index hits.
	///
	/// Non-finite scores are dropped, duplicate scene ids keep their best score, and hits
	/// outside `allowlist` are discarded before the pool cap applies.
	pub fn from_hits(
		channel: Channel,
		hits: Vec<SceneHit>,
		pool_size: usize,
		allowlist: Option<&HashSet<String>>,
	) -> Self {
		let mut best: HashMap<String, f32> = HashMap::with_capacity(hits.len());

		for hit in hits {
			if !hit.score.is_finite() {
				continue;
			}
			if let Some(allowlist) = allowlist
				&& !allowlist.contains(&hit.scene_id)
			{
				continue;
			}

			best.entry(hit.scene_id)
				.and_modify(|score| *score = score.max(hit.score))
				.or_insert(hit.score);
		}

		let mut candidates: Vec<Candidate> = best
			.into_iter()
			.map(|(scene_id, raw_score)| Candidate { scene_id, raw_score, channel })
			.collect();

		candidates.sort_by(|a, b| {
			cmp_f32_desc(a.raw_score, b.raw_score).then_with(|| a.scene_id.cmp(&b.scene_id))
		});
		candidates.truncate(pool_size);

		Self { channel, candidates }
	}

	pub fn channel(&self) -> Channel {
		self.channel
	}

	pub fn candidates(&self) -> &[Candidate] {
		&self.candidates
	}

	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	pub fn scene_ids(&self) -> impl Iterator<Item = &str> {
		self.candidates.iter().map(|candidate| candidate.scene_id.as_str())
	}

	/// Min-max normalized scores keyed by scene id.
	pub fn normalized(&self) -> HashMap<&str, f32> {
		let raw: Vec<f32> = self.candidates.iter().map(|candidate| candidate.raw_score).collect();

		self.scene_ids().zip(min_max_normalize(&raw)).collect()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
	Supported,
	BestGuess,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusedResult {
	pub scene_id: String,
	/// The current ranking score. Rerank and person fusion overwrite it in place.
	pub fused_score: f32,
	pub contributing_channels: Vec<Channel>,
	pub match_quality: MatchQuality,
	/// Weighted normalized score contributed by each channel that returned the scene.
	pub contributions: BTreeMap<Channel, f32>,
	pub rerank_score: Option<f32>,
	pub person_score: Option<f32>,
}

/// Per-query min-max normalization to `[0, 1]`.
///
/// A single score normalizes to 1.0. Two or more equal scores all normalize to
/// [`NEUTRAL_SCORE`].
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
	match scores {
		[] => Vec::new(),
		[_] => vec![1.0],
		_ => {
			let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
			let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
			let range = max - min;

			if !range.is_finite() || range <= 0.0 {
				return vec![NEUTRAL_SCORE; scores.len()];
			}

			scores.iter().map(|score| ((score - min) / range).clamp(0.0, 1.0)).collect()
		},
	}
}

/// Redistributes declared weights over the channels that produced at least one candidate.
///
/// Channels without a declared weight are ignored. The returned weights sum to 1.0 whenever at
/// least one weighted channel is active; a zero total is split evenly.
pub fn effective_weights(
	sets: &BTreeMap<Channel, ChannelCandidateSet>,
	weights: &BTreeMap<Channel, f32>,
) -> BTreeMap<Channel, f32> {
	let active: Vec<(Channel, f32)> = weights
		.iter()
		.filter(|(channel, _)| sets.get(channel).is_some_and(|set| !set.is_empty()))
		.map(|(channel, weight)| (*channel, weight.max(0.0)))
		.collect();

	if active.is_empty() {
		return BTreeMap::new();
	}

	let total: f32 = active.iter().map(|(_, weight)| weight).sum();

	if total <= 0.0 {
		let even = 1.0 / active.len() as f32;

		return active.into_iter().map(|(channel, _)| (channel, even)).collect();
	}

	active.into_iter().map(|(channel, weight)| (channel, weight / total)).collect()
}

/// Weighted linear fusion of per-channel normalized scores.
///
/// A scene absent from a channel contributes zero for that channel. Output is sorted by
/// descending score with ties broken by ascending scene id. Every result starts as
/// [`MatchQuality::Supported`].
pub fn fuse(
	sets: &BTreeMap<Channel, ChannelCandidateSet>,
	weights: &BTreeMap<Channel, f32>,
) -> Vec<FusedResult> {
	let effective = effective_weights(sets, weights);
	let mut by_scene: BTreeMap<&str, BTreeMap<Channel, f32>> = BTreeMap::new();

	for (channel, weight) in &effective {
		let Some(set) = sets.get(channel) else { continue };

		for (scene_id, normalized) in set.normalized() {
			by_scene.entry(scene_id).or_default().insert(*channel, weight * normalized);
		}
	}

	let mut results: Vec<FusedResult> = by_scene
		.into_iter()
		.map(|(scene_id, contributions)| FusedResult {
			scene_id: scene_id.to_string(),
			fused_score: contributions.values().sum(),
			contributing_channels: contributions.keys().copied().collect(),
			match_quality: MatchQuality::Supported,
			contributions,
			rerank_score: None,
			person_score: None,
		})
		.collect();

	sort_results(&mut results);

	results
}

pub fn sort_results(results: &mut [FusedResult]) {
	results.sort_by(|a, b| {
		cmp_f32_desc(a.fused_score, b.fused_score).then_with(|| a.scene_id.cmp(&b.scene_id))
	});
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
