use std::collections::BTreeMap;

use serde::Serialize;

use crate::search::{ChannelCandidateSet, FusedResult, MatchQuality, fusion};
use sift_domain::Channel;

#[derive(Clone, Debug, Serialize)]
pub struct PersonPolicy {
	pub enabled: bool,
	pub content_weight: f32,
	pub person_weight: f32,
	pub pool_size: u32,
	pub max_known_people: u32,
}

/// Fuses person-similarity candidates into the content ranking.
///
/// Content scores are taken as they stand after fusion and rerank; person scores are min-max
/// normalized per query. A scene missing from either side contributes zero for that side. When
/// the content side is empty its weight moves to the person side. An empty person set returns
/// the content ranking unchanged.
pub fn fuse_person(
	content: Vec<FusedResult>,
	person: &ChannelCandidateSet,
	policy: &PersonPolicy,
) -> Vec<FusedResult> {
	if person.is_empty() {
		return content;
	}

	let (content_weight, person_weight) = if content.is_empty() {
		(0.0, 1.0)
	} else {
		(policy.content_weight, policy.person_weight)
	};
	let normalized = person.normalized();
	let mut by_scene: BTreeMap<String, FusedResult> = content
		.into_iter()
		.map(|mut result| {
			result.fused_score *= content_weight;

			for contribution in result.contributions.values_mut() {
				*contribution *= content_weight;
			}

			(result.scene_id.clone(), result)
		})
		.collect();

	for (scene_id, score) in normalized {
		let weighted = person_weight * score;
		let result = by_scene.entry(scene_id.to_string()).or_insert_with(|| FusedResult {
			scene_id: scene_id.to_string(),
			fused_score: 0.0,
			contributing_channels: Vec::new(),
			match_quality: MatchQuality::Supported,
			contributions: BTreeMap::new(),
			rerank_score: None,
			person_score: None,
		});

		result.fused_score += weighted;
		result.person_score = Some(score);
		result.contributions.insert(Channel::Person, weighted);

		if !result.contributing_channels.contains(&Channel::Person) {
			result.contributing_channels.push(Channel::Person);
		}
	}

	let mut results: Vec<FusedResult> = by_scene.into_values().collect();

	fusion::sort_results(&mut results);

	results
}
