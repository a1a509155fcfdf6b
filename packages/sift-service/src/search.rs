mod calibrate;
mod channels;
mod fusion;
mod gate;
mod person;
mod policy;
mod rerank;

pub use calibrate::{CalibrationMethod, CalibrationPolicy, calibrate};
pub use fusion::{
	Candidate, ChannelCandidateSet, FusedResult, MatchQuality, NEUTRAL_SCORE, effective_weights,
	fuse, min_max_normalize, sort_results,
};
pub use gate::{GateDecision, LexicalGatePolicy, gate};
pub use person::{PersonPolicy, fuse_person};
pub use policy::{ChannelTimeouts, ChannelWeights, FusionPolicy, SearchPolicy, resolve_policy};
pub use rerank::{RerankOutcome, RerankPolicy, RerankSkipReason, rerank, rerank_pool};

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, SceneHit, SearchScope, SiftService};
use channels::{Guarded, guarded, maybe};
use sift_config::EmbeddingProviderConfig;
use sift_domain::{Channel, IntentDecision};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SearchRequest {
	pub owner_id: String,
	pub query: String,
	/// BCP 47 style language hint such as `en` or `zh-CN`.
	pub language: Option<String>,
	pub source_id: Option<String>,
	/// Forces person-aware fusion for this person instead of detecting one from the query.
	pub person_id: Option<String>,
	pub limit: Option<u32>,
	pub min_score: Option<f32>,
	pub weights: Option<ChannelWeights>,
	#[serde(default)]
	pub debug: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchItem {
	pub scene_id: String,
	pub score: f32,
	pub display_score: f32,
	pub match_quality: MatchQuality,
	pub channels: Vec<Channel>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub trace_id: uuid::Uuid,
	pub items: Vec<SearchItem>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub debug: Option<SearchDebug>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchDebug {
	pub intent: IntentDecision,
	pub channel_counts: BTreeMap<Channel, usize>,
	pub unavailable_channels: Vec<Channel>,
	pub effective_weights: BTreeMap<Channel, f32>,
	pub gate: GateDecision,
	pub rerank: RerankOutcome,
	pub person_id: Option<String>,
	pub policy_hash: Option<String>,
}

struct ResolvedPerson {
	person_id: String,
	embedding: Vec<f32>,
}

// `None` marks a channel that was attempted but produced no usable answer.
type Fetched = Option<Vec<SceneHit>>;

impl SiftService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let owner_id = req.owner_id.trim();
		let query = req.query.trim();

		if owner_id.is_empty() {
			return Err(Error::InvalidRequest {
				message: "owner_id must be non-empty.".to_string(),
			});
		}
		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let policy =
			resolve_policy(&self.cfg.search, req.weights.as_ref(), req.limit, req.min_score)?;
		let timeouts = ChannelTimeouts::from_config(&self.cfg.search.timeouts);
		let trace_id = uuid::Uuid::new_v4();
		let scope = SearchScope {
			owner_id: owner_id.to_string(),
			source_id: req
				.source_id
				.as_deref()
				.map(str::trim)
				.filter(|source_id| !source_id.is_empty())
				.map(str::to_string),
		};
		let intent = sift_domain::classify(query, req.language.as_deref());
		let plan = intent.visual_mode.plan();

		tracing::debug!(
			%trace_id,
			visual_mode = intent.visual_mode.as_str(),
			lookup = intent.lookup,
			confidence = intent.confidence,
			"Query intent classified."
		);

		// Embeddings, person resolution and the gate's lexical pass do not depend on each other.
		let texts = vec![query.to_string()];
		let explicit_person = req.person_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
		let run_gate = intent.lookup && policy.lexical_gate.enabled;
		let (text_vector, visual_vector, person, gate_pass) = tokio::join!(
			self.embed_query(
				"text_embedding",
				&self.cfg.providers.text_embedding,
				&texts,
				&timeouts,
			),
			maybe(plan.embed_visual.then(|| {
				self.embed_query(
					"visual_embedding",
					&self.cfg.providers.visual_embedding,
					&texts,
					&timeouts,
				)
			})),
			maybe(policy.person.enabled.then(|| {
				self.resolve_person(explicit_person, query, &scope, &policy, &timeouts)
			})),
			maybe(run_gate.then(|| {
				guarded(
					Channel::Lexical.as_str(),
					timeouts.lexical,
					self.index.lexical_search(query, &scope, policy.lexical_gate.pool_size),
				)
			})),
		);
		let visual_vector = visual_vector.flatten();
		let person = person.flatten();
		let gate_pass: Option<Fetched> = gate_pass.map(Guarded::ready);
		let gate_set = ChannelCandidateSet::from_hits(
			Channel::Lexical,
			gate_pass.clone().flatten().unwrap_or_default(),
			policy.lexical_gate.pool_size as usize,
			None,
		);
		let gate_decision = gate(&intent, &gate_set, &policy.lexical_gate);

		if gate_decision.active {
			tracing::info!(
				%trace_id,
				candidate_count = gate_decision.lexical_hits,
				allowlisted = gate_decision.allowlist.is_some(),
				"Lexical gate evaluated."
			);
		}

		let allowlist: Option<Vec<String>> =
			gate_decision.allowlist.as_ref().map(|ids| ids.iter().cloned().collect());
		let allowlist_set: Option<HashSet<String>> =
			gate_decision.allowlist.as_ref().map(|ids| ids.iter().cloned().collect());
		let pool = policy.fusion.pool_size;
		let wants = |channel: Channel| plan.retrieval.contains(&channel);
		let (transcript, visual, summary, lexical, person_hits) = tokio::join!(
			maybe(wants(Channel::Transcript).then(|| {
				self.fetch_dense(
					Channel::Transcript,
					text_vector.as_deref(),
					&scope,
					pool,
					allowlist.as_deref(),
					&timeouts,
				)
			})),
			maybe(wants(Channel::Visual).then(|| {
				self.fetch_dense(
					Channel::Visual,
					visual_vector.as_deref(),
					&scope,
					pool,
					allowlist.as_deref(),
					&timeouts,
				)
			})),
			maybe(wants(Channel::Summary).then(|| {
				self.fetch_dense(
					Channel::Summary,
					text_vector.as_deref(),
					&scope,
					pool,
					allowlist.as_deref(),
					&timeouts,
				)
			})),
			maybe((wants(Channel::Lexical) && gate_pass.is_none()).then(|| {
				guarded(
					Channel::Lexical.as_str(),
					timeouts.lexical,
					self.index.lexical_search(query, &scope, pool),
				)
			})),
			maybe(person.as_ref().map(|person| {
				guarded(
					Channel::Person.as_str(),
					timeouts.person,
					self.index.person_search(
						&person.embedding,
						&scope,
						policy.person.pool_size,
						allowlist.as_deref(),
					),
				)
			})),
		);
		// The gate's lexical pass doubles as the lexical channel.
		let lexical: Option<Fetched> = match gate_pass {
			Some(fetched) if wants(Channel::Lexical) => Some(fetched),
			_ => lexical.map(Guarded::ready),
		};
		let mut sets: BTreeMap<Channel, ChannelCandidateSet> = BTreeMap::new();
		let mut unavailable: BTreeSet<Channel> = BTreeSet::new();
		let mut attempted = 0_usize;

		for (channel, fetched) in [
			(Channel::Transcript, transcript),
			(Channel::Visual, visual),
			(Channel::Summary, summary),
			(Channel::Lexical, lexical),
		] {
			let Some(fetched) = fetched else { continue };

			attempted += 1;

			let set = match fetched {
				Some(hits) => ChannelCandidateSet::from_hits(
					channel,
					hits,
					pool as usize,
					allowlist_set.as_ref(),
				),
				None => {
					unavailable.insert(channel);

					ChannelCandidateSet::empty(channel)
				},
			};

			sets.insert(channel, set);
		}

		let person_set = match person_hits.map(Guarded::ready) {
			Some(Some(hits)) => {
				attempted += 1;

				Some(ChannelCandidateSet::from_hits(
					Channel::Person,
					hits,
					policy.person.pool_size as usize,
					allowlist_set.as_ref(),
				))
			},
			Some(None) => {
				attempted += 1;

				unavailable.insert(Channel::Person);

				None
			},
			None => None,
		};

		if attempted > 0 && unavailable.len() == attempted {
			return Err(Error::NoSearchableSignal {
				message: "Every retrieval channel failed or timed out.".to_string(),
			});
		}

		let effective = effective_weights(&sets, &policy.fusion.weights);
		let channel_counts: BTreeMap<Channel, usize> = sets
			.iter()
			.map(|(channel, set)| (*channel, set.len()))
			.chain(person_set.as_ref().map(|set| (Channel::Person, set.len())))
			.collect();

		tracing::debug!(
			%trace_id,
			channel_counts = ?channel_counts,
			effective_weights = ?effective,
			"Channel candidates collected."
		);

		let mut results = fuse(&sets, &policy.fusion.weights);
		let rerank_outcome = self
			.rerank_stage(
				&mut results,
				plan.rerank,
				visual_vector.as_deref(),
				&scope,
				&policy.rerank,
				&timeouts,
			)
			.await;

		if let Some(person_set) = person_set.as_ref() {
			results = fuse_person(results, person_set, &policy.person);
		}

		for result in &mut results {
			result.match_quality = gate_decision.match_quality;
		}

		results.retain(|result| result.fused_score >= policy.min_score);

		let scores: Vec<f32> = results.iter().map(|result| result.fused_score).collect();
		let display = calibrate(&scores, &policy.calibration);
		let items = results
			.into_iter()
			.zip(display)
			.take(policy.limit as usize)
			.map(|(result, display_score)| SearchItem {
				scene_id: result.scene_id,
				score: result.fused_score,
				display_score,
				match_quality: result.match_quality,
				channels: result.contributing_channels,
			})
			.collect();
		let debug = req.debug.then(|| {
			let policy_hash = match policy.hash() {
				Ok(hash) => Some(hash),
				Err(err) => {
					tracing::warn!(error = %err, "Policy hash failed.");

					None
				},
			};

			SearchDebug {
				intent,
				channel_counts,
				unavailable_channels: unavailable.into_iter().collect(),
				effective_weights: effective,
				gate: gate_decision,
				rerank: rerank_outcome,
				person_id: person.map(|person| person.person_id),
				policy_hash,
			}
		});

		Ok(SearchResponse { trace_id, items, debug })
	}

	async fn embed_query(
		&self,
		stage: &'static str,
		cfg: &EmbeddingProviderConfig,
		texts: &[String],
		timeouts: &ChannelTimeouts,
	) -> Option<Vec<f32>> {
		let vectors = guarded(stage, timeouts.embedding, self.providers.embedding.embed(cfg, texts))
			.await
			.ready()?;
		let Some(vector) = vectors.into_iter().next() else {
			tracing::warn!(channel = stage, "Embedding provider returned no vectors.");

			return None;
		};

		if vector.len() != cfg.dimensions as usize {
			tracing::warn!(
				channel = stage,
				expected = cfg.dimensions,
				actual = vector.len(),
				"Embedding dimension mismatch."
			);

			return None;
		}

		Some(vector)
	}

	async fn resolve_person(
		&self,
		explicit: Option<&str>,
		query: &str,
		scope: &SearchScope,
		policy: &SearchPolicy,
		timeouts: &ChannelTimeouts,
	) -> Option<ResolvedPerson> {
		let stage = Channel::Person.as_str();
		// An explicit id is resolved through the owner-scoped embedding lookup alone.
		let person_id = match explicit {
			Some(person_id) => person_id.to_string(),
			None => {
				let max_people = policy.person.max_known_people;
				let people = guarded(
					stage,
					timeouts.person,
					self.index.known_people(scope, max_people),
				)
				.await
				.ready()?;

				if people.len() >= max_people as usize {
					tracing::warn!(
						owner_id = scope.owner_id.as_str(),
						max_people,
						"Known people truncated; names beyond the cap are not detected."
					);
				}

				sift_domain::detect_person(query, &people)?.person_id
			},
		};
		let embedding =
			guarded(stage, timeouts.person, self.index.person_embedding(&person_id, scope))
				.await
				.ready()
				.flatten();
		let Some(embedding) = embedding.filter(|embedding| !embedding.is_empty()) else {
			tracing::warn!(
				person_id = person_id.as_str(),
				owner_id = scope.owner_id.as_str(),
				"Person has no identity embedding for this owner; person fusion skipped."
			);

			return None;
		};

		Some(ResolvedPerson { person_id, embedding })
	}

	async fn fetch_dense(
		&self,
		channel: Channel,
		vector: Option<&[f32]>,
		scope: &SearchScope,
		limit: u32,
		allowlist: Option<&[String]>,
		timeouts: &ChannelTimeouts,
	) -> Fetched {
		let Some(vector) = vector else {
			tracing::warn!(
				channel = channel.as_str(),
				"Channel skipped because the query embedding is unavailable."
			);

			return None;
		};

		guarded(
			channel.as_str(),
			timeouts.for_channel(channel),
			self.index.dense_search(channel, vector, scope, limit, allowlist),
		)
		.await
		.ready()
	}

	async fn rerank_stage(
		&self,
		results: &mut Vec<FusedResult>,
		requested: bool,
		vector: Option<&[f32]>,
		scope: &SearchScope,
		policy: &RerankPolicy,
		timeouts: &ChannelTimeouts,
	) -> RerankOutcome {
		if !requested {
			return RerankOutcome::skipped(RerankSkipReason::NotRequested);
		}
		if !policy.enabled {
			return RerankOutcome::skipped(RerankSkipReason::Disabled);
		}

		let Some(vector) = vector else {
			tracing::warn!("Rerank skipped because the visual query embedding is unavailable.");

			return RerankOutcome::skipped(RerankSkipReason::MissingVector);
		};
		let pool = rerank_pool(results, policy);

		if pool.is_empty() {
			return RerankOutcome::skipped(RerankSkipReason::NoScores);
		}

		let Some(scores) = guarded(
			"rerank",
			timeouts.rerank,
			self.index.batch_score(Channel::Visual, vector, scope, &pool),
		)
		.await
		.ready() else {
			return RerankOutcome::skipped(RerankSkipReason::Unavailable);
		};
		let (reranked, outcome) = rerank(std::mem::take(results), &scores, policy);

		*results = reranked;

		outcome
	}
}
