use std::{
	collections::{HashMap, HashSet},
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use sift_config::{Config, EmbeddingProviderConfig, SearchTimeouts};
use sift_domain::{Channel, KnownPerson};
use sift_service::{
	BoxFuture, ChannelWeights, EmbeddingProvider, Error, MatchQuality, Providers, RerankOutcome,
	RerankSkipReason, Result, SceneHit, SceneIndex, SearchRequest, SearchResponse, SearchScope,
	SiftService,
};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str =
	include_str!("../../sift-config/tests/fixtures/sample_config.template.toml");
const VISUAL_PROVIDER_ID: &str = "clip";
const TEXT_PROVIDER_ID: &str = "openai-compatible";

fn test_config() -> Config {
	let mut cfg: Config =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");

	cfg.search.timeouts = SearchTimeouts {
		embedding_ms: 200,
		transcript_ms: 200,
		summary_ms: 200,
		visual_ms: 200,
		lexical_ms: 200,
		person_ms: 200,
		rerank_ms: 200,
	};

	cfg
}

fn hits(entries: &[(&str, f32)]) -> Vec<SceneHit> {
	entries
		.iter()
		.map(|(scene_id, score)| SceneHit { scene_id: scene_id.to_string(), score: *score })
		.collect()
}

#[derive(Default)]
struct SpyIndex {
	hits: HashMap<Channel, Vec<SceneHit>>,
	failing: HashSet<Channel>,
	slow: HashSet<Channel>,
	batch_scores: HashMap<String, f32>,
	// (owner_id, person)
	people: Vec<(String, KnownPerson)>,
	// (owner_id, person_id) -> embedding
	embeddings: HashMap<(String, String), Vec<f32>>,
	dense_calls: Mutex<Vec<Channel>>,
	allowlists: Mutex<Vec<Option<Vec<String>>>>,
	lexical_calls: AtomicUsize,
	batch_sizes: Mutex<Vec<usize>>,
	batch_owners: Mutex<Vec<String>>,
	people_limits: Mutex<Vec<u32>>,
	person_calls: AtomicUsize,
}
impl SpyIndex {
	fn with_person(
		mut self,
		owner_id: &str,
		person_id: &str,
		name: &str,
		embedding: Option<Vec<f32>>,
	) -> Self {
		let person = KnownPerson {
			person_id: person_id.to_string(),
			name: name.to_string(),
			aliases: Vec::new(),
		};

		self.people.push((owner_id.to_string(), person));

		if let Some(embedding) = embedding {
			self.embeddings.insert((owner_id.to_string(), person_id.to_string()), embedding);
		}

		self
	}

	fn with_hits(mut self, channel: Channel, entries: &[(&str, f32)]) -> Self {
		self.hits.insert(channel, hits(entries));

		self
	}

	fn failing(mut self, channel: Channel) -> Self {
		self.failing.insert(channel);

		self
	}

	fn slow(mut self, channel: Channel) -> Self {
		self.slow.insert(channel);

		self
	}

	fn with_batch_scores(mut self, entries: &[(&str, f32)]) -> Self {
		self.batch_scores =
			entries.iter().map(|(scene_id, score)| (scene_id.to_string(), *score)).collect();

		self
	}

	fn dense_calls(&self) -> Vec<Channel> {
		self.dense_calls.lock().expect("Lock poisoned.").clone()
	}

	fn batch_sizes(&self) -> Vec<usize> {
		self.batch_sizes.lock().expect("Lock poisoned.").clone()
	}

	fn people_limits(&self) -> Vec<u32> {
		self.people_limits.lock().expect("Lock poisoned.").clone()
	}

	// Allowlists are recorded but not applied, so containment must come from the engine.
	async fn answer(&self, channel: Channel, limit: u32) -> Result<Vec<SceneHit>> {
		if self.slow.contains(&channel) {
			tokio::time::sleep(Duration::from_secs(5)).await;
		}
		if self.failing.contains(&channel) {
			return Err(Error::Storage { message: format!("{} index offline.", channel.as_str()) });
		}

		Ok(self
			.hits
			.get(&channel)
			.map(|hits| hits.iter().take(limit as usize).cloned().collect())
			.unwrap_or_default())
	}
}

impl SceneIndex for SpyIndex {
	fn dense_search<'a>(
		&'a self,
		channel: Channel,
		_vector: &'a [f32],
		_scope: &'a SearchScope,
		limit: u32,
		allowlist: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<Vec<SceneHit>>> {
		Box::pin(async move {
			self.dense_calls.lock().expect("Lock poisoned.").push(channel);
			self.allowlists.lock().expect("Lock poisoned.").push(allowlist.map(<[String]>::to_vec));

			self.answer(channel, limit).await
		})
	}

	fn lexical_search<'a>(
		&'a self,
		_query: &'a str,
		_scope: &'a SearchScope,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<SceneHit>>> {
		Box::pin(async move {
			self.lexical_calls.fetch_add(1, Ordering::SeqCst);

			self.answer(Channel::Lexical, limit).await
		})
	}

	fn batch_score<'a>(
		&'a self,
		channel: Channel,
		_vector: &'a [f32],
		scope: &'a SearchScope,
		scene_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, f32>>> {
		Box::pin(async move {
			assert_eq!(channel, Channel::Visual);

			self.batch_sizes.lock().expect("Lock poisoned.").push(scene_ids.len());
			self.batch_owners.lock().expect("Lock poisoned.").push(scope.owner_id.clone());

			Ok(scene_ids
				.iter()
				.filter_map(|id| self.batch_scores.get(id).map(|score| (id.clone(), *score)))
				.collect())
		})
	}

	fn known_people<'a>(
		&'a self,
		scope: &'a SearchScope,
		max_people: u32,
	) -> BoxFuture<'a, Result<Vec<KnownPerson>>> {
		Box::pin(async move {
			self.people_limits.lock().expect("Lock poisoned.").push(max_people);

			let mut people: Vec<KnownPerson> = self
				.people
				.iter()
				.filter(|(owner_id, _)| *owner_id == scope.owner_id)
				.map(|(_, person)| person.clone())
				.collect();

			people.sort_by(|a, b| a.person_id.cmp(&b.person_id));
			people.truncate(max_people as usize);

			Ok(people)
		})
	}

	fn person_embedding<'a>(
		&'a self,
		person_id: &'a str,
		scope: &'a SearchScope,
	) -> BoxFuture<'a, Result<Option<Vec<f32>>>> {
		Box::pin(async move {
			let key = (scope.owner_id.clone(), person_id.to_string());

			Ok(self.embeddings.get(&key).cloned())
		})
	}

	fn person_search<'a>(
		&'a self,
		_vector: &'a [f32],
		_scope: &'a SearchScope,
		limit: u32,
		allowlist: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<Vec<SceneHit>>> {
		Box::pin(async move {
			self.person_calls.fetch_add(1, Ordering::SeqCst);
			self.allowlists.lock().expect("Lock poisoned.").push(allowlist.map(<[String]>::to_vec));

			self.answer(Channel::Person, limit).await
		})
	}
}

#[derive(Default)]
struct DummyEmbedding {
	failing: HashSet<&'static str>,
	calls: AtomicUsize,
	visual_calls: AtomicUsize,
}

impl EmbeddingProvider for DummyEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if cfg.provider_id == VISUAL_PROVIDER_ID {
				self.visual_calls.fetch_add(1, Ordering::SeqCst);
			}
			if self.failing.contains(cfg.provider_id.as_str()) {
				return Err(Error::Provider {
					message: "Embedding service unavailable.".to_string(),
				});
			}

			Ok(texts.iter().map(|_| vec![0.1; cfg.dimensions as usize]).collect())
		})
	}
}

struct Harness {
	service: SiftService,
	index: Arc<SpyIndex>,
	embedding: Arc<DummyEmbedding>,
}

fn harness(index: SpyIndex) -> Harness {
	harness_with(test_config(), index, DummyEmbedding::default())
}

fn harness_with(cfg: Config, index: SpyIndex, embedding: DummyEmbedding) -> Harness {
	let index = Arc::new(index);
	let embedding = Arc::new(embedding);
	let service = SiftService::with_parts(
		cfg,
		index.clone(),
		Providers::new(embedding.clone() as Arc<dyn EmbeddingProvider>),
	);

	Harness { service, index, embedding }
}

fn request(query: &str) -> SearchRequest {
	SearchRequest {
		owner_id: "owner-1".to_string(),
		query: query.to_string(),
		debug: true,
		..Default::default()
	}
}

fn ids(response: &SearchResponse) -> Vec<&str> {
	response.items.iter().map(|item| item.scene_id.as_str()).collect()
}

const RECALL_QUERY: &str = "red car driving on the beach at sunset";
const RERANK_QUERY: &str = "a dog that talks";
const SKIP_QUERY: &str = "what does the coach say when she explains the drill";

#[tokio::test]
async fn recall_query_fuses_every_content_channel() {
	let h = harness(
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9), ("s2", 0.5)])
			.with_hits(Channel::Visual, &[("s2", 0.8), ("s3", 0.4)])
			.with_hits(Channel::Summary, &[("s1", 0.7)])
			.with_hits(Channel::Lexical, &[("s3", 5.0), ("s1", 1.0)]),
	);
	let response = h
		.service
		.search(SearchRequest { language: Some("en".to_string()), ..request(RECALL_QUERY) })
		.await
		.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(ids(&response), vec!["s1", "s2", "s3"]);
	assert!(h.index.dense_calls().contains(&Channel::Visual));
	assert!(h.index.batch_sizes().is_empty());
	assert_eq!(debug.channel_counts.len(), 4);
	assert_eq!(debug.rerank, RerankOutcome::skipped(RerankSkipReason::NotRequested));
	assert!((debug.effective_weights.values().sum::<f32>() - 1.0).abs() < 1e-6);
	assert!(response.items.iter().all(|item| (0.0..0.97).contains(&item.display_score)));
	assert!(response.items.windows(2).all(|pair| pair[0].score >= pair[1].score));
	assert!(response.items.windows(2).all(|pair| pair[0].display_score >= pair[1].display_score));
}

#[tokio::test]
async fn failing_channel_is_treated_as_empty() {
	let h = harness(
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9)])
			.with_hits(Channel::Summary, &[("s2", 0.7), ("s3", 0.5), ("s4", 0.2)])
			.with_hits(Channel::Lexical, &[("s3", 4.0)])
			.failing(Channel::Transcript),
	);
	let response = h.service.search(request(RERANK_QUERY)).await.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(debug.unavailable_channels, vec![Channel::Transcript]);
	assert!(!ids(&response).contains(&"s1"));
	assert_eq!(debug.effective_weights.len(), 2);
	assert!((debug.effective_weights[&Channel::Summary] - 0.5).abs() < 1e-6);
	assert!((debug.effective_weights[&Channel::Lexical] - 0.5).abs() < 1e-6);
	assert_eq!(ids(&response), vec!["s3", "s2", "s4"]);
}

#[tokio::test]
async fn every_channel_failing_reports_no_searchable_signal() {
	let h = harness(
		SpyIndex::default()
			.failing(Channel::Transcript)
			.failing(Channel::Summary)
			.failing(Channel::Lexical),
	);
	let err = h.service.search(request(RERANK_QUERY)).await.expect_err("Search must fail.");

	assert!(matches!(err, Error::NoSearchableSignal { .. }));
}

#[tokio::test]
async fn embedding_failure_leaves_lexical_results() {
	let h = harness_with(
		test_config(),
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9)])
			.with_hits(Channel::Lexical, &[("s2", 3.0), ("s3", 1.0)]),
		DummyEmbedding {
			failing: HashSet::from([TEXT_PROVIDER_ID, VISUAL_PROVIDER_ID]),
			..Default::default()
		},
	);
	let response = h.service.search(request(RERANK_QUERY)).await.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(ids(&response), vec!["s2", "s3"]);
	assert!(h.index.dense_calls().is_empty());
	assert_eq!(debug.unavailable_channels, vec![Channel::Transcript, Channel::Summary]);
	assert_eq!(debug.rerank, RerankOutcome::skipped(RerankSkipReason::MissingVector));
}

#[tokio::test]
async fn invalid_weights_are_rejected_before_retrieval() {
	let h = harness(SpyIndex::default().with_hits(Channel::Transcript, &[("s1", 0.9)]));
	let weights = ChannelWeights { transcript: 0.6, visual: 0.3, summary: 0.2, lexical: 0.1 };
	let err = h
		.service
		.search(SearchRequest { weights: Some(weights), ..request(RERANK_QUERY) })
		.await
		.expect_err("Search must fail.");

	assert!(matches!(err, Error::InvalidWeights { .. }));
	assert_eq!(h.embedding.calls.load(Ordering::SeqCst), 0);
	assert!(h.index.dense_calls().is_empty());
	assert_eq!(h.index.lexical_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn weight_overrides_change_the_ranking() {
	let index = || {
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9), ("s2", 0.1)])
			.with_hits(Channel::Lexical, &[("s2", 6.0), ("s1", 1.0)])
	};
	let h = harness(index());
	let transcript_heavy =
		ChannelWeights { transcript: 0.8, visual: 0.0, summary: 0.0, lexical: 0.2 };
	let response = h
		.service
		.search(SearchRequest { weights: Some(transcript_heavy), ..request(RERANK_QUERY) })
		.await
		.expect("Search failed.");

	assert_eq!(ids(&response), vec!["s1", "s2"]);

	let h = harness(index());
	let lexical_heavy =
		ChannelWeights { transcript: 0.2, visual: 0.0, summary: 0.0, lexical: 0.8 };
	let response = h
		.service
		.search(SearchRequest { weights: Some(lexical_heavy), ..request(RERANK_QUERY) })
		.await
		.expect("Search failed.");

	assert_eq!(ids(&response), vec!["s2", "s1"]);
}

#[tokio::test]
async fn lookup_with_lexical_hits_restricts_every_channel() {
	let h = harness(
		SpyIndex::default()
			.with_hits(Channel::Lexical, &[("s1", 3.0), ("s2", 2.0)])
			.with_hits(Channel::Transcript, &[("s9", 0.99), ("s1", 0.5)])
			.with_hits(Channel::Summary, &[("s8", 0.9), ("s2", 0.6)]),
	);
	let response = h.service.search(request("Nike")).await.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");
	let allowed = ["s1", "s2"];

	assert!(!response.items.is_empty());
	assert!(ids(&response).iter().all(|id| allowed.contains(id)));
	assert!(response.items.iter().all(|item| item.match_quality == MatchQuality::Supported));
	assert!(debug.gate.active);
	assert_eq!(h.index.lexical_calls.load(Ordering::SeqCst), 1);

	for allowlist in h.index.allowlists.lock().expect("Lock poisoned.").iter() {
		assert_eq!(allowlist.as_deref(), Some(&["s1".to_string(), "s2".to_string()][..]));
	}
}

#[tokio::test]
async fn lookup_without_lexical_hits_falls_back_to_best_guess() {
	let h =
		harness(SpyIndex::default().with_hits(Channel::Transcript, &[("s1", 0.9), ("s2", 0.4)]));
	let response = h.service.search(request("Nike")).await.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(ids(&response), vec!["s1", "s2"]);
	assert!(response.items.iter().all(|item| item.match_quality == MatchQuality::BestGuess));
	assert_eq!(debug.gate.allowlist, None);
	assert!(h.index.allowlists.lock().expect("Lock poisoned.").iter().all(Option::is_none));
}

#[tokio::test]
async fn rerank_scores_the_pool_in_one_batch() {
	let transcript: Vec<(String, f32)> =
		(0..30).map(|idx| (format!("s{idx:02}"), 0.9 - idx as f32 * 0.01)).collect();
	let transcript: Vec<(&str, f32)> =
		transcript.iter().map(|(id, score)| (id.as_str(), *score)).collect();
	let h = harness(
		SpyIndex::default()
			.with_hits(Channel::Transcript, &transcript)
			.with_batch_scores(&[("s29", 0.95), ("s00", 0.1), ("s01", 0.2)]),
	);
	let response = h.service.search(request(RERANK_QUERY)).await.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(h.index.batch_sizes(), vec![30]);
	assert_eq!(*h.index.batch_owners.lock().expect("Lock poisoned."), vec!["owner-1".to_string()]);
	assert!(!h.index.dense_calls().contains(&Channel::Visual));
	assert!(matches!(debug.rerank, RerankOutcome::Applied { scored: 3, .. }));
	assert_eq!(h.embedding.visual_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn flat_rerank_scores_keep_the_fused_order() {
	let index = || {
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9), ("s2", 0.6), ("s3", 0.3)])
			.with_batch_scores(&[("s1", 0.30), ("s2", 0.32), ("s3", 0.31)])
	};
	let h = harness(index());
	let reranked = h.service.search(request(RERANK_QUERY)).await.expect("Search failed.");
	let mut cfg = test_config();

	cfg.search.rerank.enabled = false;

	let h = harness_with(cfg, index(), DummyEmbedding::default());
	let plain = h.service.search(request(RERANK_QUERY)).await.expect("Search failed.");

	assert_eq!(ids(&reranked), ids(&plain));
	assert!(matches!(
		reranked.debug.as_ref().expect("Debug output missing.").rerank,
		RerankOutcome::Skipped { reason: RerankSkipReason::FlatScores, .. }
	));
	assert!(h.index.batch_sizes().is_empty());
}

#[tokio::test]
async fn skip_mode_never_touches_the_visual_channel() {
	let h = harness(SpyIndex::default().with_hits(Channel::Transcript, &[("s1", 0.9)]));
	let response = h
		.service
		.search(SearchRequest { language: Some("en".to_string()), ..request(SKIP_QUERY) })
		.await
		.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(h.embedding.visual_calls.load(Ordering::SeqCst), 0);
	assert!(!h.index.dense_calls().contains(&Channel::Visual));
	assert!(h.index.batch_sizes().is_empty());
	assert_eq!(debug.rerank, RerankOutcome::skipped(RerankSkipReason::NotRequested));
}

#[tokio::test]
async fn detected_person_is_fused_after_content() {
	let mut index = SpyIndex::default()
		.with_hits(Channel::Transcript, &[("s1", 0.9), ("s2", 0.8)])
		.with_hits(Channel::Person, &[("s3", 0.9), ("s2", 0.4)]);

	index.people.push((
		"owner-1".to_string(),
		KnownPerson {
			person_id: "p1".to_string(),
			name: "Alice Chen".to_string(),
			aliases: vec!["Ali".to_string()],
		},
	));
	index.embeddings.insert(("owner-1".to_string(), "p1".to_string()), vec![0.2; 512]);

	let h = harness(index);
	let response = h
		.service
		.search(request("scenes with alice chen in the kitchen"))
		.await
		.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(debug.person_id.as_deref(), Some("p1"));
	assert_eq!(h.index.person_calls.load(Ordering::SeqCst), 1);
	assert_eq!(ids(&response), vec!["s3", "s1", "s2"]);
	assert_eq!(response.items[0].channels, vec![Channel::Person]);
	assert!((response.items[0].score - 0.65).abs() < 1e-6);
	assert!((response.items[1].score - 0.35).abs() < 1e-6);
}

#[tokio::test]
async fn person_without_embedding_is_a_passthrough() {
	let h = harness(
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9), ("s2", 0.8)])
			.with_hits(Channel::Person, &[("s3", 0.9)]),
	);
	let response = h
		.service
		.search(SearchRequest { person_id: Some("p2".to_string()), ..request(RERANK_QUERY) })
		.await
		.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(debug.person_id, None);
	assert_eq!(h.index.person_calls.load(Ordering::SeqCst), 0);
	assert_eq!(ids(&response), vec!["s1", "s2"]);
}

#[tokio::test]
async fn explicit_person_of_another_owner_is_ignored() {
	let h = harness(
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9), ("s2", 0.8)])
			.with_hits(Channel::Person, &[("s3", 0.99)])
			.with_person("owner-2", "other-owner-person", "Dana Ruiz", Some(vec![0.3; 512])),
	);
	let response = h
		.service
		.search(SearchRequest {
			person_id: Some("other-owner-person".to_string()),
			..request(RERANK_QUERY)
		})
		.await
		.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(debug.person_id, None);
	assert_eq!(h.index.person_calls.load(Ordering::SeqCst), 0);
	assert!(h.index.people_limits().is_empty());
	assert_eq!(ids(&response), vec!["s1", "s2"]);
}

#[tokio::test]
async fn people_of_another_owner_are_never_detected() {
	let h = harness(
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9)])
			.with_hits(Channel::Person, &[("s3", 0.99)])
			.with_person("owner-2", "p9", "Dana Ruiz", Some(vec![0.3; 512])),
	);
	let response = h
		.service
		.search(request("dana ruiz walking in the park"))
		.await
		.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(debug.person_id, None);
	assert_eq!(h.index.person_calls.load(Ordering::SeqCst), 0);
	assert_eq!(ids(&response), vec!["s1"]);
}

#[tokio::test]
async fn person_hits_stay_inside_the_lexical_allowlist() {
	let h = harness(
		SpyIndex::default()
			.with_hits(Channel::Lexical, &[("s1", 3.0), ("s2", 2.0)])
			.with_hits(Channel::Transcript, &[("s1", 0.8)])
			.with_hits(Channel::Person, &[("s9", 0.99), ("s2", 0.7), ("s1", 0.2)])
			.with_person("owner-1", "p-nike", "Nike", Some(vec![0.1; 512])),
	);
	let response = h.service.search(request("Nike")).await.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");
	let allowed = ["s1", "s2"];

	assert!(debug.gate.active);
	assert_eq!(debug.person_id.as_deref(), Some("p-nike"));
	assert_eq!(h.index.person_calls.load(Ordering::SeqCst), 1);
	assert!(!response.items.is_empty());
	assert!(ids(&response).iter().all(|id| allowed.contains(id)));
	assert_eq!(debug.channel_counts.get(&Channel::Person), Some(&2));
}

#[tokio::test]
async fn known_people_listing_honors_the_cap() {
	let index = || {
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9)])
			.with_hits(Channel::Person, &[("s3", 0.99)])
			.with_person("owner-1", "p1", "Alice Chen", Some(vec![0.2; 512]))
			.with_person("owner-1", "p2", "Bruno Stone", Some(vec![0.2; 512]))
	};
	let query = "bruno stone on a boat";
	let h = harness(index());
	let uncapped = h.service.search(request(query)).await.expect("Search failed.");

	assert_eq!(
		uncapped.debug.as_ref().expect("Debug output missing.").person_id.as_deref(),
		Some("p2")
	);
	assert_eq!(h.index.people_limits(), vec![2_000]);

	let mut cfg = test_config();

	cfg.search.person.max_known_people = 1;

	let h = harness_with(cfg, index(), DummyEmbedding::default());
	let capped = h.service.search(request(query)).await.expect("Search failed.");

	assert_eq!(capped.debug.as_ref().expect("Debug output missing.").person_id, None);
	assert_eq!(h.index.people_limits(), vec![1]);
	assert_eq!(h.index.person_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn limit_and_min_score_apply_after_ranking() {
	let transcript: Vec<(String, f32)> =
		(0..10).map(|idx| (format!("s{idx}"), 0.9 - idx as f32 * 0.05)).collect();
	let transcript: Vec<(&str, f32)> =
		transcript.iter().map(|(id, score)| (id.as_str(), *score)).collect();
	let h = harness(SpyIndex::default().with_hits(Channel::Transcript, &transcript));
	let filtered = h
		.service
		.search(SearchRequest { min_score: Some(0.5), ..request(RERANK_QUERY) })
		.await
		.expect("Search failed.");

	assert_eq!(ids(&filtered), vec!["s0", "s1", "s2", "s3", "s4"]);

	let limited = h
		.service
		.search(SearchRequest { min_score: Some(0.5), limit: Some(3), ..request(RERANK_QUERY) })
		.await
		.expect("Search failed.");

	assert_eq!(ids(&limited), vec!["s0", "s1", "s2"]);

	for (a, b) in limited.items.iter().zip(&filtered.items) {
		assert_eq!(a.display_score, b.display_score);
	}
}

#[tokio::test]
async fn slow_channel_times_out_without_failing_the_query() {
	let h = harness(
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("s1", 0.9)])
			.with_hits(Channel::Summary, &[("s2", 0.9)])
			.slow(Channel::Summary),
	);
	let response = h.service.search(request(RERANK_QUERY)).await.expect("Search failed.");
	let debug = response.debug.as_ref().expect("Debug output missing.");

	assert_eq!(ids(&response), vec!["s1"]);
	assert_eq!(debug.unavailable_channels, vec![Channel::Summary]);
}

#[tokio::test]
async fn repeated_searches_are_identical() {
	let index = || {
		SpyIndex::default()
			.with_hits(Channel::Transcript, &[("b", 0.6), ("a", 0.6), ("c", 0.2)])
			.with_hits(Channel::Summary, &[("c", 0.9), ("d", 0.9)])
			.with_hits(Channel::Lexical, &[("d", 2.0), ("a", 1.0)])
	};
	let first = harness(index()).service.search(request(RERANK_QUERY)).await.expect("Search.");
	let second = harness(index()).service.search(request(RERANK_QUERY)).await.expect("Search.");

	assert_eq!(
		serde_json::to_string(&first.items).expect("Failed to serialize."),
		serde_json::to_string(&second.items).expect("Failed to serialize.")
	);
	assert_ne!(first.trace_id, second.trace_id);
}

#[tokio::test]
async fn empty_indexes_return_no_items() {
	let h = harness(SpyIndex::default());
	let response = h.service.search(request(RERANK_QUERY)).await.expect("Search failed.");

	assert!(response.items.is_empty());
}

#[tokio::test]
async fn disabled_calibration_shows_internal_scores() {
	let mut cfg = test_config();

	cfg.search.calibration.enabled = false;

	let h = harness_with(
		cfg,
		SpyIndex::default().with_hits(Channel::Transcript, &[("s1", 0.9), ("s2", 0.3)]),
		DummyEmbedding::default(),
	);
	let response = h.service.search(request(RERANK_QUERY)).await.expect("Search failed.");

	assert!(response.items.iter().all(|item| item.display_score == item.score));
	assert_eq!(response.items[0].score, 1.0);
}

#[tokio::test]
async fn blank_inputs_are_rejected() {
	let h = harness(SpyIndex::default());
	let err = h.service.search(request("   ")).await.expect_err("Search must fail.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	let err = h
		.service
		.search(SearchRequest { owner_id: String::new(), ..request(RERANK_QUERY) })
		.await
		.expect_err("Search must fail.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}
