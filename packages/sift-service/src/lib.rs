pub mod index;
pub mod search;

mod error;

pub use error::{Error, Result};
pub use search::{
	CalibrationMethod, CalibrationPolicy, Candidate, ChannelCandidateSet, ChannelWeights,
	FusedResult, GateDecision, LexicalGatePolicy, MatchQuality, PersonPolicy, RerankOutcome,
	RerankPolicy, RerankSkipReason, SearchDebug, SearchItem, SearchRequest, SearchResponse,
	calibrate, effective_weights, fuse, fuse_person, gate, min_max_normalize, rerank,
};
pub use sift_storage::models::SceneHit;

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use sift_config::{Config, EmbeddingProviderConfig};
use sift_domain::{Channel, KnownPerson};
use sift_providers::embedding;
use sift_storage::qdrant::QdrantStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Read-only access to the scene and people indexes.
///
/// Every call is scoped to one owner: scenes and people registered for a different owner must
/// never be returned, scored, or resolved. Implementations must answer `batch_score` with a
/// single round trip regardless of how many scene ids are passed.
pub trait SceneIndex
where
	Self: Send + Sync,
{
	fn dense_search<'a>(
		&'a self,
		channel: Channel,
		vector: &'a [f32],
		scope: &'a SearchScope,
		limit: u32,
		allowlist: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<Vec<SceneHit>>>;

	fn lexical_search<'a>(
		&'a self,
		query: &'a str,
		scope: &'a SearchScope,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<SceneHit>>>;

	fn batch_score<'a>(
		&'a self,
		channel: Channel,
		vector: &'a [f32],
		scope: &'a SearchScope,
		scene_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, f32>>>;

	/// Lists at most `max_people` people registered for the scope's owner.
	fn known_people<'a>(
		&'a self,
		scope: &'a SearchScope,
		max_people: u32,
	) -> BoxFuture<'a, Result<Vec<KnownPerson>>>;

	/// Returns `None` when the person is unknown to the scope's owner or has no embedding.
	fn person_embedding<'a>(
		&'a self,
		person_id: &'a str,
		scope: &'a SearchScope,
	) -> BoxFuture<'a, Result<Option<Vec<f32>>>>;

	fn person_search<'a>(
		&'a self,
		vector: &'a [f32],
		scope: &'a SearchScope,
		limit: u32,
		allowlist: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<Vec<SceneHit>>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchScope {
	pub owner_id: String,
	pub source_id: Option<String>,
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}

pub struct SiftService {
	pub cfg: Config,
	pub index: Arc<dyn SceneIndex>,
	pub providers: Providers,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}

impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

impl SiftService {
	pub fn new(cfg: Config, qdrant: QdrantStore) -> Self {
		Self { cfg, index: Arc::new(qdrant), providers: Providers::default() }
	}

	pub fn with_parts(cfg: Config, index: Arc<dyn SceneIndex>, providers: Providers) -> Self {
		Self { cfg, index, providers }
	}
}
