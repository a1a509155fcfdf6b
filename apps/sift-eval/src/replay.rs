use std::{
	collections::{BTreeMap, HashMap},
	sync::RwLock,
};

use serde::Deserialize;

use sift_config::EmbeddingProviderConfig;
use sift_domain::{Channel, KnownPerson};
use sift_service::{BoxFuture, EmbeddingProvider, SceneHit, SceneIndex, SearchScope};

/// Index answers captured for one query, replayed instead of calling Qdrant.
///
/// A recording already belongs to the query's owner, so scope arguments are not consulted.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReplayRecording {
	#[serde(default)]
	pub hits: BTreeMap<Channel, Vec<ReplayHit>>,
	/// Vision-grounded scores served to the rerank batch lookup.
	#[serde(default)]
	pub visual_scores: BTreeMap<String, f32>,
	#[serde(default)]
	pub people: Vec<KnownPerson>,
	#[serde(default)]
	pub person_embeddings: BTreeMap<String, Vec<f32>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReplayHit {
	pub scene_id: String,
	pub score: f32,
}

/// A [`SceneIndex`] that serves the active recording.
///
/// Queries run one at a time, so the harness swaps the recording in with [`ReplayIndex::load`]
/// before each search.
#[derive(Debug, Default)]
pub struct ReplayIndex {
	active: RwLock<ReplayRecording>,
}
impl ReplayIndex {
	pub fn load(&self, recording: ReplayRecording) -> sift_service::Result<()> {
		let mut active = self.active.write().map_err(|_| poisoned())?;

		*active = recording;

		Ok(())
	}

	fn read<T>(&self, f: impl FnOnce(&ReplayRecording) -> T) -> sift_service::Result<T> {
		let active = self.active.read().map_err(|_| poisoned())?;

		Ok(f(&active))
	}

	fn channel_hits(
		&self,
		channel: Channel,
		limit: u32,
		allowlist: Option<&[String]>,
	) -> sift_service::Result<Vec<SceneHit>> {
		self.read(|recording| {
			recording
				.hits
				.get(&channel)
				.into_iter()
				.flatten()
				.filter(|hit| allowlist.is_none_or(|allowed| allowed.contains(&hit.scene_id)))
				.take(limit as usize)
				.map(|hit| SceneHit { scene_id: hit.scene_id.clone(), score: hit.score })
				.collect()
		})
	}
}

impl SceneIndex for ReplayIndex {
	fn dense_search<'a>(
		&'a self,
		channel: Channel,
		_vector: &'a [f32],
		_scope: &'a SearchScope,
		limit: u32,
		allowlist: Option<&'a [String]>,
	) -> BoxFuture<'a, sift_service::Result<Vec<SceneHit>>> {
		Box::pin(async move { self.channel_hits(channel, limit, allowlist) })
	}

	fn lexical_search<'a>(
		&'a self,
		_query: &'a str,
		_scope: &'a SearchScope,
		limit: u32,
	) -> BoxFuture<'a, sift_service::Result<Vec<SceneHit>>> {
		Box::pin(async move { self.channel_hits(Channel::Lexical, limit, None) })
	}

	fn batch_score<'a>(
		&'a self,
		_channel: Channel,
		_vector: &'a [f32],
		_scope: &'a SearchScope,
		scene_ids: &'a [String],
	) -> BoxFuture<'a, sift_service::Result<HashMap<String, f32>>> {
		Box::pin(async move {
			self.read(|recording| {
				scene_ids
					.iter()
					.filter_map(|id| recording.visual_scores.get(id).map(|score| (id.clone(), *score)))
					.collect()
			})
		})
	}

	fn known_people<'a>(
		&'a self,
		_scope: &'a SearchScope,
		max_people: u32,
	) -> BoxFuture<'a, sift_service::Result<Vec<KnownPerson>>> {
		Box::pin(async move {
			self.read(|recording| {
				recording.people.iter().take(max_people as usize).cloned().collect()
			})
		})
	}

	fn person_embedding<'a>(
		&'a self,
		person_id: &'a str,
		_scope: &'a SearchScope,
	) -> BoxFuture<'a, sift_service::Result<Option<Vec<f32>>>> {
		Box::pin(async move {
			self.read(|recording| recording.person_embeddings.get(person_id).cloned())
		})
	}

	fn person_search<'a>(
		&'a self,
		_vector: &'a [f32],
		_scope: &'a SearchScope,
		limit: u32,
		allowlist: Option<&'a [String]>,
	) -> BoxFuture<'a, sift_service::Result<Vec<SceneHit>>> {
		Box::pin(async move { self.channel_hits(Channel::Person, limit, allowlist) })
	}
}

/// Returns a constant unit vector of the configured width for every text.
pub struct FixedEmbedding;

impl EmbeddingProvider for FixedEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_service::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			let dim = cfg.dimensions as usize;
			let value = 1.0 / (dim.max(1) as f32).sqrt();

			Ok(texts.iter().map(|_| vec![value; dim]).collect())
		})
	}
}

fn poisoned() -> sift_service::Error {
	sift_service::Error::Storage { message: "Replay recording lock is poisoned.".to_string() }
}
