pub const TRANSCRIPT_VECTOR_NAME: &str = "transcript";
pub const SUMMARY_VECTOR_NAME: &str = "summary";
pub const VISUAL_VECTOR_NAME: &str = "visual";
pub const FACE_VECTOR_NAME: &str = "face";
pub const BM25_VECTOR_NAME: &str = "bm25";
pub const BM25_MODEL: &str = "qdrant/bm25";

pub const SCENE_ID_KEY: &str = "scene_id";
pub const OWNER_ID_KEY: &str = "owner_id";
pub const SOURCE_ID_KEY: &str = "source_id";
pub const PERSON_ID_KEY: &str = "person_id";
pub const NAME_KEY: &str = "name";
pub const ALIASES_KEY: &str = "aliases";
pub const EMBEDDING_KEY: &str = "embedding";

use qdrant_client::qdrant::{Condition, Filter};

use crate::Result;

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub scenes_collection: String,
	pub people_collection: String,
}
impl QdrantStore {
	pub fn new(cfg: &sift_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			scenes_collection: cfg.scenes_collection.clone(),
			people_collection: cfg.people_collection.clone(),
		})
	}
}

/// Restricts a scene query to one owner, optionally one source, and optionally an allowlist
/// of scene ids.
pub fn scene_filter(owner_id: &str, source_id: Option<&str>, allowlist: Option<&[String]>) -> Filter {
	let mut must = vec![Condition::matches(OWNER_ID_KEY, owner_id.to_string())];

	if let Some(source_id) = source_id {
		must.push(Condition::matches(SOURCE_ID_KEY, source_id.to_string()));
	}
	if let Some(allowlist) = allowlist {
		must.push(Condition::matches(SCENE_ID_KEY, allowlist.to_vec()));
	}

	Filter { must, should: Vec::new(), must_not: Vec::new(), min_should: None }
}
