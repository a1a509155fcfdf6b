use qdrant_client::qdrant::{Document, Filter, Query, QueryPointsBuilder, ScoredPoint};

use crate::{
	Error, Result,
	models::SceneHit,
	payload,
	qdrant::{BM25_MODEL, BM25_VECTOR_NAME, QdrantStore, scene_filter},
};

impl QdrantStore {
	/// Nearest-neighbor search over one named dense vector of the scenes collection.
	pub async fn search_dense(
		&self,
		vector_name: &str,
		vector: Vec<f32>,
		filter: Filter,
		limit: u64,
	) -> Result<Vec<SceneHit>> {
		ensure_limit(limit)?;

		let search = QueryPointsBuilder::new(self.scenes_collection.clone())
			.query(Query::new_nearest(vector))
			.using(vector_name)
			.filter(filter)
			.limit(limit)
			.with_payload(true);
		let response = self.client.query(search).await?;

		Ok(collect_hits(response.result))
	}

	/// Server-side BM25 over the scene text.
	pub async fn search_bm25(&self, text: &str, filter: Filter, limit: u64) -> Result<Vec<SceneHit>> {
		ensure_limit(limit)?;

		let search = QueryPointsBuilder::new(self.scenes_collection.clone())
			.query(Query::new_nearest(Document::new(text.to_string(), BM25_MODEL)))
			.using(BM25_VECTOR_NAME)
			.filter(filter)
			.limit(limit)
			.with_payload(true);
		let response = self.client.query(search).await?;

		Ok(collect_hits(response.result))
	}

	/// Scores a fixed set of scenes against `vector` with a single query.
	///
	/// Scenes outside the owner (and source, when given) or without the named vector are absent
	/// from the result.
	pub async fn score_scenes(
		&self,
		vector_name: &str,
		vector: Vec<f32>,
		owner_id: &str,
		source_id: Option<&str>,
		scene_ids: &[String],
	) -> Result<Vec<SceneHit>> {
		if scene_ids.is_empty() {
			return Ok(Vec::new());
		}

		let filter = scene_filter(owner_id, source_id, Some(scene_ids));
		let search = QueryPointsBuilder::new(self.scenes_collection.clone())
			.query(Query::new_nearest(vector))
			.using(vector_name)
			.filter(filter)
			.limit(scene_ids.len() as u64)
			.with_payload(true);
		let response = self.client.query(search).await?;

		Ok(collect_hits(response.result))
	}
}

fn ensure_limit(limit: u64) -> Result<()> {
	if limit == 0 {
		return Err(Error::InvalidArgument("Search limit must be greater than zero.".to_string()));
	}

	Ok(())
}

fn collect_hits(points: Vec<ScoredPoint>) -> Vec<SceneHit> {
	points
		.into_iter()
		.filter_map(|point| {
			let scene_id = payload::scene_id(&point.payload, point.id.as_ref())?;

			Some(SceneHit { scene_id, score: point.score })
		})
		.collect()
}
