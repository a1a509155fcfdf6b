use std::collections::HashMap;

use sift_domain::{Channel, KnownPerson};
use sift_storage::qdrant::{
	FACE_VECTOR_NAME, QdrantStore, SUMMARY_VECTOR_NAME, TRANSCRIPT_VECTOR_NAME, VISUAL_VECTOR_NAME,
	scene_filter,
};

use crate::{BoxFuture, Error, Result, SceneHit, SceneIndex, SearchScope};

impl SceneIndex for QdrantStore {
	fn dense_search<'a>(
		&'a self,
		channel: Channel,
		vector: &'a [f32],
		scope: &'a SearchScope,
		limit: u32,
		allowlist: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<Vec<SceneHit>>> {
		Box::pin(async move {
			let vector_name = vector_name(channel)?;
			let filter = scene_filter(&scope.owner_id, scope.source_id.as_deref(), allowlist);

			Ok(self.search_dense(vector_name, vector.to_vec(), filter, limit as u64).await?)
		})
	}

	fn lexical_search<'a>(
		&'a self,
		query: &'a str,
		scope: &'a SearchScope,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<SceneHit>>> {
		Box::pin(async move {
			let filter = scene_filter(&scope.owner_id, scope.source_id.as_deref(), None);

			Ok(self.search_bm25(query, filter, limit as u64).await?)
		})
	}

	fn batch_score<'a>(
		&'a self,
		channel: Channel,
		vector: &'a [f32],
		scope: &'a SearchScope,
		scene_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, f32>>> {
		Box::pin(async move {
			let vector_name = vector_name(channel)?;
			let hits = self
				.score_scenes(
					vector_name,
					vector.to_vec(),
					&scope.owner_id,
					scope.source_id.as_deref(),
					scene_ids,
				)
				.await?;

			Ok(hits.into_iter().map(|hit| (hit.scene_id, hit.score)).collect())
		})
	}

	fn known_people<'a>(
		&'a self,
		scope: &'a SearchScope,
		max_people: u32,
	) -> BoxFuture<'a, Result<Vec<KnownPerson>>> {
		Box::pin(async move {
			let records = self.list_people(&scope.owner_id, max_people).await?;

			Ok(records
				.into_iter()
				.map(|record| KnownPerson {
					person_id: record.person_id,
					name: record.name,
					aliases: record.aliases,
				})
				.collect())
		})
	}

	fn person_embedding<'a>(
		&'a self,
		person_id: &'a str,
		scope: &'a SearchScope,
	) -> BoxFuture<'a, Result<Option<Vec<f32>>>> {
		Box::pin(async move {
			Ok(QdrantStore::person_embedding(self, &scope.owner_id, person_id).await?)
		})
	}

	fn person_search<'a>(
		&'a self,
		vector: &'a [f32],
		scope: &'a SearchScope,
		limit: u32,
		allowlist: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<Vec<SceneHit>>> {
		Box::pin(async move {
			let filter = scene_filter(&scope.owner_id, scope.source_id.as_deref(), allowlist);

			Ok(self.search_dense(FACE_VECTOR_NAME, vector.to_vec(), filter, limit as u64).await?)
		})
	}
}

fn vector_name(channel: Channel) -> Result<&'static str> {
	match channel {
		Channel::Transcript => Ok(TRANSCRIPT_VECTOR_NAME),
		Channel::Summary => Ok(SUMMARY_VECTOR_NAME),
		Channel::Visual => Ok(VISUAL_VECTOR_NAME),
		Channel::Person => Ok(FACE_VECTOR_NAME),
		Channel::Lexical => Err(Error::InvalidRequest {
			message: "The lexical channel has no dense vector.".to_string(),
		}),
	}
}
