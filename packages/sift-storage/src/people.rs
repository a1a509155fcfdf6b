use qdrant_client::qdrant::{Condition, Filter, ScrollPointsBuilder};

use crate::{
	Result,
	models::PersonRecord,
	payload,
	qdrant::{ALIASES_KEY, EMBEDDING_KEY, NAME_KEY, OWNER_ID_KEY, PERSON_ID_KEY, QdrantStore},
};

const PEOPLE_PAGE_SIZE: u32 = 256;

impl QdrantStore {
	/// Lists up to `max_people` people registered for an owner.
	pub async fn list_people(&self, owner_id: &str, max_people: u32) -> Result<Vec<PersonRecord>> {
		let filter = Filter::must([Condition::matches(OWNER_ID_KEY, owner_id.to_string())]);
		let mut out = Vec::new();
		let mut offset = None;

		while let Some(page_size) = page_size(out.len(), max_people) {
			let mut scroll = ScrollPointsBuilder::new(self.people_collection.clone())
				.filter(filter.clone())
				.limit(page_size)
				.with_payload(true)
				.with_vectors(false);

			if let Some(offset) = offset.take() {
				scroll = scroll.offset(offset);
			}

			let response = self.client.scroll(scroll).await?;

			for point in response.result {
				let Some(person_id) = payload::payload_string(&point.payload, PERSON_ID_KEY) else {
					continue;
				};
				let name = payload::payload_string(&point.payload, NAME_KEY).unwrap_or_default();
				let aliases = payload::payload_string_list(&point.payload, ALIASES_KEY);

				out.push(PersonRecord { person_id, name, aliases });
			}

			match response.next_page_offset {
				Some(next) => offset = Some(next),
				None => break,
			}
		}

		out.sort_by(|a, b| a.person_id.cmp(&b.person_id));

		Ok(out)
	}

	/// Returns the aggregated identity embedding of a person owned by `owner_id`, if one has been
	/// computed.
	pub async fn person_embedding(
		&self,
		owner_id: &str,
		person_id: &str,
	) -> Result<Option<Vec<f32>>> {
		let filter = Filter::must([
			Condition::matches(OWNER_ID_KEY, owner_id.to_string()),
			Condition::matches(PERSON_ID_KEY, person_id.to_string()),
		]);
		let scroll = ScrollPointsBuilder::new(self.people_collection.clone())
			.filter(filter)
			.limit(1)
			.with_payload(true)
			.with_vectors(false);
		let response = self.client.scroll(scroll).await?;
		let Some(point) = response.result.into_iter().next() else { return Ok(None) };

		Ok(payload::payload_f32_list(&point.payload, EMBEDDING_KEY)
			.filter(|embedding| !embedding.is_empty()))
	}
}

/// Size of the next scroll page, or `None` once `max_people` records have been collected.
fn page_size(collected: usize, max_people: u32) -> Option<u32> {
	let remaining = (max_people as usize).saturating_sub(collected);

	if remaining == 0 {
		return None;
	}

	Some(remaining.min(PEOPLE_PAGE_SIZE as usize) as u32)
}
