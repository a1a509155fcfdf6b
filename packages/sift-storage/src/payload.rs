use std::collections::HashMap;

use qdrant_client::qdrant::{PointId, Value, point_id::PointIdOptions, value::Kind};

pub fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}

pub fn payload_string_list(payload: &HashMap<String, Value>, key: &str) -> Vec<String> {
	let Some(value) = payload.get(key) else { return Vec::new() };

	match &value.kind {
		Some(Kind::ListValue(list)) => list
			.values
			.iter()
			.filter_map(|item| match &item.kind {
				Some(Kind::StringValue(text)) => Some(text.clone()),
				_ => None,
			})
			.collect(),
		Some(Kind::StringValue(text)) => vec![text.clone()],
		_ => Vec::new(),
	}
}

/// Reads a numeric list. Returns `None` when any element is not a number.
pub fn payload_f32_list(payload: &HashMap<String, Value>, key: &str) -> Option<Vec<f32>> {
	let value = payload.get(key)?;
	let Some(Kind::ListValue(list)) = &value.kind else { return None };
	let mut out = Vec::with_capacity(list.values.len());

	for item in &list.values {
		match &item.kind {
			Some(Kind::DoubleValue(number)) => out.push(*number as f32),
			Some(Kind::IntegerValue(number)) => out.push(*number as f32),
			_ => return None,
		}
	}

	Some(out)
}

pub fn point_id_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

/// Resolves the scene id of a point: the `scene_id` payload wins over the point id.
pub fn scene_id(payload: &HashMap<String, Value>, point_id: Option<&PointId>) -> Option<String> {
	payload_string(payload, crate::qdrant::SCENE_ID_KEY)
		.or_else(|| point_id.and_then(point_id_string))
}
