#[derive(Clone, Debug, PartialEq)]
pub struct SceneHit {
	pub scene_id: String,
	pub score: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonRecord {
	pub person_id: String,
	pub name: String,
	pub aliases: Vec<String>,
}
