use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub scenes_collection: String,
	pub people_collection: String,
	pub text_vector_dim: u32,
	pub visual_vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	/// Embeds queries into the transcript/summary space.
	pub text_embedding: EmbeddingProviderConfig,
	/// Embeds queries into the vision-grounded (CLIP) text space.
	pub visual_embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_pool_size")]
	pub pool_size: u32,
	#[serde(default = "default_limit")]
	pub default_limit: u32,
	#[serde(default = "default_max_limit")]
	pub max_limit: u32,
	#[serde(default)]
	pub min_score: f32,
	#[serde(default)]
	pub weights: SearchWeights,
	#[serde(default)]
	pub timeouts: SearchTimeouts,
	#[serde(default)]
	pub lexical_gate: SearchLexicalGate,
	#[serde(default)]
	pub rerank: SearchRerank,
	#[serde(default)]
	pub person: SearchPerson,
	#[serde(default)]
	pub calibration: SearchCalibration,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SearchWeights {
	pub transcript: f32,
	pub visual: f32,
	pub summary: f32,
	pub lexical: f32,
}
impl Default for SearchWeights {
	fn default() -> Self {
		Self { transcript: 0.35, visual: 0.25, summary: 0.2, lexical: 0.2 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchTimeouts {
	pub embedding_ms: u64,
	pub transcript_ms: u64,
	pub summary_ms: u64,
	/// The visual channel may call a remote inference service, so it gets the longest deadline.
	pub visual_ms: u64,
	pub lexical_ms: u64,
	pub person_ms: u64,
	pub rerank_ms: u64,
}
impl Default for SearchTimeouts {
	fn default() -> Self {
		Self {
			embedding_ms: 1_500,
			transcript_ms: 1_500,
			summary_ms: 1_500,
			visual_ms: 2_000,
			lexical_ms: 1_500,
			person_ms: 1_500,
			rerank_ms: 2_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchLexicalGate {
	pub enabled: bool,
	pub min_hits: u32,
	pub pool_size: u32,
}
impl Default for SearchLexicalGate {
	fn default() -> Self {
		Self { enabled: true, min_hits: 1, pool_size: 200 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchRerank {
	pub enabled: bool,
	pub pool_size: u32,
	pub blend_weight: f32,
	pub min_score_range: f32,
}
impl Default for SearchRerank {
	fn default() -> Self {
		Self { enabled: true, pool_size: 500, blend_weight: 0.3, min_score_range: 0.05 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchPerson {
	pub enabled: bool,
	pub content_weight: f32,
	pub person_weight: f32,
	pub pool_size: u32,
	/// Upper bound on the people listed per owner for name detection.
	pub max_known_people: u32,
}
impl Default for SearchPerson {
	fn default() -> Self {
		Self {
			enabled: true,
			content_weight: 0.35,
			person_weight: 0.65,
			pool_size: 300,
			max_known_people: 2_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchCalibration {
	pub enabled: bool,
	/// One of "exponential" or "linear".
	pub method: String,
	pub alpha: f32,
	pub max_cap: f32,
}
impl Default for SearchCalibration {
	fn default() -> Self {
		Self { enabled: true, method: "exponential".to_string(), alpha: 3.0, max_cap: 0.97 }
	}
}

fn default_pool_size() -> u32 {
	300
}

fn default_limit() -> u32 {
	20
}

fn default_max_limit() -> u32 {
	200
}
