mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Providers, Qdrant, Search, SearchCalibration, SearchLexicalGate,
	SearchPerson, SearchRerank, SearchTimeouts, SearchWeights, Service, Storage,
};

use std::{fs, path::Path};

/// Tolerance applied whenever a set of weights must sum to 1.0.
pub const WEIGHT_SUM_EPSILON: f32 = 1e-6;

pub const CALIBRATION_METHODS: [&str; 2] = ["exponential", "linear"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.qdrant.scenes_collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.scenes_collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.people_collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.people_collection must be non-empty.".to_string(),
		});
	}

	for (label, provider, vector_dim) in [
		("text_embedding", &cfg.providers.text_embedding, cfg.storage.qdrant.text_vector_dim),
		("visual_embedding", &cfg.providers.visual_embedding, cfg.storage.qdrant.visual_vector_dim),
	] {
		if provider.dimensions == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.dimensions must be greater than zero."),
			});
		}
		if provider.dimensions != vector_dim {
			return Err(Error::Validation {
				message: format!(
					"providers.{label}.dimensions must match the storage.qdrant vector dimension."
				),
			});
		}
		if provider.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
		if provider.timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.timeout_ms must be greater than zero."),
			});
		}
	}

	let search = &cfg.search;

	if search.pool_size == 0 {
		return Err(Error::Validation {
			message: "search.pool_size must be greater than zero.".to_string(),
		});
	}
	if search.default_limit == 0 {
		return Err(Error::Validation {
			message: "search.default_limit must be greater than zero.".to_string(),
		});
	}
	if search.max_limit < search.default_limit {
		return Err(Error::Validation {
			message: "search.max_limit must be greater than or equal to search.default_limit."
				.to_string(),
		});
	}
	if !search.min_score.is_finite() || search.min_score < 0.0 {
		return Err(Error::Validation {
			message: "search.min_score must be a finite number, zero or greater.".to_string(),
		});
	}

	validate_weights(
		"search.weights",
		&[
			("transcript", search.weights.transcript),
			("visual", search.weights.visual),
			("summary", search.weights.summary),
			("lexical", search.weights.lexical),
		],
	)?;

	for (label, value) in [
		("embedding_ms", search.timeouts.embedding_ms),
		("transcript_ms", search.timeouts.transcript_ms),
		("summary_ms", search.timeouts.summary_ms),
		("visual_ms", search.timeouts.visual_ms),
		("lexical_ms", search.timeouts.lexical_ms),
		("person_ms", search.timeouts.person_ms),
		("rerank_ms", search.timeouts.rerank_ms),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("search.timeouts.{label} must be greater than zero."),
			});
		}
	}

	if search.lexical_gate.min_hits == 0 {
		return Err(Error::Validation {
			message: "search.lexical_gate.min_hits must be greater than zero.".to_string(),
		});
	}
	if search.lexical_gate.pool_size == 0 {
		return Err(Error::Validation {
			message: "search.lexical_gate.pool_size must be greater than zero.".to_string(),
		});
	}
	if search.rerank.pool_size == 0 {
		return Err(Error::Validation {
			message: "search.rerank.pool_size must be greater than zero.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&search.rerank.blend_weight) {
		return Err(Error::Validation {
			message: "search.rerank.blend_weight must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !search.rerank.min_score_range.is_finite() || search.rerank.min_score_range < 0.0 {
		return Err(Error::Validation {
			message: "search.rerank.min_score_range must be a finite number, zero or greater."
				.to_string(),
		});
	}
	if search.person.pool_size == 0 {
		return Err(Error::Validation {
			message: "search.person.pool_size must be greater than zero.".to_string(),
		});
	}
	if search.person.max_known_people == 0 {
		return Err(Error::Validation {
			message: "search.person.max_known_people must be greater than zero.".to_string(),
		});
	}

	validate_weights(
		"search.person",
		&[
			("content_weight", search.person.content_weight),
			("person_weight", search.person.person_weight),
		],
	)?;

	if !CALIBRATION_METHODS.contains(&search.calibration.method.as_str()) {
		return Err(Error::Validation {
			message: "search.calibration.method must be one of exponential or linear.".to_string(),
		});
	}
	if !search.calibration.alpha.is_finite() || search.calibration.alpha <= 0.0 {
		return Err(Error::Validation {
			message: "search.calibration.alpha must be a finite number greater than zero."
				.to_string(),
		});
	}
	if !(search.calibration.max_cap > 0.0 && search.calibration.max_cap <= 1.0) {
		return Err(Error::Validation {
			message: "search.calibration.max_cap must be in the range (0.0, 1.0].".to_string(),
		});
	}

	Ok(())
}

/// Checks that every weight is a finite value in `[0, 1]` and that the set sums to 1.0.
pub fn validate_weights(path: &str, weights: &[(&str, f32)]) -> Result<()> {
	let mut total = 0.0_f32;

	for (name, value) in weights {
		if !value.is_finite() {
			return Err(Error::Validation {
				message: format!("{path}.{name} must be a finite number."),
			});
		}
		if !(0.0..=1.0).contains(value) {
			return Err(Error::Validation {
				message: format!("{path}.{name} must be in the range 0.0-1.0."),
			});
		}

		total += value;
	}

	if (total - 1.0).abs() > WEIGHT_SUM_EPSILON {
		return Err(Error::Validation {
			message: format!("{path} must sum to 1.0. Got {total}."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
	cfg.search.calibration.method = cfg.search.calibration.method.trim().to_ascii_lowercase();
}
