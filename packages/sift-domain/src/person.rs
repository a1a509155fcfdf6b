use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::cjk;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct KnownPerson {
	pub person_id: String,
	pub name: String,
	#[serde(default)]
	pub aliases: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PersonMatch {
	pub person_id: String,
	/// The name or alias that matched, as written in the people index.
	pub matched: String,
}

/// Finds the known person referenced by a query.
///
/// Latin names must match whole words; names containing CJK characters match as substrings.
/// The longest matching name wins and ties resolve to the smallest `person_id`.
pub fn detect_person(query: &str, people: &[KnownPerson]) -> Option<PersonMatch> {
	let normalized: String = query.nfkc().collect::<String>().to_lowercase();
	let query_words: Vec<&str> = normalized.unicode_words().collect();
	let mut best: Option<(usize, &KnownPerson, &str)> = None;

	for person in people {
		for name in std::iter::once(&person.name).chain(person.aliases.iter()) {
			let trimmed = name.trim();

			if trimmed.is_empty() || !name_matches(trimmed, &normalized, &query_words) {
				continue;
			}

			let len = trimmed.chars().count();
			let better = match best {
				None => true,
				Some((best_len, best_person, _)) => match len.cmp(&best_len) {
					Ordering::Greater => true,
					Ordering::Less => false,
					Ordering::Equal => person.person_id < best_person.person_id,
				},
			};

			if better {
				best = Some((len, person, trimmed));
			}
		}
	}

	best.map(|(_, person, matched)| PersonMatch {
		person_id: person.person_id.clone(),
		matched: matched.to_string(),
	})
}

fn name_matches(name: &str, normalized_query: &str, query_words: &[&str]) -> bool {
	let name: String = name.nfkc().collect::<String>().to_lowercase();

	if cjk::contains_cjk(&name) {
		return normalized_query.contains(name.as_str());
	}

	let name_words: Vec<&str> = name.unicode_words().collect();

	if name_words.is_empty() || name_words.len() > query_words.len() {
		return false;
	}

	query_words.windows(name_words.len()).any(|window| window == name_words.as_slice())
}
