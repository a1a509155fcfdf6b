mod keywords;

use std::ops::RangeInclusive;

use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;
use whatlang::Lang;

use crate::{VisualMode, cjk};
use keywords::KeywordTable;

const RECALL_MIN_VISUAL: u32 = 3;
const SKIP_MIN_SPEECH: u32 = 2;
const QUOTED_SPAN_POINTS: u32 = 2;
const STRONG_CONFIDENCE: f32 = 0.9;
const MIXED_CONFIDENCE: f32 = 0.6;
const NO_SIGNAL_CONFIDENCE: f32 = 0.5;
const LOOKUP_MAX_TOKENS: usize = 2;
const SHORT_NAME_CHARS: RangeInclusive<usize> = 2..=4;
const SHORT_ALNUM_MAX_CHARS: usize = 6;
const SHORT_ALNUM_MIN_RATIO: f32 = 0.8;
const LID_MIN_LETTERS: usize = 24;
const LID_MIN_CONFIDENCE: f64 = 0.85;
const QUOTED_SPAN_PATTERN: &str = r#""[^"]+"|“[^”]+”|「[^」]+」|『[^』]+』"#;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
	En,
	Zh,
	Ko,
	/// Confidently detected as a language without keyword tables.
	Other,
}
impl QueryLanguage {
	pub fn from_code(code: &str) -> Option<Self> {
		let code = code.trim().to_ascii_lowercase();
		let primary = code.split(['-', '_']).next().unwrap_or_default();

		match primary {
			"en" => Some(QueryLanguage::En),
			"zh" => Some(QueryLanguage::Zh),
			"ko" => Some(QueryLanguage::Ko),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupRule {
	/// One or two tokens with at least one uppercase letter.
	CapitalizedShort,
	/// Two to four contiguous ideographic or syllabic characters.
	ShortName,
	/// Six characters or fewer, mostly alphanumeric.
	ShortAlphanumeric,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntentDecision {
	pub visual_mode: VisualMode,
	pub lookup: bool,
	pub lookup_rule: Option<LookupRule>,
	pub language: QueryLanguage,
	pub visual_score: u32,
	pub speech_score: u32,
	pub confidence: f32,
	pub explanation: String,
}

/// Classifies a query into a visual mode and a lookup flag.
///
/// Pure and deterministic. `language` is a hint such as `en` or `zh-CN`; unknown hints fall
/// back to detection.
pub fn classify(query: &str, language: Option<&str>) -> IntentDecision {
	let normalized: String = query.nfkc().collect();
	let trimmed = normalized.trim();
	let language = resolve_language(trimmed, language);
	let lowered = trimmed.to_lowercase();
	let words: Vec<&str> = lowered.unicode_words().collect();
	let (visual_score, keyword_speech) = score_keywords(language, &lowered, &words);
	let speech_score = keyword_speech + QUOTED_SPAN_POINTS * count_quoted_spans(trimmed);
	let (visual_mode, confidence, explanation) = decide_visual_mode(visual_score, speech_score);
	let lookup_rule = detect_lookup(trimmed);

	IntentDecision {
		visual_mode,
		lookup: lookup_rule.is_some(),
		lookup_rule,
		language,
		visual_score,
		speech_score,
		confidence,
		explanation,
	}
}

fn resolve_language(text: &str, hint: Option<&str>) -> QueryLanguage {
	if let Some(language) = hint.and_then(QueryLanguage::from_code) {
		return language;
	}
	if cjk::contains_han(text) {
		return QueryLanguage::Zh;
	}
	if cjk::contains_hangul(text) {
		return QueryLanguage::Ko;
	}

	// Short queries are too noisy for language identification.
	if text.chars().filter(|ch| ch.is_alphabetic()).count() < LID_MIN_LETTERS {
		return QueryLanguage::En;
	}

	let Some(info) = whatlang::detect(text) else {
		return QueryLanguage::En;
	};

	if !info.is_reliable() || info.confidence() < LID_MIN_CONFIDENCE {
		return QueryLanguage::En;
	}

	match info.lang() {
		Lang::Eng => QueryLanguage::En,
		Lang::Cmn => QueryLanguage::Zh,
		Lang::Kor => QueryLanguage::Ko,
		_ => QueryLanguage::Other,
	}
}

fn score_keywords(language: QueryLanguage, lowered: &str, words: &[&str]) -> (u32, u32) {
	match language {
		QueryLanguage::En => score_words(&keywords::EN, words),
		QueryLanguage::Zh | QueryLanguage::Ko => {
			let table = if language == QueryLanguage::Zh { &keywords::ZH } else { &keywords::KO };
			// These queries often carry English nouns, so the English table applies too.
			let (visual, speech) = score_substrings(table, lowered);
			let (en_visual, en_speech) = score_words(&keywords::EN, words);

			(visual + en_visual, speech + en_speech)
		},
		QueryLanguage::Other => (0, 0),
	}
}

fn score_words(table: &KeywordTable, words: &[&str]) -> (u32, u32) {
	let mut visual = 0;
	let mut speech = 0;

	for word in words {
		if table.visual.contains(word) {
			visual += 1;
		}
		if table.speech.contains(word) {
			speech += 1;
		}
	}

	(visual, speech)
}

// Leftmost-longest scan: the longest entry starting at a position wins and its span is consumed.
fn score_substrings(table: &KeywordTable, text: &str) -> (u32, u32) {
	let mut visual = 0;
	let mut speech = 0;
	let mut rest = text;

	while let Some(ch) = rest.chars().next() {
		let visual_len = longest_prefix(table.visual, rest);
		let speech_len = longest_prefix(table.speech, rest);
		let neutral_len = longest_prefix(table.neutral, rest);
		let len = visual_len.max(speech_len).max(neutral_len);

		if len == 0 {
			rest = &rest[ch.len_utf8()..];

			continue;
		}

		if neutral_len < len {
			if visual_len == len {
				visual += 1;
			} else {
				speech += 1;
			}
		}

		rest = &rest[len..];
	}

	(visual, speech)
}

fn longest_prefix(keywords: &[&str], text: &str) -> usize {
	keywords
		.iter()
		.filter(|keyword| text.starts_with(**keyword))
		.map(|keyword| keyword.len())
		.max()
		.unwrap_or(0)
}

fn count_quoted_spans(text: &str) -> u32 {
	Regex::new(QUOTED_SPAN_PATTERN).map(|re| re.find_iter(text).count() as u32).unwrap_or(0)
}

fn decide_visual_mode(visual: u32, speech: u32) -> (VisualMode, f32, String) {
	if visual >= RECALL_MIN_VISUAL && speech == 0 {
		return (
			VisualMode::Recall,
			STRONG_CONFIDENCE,
			format!("{visual} visual cues and no speech cues."),
		);
	}
	if speech >= SKIP_MIN_SPEECH {
		return (VisualMode::Skip, STRONG_CONFIDENCE, format!("{speech} speech points."));
	}

	if visual == 0 && speech == 0 {
		return (VisualMode::Rerank, NO_SIGNAL_CONFIDENCE, "No visual or speech cues.".to_string());
	}

	(
		VisualMode::Rerank,
		MIXED_CONFIDENCE,
		format!("Mixed or weak cues: {visual} visual, {speech} speech."),
	)
}

fn detect_lookup(text: &str) -> Option<LookupRule> {
	if text.is_empty() {
		return None;
	}

	let token_count = text.split_whitespace().count();

	if token_count <= LOOKUP_MAX_TOKENS && text.chars().any(char::is_uppercase) {
		return Some(LookupRule::CapitalizedShort);
	}

	let char_count = text.chars().count();

	if SHORT_NAME_CHARS.contains(&char_count) && text.chars().all(cjk::is_cjk_char) {
		return Some(LookupRule::ShortName);
	}
	if char_count <= SHORT_ALNUM_MAX_CHARS {
		let alnum = text.chars().filter(|ch| ch.is_alphanumeric()).count();

		if alnum as f32 / char_count as f32 >= SHORT_ALNUM_MIN_RATIO {
			return Some(LookupRule::ShortAlphanumeric);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::{
		LookupRule, QueryLanguage, count_quoted_spans, decide_visual_mode, detect_lookup,
		keywords, score_substrings,
	};
	use crate::VisualMode;

	#[test]
	fn keyword_tables_are_lowercase_and_unique() {
		for table in [&keywords::EN, &keywords::ZH, &keywords::KO] {
			for list in [table.visual, table.speech, table.neutral] {
				let mut seen = std::collections::HashSet::new();

				for keyword in list {
					assert_eq!(*keyword, keyword.to_lowercase());
					assert!(seen.insert(*keyword), "Duplicate keyword {keyword}.");
				}
			}
		}
	}

	#[test]
	fn visual_and_speech_tables_do_not_overlap() {
		for table in [&keywords::EN, &keywords::ZH, &keywords::KO] {
			for keyword in table.visual {
				assert!(!table.speech.contains(keyword), "{keyword} is in both tables.");
				assert!(!table.neutral.contains(keyword), "{keyword} is also neutral.");
			}
			for keyword in table.speech {
				assert!(!table.neutral.contains(keyword), "{keyword} is also neutral.");
			}
		}
	}

	#[test]
	fn substring_scan_consumes_the_longest_entry() {
		assert_eq!(score_substrings(&keywords::ZH, "跳舞的狗"), (2, 0));
		assert_eq!(score_substrings(&keywords::ZH, "骑马的人"), (1, 0));
		assert_eq!(score_substrings(&keywords::ZH, "看小说的人"), (0, 0));
		assert_eq!(score_substrings(&keywords::ZH, "他说了什么，她回答了什么"), (0, 2));
		assert_eq!(score_substrings(&keywords::KO, "춤추는 고양이"), (2, 0));
	}

	#[test]
	fn decision_thresholds() {
		assert_eq!(decide_visual_mode(3, 0).0, VisualMode::Recall);
		assert_eq!(decide_visual_mode(3, 1).0, VisualMode::Rerank);
		assert_eq!(decide_visual_mode(5, 2).0, VisualMode::Skip);
		assert_eq!(decide_visual_mode(0, 2).0, VisualMode::Skip);
		assert_eq!(decide_visual_mode(2, 0).0, VisualMode::Rerank);
		assert_eq!(decide_visual_mode(0, 0).1, 0.5);
		assert_eq!(decide_visual_mode(1, 1).1, 0.6);
	}

	#[test]
	fn counts_quoted_spans_in_several_styles() {
		assert_eq!(count_quoted_spans(r#"he said "hello there""#), 1);
		assert_eq!(count_quoted_spans("“one” and “two”"), 2);
		assert_eq!(count_quoted_spans("「你好」"), 1);
		assert_eq!(count_quoted_spans(r#"empty "" quotes"#), 0);
	}

	#[test]
	fn lookup_rules() {
		assert_eq!(detect_lookup("Nike"), Some(LookupRule::CapitalizedShort));
		assert_eq!(detect_lookup("Taylor Swift"), Some(LookupRule::CapitalizedShort));
		assert_eq!(detect_lookup("张三"), Some(LookupRule::ShortName));
		assert_eq!(detect_lookup("abc12"), Some(LookupRule::ShortAlphanumeric));
		assert_eq!(detect_lookup("Taylor Swift singing"), None);
		assert_eq!(detect_lookup("张三在说什么呢"), None);
		assert_eq!(detect_lookup("a dog on the beach"), None);
		assert_eq!(detect_lookup(""), None);
	}

	#[test]
	fn language_codes() {
		assert_eq!(QueryLanguage::from_code("EN"), Some(QueryLanguage::En));
		assert_eq!(QueryLanguage::from_code("zh-Hans"), Some(QueryLanguage::Zh));
		assert_eq!(QueryLanguage::from_code("zh_TW"), Some(QueryLanguage::Zh));
		assert_eq!(QueryLanguage::from_code("ko-KR"), Some(QueryLanguage::Ko));
		assert_eq!(QueryLanguage::from_code("fr"), None);
	}
}
