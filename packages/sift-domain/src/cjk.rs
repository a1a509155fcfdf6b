use unicode_script::{Script, UnicodeScript};

/// Ideographic and syllabic scripts that are written without spaces between words.
pub fn is_cjk_char(ch: char) -> bool {
	matches!(ch.script(), Script::Han | Script::Hiragana | Script::Katakana | Script::Hangul)
}

pub fn contains_cjk(input: &str) -> bool {
	input.chars().any(is_cjk_char)
}

pub fn contains_han(input: &str) -> bool {
	input.chars().any(|ch| ch.script() == Script::Han)
}

pub fn contains_hangul(input: &str) -> bool {
	input.chars().any(|ch| ch.script() == Script::Hangul)
}
