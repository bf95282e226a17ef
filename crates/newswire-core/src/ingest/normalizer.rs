use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("sentence has no last word to summarize")]
    EmptySentence,
}

pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Result of running a raw text field through the full normalization
/// pipeline. `whitespace_count` counts every Unicode whitespace character in
/// the original, pre-normalization input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedText {
    pub final_text: String,
    pub whitespace_count: usize,
}

static MISSPELLED_IZ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\biz\b").expect("hard-coded pattern"));

/// Split on boundaries after `.`, `!` or `?` followed by whitespace and
/// sentence-case each piece (first letter uppercased, the rest lowercased).
/// Blank pieces are dropped.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        sentences.push(sentence_case(trimmed));
    }
}

fn sentence_case(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect()
    })
}

/// Whole-word, case-insensitive replacement of the misspelled token "iz"
/// with "is". The substitution keeps the leading letter's case so a
/// sentence-initial "Iz" becomes "Is". Longer words containing "iz" are left
/// alone.
#[must_use]
pub fn fix_misspelling(sentences: &[String]) -> Vec<String> {
    sentences
        .iter()
        .map(|sentence| {
            MISSPELLED_IZ
                .replace_all(sentence, |caps: &regex::Captures<'_>| {
                    if caps[0].starts_with('I') {
                        "Is"
                    } else {
                        "is"
                    }
                })
                .into_owned()
        })
        .collect()
}

/// Build the synthesized trailing sentence from the last word of each
/// sentence. A sentence that is empty once trailing punctuation is stripped
/// has no last word and fails the whole operation.
pub fn summarize_last_words(sentences: &[String]) -> NormalizeResult<String> {
    let mut last_words = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        let stripped = sentence.trim_end_matches(['.', '!', '?']);
        let word = stripped
            .split_whitespace()
            .last()
            .ok_or(NormalizeError::EmptySentence)?;
        last_words.push(word);
    }
    Ok(sentence_case(&last_words.join(" ")) + ".")
}

/// Count of Unicode whitespace characters, not just spaces.
#[must_use]
pub fn count_whitespace(text: &str) -> usize {
    text.chars().filter(|c| c.is_whitespace()).count()
}

/// Full pipeline: sentence casing, misspelling fix and, when requested, the
/// synthesized last-words sentence appended at the end.
pub fn normalize(text: &str, with_summary: bool) -> NormalizeResult<NormalizedText> {
    let sentences = split_sentences(text);
    let fixed = fix_misspelling(&sentences);

    let mut final_text = fixed.join(" ");
    if with_summary && !fixed.is_empty() {
        let summary = summarize_last_words(&fixed)?;
        final_text.push(' ');
        final_text.push_str(&summary);
    }

    Ok(NormalizedText {
        final_text,
        whitespace_count: count_whitespace(text),
    })
}
