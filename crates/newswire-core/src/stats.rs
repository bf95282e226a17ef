use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::Result;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("hard-coded pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LetterCount {
    pub count_all: u64,
    pub count_upper: u64,
    /// Share of all letters in the feed, rounded to two decimals.
    pub percentage: f64,
}

/// Word and letter frequency tables over the full feed content. Fully
/// derived and disposable: both tables are rebuilt wholesale from the feed
/// on every successful batch, never updated incrementally.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeedStats {
    /// Maximal ASCII-letter runs, case-folded, ordered by word.
    pub words: BTreeMap<String, u64>,
    /// Per-letter totals, case-folded, ordered by letter.
    pub letters: BTreeMap<char, LetterCount>,
}

impl FeedStats {
    #[must_use]
    pub fn recompute(feed_text: &str) -> Self {
        let mut words: BTreeMap<String, u64> = BTreeMap::new();
        for token in WORD.find_iter(feed_text) {
            *words.entry(token.as_str().to_lowercase()).or_insert(0) += 1;
        }

        let mut letters: BTreeMap<char, LetterCount> = BTreeMap::new();
        let mut total = 0u64;
        for ch in feed_text.chars().filter(char::is_ascii_alphabetic) {
            total += 1;
            let entry = letters.entry(ch.to_ascii_lowercase()).or_insert(LetterCount {
                count_all: 0,
                count_upper: 0,
                percentage: 0.0,
            });
            entry.count_all += 1;
            if ch.is_ascii_uppercase() {
                entry.count_upper += 1;
            }
        }
        for entry in letters.values_mut() {
            entry.percentage = round2(entry.count_all as f64 / total as f64 * 100.0);
        }

        Self { words, letters }
    }

    #[must_use]
    pub fn word_count_csv(&self) -> String {
        let mut out = String::from("word,count\n");
        for (word, count) in &self.words {
            out.push_str(&format!("{word},{count}\n"));
        }
        out
    }

    #[must_use]
    pub fn letter_stat_csv(&self) -> String {
        let mut out = String::from("letter,count_all,count_uppercase,percentage\n");
        for (letter, stat) in &self.letters {
            out.push_str(&format!(
                "{letter},{},{},{:.2}\n",
                stat.count_all, stat.count_upper, stat.percentage
            ));
        }
        out
    }

    /// Overwrite both report files in `dir`.
    pub async fn write_reports(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join("word_count.csv"), self.word_count_csv()).await?;
        tokio::fs::write(dir.join("letter_stat.csv"), self.letter_stat_csv()).await?;
        Ok(())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_case_folded_and_ordered() {
        let stats = FeedStats::recompute("News Hello hello, world! 42 news");

        let words: Vec<(&str, u64)> = stats
            .words
            .iter()
            .map(|(w, c)| (w.as_str(), *c))
            .collect();
        assert_eq!(
            words,
            vec![("hello", 2), ("news", 2), ("world", 1)]
        );
    }

    #[test]
    fn letter_stats_track_uppercase_separately() {
        let stats = FeedStats::recompute("AaBb");

        let a = stats.letters[&'a'];
        assert_eq!(a.count_all, 2);
        assert_eq!(a.count_upper, 1);
        assert!((a.percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percentages_sum_to_at_most_one_hundred() {
        let stats = FeedStats::recompute("The quick brown fox; 12345 jumps!");

        let sum: f64 = stats.letters.values().map(|s| s.percentage).sum();
        assert!(sum <= 100.001, "sum was {sum}");
    }

    #[test]
    fn recompute_is_idempotent() {
        let feed = "News -------------------------\nHello.\nLviv, 2024-03-01 09:30\n\n";
        assert_eq!(FeedStats::recompute(feed), FeedStats::recompute(feed));
    }

    #[test]
    fn empty_feed_yields_empty_tables() {
        let stats = FeedStats::recompute("");
        assert!(stats.words.is_empty());
        assert!(stats.letters.is_empty());
    }

    #[test]
    fn csv_rendering_layout() {
        let stats = FeedStats::recompute("ab A");

        assert_eq!(stats.word_count_csv(), "word,count\na,1\nab,1\n");
        assert_eq!(
            stats.letter_stat_csv(),
            "letter,count_all,count_uppercase,percentage\na,2,1,66.67\nb,1,0,33.33\n"
        );
    }
}
