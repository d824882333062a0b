use std::collections::HashSet;

use crate::extraction::base::{EntityExtractor, EntityLabel, ExtractionError};
use crate::types::EntityCounts;

/// Capitalized words that start a sentence without being part of a name.
const LEADING_FUNCTION_WORDS: &[&str] = &[
    "a", "after", "an", "and", "as", "at", "before", "but", "by", "for", "from", "he", "her",
    "here", "his", "how", "i", "if", "in", "it", "its", "my", "no", "of", "on", "or", "our",
    "she", "so", "that", "the", "their", "then", "there", "these", "they", "this", "those", "to",
    "we", "what", "when", "while", "who", "why", "with", "yes", "you", "your",
];

const DATE_WORDS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "today", "tomorrow", "yesterday",
];

const TIME_WORDS: &[&str] = &["am", "pm", "a.m", "p.m", "noon", "midnight"];

const ORDINAL_WORDS: &[&str] = &[
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

const ORDINAL_SUFFIXES: &[&str] = &["st", "nd", "rd", "th"];

const NUMBER_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "dozen",
    "hundred", "thousand", "million", "billion", "trillion",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Deterministic, dictionary-free entity extractor.
///
/// Named entities are runs of capitalized words inside a clause, with leading function words
/// removed. Numbers, amounts of money, ordinals, dates and times are recognized from their
/// shape and labelled accordingly so they can be skipped.
#[derive(Debug, Clone)]
pub struct RuleBasedExtractor {
    skip_labels: HashSet<EntityLabel>,
    max_text_len: usize,
}

#[derive(Debug)]
struct Token<'a> {
    text: &'a str,
    label: Option<EntityLabel>,
    ends_clause: bool,
}

impl RuleBasedExtractor {
    /// Default maximum length, in characters, of an extracted text.
    pub const DEFAULT_MAX_TEXT_LEN: usize = 1_000_000;

    /// Creates an extractor skipping [`EntityLabel::DEFAULT_SKIPPED`].
    pub fn new() -> Self {
        Self {
            skip_labels: EntityLabel::DEFAULT_SKIPPED.into_iter().collect(),
            max_text_len: Self::DEFAULT_MAX_TEXT_LEN,
        }
    }

    /// Creates an extractor skipping the labels named in `labels`.
    ///
    /// Fails if a label is unknown.
    pub fn with_skip_labels<I, S>(labels: I) -> Result<Self, ExtractionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let skip_labels = labels
            .into_iter()
            .map(|label| label.as_ref().parse())
            .collect::<Result<HashSet<EntityLabel>, _>>()?;

        Ok(Self {
            skip_labels,
            max_text_len: Self::DEFAULT_MAX_TEXT_LEN,
        })
    }

    /// Sets the maximum accepted text length, in characters.
    pub fn with_max_text_len(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    /// Returns every labelled span of `text` as `(label, lower-cased text)`.
    fn spans(&self, text: &str) -> Vec<(EntityLabel, String)> {
        let mut spans = Vec::new();
        let mut current: Option<(EntityLabel, Vec<&str>)> = None;

        for token in tokenize(text) {
            match (token.label, current.as_mut()) {
                (Some(label), Some((current_label, words))) if *current_label == label => {
                    words.push(token.text);
                }
                (Some(label), _) => {
                    push_span(&mut spans, current.take());
                    current = Some((label, vec![token.text]));
                }
                (None, _) => push_span(&mut spans, current.take()),
            }

            if token.ends_clause {
                push_span(&mut spans, current.take());
            }
        }
        push_span(&mut spans, current);

        spans
    }
}

impl Default for RuleBasedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor for RuleBasedExtractor {
    fn extract(&self, text: &str) -> Result<EntityCounts, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }

        let len = text.chars().count();
        if len > self.max_text_len {
            return Err(ExtractionError::TextTooLong {
                len,
                max: self.max_text_len,
            });
        }

        let mut counts = EntityCounts::new();
        for (label, entity) in self.spans(text) {
            if self.skip_labels.contains(&label) {
                continue;
            }
            *counts.entry(entity).or_default() += 1;
        }

        Ok(counts)
    }
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens: Vec<Token<'_>> = Vec::new();

    for raw in text.split_whitespace() {
        let mut ends_clause = raw.ends_with(['.', ',', ';', ':', '!', '?', ')', '"']);

        let word = raw.trim_matches(|c: char| {
            !(c.is_alphanumeric() || c == '%' || CURRENCY_SYMBOLS.contains(&c))
        });
        // A possessive closes the name it belongs to.
        let word = match word
            .strip_suffix("'s")
            .or_else(|| word.strip_suffix("’s"))
        {
            Some(stem) => {
                ends_clause = true;
                stem
            }
            None => word,
        };

        if word.is_empty() {
            if ends_clause && let Some(last) = tokens.last_mut() {
                last.ends_clause = true;
            }
            continue;
        }

        tokens.push(Token {
            text: word,
            label: classify(word),
            ends_clause,
        });
    }

    tokens
}

fn classify(word: &str) -> Option<EntityLabel> {
    let lower = word.to_lowercase();

    if is_money(word) {
        Some(EntityLabel::Money)
    } else if is_time(&lower) {
        Some(EntityLabel::Time)
    } else if is_ordinal(&lower) {
        Some(EntityLabel::Ordinal)
    } else if is_cardinal(&lower) {
        Some(EntityLabel::Cardinal)
    } else if DATE_WORDS.contains(&lower.as_str()) {
        Some(EntityLabel::Date)
    } else if word.chars().next().is_some_and(char::is_uppercase) {
        Some(EntityLabel::Named)
    } else {
        None
    }
}

fn is_money(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next().is_some_and(|c| CURRENCY_SYMBOLS.contains(&c))
        && chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn is_time(lower: &str) -> bool {
    if TIME_WORDS.contains(&lower) {
        return true;
    }

    let mut parts = lower.split(':');
    let has_separator = lower.contains(':');
    has_separator && parts.all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

fn is_ordinal(lower: &str) -> bool {
    if ORDINAL_WORDS.contains(&lower) {
        return true;
    }

    ORDINAL_SUFFIXES.iter().any(|suffix| {
        lower
            .strip_suffix(suffix)
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
    })
}

fn is_cardinal(lower: &str) -> bool {
    if NUMBER_WORDS.contains(&lower) {
        return true;
    }

    lower.chars().any(|c| c.is_ascii_digit())
        && lower
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '%'))
}

fn push_span(spans: &mut Vec<(EntityLabel, String)>, span: Option<(EntityLabel, Vec<&str>)>) {
    let Some((label, mut words)) = span else {
        return;
    };

    if label == EntityLabel::Named {
        let leading = words
            .iter()
            .take_while(|word| LEADING_FUNCTION_WORDS.contains(&word.to_lowercase().as_str()))
            .count();
        words.drain(..leading);
    }

    if words.is_empty() {
        return;
    }

    spans.push((label, words.join(" ").to_lowercase()));
}
