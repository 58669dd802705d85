//! Label matching: locate a vision-model label among OCR text spans.
//!
//! Rules, tried in order after normalization (trailing colon/׃/whitespace
//! stripped, internal whitespace collapsed):
//! - exact match → 1.0
//! - containment either way → 0.9
//! - exact match once nikud is stripped → 0.95
//! - containment once nikud is stripped → 0.85
//! - otherwise → 0.0
//!
//! Words are searched first so that single lines holding several fields
//! ("עיר: ____ מיקוד: ____") resolve to the right label; lines are the fallback.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{MatchResult, TextSpan};

pub const SCORE_EXACT: f32 = 1.0;
pub const SCORE_NIKUD_EXACT: f32 = 0.95;
pub const SCORE_CONTAINS: f32 = 0.9;
pub const SCORE_NIKUD_CONTAINS: f32 = 0.85;

/// Default minimum score for a match to count.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.85;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Finds the OCR span that best matches a label.
#[derive(Debug, Clone, Copy)]
pub struct LabelMatcher {
    threshold: f32,
}

impl Default for LabelMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl LabelMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Two-pass search: words first, lines only if no word reaches the threshold.
    ///
    /// `None` means "field not detected" and is not an error.
    pub fn find(&self, label: &str, lines: &[TextSpan], words: &[TextSpan]) -> Option<MatchResult> {
        if let Some(found) = self.best_in(label, words) {
            tracing::debug!(label, matched = %found.text, score = found.score, "Label matched at word level");
            return Some(found);
        }
        let found = self.best_in(label, lines);
        match &found {
            Some(m) => {
                tracing::debug!(label, matched = %m.text, score = m.score, "Label matched at line level")
            }
            None => tracing::debug!(label, "Label not found in OCR spans"),
        }
        found
    }

    /// Highest-scoring span at or above the threshold.
    /// Ties keep the first span in caller order.
    pub fn best_in(&self, label: &str, spans: &[TextSpan]) -> Option<MatchResult> {
        let mut best: Option<MatchResult> = None;
        for span in spans {
            let score = match_score(label, &span.content);
            if score < self.threshold {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(MatchResult {
                    text: span.content.clone(),
                    bbox: span.bbox,
                    score,
                });
            }
        }
        best
    }
}

/// Similarity of a label to OCR text, in [0, 1].
pub fn match_score(label: &str, candidate: &str) -> f32 {
    let a = normalize_label(label);
    let b = normalize_label(candidate);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return SCORE_EXACT;
    }

    if a.contains(&b) || b.contains(&a) {
        return SCORE_CONTAINS;
    }

    let a_bare = strip_nikud(&a);
    let b_bare = strip_nikud(&b);
    let bare_usable = !a_bare.is_empty() && !b_bare.is_empty();

    if bare_usable && a_bare == b_bare {
        return SCORE_NIKUD_EXACT;
    }
    if bare_usable && (a_bare.contains(&b_bare) || b_bare.contains(&a_bare)) {
        return SCORE_NIKUD_CONTAINS;
    }
    0.0
}

/// Trim, drop trailing separators (`:`, `׃`, full-width colon), collapse whitespace.
pub fn normalize_label(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text.trim(), " ");
    collapsed
        .trim_end_matches(|c: char| is_label_terminator(c) || c.is_whitespace())
        .to_string()
}

pub(crate) fn is_label_terminator(c: char) -> bool {
    matches!(c, ':' | '\u{05C3}' | '\u{FF1A}')
}

/// Remove Hebrew points (nikud): U+05B0–U+05BD and U+05BF–U+05C7.
/// Maqaf (U+05BE) is punctuation and stays.
pub fn strip_nikud(text: &str) -> String {
    text.chars().filter(|c| !is_nikud(*c)).collect()
}

fn is_nikud(c: char) -> bool {
    matches!(c, '\u{05B0}'..='\u{05BD}' | '\u{05BF}'..='\u{05C7}')
}
