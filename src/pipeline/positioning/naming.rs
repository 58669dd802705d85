//! Field names: identifier-safe, Hebrew-preserving, reproducible.
//!
//! A label that sanitizes to nothing gets a suffix from an injected
//! `IdGenerator` instead of a random one, so identical input always yields
//! identical names.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use super::matcher::is_label_terminator;
use super::types::FinalField;

/// Namespace for content-hashed field suffixes.
const FIELD_NAMESPACE: Uuid = Uuid::from_u128(0x6f1e_2b9a_47c3_4d58_9a0e_3c5b_7d21_f4a8);

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Everything outside the Hebrew script and ASCII identifier characters.
static NAME_UNSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{Hebrew}A-Za-z0-9_]").expect("valid name regex"));

/// Source of suffixes for labels that sanitize to an empty name.
pub trait IdGenerator: Send + Sync {
    fn next_suffix(&self, label: &str) -> String;
}

/// Sequential suffixes: `1`, `2`, `3`, …
#[derive(Debug, Default)]
pub struct CounterIdGenerator {
    next: AtomicUsize,
}

impl CounterIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for CounterIdGenerator {
    fn next_suffix(&self, _label: &str) -> String {
        (self.next.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

/// First 8 hex digits of a UUID v5 over the raw label text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHashIdGenerator;

impl IdGenerator for ContentHashIdGenerator {
    fn next_suffix(&self, label: &str) -> String {
        let id = Uuid::new_v5(&FIELD_NAMESPACE, label.as_bytes());
        id.simple().to_string()[..8].to_string()
    }
}

/// Derive a form-field identifier from its label.
///
/// Trailing separators are dropped, whitespace runs become `_`, and any
/// character outside the Hebrew script or `[A-Za-z0-9_]` is removed.
pub fn derive_field_name(label: &str, ids: &dyn IdGenerator) -> String {
    let trimmed = label
        .trim()
        .trim_end_matches(|c: char| is_label_terminator(c) || c.is_whitespace());
    let underscored = WHITESPACE_RUN.replace_all(trimmed, "_");
    let cleaned = NAME_UNSAFE.replace_all(&underscored, "");
    let name = cleaned.trim_matches('_');

    if name.is_empty() {
        format!("field_{}", ids.next_suffix(label))
    } else {
        name.to_string()
    }
}

/// Make names unique across a document: repeats get `_2`, `_3`, … in order.
pub fn dedupe_names<'a>(fields: impl IntoIterator<Item = &'a mut FinalField>) {
    let mut taken: HashSet<String> = HashSet::new();
    for field in fields {
        let base = field.name().to_string();
        if taken.insert(base.clone()) {
            continue;
        }
        let mut n = 2;
        let unique = loop {
            let candidate = format!("{base}_{n}");
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        tracing::debug!(original = %base, renamed = %unique, "Duplicate field name");
        taken.insert(unique.clone());
        field.set_name(unique);
    }
}

/// Same as [`dedupe_names`] for plain name lists (radio options).
pub fn dedupe_strings(names: &mut [String]) {
    let mut taken: HashSet<String> = HashSet::new();
    for name in names.iter_mut() {
        if taken.insert(name.clone()) {
            continue;
        }
        let mut n = 2;
        while taken.contains(&format!("{name}_{n}")) {
            n += 1;
        }
        *name = format!("{name}_{n}");
        taken.insert(name.clone());
    }
}
