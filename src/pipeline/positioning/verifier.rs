//! Position Verifier: re-check field positions against the PDF's own text layer.
//!
//! OCR coordinates come from a rendered image and can drift from where the
//! PDF actually draws its text. For each field the verifier looks its label
//! up among the page's native text words:
//!
//! - label within tolerance of where OCR placed it → `Confirmed`, confidence boosted
//! - label found elsewhere → `Corrected`, field box moved by the same offset and
//!   re-validated against the page
//! - label absent → `NotFound`, confidence penalised
//!
//! Pages are independent, so `verify_document` runs one blocking task per page.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::boundary::BoundaryValidator;
use super::geometry::BoundingBox;
use super::matcher::match_score;
use super::types::{PageInfo, PositionedField, TextSpan};
use super::VerifierError;
use crate::config::EngineConfig;

/// Word-level text of a PDF, in points, top-left origin.
pub trait PdfTextSource: Send + Sync {
    fn page_count(&self) -> u32;

    /// Words on a 1-based page.
    fn page_words(&self, page: u32) -> Result<Vec<TextSpan>, VerifierError>;
}

/// Text layer held in memory (pre-extracted, or for tests).
#[derive(Debug, Clone, Default)]
pub struct MemoryTextSource {
    pages: Vec<Vec<TextSpan>>,
}

impl MemoryTextSource {
    pub fn new(pages: Vec<Vec<TextSpan>>) -> Self {
        Self { pages }
    }
}

impl PdfTextSource for MemoryTextSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_words(&self, page: u32) -> Result<Vec<TextSpan>, VerifierError> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .cloned()
            .ok_or(VerifierError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Confirmed,
    Corrected { dx: f32, dy: f32 },
    NotFound,
    /// Invalid fields are not checked.
    Skipped,
}

#[derive(Debug, Clone, Copy)]
pub struct PositionVerifier {
    threshold: f32,
    tolerance: f32,
    confirm_boost: f32,
    miss_penalty: f32,
    validator: BoundaryValidator,
}

impl Default for PositionVerifier {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl PositionVerifier {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            threshold: config.match_threshold,
            tolerance: config.verifier.position_tolerance,
            confirm_boost: config.verifier.confirm_boost,
            miss_penalty: config.verifier.miss_penalty,
            validator: BoundaryValidator::from_config(config),
        }
    }

    /// Verify one page's fields against that page's text-layer words.
    pub fn verify_page(
        &self,
        fields: Vec<PositionedField>,
        words: &[TextSpan],
        page: &PageInfo,
    ) -> Vec<(PositionedField, VerificationOutcome)> {
        fields
            .into_iter()
            .map(|field| self.verify_field(field, words, page))
            .collect()
    }

    fn verify_field(
        &self,
        mut field: PositionedField,
        words: &[TextSpan],
        page: &PageInfo,
    ) -> (PositionedField, VerificationOutcome) {
        if field.is_invalid() {
            return (field, VerificationOutcome::Skipped);
        }

        let expected = field.provenance.label_box;
        let Some(found) = self.locate(&field.label, &expected, words) else {
            field.confidence *= self.miss_penalty;
            tracing::debug!(field = %field.name, "Label absent from PDF text layer");
            return (field, VerificationOutcome::NotFound);
        };

        let dx = found.bbox.x - expected.x;
        let dy = found.bbox.y - expected.y;
        if dx.abs() <= self.tolerance && dy.abs() <= self.tolerance {
            field.confidence = (field.confidence + self.confirm_boost).min(1.0);
            return (field, VerificationOutcome::Confirmed);
        }

        tracing::info!(
            field = %field.name,
            dx,
            dy,
            "Field moved to match PDF text layer"
        );
        field.bbox = field.bbox.translate(dx, dy).rounded();
        field.provenance.label_box = found.bbox;
        field.validation_status = None;
        field.original_box = None;
        let field = self.validator.validate(field, page);
        (field, VerificationOutcome::Corrected { dx, dy })
    }

    /// Best-scoring word; among equal scores the one nearest the OCR position.
    fn locate<'a>(
        &self,
        label: &str,
        expected: &BoundingBox,
        words: &'a [TextSpan],
    ) -> Option<&'a TextSpan> {
        let distance = |s: &TextSpan| {
            let (dx, dy) = (s.bbox.x - expected.x, s.bbox.y - expected.y);
            dx * dx + dy * dy
        };
        let mut best: Option<(&TextSpan, f32, f32)> = None;
        for span in words {
            let score = match_score(label, &span.content);
            if score < self.threshold {
                continue;
            }
            let d = distance(span);
            let better = match best {
                None => true,
                Some((_, s, bd)) => score > s || (score == s && d < bd),
            };
            if better {
                best = Some((span, score, d));
            }
        }
        best.map(|(span, _, _)| span)
    }

    /// Verify every field, one blocking task per page.
    ///
    /// Output order matches input order.
    pub async fn verify_document(
        &self,
        source: Arc<dyn PdfTextSource>,
        fields: Vec<PositionedField>,
        pages: &[PageInfo],
    ) -> Result<Vec<(PositionedField, VerificationOutcome)>, VerifierError> {
        let mut by_page: BTreeMap<u32, Vec<(usize, PositionedField)>> = BTreeMap::new();
        for (i, field) in fields.into_iter().enumerate() {
            by_page.entry(field.page_number).or_default().push((i, field));
        }

        let mut handles = Vec::with_capacity(by_page.len());
        for (page_number, batch) in by_page {
            let page = *pages
                .iter()
                .find(|p| p.page_number == page_number)
                .ok_or(VerifierError::PageOutOfRange {
                    page: page_number,
                    page_count: pages.len() as u32,
                })?;
            let source = Arc::clone(&source);
            let verifier = *self;

            handles.push(tokio::task::spawn_blocking(move || {
                let _span = tracing::info_span!("verify_page", page = page_number).entered();
                let words = source.page_words(page_number)?;
                let (indices, fields): (Vec<usize>, Vec<PositionedField>) =
                    batch.into_iter().unzip();
                let verified = verifier.verify_page(fields, &words, &page);
                Ok::<_, VerifierError>(indices.into_iter().zip(verified).collect::<Vec<_>>())
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            let page_results = handle
                .await
                .map_err(|e| VerifierError::TaskJoin(e.to_string()))??;
            results.extend(page_results);
        }
        results.sort_by_key(|(i, _)| *i);

        let corrected = results
            .iter()
            .filter(|(_, (_, o))| matches!(o, VerificationOutcome::Corrected { .. }))
            .count();
        tracing::info!(fields = results.len(), corrected, "Position verification complete");

        Ok(results.into_iter().map(|(_, r)| r).collect())
    }
}
