use std::sync::Arc;

use serde::Serialize;

use super::boundary::BoundaryValidator;
use super::ingest::ensure_finite;
use super::matcher::LabelMatcher;
use super::naming::{dedupe_names, ContentHashIdGenerator, IdGenerator};
use super::overlap::OverlapResolver;
use super::positioner::FieldPositioner;
use super::radio::RadioGroupDetector;
use super::tab_order::TabOrderCalculator;
use super::types::{
    FieldWithTabOrder, FinalField, LabelDescriptor, PageInfo, PositionedField, ResolutionAction,
    TextSpan, ValidationStatus,
};
use super::verifier::{PdfTextSource, PositionVerifier, VerificationOutcome};
use super::PositioningError;
use crate::config::EngineConfig;

/// Everything the collaborators supply for one page.
#[derive(Debug, Clone)]
pub struct PageInput {
    pub page: PageInfo,
    pub descriptors: Vec<LabelDescriptor>,
    /// Line-level OCR spans, in points.
    pub lines: Vec<TextSpan>,
    /// Word-level OCR spans, in points.
    pub words: Vec<TextSpan>,
}

/// Fields that did not make it into the output, and fields needing review.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDiagnostics {
    pub page_number: u32,
    /// Labels with no OCR match above threshold.
    pub unmatched: Vec<String>,
    /// Degenerate or off-page fields, with `original_box` when captured.
    pub invalid: Vec<PositionedField>,
    /// Fields dropped by overlap resolution.
    pub removed: Vec<PositionedField>,
    /// Labels of output fields awaiting manual review; the fields themselves
    /// carry a `flag` resolution.
    pub flagged: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub descriptors: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub invalid: usize,
    pub clamped: usize,
    pub adjusted: usize,
    pub removed: usize,
    pub flagged: usize,
    pub radio_groups: usize,
    pub final_fields: usize,
    pub verified_confirmed: usize,
    pub verified_corrected: usize,
    pub verified_missing: usize,
}

impl PipelineStats {
    fn merge(&mut self, other: &PipelineStats) {
        self.descriptors += other.descriptors;
        self.matched += other.matched;
        self.unmatched += other.unmatched;
        self.invalid += other.invalid;
        self.clamped += other.clamped;
        self.adjusted += other.adjusted;
        self.removed += other.removed;
        self.flagged += other.flagged;
        self.radio_groups += other.radio_groups;
        self.final_fields += other.final_fields;
        self.verified_confirmed += other.verified_confirmed;
        self.verified_corrected += other.verified_corrected;
        self.verified_missing += other.verified_missing;
    }
}

/// Result of processing a single page on its own.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOutcome {
    pub page: PageInfo,
    pub fields: Vec<FieldWithTabOrder>,
    pub diagnostics: PageDiagnostics,
    pub stats: PipelineStats,
}

/// Result of processing a whole document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutcome {
    /// Tab-ordered across the document; names unique across the document.
    pub fields: Vec<FieldWithTabOrder>,
    pub pages: Vec<PageDiagnostics>,
    pub stats: PipelineStats,
}

/// Fields located and boundary-checked, before conflict resolution.
struct LocatedPage {
    page: PageInfo,
    fields: Vec<PositionedField>,
    diagnostics: PageDiagnostics,
    stats: PipelineStats,
}

/// Runs the positioning stages in order for each page.
pub struct FormPositioningEngine {
    config: EngineConfig,
    ids: Box<dyn IdGenerator>,
    matcher: LabelMatcher,
    positioner: FieldPositioner,
    validator: BoundaryValidator,
    resolver: OverlapResolver,
    radio: RadioGroupDetector,
    tab_order: TabOrderCalculator,
    verifier: PositionVerifier,
}

impl Default for FormPositioningEngine {
    fn default() -> Self {
        Self::build(EngineConfig::default(), Box::new(ContentHashIdGenerator))
    }
}

impl FormPositioningEngine {
    /// Validate the configuration and assemble the stages.
    pub fn new(config: EngineConfig, ids: Box<dyn IdGenerator>) -> Result<Self, PositioningError> {
        config.validate()?;
        Ok(Self::build(config, ids))
    }

    fn build(config: EngineConfig, ids: Box<dyn IdGenerator>) -> Self {
        Self {
            matcher: LabelMatcher::new(config.match_threshold),
            positioner: FieldPositioner::from_config(&config),
            validator: BoundaryValidator::from_config(&config),
            resolver: OverlapResolver::from_config(&config),
            radio: RadioGroupDetector::from_config(&config),
            tab_order: TabOrderCalculator::from_config(&config),
            verifier: PositionVerifier::from_config(&config),
            config,
            ids,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process one page in isolation. Names are unique within the page;
    /// repeats are suffixed in tab order.
    pub fn process_page(&self, input: &PageInput) -> Result<PageOutcome, PositioningError> {
        let located = self.locate(input)?;
        let page = located.page;
        let (fields, diagnostics, mut stats) = self.finish(located);

        let mut fields = self.tab_order.order(fields);
        dedupe_names(fields.iter_mut().map(|f| &mut f.field));
        stats.final_fields = fields.len();
        log_stats(&stats);

        Ok(PageOutcome {
            page,
            fields,
            diagnostics,
            stats,
        })
    }

    /// Process every page, then name and tab-order across the document.
    ///
    /// Inputs must be pages `1..=N` in order.
    pub fn process_document(&self, inputs: &[PageInput]) -> Result<DocumentOutcome, PositioningError> {
        check_page_sequence(inputs)?;

        let mut finished = Vec::with_capacity(inputs.len());
        for input in inputs {
            finished.push(self.finish(self.locate(input)?));
        }
        Ok(self.assemble(finished))
    }

    /// Like [`process_document`](Self::process_document), with positions
    /// checked against the PDF text layer before conflict resolution.
    ///
    /// Verification is skipped when disabled in the configuration.
    pub async fn process_document_verified(
        &self,
        inputs: &[PageInput],
        source: Arc<dyn PdfTextSource>,
    ) -> Result<DocumentOutcome, PositioningError> {
        check_page_sequence(inputs)?;
        if !self.config.verifier.enabled {
            tracing::debug!("Position verification disabled, skipping text layer");
            return self.process_document(inputs);
        }
        if source.page_count() < inputs.len() as u32 {
            return Err(PositioningError::PageMismatch {
                expected: inputs.len() as u32,
                found: source.page_count(),
            });
        }

        let mut located = Vec::with_capacity(inputs.len());
        for input in inputs {
            located.push(self.locate(input)?);
        }

        let pages: Vec<PageInfo> = located.iter().map(|l| l.page).collect();
        let all_fields: Vec<PositionedField> = located
            .iter_mut()
            .flat_map(|l| std::mem::take(&mut l.fields))
            .collect();

        let verified = self
            .verifier
            .verify_document(source, all_fields, &pages)
            .await?;

        for (field, outcome) in verified {
            // pages are 1..=N, so page_number - 1 indexes `located`
            let Some(slot) = located.get_mut(field.page_number as usize - 1) else {
                continue;
            };
            match outcome {
                VerificationOutcome::Confirmed => slot.stats.verified_confirmed += 1,
                VerificationOutcome::Corrected { .. } => slot.stats.verified_corrected += 1,
                VerificationOutcome::NotFound => slot.stats.verified_missing += 1,
                VerificationOutcome::Skipped => {}
            }
            slot.fields.push(field);
        }

        let finished = located.into_iter().map(|l| self.finish(l)).collect();
        Ok(self.assemble(finished))
    }

    /// Match, position and boundary-check every descriptor on a page.
    fn locate(&self, input: &PageInput) -> Result<LocatedPage, PositioningError> {
        let page = input.page;
        page.validate()?;
        ensure_finite(&input.lines, "line")?;
        ensure_finite(&input.words, "word")?;

        let _span = tracing::info_span!("position_page", page = page.page_number).entered();

        let mut diagnostics = PageDiagnostics {
            page_number: page.page_number,
            ..PageDiagnostics::default()
        };
        let mut stats = PipelineStats {
            descriptors: input.descriptors.len(),
            ..PipelineStats::default()
        };
        let mut fields = Vec::with_capacity(input.descriptors.len());

        for descriptor in &input.descriptors {
            let Some(matched) = self
                .matcher
                .find(&descriptor.label_text, &input.lines, &input.words)
            else {
                diagnostics.unmatched.push(descriptor.label_text.clone());
                continue;
            };
            stats.matched += 1;

            let field = self
                .positioner
                .build_field(descriptor, &matched, &page, self.ids.as_ref());
            let field = self.validator.validate(field, &page);
            if field.validation_status == Some(ValidationStatus::Adjusted) {
                stats.clamped += 1;
            }
            fields.push(field);
        }
        stats.unmatched = diagnostics.unmatched.len();

        Ok(LocatedPage {
            page,
            fields,
            diagnostics,
            stats,
        })
    }

    /// Resolve overlaps, apply moves, drop losers, group radios.
    fn finish(&self, located: LocatedPage) -> (Vec<FinalField>, PageDiagnostics, PipelineStats) {
        let LocatedPage {
            page,
            fields,
            mut diagnostics,
            mut stats,
        } = located;

        let mut survivors = Vec::with_capacity(fields.len());
        for field in self.resolver.resolve(fields) {
            if field.is_invalid() {
                diagnostics.invalid.push(field);
                continue;
            }
            if field.is_removed() {
                tracing::warn!(page = page.page_number, field = %field.name, "Field removed by overlap resolution");
                diagnostics.removed.push(field);
                continue;
            }
            if field.is_flagged() {
                tracing::warn!(page = page.page_number, field = %field.name, "Field flagged for review");
                diagnostics.flagged.push(field.label.clone());
            }

            let moved_to = field
                .resolution
                .as_ref()
                .filter(|r| r.action == ResolutionAction::Adjust)
                .and_then(|r| r.adjusted_box);
            let field = match moved_to {
                Some(bbox) => {
                    stats.adjusted += 1;
                    let mut moved = field;
                    moved.bbox = bbox;
                    moved.validation_status = None;
                    moved.original_box = None;
                    self.validator.validate(moved, &page)
                }
                None => field,
            };
            if field.survives() {
                survivors.push(field);
            } else {
                diagnostics.invalid.push(field);
            }
        }

        let fields = self.radio.detect_groups(survivors);

        stats.invalid = diagnostics.invalid.len();
        stats.removed = diagnostics.removed.len();
        stats.flagged = diagnostics.flagged.len();
        stats.radio_groups = fields
            .iter()
            .filter(|f| matches!(f, FinalField::RadioGroup(_)))
            .count();
        stats.final_fields = fields.len();

        tracing::debug!(
            page = page.page_number,
            fields = fields.len(),
            invalid = stats.invalid,
            removed = stats.removed,
            "Page positioned"
        );

        (fields, diagnostics, stats)
    }

    fn assemble(
        &self,
        finished: Vec<(Vec<FinalField>, PageDiagnostics, PipelineStats)>,
    ) -> DocumentOutcome {
        let mut fields = Vec::new();
        let mut pages = Vec::with_capacity(finished.len());
        let mut stats = PipelineStats::default();

        for (page_fields, diagnostics, page_stats) in finished {
            fields.extend(page_fields);
            pages.push(diagnostics);
            stats.merge(&page_stats);
        }

        let mut fields = self.tab_order.order(fields);
        dedupe_names(fields.iter_mut().map(|f| &mut f.field));
        stats.final_fields = fields.len();
        log_stats(&stats);

        DocumentOutcome {
            fields,
            pages,
            stats,
        }
    }
}

fn check_page_sequence(inputs: &[PageInput]) -> Result<(), PositioningError> {
    for (i, input) in inputs.iter().enumerate() {
        let expected = i as u32 + 1;
        if input.page.page_number != expected {
            return Err(PositioningError::PageMismatch {
                expected,
                found: input.page.page_number,
            });
        }
    }
    Ok(())
}

fn log_stats(stats: &PipelineStats) {
    tracing::info!(
        descriptors = stats.descriptors,
        matched = stats.matched,
        unmatched = stats.unmatched,
        invalid = stats.invalid,
        clamped = stats.clamped,
        adjusted = stats.adjusted,
        removed = stats.removed,
        flagged = stats.flagged,
        radio_groups = stats.radio_groups,
        final_fields = stats.final_fields,
        "Form positioning complete"
    );
}
