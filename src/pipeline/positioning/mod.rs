//! Field Positioning & Conflict Resolution
//!
//! Fuses vision-model field descriptions with OCR text geometry into
//! validated, non-overlapping, tab-ordered form fields.
//!
//! ## Stages
//! ```text
//! Matcher → Positioner → Boundary Validator → Overlap Resolver
//!        → Radio Group Detector → Tab Order Calculator
//!                 (optional) Position Verifier against the PDF text layer
//! ```
//!
//! Per-field problems (no match, degenerate or off-page geometry, ambiguous
//! overlaps) are recorded as data on the field or in the page outcome. Only
//! malformed page-level input is returned as `Err`.

pub mod types;
pub mod geometry;
pub mod matcher;
pub mod naming;
pub mod positioner;
pub mod boundary;
pub mod overlap;
pub mod radio;
pub mod tab_order;
pub mod ingest;
pub mod verifier;
pub mod orchestrator;
#[cfg(feature = "pdfium")]
pub mod pdfium;

pub use types::*;
pub use geometry::BoundingBox;
pub use matcher::LabelMatcher;
pub use naming::{ContentHashIdGenerator, CounterIdGenerator, IdGenerator};
pub use positioner::FieldPositioner;
pub use boundary::{audit_fields, BoundaryValidator, ValidationIssue, ValidationResult, Violation};
pub use overlap::OverlapResolver;
pub use radio::RadioGroupDetector;
pub use tab_order::TabOrderCalculator;
pub use ingest::{parse_label_descriptors, scale_spans};
pub use verifier::{MemoryTextSource, PdfTextSource, PositionVerifier, VerificationOutcome};
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumTextSource;
pub use orchestrator::{
    DocumentOutcome, FormPositioningEngine, PageDiagnostics, PageInput, PageOutcome, PipelineStats,
};

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum PositioningError {
    #[error("Invalid dimensions for page {page}: {width}x{height}")]
    InvalidPageDimensions { page: u32, width: f32, height: f32 },

    #[error("Non-finite geometry in {context}")]
    NonFiniteGeometry { context: String },

    #[error("Page mismatch: expected page {expected}, found {found}")]
    PageMismatch { expected: u32, found: u32 },

    #[error("Invalid OCR resolution: {0} dpi")]
    InvalidDpi(f32),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Malformed field description response: {0}")]
    MalformedResponse(String),

    #[error("Verification error: {0}")]
    Verification(#[from] VerifierError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failures of the PDF text-layer collaborator used by the position verifier.
#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("Text layer unavailable for page {page}: {reason}")]
    TextLayer { page: u32, reason: String },

    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Verification task failed: {0}")]
    TaskJoin(String),
}
