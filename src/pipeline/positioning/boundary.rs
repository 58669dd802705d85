// Boundary validation: clamp fields into the page, reject unrecoverable ones.
// Also hosts the read-only audit used for diagnostics, which reports the same
// problems without touching the fields.

use serde::{Deserialize, Serialize};

use super::geometry::BoundingBox;
use super::types::{PageInfo, PositionedField, ValidationStatus};
use crate::config::EngineConfig;

/// Clamps field boxes to page bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryValidator {
    min_field_size: Option<f32>,
}

/// Outcome of checking one box against a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCheck {
    pub bbox: BoundingBox,
    pub status: ValidationStatus,
    /// Pre-adjustment box; set whenever an adjustment was attempted.
    pub original: Option<BoundingBox>,
}

impl BoundaryValidator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min_field_size: config.min_field_size,
        }
    }

    /// Annotate a field with its validation status and clamped box.
    pub fn validate(&self, mut field: PositionedField, page: &PageInfo) -> PositionedField {
        let check = self.check_box(&field.bbox, page);

        match check.status {
            ValidationStatus::Invalid => tracing::warn!(
                page = page.page_number,
                field = %field.name,
                x = field.bbox.x,
                y = field.bbox.y,
                width = field.bbox.width,
                height = field.bbox.height,
                "Field geometry invalid, excluded from output"
            ),
            ValidationStatus::Adjusted => tracing::debug!(
                page = page.page_number,
                field = %field.name,
                width = check.bbox.width,
                height = check.bbox.height,
                "Field clamped to page bounds"
            ),
            ValidationStatus::Valid => {}
        }

        field.bbox = check.bbox;
        field.validation_status = Some(check.status);
        field.original_box = check.original;
        field
    }

    /// Rules, in order:
    /// 1. non-positive width or height → invalid, nothing captured
    /// 2. clamp left, top, right, bottom edges into the page
    /// 3. anchored at or beyond the right/bottom edge before clamping → invalid
    /// 4. any clamp → adjusted (invalid if clamping left no positive area, or
    ///    the box fell under the configured size floor)
    /// 5. otherwise valid
    pub fn check_box(&self, bbox: &BoundingBox, page: &PageInfo) -> BoxCheck {
        if bbox.width <= 0.0 || bbox.height <= 0.0 {
            return BoxCheck {
                bbox: *bbox,
                status: ValidationStatus::Invalid,
                original: None,
            };
        }

        let original = *bbox;
        let mut b = *bbox;
        let mut adjusted = false;

        if b.x < 0.0 {
            b.width += b.x;
            b.x = 0.0;
            adjusted = true;
        }
        if b.y < 0.0 {
            b.height += b.y;
            b.y = 0.0;
            adjusted = true;
        }
        if b.x + b.width > page.width {
            b.width = page.width - b.x;
            adjusted = true;
        }
        if b.y + b.height > page.height {
            b.height = page.height - b.y;
            adjusted = true;
        }

        let outside = original.x >= page.width || original.y >= page.height;
        let status = if outside || (adjusted && !self.is_usable(&b)) {
            ValidationStatus::Invalid
        } else if adjusted {
            ValidationStatus::Adjusted
        } else {
            ValidationStatus::Valid
        };

        BoxCheck {
            bbox: b,
            status,
            original: adjusted.then_some(original),
        }
    }

    fn is_usable(&self, b: &BoundingBox) -> bool {
        if !b.has_positive_size() {
            return false;
        }
        match self.min_field_size {
            Some(floor) => b.width >= floor && b.height >= floor,
            None => true,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Audit (diagnostics only)
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssue {
    OutOfBounds,
    NegativeCoords,
    ZeroDimensions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub field: String,
    pub issue: ValidationIssue,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
}

/// Report boundary problems in a field set without modifying it.
///
/// The suggested fix is the box the validator would produce, when that box
/// would not itself be invalid.
pub fn audit_fields(fields: &[PositionedField], pages: &[PageInfo]) -> ValidationResult {
    let validator = BoundaryValidator::default();
    let mut violations = Vec::new();

    for field in fields {
        let b = &field.bbox;

        if b.width <= 0.0 || b.height <= 0.0 {
            violations.push(Violation {
                field: field.name.clone(),
                issue: ValidationIssue::ZeroDimensions,
                details: format!("width {} x height {}", b.width, b.height),
                suggested_fix: None,
            });
            continue;
        }

        let Some(page) = pages.iter().find(|p| p.page_number == field.page_number) else {
            violations.push(Violation {
                field: field.name.clone(),
                issue: ValidationIssue::OutOfBounds,
                details: format!("page {} not in document", field.page_number),
                suggested_fix: None,
            });
            continue;
        };

        let check = validator.check_box(b, page);
        let suggested_fix =
            (check.status == ValidationStatus::Adjusted).then_some(check.bbox);

        if b.x < 0.0 || b.y < 0.0 {
            violations.push(Violation {
                field: field.name.clone(),
                issue: ValidationIssue::NegativeCoords,
                details: format!("origin ({}, {})", b.x, b.y),
                suggested_fix,
            });
        }
        if b.right() > page.width || b.bottom() > page.height {
            violations.push(Violation {
                field: field.name.clone(),
                issue: ValidationIssue::OutOfBounds,
                details: format!(
                    "extends to ({}, {}) on {}x{} page",
                    b.right(),
                    b.bottom(),
                    page.width,
                    page.height
                ),
                suggested_fix,
            });
        }
    }

    if !violations.is_empty() {
        tracing::warn!(
            violation_count = violations.len(),
            "Field audit found boundary violations"
        );
    }

    ValidationResult {
        is_valid: violations.is_empty(),
        violations,
    }
}
