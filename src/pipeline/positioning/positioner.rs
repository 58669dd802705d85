//! Field Positioner: turn a matched label box into a fillable-area box.
//!
//! Hebrew forms read right to left, so the fillable area trails the label on
//! its LEFT: `x = label.x − width − gap`, same row as the label. Width is the
//! smaller of a per-kind cap and the room left before the page margin.

use super::geometry::{round2, BoundingBox};
use super::naming::{derive_field_name, IdGenerator};
use super::types::{
    Direction, FieldType, InputType, LabelDescriptor, MatchResult, PageInfo, PositionedField,
    Provenance,
};
use crate::config::EngineConfig;

const DEFAULT_WIDTH_CAP: f32 = 200.0;
const SIGNATURE_WIDTH_CAP: f32 = 200.0;
const SIGNATURE_HEIGHT: f32 = 50.0;
const DIGIT_BOXES_WIDTH_CAP: f32 = 150.0;
const DIGIT_BOXES_HEIGHT: f32 = 25.0;

/// Seed confidence for an exact label match.
pub const CONFIDENCE_EXACT: f32 = 0.9;
/// Seed confidence for any other accepted match.
pub const CONFIDENCE_FUZZY: f32 = 0.75;

/// Geometry class of a field, decided once per descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGeometry {
    /// Wide, tall box for a handwritten signature.
    Signature,
    /// Row of single-digit cells (ID numbers, dates).
    DigitBoxes,
    /// Square tick box sized to the label's line height.
    SelectionMark,
    /// Free-text line the height of its label.
    Line,
}

impl FieldGeometry {
    pub fn of(descriptor: &LabelDescriptor) -> Self {
        match (descriptor.input_type, descriptor.field_type) {
            (InputType::Signature, _) => Self::Signature,
            (InputType::Checkbox | InputType::Radio, _) | (_, FieldType::SelectionMark) => {
                Self::SelectionMark
            }
            (_, FieldType::DigitBoxes) => Self::DigitBoxes,
            (
                InputType::Text | InputType::Dropdown | InputType::Date | InputType::Number,
                FieldType::Underline
                | FieldType::BoxWithTitle
                | FieldType::TableCell
                | FieldType::TitleRight,
            ) => Self::Line,
        }
    }

    fn width_cap(&self, label: &BoundingBox) -> f32 {
        match self {
            Self::Signature => SIGNATURE_WIDTH_CAP,
            Self::DigitBoxes => DIGIT_BOXES_WIDTH_CAP,
            Self::SelectionMark => label.height,
            Self::Line => DEFAULT_WIDTH_CAP,
        }
    }

    fn height(&self, label: &BoundingBox) -> f32 {
        match self {
            Self::Signature => SIGNATURE_HEIGHT,
            Self::DigitBoxes => DIGIT_BOXES_HEIGHT,
            Self::SelectionMark | Self::Line => label.height,
        }
    }
}

/// Computes field boxes to the left of their labels.
#[derive(Debug, Clone, Copy)]
pub struct FieldPositioner {
    left_margin: f32,
    label_gap: f32,
}

impl Default for FieldPositioner {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl FieldPositioner {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            left_margin: config.left_margin,
            label_gap: config.label_gap,
        }
    }

    /// Candidate box for a descriptor whose label sits at `label_box`.
    ///
    /// May be degenerate (non-positive width) when the label hugs the left
    /// margin; the boundary validator rejects such boxes.
    pub fn position(
        &self,
        descriptor: &LabelDescriptor,
        label_box: &BoundingBox,
        page: &PageInfo,
    ) -> BoundingBox {
        let geometry = FieldGeometry::of(descriptor);
        let available = label_box.x - self.left_margin - self.label_gap;
        let mut width = geometry.width_cap(label_box).min(available);
        let mut x = label_box.x - width - self.label_gap;
        let y = label_box.y;
        let height = geometry.height(label_box);

        if x < 0.0 {
            width -= x.abs();
            x = 0.0;
        }
        if x + width > page.width {
            width = page.width - x;
        }

        BoundingBox::new(x, y, width, height).rounded()
    }

    /// Build the positioned field for a matched descriptor.
    pub fn build_field(
        &self,
        descriptor: &LabelDescriptor,
        matched: &MatchResult,
        page: &PageInfo,
        ids: &dyn IdGenerator,
    ) -> PositionedField {
        let bbox = self.position(descriptor, &matched.bbox, page);
        let confidence = if matched.score >= 1.0 {
            CONFIDENCE_EXACT
        } else {
            CONFIDENCE_FUZZY
        };

        tracing::debug!(
            page = page.page_number,
            label = %descriptor.label_text,
            x = bbox.x,
            y = bbox.y,
            width = bbox.width,
            height = bbox.height,
            confidence,
            "Field positioned"
        );

        PositionedField {
            input_type: descriptor.input_type,
            name: derive_field_name(&descriptor.label_text, ids),
            label: descriptor.label_text.clone(),
            bbox,
            page_number: page.page_number,
            direction: Direction::detect(&descriptor.label_text),
            required: descriptor.required,
            confidence,
            section_name: descriptor.section.clone(),
            provenance: Provenance {
                matched_text: matched.text.clone(),
                match_score: round2(matched.score),
                label_box: matched.bbox,
                field_type: descriptor.field_type,
            },
            validation_status: None,
            original_box: None,
            has_overlap: false,
            resolution: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::positioning::naming::CounterIdGenerator;

    fn a4() -> PageInfo {
        PageInfo::new(1, 595.0, 842.0)
    }

    fn descriptor(field_type: FieldType, input_type: InputType) -> LabelDescriptor {
        LabelDescriptor::new("שם פרטי:", field_type, input_type)
    }

    fn matched(x: f32, score: f32) -> MatchResult {
        MatchResult {
            text: "שם פרטי:".into(),
            bbox: BoundingBox::new(x, 100.0, 60.0, 14.0),
            score,
        }
    }

    #[test]
    fn text_field_left_of_label() {
        let pos = FieldPositioner::default();
        let d = descriptor(FieldType::Underline, InputType::Text);
        let b = pos.position(&d, &BoundingBox::new(450.0, 100.0, 60.0, 14.0), &a4());
        assert_eq!(b, BoundingBox::new(245.0, 100.0, 200.0, 14.0));
    }

    #[test]
    fn width_limited_by_left_margin() {
        let pos = FieldPositioner::default();
        let d = descriptor(FieldType::Underline, InputType::Text);
        let b = pos.position(&d, &BoundingBox::new(155.0, 100.0, 60.0, 14.0), &a4());
        // available = 155 - 50 - 5 = 100
        assert_eq!(b.width, 100.0);
        assert_eq!(b.x, 50.0);
    }

    #[test]
    fn signature_is_tall() {
        let pos = FieldPositioner::default();
        let d = descriptor(FieldType::Underline, InputType::Signature);
        let b = pos.position(&d, &BoundingBox::new(450.0, 700.0, 40.0, 12.0), &a4());
        assert_eq!(b.height, 50.0);
        assert_eq!(b.width, 200.0);
    }

    #[test]
    fn digit_boxes_capped_at_150() {
        let pos = FieldPositioner::default();
        let d = descriptor(FieldType::DigitBoxes, InputType::Number);
        let b = pos.position(&d, &BoundingBox::new(450.0, 100.0, 60.0, 14.0), &a4());
        assert_eq!(b.width, 150.0);
        assert_eq!(b.height, 25.0);
        assert_eq!(b.x, 295.0);
    }

    #[test]
    fn checkbox_is_square() {
        let pos = FieldPositioner::default();
        let d = descriptor(FieldType::SelectionMark, InputType::Checkbox);
        let b = pos.position(&d, &BoundingBox::new(450.0, 100.0, 30.0, 12.0), &a4());
        assert_eq!(b.width, 12.0);
        assert_eq!(b.height, 12.0);
        assert_eq!(b.x, 433.0);
    }

    #[test]
    fn label_at_margin_gives_degenerate_box() {
        let pos = FieldPositioner::default();
        let d = descriptor(FieldType::Underline, InputType::Text);
        let b = pos.position(&d, &BoundingBox::new(40.0, 100.0, 60.0, 14.0), &a4());
        assert!(b.width <= 0.0);
    }

    #[test]
    fn zero_margin_reaches_page_edge() {
        let pos = FieldPositioner::from_config(&EngineConfig {
            left_margin: 0.0,
            label_gap: 5.0,
            ..EngineConfig::default()
        });
        let d = descriptor(FieldType::Underline, InputType::Text);
        let b = pos.position(&d, &BoundingBox::new(100.0, 100.0, 60.0, 14.0), &a4());
        assert_eq!(b.x, 0.0);
        assert_eq!(b.width, 95.0);
    }

    #[test]
    fn width_clamped_to_page() {
        let pos = FieldPositioner::default();
        let d = descriptor(FieldType::Underline, InputType::Text);
        let narrow = PageInfo::new(1, 300.0, 400.0);
        let b = pos.position(&d, &BoundingBox::new(560.0, 10.0, 30.0, 10.0), &narrow);
        assert!(b.x + b.width <= 300.0 + f32::EPSILON);
    }

    #[test]
    fn coordinates_rounded() {
        let pos = FieldPositioner::default();
        let d = descriptor(FieldType::Underline, InputType::Text);
        let b = pos.position(&d, &BoundingBox::new(450.333, 100.126, 60.0, 14.444), &a4());
        assert_eq!(b.x, 245.33);
        assert_eq!(b.y, 100.13);
        assert_eq!(b.height, 14.44);
    }

    #[test]
    fn exact_match_seeds_high_confidence() {
        let pos = FieldPositioner::default();
        let ids = CounterIdGenerator::new();
        let d = descriptor(FieldType::Underline, InputType::Text);
        let field = pos.build_field(&d, &matched(450.0, 1.0), &a4(), &ids);
        assert_eq!(field.confidence, CONFIDENCE_EXACT);
        assert_eq!(field.name, "שם_פרטי");
        assert_eq!(field.direction, Direction::Rtl);
        assert_eq!(field.provenance.match_score, 1.0);
        assert_eq!(field.provenance.label_box.x, 450.0);
        assert!(field.validation_status.is_none());
    }

    #[test]
    fn fuzzy_match_seeds_lower_confidence() {
        let pos = FieldPositioner::default();
        let ids = CounterIdGenerator::new();
        let d = descriptor(FieldType::Underline, InputType::Text);
        let field = pos.build_field(&d, &matched(450.0, 0.9), &a4(), &ids);
        assert_eq!(field.confidence, CONFIDENCE_FUZZY);
    }

    #[test]
    fn geometry_class_is_exhaustive() {
        let d = descriptor(FieldType::TitleRight, InputType::Dropdown);
        assert_eq!(FieldGeometry::of(&d), FieldGeometry::Line);
        let d = descriptor(FieldType::DigitBoxes, InputType::Signature);
        assert_eq!(FieldGeometry::of(&d), FieldGeometry::Signature);
        let d = descriptor(FieldType::SelectionMark, InputType::Text);
        assert_eq!(FieldGeometry::of(&d), FieldGeometry::SelectionMark);
    }
}
