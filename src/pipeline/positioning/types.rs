//! Core types for the field positioning pipeline.
//!
//! These types model the full lifecycle:
//! Descriptor + OCR spans → Match → Positioned → Validated → Resolved →
//! Grouped → Tab-ordered.
//!
//! Boundary types serialize in camelCase, the format exchanged with the
//! vision-model collaborator and the PDF widget writer.

use serde::{Deserialize, Deserializer, Serialize};

use super::geometry::BoundingBox;
use super::PositioningError;

// ═══════════════════════════════════════════
// Direction
// ═══════════════════════════════════════════

/// Text and layout direction of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rtl,
    Ltr,
}

impl Direction {
    /// `Rtl` when the text contains a Hebrew or Arabic letter, else `Ltr`.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(is_rtl_letter) {
            Self::Rtl
        } else {
            Self::Ltr
        }
    }

    /// PDF quadding (`Q`) value: 0 = left, 2 = right.
    pub fn quadding(&self) -> u8 {
        match self {
            Self::Rtl => 2,
            Self::Ltr => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rtl => "rtl",
            Self::Ltr => "ltr",
        }
    }
}

fn is_rtl_letter(c: char) -> bool {
    matches!(c, '\u{05D0}'..='\u{05EA}' | '\u{05F0}'..='\u{05F2}' | '\u{0620}'..='\u{064A}')
}

// ═══════════════════════════════════════════
// Descriptor enums (from the vision model)
// ═══════════════════════════════════════════

/// Visual shape of the fillable area as described by the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum FieldType {
    Underline,
    BoxWithTitle,
    DigitBoxes,
    TableCell,
    TitleRight,
    SelectionMark,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Underline => "underline",
            Self::BoxWithTitle => "box_with_title",
            Self::DigitBoxes => "digit_boxes",
            Self::TableCell => "table_cell",
            Self::TitleRight => "title_right",
            Self::SelectionMark => "selection_mark",
        }
    }

    /// Lenient parse: unknown values fall back to `Underline`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "box_with_title" => Self::BoxWithTitle,
            "digit_boxes" => Self::DigitBoxes,
            "table_cell" => Self::TableCell,
            "title_right" => Self::TitleRight,
            "selection_mark" => Self::SelectionMark,
            _ => Self::Underline,
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// Kind of value the field collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum InputType {
    Text,
    Checkbox,
    Radio,
    Signature,
    Dropdown,
    Date,
    Number,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Signature => "signature",
            Self::Dropdown => "dropdown",
            Self::Date => "date",
            Self::Number => "number",
        }
    }

    /// Lenient parse: unknown values fall back to `Text`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "signature" => Self::Signature,
            "dropdown" => Self::Dropdown,
            "date" => Self::Date,
            "number" => Self::Number,
            _ => Self::Text,
        }
    }

    /// AcroForm widget used to render this input.
    pub fn widget_kind(&self) -> WidgetKind {
        match self {
            Self::Text | Self::Date | Self::Number => WidgetKind::Text,
            Self::Checkbox => WidgetKind::Checkbox,
            Self::Radio => WidgetKind::Radio,
            Self::Dropdown => WidgetKind::Dropdown,
            Self::Signature => WidgetKind::Signature,
        }
    }
}

impl From<String> for InputType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Widget kinds the PDF writer knows how to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Text,
    Checkbox,
    Radio,
    Dropdown,
    Signature,
}

/// One field as described by the vision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDescriptor {
    pub label_text: String,
    #[serde(default = "default_field_type")]
    pub field_type: FieldType,
    #[serde(default = "default_input_type")]
    pub input_type: InputType,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    pub row_group: Option<String>,
    #[serde(default)]
    pub related_fields: Vec<String>,
    #[serde(default)]
    pub has_visible_boundary: Option<bool>,
}

fn default_field_type() -> FieldType {
    FieldType::Underline
}

fn default_input_type() -> InputType {
    InputType::Text
}

/// Vision models emit row groups as either `"2"` or `2`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl LabelDescriptor {
    pub fn new(label_text: &str, field_type: FieldType, input_type: InputType) -> Self {
        Self {
            label_text: label_text.to_string(),
            field_type,
            input_type,
            section: None,
            required: false,
            row_group: None,
            related_fields: Vec::new(),
            has_visible_boundary: None,
        }
    }
}

// ═══════════════════════════════════════════
// OCR input
// ═══════════════════════════════════════════

/// A run of OCR text (line or word granularity) with its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub content: String,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

impl TextSpan {
    pub fn new(content: &str, bbox: BoundingBox) -> Self {
        Self {
            content: content.to_string(),
            bbox,
        }
    }
}

/// Page size in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_number: u32,
    pub width: f32,
    pub height: f32,
}

impl PageInfo {
    pub fn new(page_number: u32, width: f32, height: f32) -> Self {
        Self {
            page_number,
            width,
            height,
        }
    }

    /// Malformed page dimensions are the one input defect raised to the caller.
    pub fn validate(&self) -> Result<(), PositioningError> {
        let ok = self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0;
        if ok {
            Ok(())
        } else {
            Err(PositioningError::InvalidPageDimensions {
                page: self.page_number,
                width: self.width,
                height: self.height,
            })
        }
    }
}

// ═══════════════════════════════════════════
// Matching & positioning output
// ═══════════════════════════════════════════

/// Best OCR span for a label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub text: String,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub score: f32,
}

/// How a field was located.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub matched_text: String,
    pub match_score: f32,
    pub label_box: BoundingBox,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Adjusted,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    Keep,
    Adjust,
    Flag,
    Remove,
}

impl ResolutionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Adjust => "adjust",
            Self::Flag => "flag",
            Self::Remove => "remove",
        }
    }
}

/// Outcome of overlap resolution for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub action: ResolutionAction,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_box: Option<BoundingBox>,
}

/// A located form field, annotated as it moves through the stages.
///
/// Each stage consumes the field and returns an annotated copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedField {
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub name: String,
    pub label: String,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub page_number: u32,
    pub direction: Direction,
    pub required: bool,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<ValidationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_box: Option<BoundingBox>,
    #[serde(default)]
    pub has_overlap: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl PositionedField {
    pub fn is_invalid(&self) -> bool {
        self.validation_status == Some(ValidationStatus::Invalid)
    }

    pub fn is_removed(&self) -> bool {
        self.resolution
            .as_ref()
            .is_some_and(|r| r.action == ResolutionAction::Remove)
    }

    pub fn is_flagged(&self) -> bool {
        self.resolution
            .as_ref()
            .is_some_and(|r| r.action == ResolutionAction::Flag)
    }

    /// Survives to PDF synthesis: not removed and not invalid.
    pub fn survives(&self) -> bool {
        !self.is_invalid() && !self.is_removed()
    }
}

// ═══════════════════════════════════════════
// Radio groups & final output
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Several aligned checkboxes merged into one mutually exclusive choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioGroupField {
    pub name: String,
    pub label: String,
    /// Member field names, in option order.
    pub options: Vec<String>,
    pub orientation: Orientation,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub page_number: u32,
    pub direction: Direction,
    pub required: bool,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
    /// Original checkbox fields, in option order.
    pub members: Vec<PositionedField>,
}

/// Unit handed to tab ordering and PDF synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinalField {
    Single(PositionedField),
    RadioGroup(RadioGroupField),
}

impl FinalField {
    pub fn name(&self) -> &str {
        match self {
            Self::Single(f) => &f.name,
            Self::RadioGroup(g) => &g.name,
        }
    }

    pub fn set_name(&mut self, name: String) {
        match self {
            Self::Single(f) => f.name = name,
            Self::RadioGroup(g) => g.name = name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Single(f) => &f.label,
            Self::RadioGroup(g) => &g.label,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        match self {
            Self::Single(f) => f.bbox,
            Self::RadioGroup(g) => g.bbox,
        }
    }

    pub fn page_number(&self) -> u32 {
        match self {
            Self::Single(f) => f.page_number,
            Self::RadioGroup(g) => g.page_number,
        }
    }

    pub fn section_name(&self) -> Option<&str> {
        match self {
            Self::Single(f) => f.section_name.as_deref(),
            Self::RadioGroup(g) => g.section_name.as_deref(),
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Single(f) => f.direction,
            Self::RadioGroup(g) => g.direction,
        }
    }

    pub fn widget_kind(&self) -> WidgetKind {
        match self {
            Self::Single(f) => f.input_type.widget_kind(),
            Self::RadioGroup(_) => WidgetKind::Radio,
        }
    }
}

/// A final field with its 1-based keyboard navigation index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldWithTabOrder {
    pub field: FinalField,
    pub tab_index: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hebrew_label_is_rtl() {
        assert_eq!(Direction::detect("שם פרטי:"), Direction::Rtl);
        assert_eq!(Direction::detect("First name"), Direction::Ltr);
        assert_eq!(Direction::detect("ת.ז. / ID"), Direction::Rtl);
    }

    #[test]
    fn quadding_aligns_rtl_right() {
        assert_eq!(Direction::Rtl.quadding(), 2);
        assert_eq!(Direction::Ltr.quadding(), 0);
    }

    #[test]
    fn unknown_field_type_falls_back() {
        assert_eq!(FieldType::parse("zigzag"), FieldType::Underline);
        assert_eq!(FieldType::parse("DIGIT_BOXES"), FieldType::DigitBoxes);
        assert_eq!(InputType::parse("email"), InputType::Text);
    }

    #[test]
    fn descriptor_deserializes_camel_case() {
        let json = r#"{
            "labelText": "תאריך לידה",
            "fieldType": "digit_boxes",
            "inputType": "date",
            "section": "פרטים אישיים",
            "required": true,
            "rowGroup": 3,
            "hasVisibleBoundary": true
        }"#;
        let d: LabelDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.field_type, FieldType::DigitBoxes);
        assert_eq!(d.input_type, InputType::Date);
        assert!(d.required);
        assert_eq!(d.row_group.as_deref(), Some("3"));
        assert!(d.related_fields.is_empty());
    }

    #[test]
    fn descriptor_defaults_when_sparse() {
        let d: LabelDescriptor = serde_json::from_str(r#"{"labelText": "עיר"}"#).unwrap();
        assert_eq!(d.field_type, FieldType::Underline);
        assert_eq!(d.input_type, InputType::Text);
        assert!(!d.required);
        assert!(d.section.is_none());
    }

    #[test]
    fn widget_kind_mapping() {
        assert_eq!(InputType::Date.widget_kind(), WidgetKind::Text);
        assert_eq!(InputType::Number.widget_kind(), WidgetKind::Text);
        assert_eq!(InputType::Signature.widget_kind(), WidgetKind::Signature);
        assert_eq!(InputType::Checkbox.widget_kind(), WidgetKind::Checkbox);
    }

    #[test]
    fn page_validation() {
        assert!(PageInfo::new(1, 595.0, 842.0).validate().is_ok());
        assert!(PageInfo::new(1, 0.0, 842.0).validate().is_err());
        assert!(PageInfo::new(2, 595.0, f32::NAN).validate().is_err());
    }

    #[test]
    fn text_span_uses_box_key() {
        let span = TextSpan::new("שם", BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        let json = serde_json::to_string(&span).unwrap();
        assert!(json.contains("\"box\":{"));
    }

    fn checkbox(label: &str, x: f32, direction: Direction) -> PositionedField {
        PositionedField {
            input_type: InputType::Checkbox,
            name: label.to_string(),
            label: label.to_string(),
            bbox: BoundingBox::new(x, 100.0, 10.0, 10.0),
            page_number: 1,
            direction,
            required: false,
            confidence: 0.9,
            section_name: None,
            provenance: Provenance {
                matched_text: label.to_string(),
                match_score: 1.0,
                label_box: BoundingBox::new(x + 15.0, 100.0, 20.0, 10.0),
                field_type: FieldType::SelectionMark,
            },
            validation_status: Some(ValidationStatus::Valid),
            original_box: None,
            has_overlap: false,
            resolution: None,
        }
    }

    #[test]
    fn removed_or_invalid_fields_do_not_survive() {
        let mut field = checkbox("כן", 100.0, Direction::Rtl);
        assert!(field.survives());

        field.resolution = Some(Resolution {
            action: ResolutionAction::Remove,
            reason: "overlap".to_string(),
            adjusted_box: None,
        });
        assert!(!field.survives());

        let mut field = checkbox("כן", 100.0, Direction::Rtl);
        field.validation_status = Some(ValidationStatus::Invalid);
        assert!(!field.survives());
    }

    #[test]
    fn final_field_accessors() {
        let single = FinalField::Single(checkbox("כן", 100.0, Direction::Rtl));
        assert_eq!(single.label(), "כן");
        assert_eq!(single.direction(), Direction::Rtl);

        let group = FinalField::RadioGroup(RadioGroupField {
            name: "yes_group".to_string(),
            label: "yes / no".to_string(),
            options: vec!["yes".to_string(), "no".to_string()],
            orientation: Orientation::Horizontal,
            bbox: BoundingBox::new(100.0, 100.0, 60.0, 10.0),
            page_number: 1,
            direction: Direction::Ltr,
            required: false,
            confidence: 0.9,
            section_name: None,
            members: vec![
                checkbox("yes", 100.0, Direction::Ltr),
                checkbox("no", 150.0, Direction::Ltr),
            ],
        });
        assert_eq!(group.label(), "yes / no");
        assert_eq!(group.direction(), Direction::Ltr);
        assert_eq!(group.widget_kind(), WidgetKind::Radio);
    }

    #[test]
    fn resolution_action_serializes() {
        let json = serde_json::to_string(&ResolutionAction::Remove).unwrap();
        assert_eq!(json, "\"remove\"");
    }
}
