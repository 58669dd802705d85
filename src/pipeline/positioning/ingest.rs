// Input adapters for the two upstream collaborators: the vision model's field
// description response and the OCR engine's pixel-space spans.

use serde_json::Value;

use super::types::{LabelDescriptor, TextSpan};
use super::PositioningError;

/// Points per inch.
const PDF_DPI: f32 = 72.0;

/// Parse the vision model's field list.
///
/// Accepts a fenced ```json block or bare JSON, shaped either as an array of
/// descriptors or as `{"fields": [...]}`. Items that fail to deserialize, or
/// whose label is blank, are skipped with a warning.
pub fn parse_label_descriptors(response: &str) -> Result<Vec<LabelDescriptor>, PositioningError> {
    let json_str = extract_json_block(response)?;
    let root: Value = serde_json::from_str(json_str)
        .map_err(|e| PositioningError::JsonParsing(e.to_string()))?;

    let items = match root {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("fields") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(PositioningError::MalformedResponse(
                    "expected a \"fields\" array".into(),
                ))
            }
        },
        _ => {
            return Err(PositioningError::MalformedResponse(
                "expected an array of field descriptions".into(),
            ))
        }
    };

    let total = items.len();
    let descriptors: Vec<LabelDescriptor> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<LabelDescriptor>(item) {
            Ok(d) if !d.label_text.trim().is_empty() => Some(d),
            Ok(_) => {
                tracing::warn!(index = i, "Skipping field description with blank label");
                None
            }
            Err(e) => {
                tracing::warn!(index = i, error = %e, "Skipping malformed field description");
                None
            }
        })
        .collect();

    tracing::debug!(total, parsed = descriptors.len(), "Field descriptions parsed");
    Ok(descriptors)
}

/// Slice out the contents of a ```json fence; unfenced input is used whole.
fn extract_json_block(response: &str) -> Result<&str, PositioningError> {
    let Some(start) = response.find("```json") else {
        return Ok(response.trim());
    };
    let content_start = start + "```json".len();
    let end = response[content_start..]
        .find("```")
        .ok_or_else(|| PositioningError::MalformedResponse("Unclosed JSON block".into()))?;
    Ok(response[content_start..content_start + end].trim())
}

/// Convert OCR spans measured in image pixels at `dpi` to PDF points.
pub fn scale_spans(spans: &[TextSpan], dpi: f32) -> Result<Vec<TextSpan>, PositioningError> {
    if !dpi.is_finite() || dpi <= 0.0 {
        return Err(PositioningError::InvalidDpi(dpi));
    }
    let factor = PDF_DPI / dpi;
    Ok(spans
        .iter()
        .map(|s| TextSpan {
            content: s.content.clone(),
            bbox: s.bbox.scaled(factor),
        })
        .collect())
}

/// Reject spans with NaN or infinite coordinates.
pub fn ensure_finite(spans: &[TextSpan], context: &str) -> Result<(), PositioningError> {
    match spans.iter().find(|s| !s.bbox.is_finite()) {
        Some(bad) => Err(PositioningError::NonFiniteGeometry {
            context: format!("{context} span \"{}\"", bad.content),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::positioning::geometry::BoundingBox;
    use crate::pipeline::positioning::types::{FieldType, InputType};

    #[test]
    fn parses_fenced_array() {
        let response = r#"Detected fields:

```json
[
  {"labelText": "שם פרטי", "fieldType": "underline", "inputType": "text", "required": true},
  {"labelText": "חתימה", "inputType": "signature"}
]
```
"#;
        let d = parse_label_descriptors(response).unwrap();
        assert_eq!(d.len(), 2);
        assert!(d[0].required);
        assert_eq!(d[1].input_type, InputType::Signature);
        assert_eq!(d[1].field_type, FieldType::Underline);
    }

    #[test]
    fn parses_bare_fields_object() {
        let response = r#"{"fields": [{"labelText": "עיר", "section": "כתובת"}]}"#;
        let d = parse_label_descriptors(response).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].section.as_deref(), Some("כתובת"));
    }

    #[test]
    fn skips_malformed_items() {
        let response = r#"[
            {"labelText": "טלפון"},
            {"fieldType": "underline"},
            {"labelText": "   "},
            42,
            {"labelText": "דוא\"ל", "inputType": "email"}
        ]"#;
        let d = parse_label_descriptors(response).unwrap();
        let labels: Vec<&str> = d.iter().map(|d| d.label_text.as_str()).collect();
        assert_eq!(labels, vec!["טלפון", "דוא\"ל"]);
        assert_eq!(d[1].input_type, InputType::Text);
    }

    #[test]
    fn invalid_json_is_error() {
        let err = parse_label_descriptors("```json\n[{\"labelText\": }]\n```").unwrap_err();
        assert!(matches!(err, PositioningError::JsonParsing(_)));
    }

    #[test]
    fn unclosed_fence_is_error() {
        let err = parse_label_descriptors("```json\n[]").unwrap_err();
        assert!(matches!(err, PositioningError::MalformedResponse(_)));
    }

    #[test]
    fn wrong_shape_is_error() {
        let err = parse_label_descriptors(r#"{"items": []}"#).unwrap_err();
        assert!(matches!(err, PositioningError::MalformedResponse(_)));
        let err = parse_label_descriptors("\"just text\"").unwrap_err();
        assert!(matches!(err, PositioningError::MalformedResponse(_)));
    }

    #[test]
    fn pixels_scaled_to_points() {
        let spans = vec![TextSpan::new("שם", BoundingBox::new(300.0, 600.0, 150.0, 30.0))];
        let scaled = scale_spans(&spans, 300.0).unwrap();
        let b = scaled[0].bbox;
        assert!((b.x - 72.0).abs() < 1e-4);
        assert!((b.y - 144.0).abs() < 1e-4);
        assert!((b.width - 36.0).abs() < 1e-4);
        assert!((b.height - 7.2).abs() < 1e-4);
        assert_eq!(scaled[0].content, "שם");
    }

    #[test]
    fn bad_dpi_rejected() {
        assert!(scale_spans(&[], 0.0).is_err());
        assert!(scale_spans(&[], f32::NAN).is_err());
    }

    #[test]
    fn non_finite_span_rejected() {
        let spans = vec![
            TextSpan::new("ok", BoundingBox::new(1.0, 1.0, 1.0, 1.0)),
            TextSpan::new("bad", BoundingBox::new(f32::INFINITY, 1.0, 1.0, 1.0)),
        ];
        let err = ensure_finite(&spans, "word").unwrap_err();
        assert!(err.to_string().contains("bad"));
    }
}
