//! Overlap Resolver: pairwise conflict resolution between fields on a page.
//!
//! Every unordered pair on the same page whose overlap (relative to the
//! smaller box) reaches the threshold gets `has_overlap` and a resolution:
//!
//! | confidence gap | required-ness            | outcome                          |
//! |----------------|--------------------------|----------------------------------|
//! | < 0.1          | exactly one required     | required keep, other adjust      |
//! | < 0.1          | both or neither          | both flag                        |
//! | ≥ 0.1          | only the weaker required | weaker keep, stronger adjust     |
//! | ≥ 0.1          | otherwise                | stronger keep, weaker remove if  |
//! |                |                          | overlap > 80%, else adjust       |
//!
//! Adjusting pushes a field straight below its blocker. The pass runs once;
//! overlaps introduced by a push are not re-examined.
//!
//! A field takes the first non-keep decision it receives and keeps it. A
//! `keep` is provisional: a later pair may still demote the field.

use super::geometry::BoundingBox;
use super::types::{PositionedField, Resolution, ResolutionAction};
use crate::config::EngineConfig;

/// Slack for f32 confidence arithmetic: 0.9 - 0.8 is a full 0.1 gap.
const GAP_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct OverlapResolver {
    threshold_pct: f32,
    remove_pct: f32,
    similar_delta: f32,
    adjust_gap: f32,
}

impl Default for OverlapResolver {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl OverlapResolver {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            threshold_pct: config.overlap_threshold_pct,
            remove_pct: config.remove_threshold_pct,
            similar_delta: config.similar_confidence_delta,
            adjust_gap: config.adjust_gap,
        }
    }

    /// Annotate every overlapping field with a resolution.
    ///
    /// Invalid fields are passed through untouched. Field order is preserved.
    pub fn resolve(&self, mut fields: Vec<PositionedField>) -> Vec<PositionedField> {
        let mut conflicts = 0usize;

        for i in 0..fields.len() {
            for j in (i + 1)..fields.len() {
                let (a, b) = (&fields[i], &fields[j]);
                if a.page_number != b.page_number || a.is_invalid() || b.is_invalid() {
                    continue;
                }
                let pct = a.bbox.overlap_pct(&b.bbox);
                if pct < self.threshold_pct {
                    continue;
                }

                let (res_a, res_b) = self.decide(a, b, pct);
                tracing::debug!(
                    page = a.page_number,
                    first = %a.name,
                    second = %b.name,
                    overlap_pct = pct,
                    first_action = res_a.action.as_str(),
                    second_action = res_b.action.as_str(),
                    "Overlapping fields"
                );
                conflicts += 1;

                fields[i].has_overlap = true;
                fields[j].has_overlap = true;
                assign(&mut fields[i].resolution, res_a);
                assign(&mut fields[j].resolution, res_b);
            }
        }

        if conflicts > 0 {
            tracing::info!(conflicts, "Overlap resolution complete");
        }
        fields
    }

    fn decide(
        &self,
        a: &PositionedField,
        b: &PositionedField,
        pct: f32,
    ) -> (Resolution, Resolution) {
        let gap = (a.confidence - b.confidence).abs();

        if gap < self.similar_delta - GAP_EPSILON {
            return match (a.required, b.required) {
                (true, false) => (
                    keep("required field, similar confidence"),
                    self.adjust(b, a, "optional field yields to required"),
                ),
                (false, true) => (
                    self.adjust(a, b, "optional field yields to required"),
                    keep("required field, similar confidence"),
                ),
                _ => (flag(), flag()),
            };
        }

        let a_stronger = a.confidence > b.confidence;
        let (strong, weak) = if a_stronger { (a, b) } else { (b, a) };

        let (strong_res, weak_res) = if weak.required && !strong.required {
            (
                self.adjust(strong, weak, "optional field yields to required"),
                keep("required field"),
            )
        } else if pct > self.remove_pct {
            (
                keep("higher confidence"),
                Resolution {
                    action: ResolutionAction::Remove,
                    reason: format!("near-total overlap ({pct:.0}%) with higher-confidence field"),
                    adjusted_box: None,
                },
            )
        } else {
            (
                keep("higher confidence"),
                self.adjust(weak, strong, "lower confidence"),
            )
        };

        if a_stronger {
            (strong_res, weak_res)
        } else {
            (weak_res, strong_res)
        }
    }

    fn adjust(&self, moving: &PositionedField, blocking: &PositionedField, reason: &str) -> Resolution {
        Resolution {
            action: ResolutionAction::Adjust,
            reason: reason.to_string(),
            adjusted_box: Some(self.adjusted_position(&moving.bbox, &blocking.bbox)),
        }
    }

    /// Push `moving` straight below `blocking`, keeping its x and size.
    pub fn adjusted_position(&self, moving: &BoundingBox, blocking: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            moving.x,
            blocking.y + blocking.height + self.adjust_gap,
            moving.width,
            moving.height,
        )
    }
}

fn keep(reason: &str) -> Resolution {
    Resolution {
        action: ResolutionAction::Keep,
        reason: reason.to_string(),
        adjusted_box: None,
    }
}

fn flag() -> Resolution {
    Resolution {
        action: ResolutionAction::Flag,
        reason: "similar confidence, manual review".to_string(),
        adjusted_box: None,
    }
}

/// Set only when unset, or when replacing a provisional keep.
///
/// Strict set-once would let two identical boxes both survive when the
/// keeper of one pair is the loser of another, so a `Keep` stays open to a
/// later `Adjust`, `Remove` or `Flag`. Non-keep decisions are final.
fn assign(slot: &mut Option<Resolution>, next: Resolution) {
    let replace = match slot {
        None => true,
        Some(current) => {
            current.action == ResolutionAction::Keep && next.action != ResolutionAction::Keep
        }
    };
    if replace {
        *slot = Some(next);
    }
}
