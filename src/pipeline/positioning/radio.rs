//! Radio Group Detector: merge aligned, adjacent checkboxes into one choice.
//!
//! Two checkboxes on the same page are linked when they share a row (tops or
//! centres within the alignment tolerance) and the horizontal edge gap is
//! within the proximity limit, or share a column and the vertical gap is
//! within it. Groups are the connected components of that relation.

use super::geometry::BoundingBox;
use super::naming::dedupe_strings;
use super::types::{
    Direction, FinalField, InputType, Orientation, PositionedField, RadioGroupField,
};
use crate::config::EngineConfig;

/// Disjoint sets over dense indices, with path compression.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy)]
pub struct RadioGroupDetector {
    alignment_tolerance: f32,
    proximity: f32,
}

impl Default for RadioGroupDetector {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl RadioGroupDetector {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            alignment_tolerance: config.radio_alignment_tolerance,
            proximity: config.radio_proximity,
        }
    }

    /// Group checkboxes; everything else passes through as `Single`.
    ///
    /// A group takes the slot of its first member in input order.
    pub fn detect_groups(&self, fields: Vec<PositionedField>) -> Vec<FinalField> {
        let candidates: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.input_type == InputType::Checkbox)
            .map(|(i, _)| i)
            .collect();

        let mut sets = UnionFind::new(fields.len());
        let mut links: Vec<(usize, usize, Link)> = Vec::new();
        for (n, &i) in candidates.iter().enumerate() {
            for &j in &candidates[n + 1..] {
                if let Some(link) = self.link(&fields[i], &fields[j]) {
                    sets.union(i, j);
                    links.push((i, j, link));
                }
            }
        }

        let roots: Vec<usize> = (0..fields.len()).map(|i| sets.find(i)).collect();
        let mut members_of: Vec<Vec<usize>> = vec![Vec::new(); fields.len()];
        for (i, &root) in roots.iter().enumerate() {
            members_of[root].push(i);
        }

        let mut slots: Vec<Option<PositionedField>> = fields.into_iter().map(Some).collect();
        let mut out = Vec::with_capacity(slots.len());
        let mut groups = 0usize;

        for i in 0..slots.len() {
            let root = roots[i];
            let members = &members_of[root];
            if members.len() < 2 {
                if let Some(field) = slots[i].take() {
                    out.push(FinalField::Single(field));
                }
                continue;
            }
            if members[0] != i {
                continue;
            }

            let (row_links, column_links) = links
                .iter()
                .filter(|(a, _, _)| roots[*a] == root)
                .fold((0usize, 0usize), |(r, c), (_, _, link)| match link {
                    Link::Row => (r + 1, c),
                    Link::Column => (r, c + 1),
                });
            let orientation = if row_links >= column_links {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };

            let group_members: Vec<PositionedField> =
                members.iter().filter_map(|&m| slots[m].take()).collect();
            let group = build_group(group_members, orientation);
            tracing::debug!(
                page = group.page_number,
                name = %group.name,
                options = group.options.len(),
                orientation = ?group.orientation,
                "Radio group detected"
            );
            groups += 1;
            out.push(FinalField::RadioGroup(group));
        }

        if groups > 0 {
            tracing::info!(groups, "Checkboxes merged into radio groups");
        }
        out
    }

    fn link(&self, a: &PositionedField, b: &PositionedField) -> Option<Link> {
        if a.page_number != b.page_number {
            return None;
        }
        let (ba, bb) = (&a.bbox, &b.bbox);
        let tol = self.alignment_tolerance;

        let row_aligned =
            (ba.y - bb.y).abs() <= tol || (ba.center_y() - bb.center_y()).abs() <= tol;
        if row_aligned && horizontal_gap(ba, bb) <= self.proximity {
            return Some(Link::Row);
        }
        let column_aligned =
            (ba.x - bb.x).abs() <= tol || (ba.center_x() - bb.center_x()).abs() <= tol;
        if column_aligned && vertical_gap(ba, bb) <= self.proximity {
            return Some(Link::Column);
        }
        None
    }
}

fn horizontal_gap(a: &BoundingBox, b: &BoundingBox) -> f32 {
    (a.x.max(b.x) - a.right().min(b.right())).max(0.0)
}

fn vertical_gap(a: &BoundingBox, b: &BoundingBox) -> f32 {
    (a.y.max(b.y) - a.bottom().min(b.bottom())).max(0.0)
}

fn build_group(mut members: Vec<PositionedField>, orientation: Orientation) -> RadioGroupField {
    let direction = if members.iter().any(|m| m.direction == Direction::Rtl) {
        Direction::Rtl
    } else {
        Direction::Ltr
    };

    match (orientation, direction) {
        (Orientation::Horizontal, Direction::Rtl) => {
            members.sort_by(|a, b| b.bbox.x.total_cmp(&a.bbox.x))
        }
        (Orientation::Horizontal, Direction::Ltr) => {
            members.sort_by(|a, b| a.bbox.x.total_cmp(&b.bbox.x))
        }
        (Orientation::Vertical, _) => members.sort_by(|a, b| a.bbox.y.total_cmp(&b.bbox.y)),
    }

    let mut options: Vec<String> = members.iter().map(|m| m.name.clone()).collect();
    dedupe_strings(&mut options);

    let bbox = members
        .iter()
        .skip(1)
        .fold(members[0].bbox, |acc, m| acc.union(&m.bbox));
    let label = members
        .iter()
        .map(|m| m.label.as_str())
        .collect::<Vec<_>>()
        .join(" / ");
    let confidence = members
        .iter()
        .map(|m| m.confidence)
        .fold(f32::INFINITY, f32::min);

    RadioGroupField {
        name: format!("{}_group", options[0]),
        label,
        options,
        orientation,
        bbox,
        page_number: members[0].page_number,
        direction,
        required: members.iter().any(|m| m.required),
        confidence,
        section_name: members[0].section_name.clone(),
        members,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::positioning::types::{FieldType, Provenance, ValidationStatus, WidgetKind};

    fn checkbox(name: &str, x: f32, y: f32) -> PositionedField {
        field(name, InputType::Checkbox, x, y, 10.0)
    }

    fn field(name: &str, input_type: InputType, x: f32, y: f32, size: f32) -> PositionedField {
        PositionedField {
            input_type,
            name: name.to_string(),
            label: name.to_string(),
            bbox: BoundingBox::new(x, y, size, size),
            page_number: 1,
            direction: Direction::Rtl,
            required: false,
            confidence: 0.9,
            section_name: None,
            provenance: Provenance {
                matched_text: name.to_string(),
                match_score: 1.0,
                label_box: BoundingBox::new(x + size + 5.0, y, 20.0, size),
                field_type: FieldType::SelectionMark,
            },
            validation_status: Some(ValidationStatus::Valid),
            original_box: None,
            has_overlap: false,
            resolution: None,
        }
    }

    fn only_group(out: &[FinalField]) -> &RadioGroupField {
        match out {
            [FinalField::RadioGroup(g)] => g,
            other => panic!("expected one radio group, got {other:?}"),
        }
    }

    #[test]
    fn three_in_a_row_form_one_group() {
        let out = RadioGroupDetector::default().detect_groups(vec![
            checkbox("זכר", 100.0, 200.0),
            checkbox("נקבה", 120.0, 200.0),
            checkbox("אחר", 140.0, 200.0),
        ]);
        let g = only_group(&out);
        assert_eq!(g.orientation, Orientation::Horizontal);
        assert_eq!(g.options, vec!["אחר", "נקבה", "זכר"]);
        assert_eq!(g.name, "אחר_group");
        assert_eq!(g.bbox, BoundingBox::new(100.0, 200.0, 50.0, 10.0));
        assert_eq!(out[0].widget_kind(), WidgetKind::Radio);
    }

    #[test]
    fn ltr_row_ordered_left_to_right() {
        let mut boxes = vec![
            checkbox("yes", 140.0, 200.0),
            checkbox("no", 100.0, 200.0),
        ];
        for b in &mut boxes {
            b.direction = Direction::Ltr;
        }
        let out = RadioGroupDetector::default().detect_groups(boxes);
        assert_eq!(only_group(&out).options, vec!["no", "yes"]);
    }

    #[test]
    fn column_forms_vertical_group() {
        let out = RadioGroupDetector::default().detect_groups(vec![
            checkbox("ג", 300.0, 160.0),
            checkbox("א", 300.0, 100.0),
            checkbox("ב", 302.0, 130.0),
        ]);
        let g = only_group(&out);
        assert_eq!(g.orientation, Orientation::Vertical);
        assert_eq!(g.options, vec!["א", "ב", "ג"]);
    }

    #[test]
    fn clustering_is_transitive() {
        // first and last are 70pt apart, linked through the middle
        let out = RadioGroupDetector::default().detect_groups(vec![
            checkbox("a", 100.0, 200.0),
            checkbox("b", 130.0, 200.0),
            checkbox("c", 160.0, 200.0),
        ]);
        assert_eq!(only_group(&out).members.len(), 3);
    }

    #[test]
    fn distant_checkboxes_stay_single() {
        let out = RadioGroupDetector::default().detect_groups(vec![
            checkbox("a", 100.0, 200.0),
            checkbox("b", 300.0, 200.0),
        ]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|f| matches!(f, FinalField::Single(_))));
        assert_eq!(out[0].widget_kind(), WidgetKind::Checkbox);
    }

    #[test]
    fn text_fields_never_grouped() {
        let out = RadioGroupDetector::default().detect_groups(vec![
            field("a", InputType::Text, 100.0, 200.0, 10.0),
            field("b", InputType::Text, 120.0, 200.0, 10.0),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn pages_do_not_mix() {
        let mut b = checkbox("b", 120.0, 200.0);
        b.page_number = 2;
        let out = RadioGroupDetector::default().detect_groups(vec![checkbox("a", 100.0, 200.0), b]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn group_keeps_first_member_slot() {
        let out = RadioGroupDetector::default().detect_groups(vec![
            field("name", InputType::Text, 300.0, 50.0, 14.0),
            checkbox("yes", 100.0, 200.0),
            field("city", InputType::Text, 300.0, 80.0, 14.0),
            checkbox("no", 120.0, 200.0),
        ]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].name(), "name");
        assert!(matches!(out[1], FinalField::RadioGroup(_)));
        assert_eq!(out[2].name(), "city");
    }

    #[test]
    fn group_aggregates_members() {
        let mut a = checkbox("כן", 100.0, 200.0);
        a.required = true;
        a.confidence = 0.75;
        let out = RadioGroupDetector::default().detect_groups(vec![a, checkbox("לא", 120.0, 200.0)]);
        let g = only_group(&out);
        assert!(g.required);
        assert_eq!(g.confidence, 0.75);
        assert_eq!(g.label, "לא / כן");
    }

    #[test]
    fn duplicate_option_names_deduped() {
        let out = RadioGroupDetector::default().detect_groups(vec![
            checkbox("opt", 100.0, 200.0),
            checkbox("opt", 120.0, 200.0),
        ]);
        assert_eq!(only_group(&out).options, vec!["opt", "opt_2"]);
    }
}
