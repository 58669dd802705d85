//! Tab Order Calculator: keyboard navigation order for final fields.
//!
//! Keys, in order: page ascending; section (Hebrew collation) when both
//! fields have one; top ascending once tops differ by more than the row
//! tolerance; within a row, rightmost first for RTL forms and leftmost
//! first for LTR.
//!
//! Row tolerance makes the comparator non-transitive (a chain of rows each
//! 8pt apart), so fields are presorted by a total key and then settled with
//! a stable insertion pass using the full comparator.

use std::cmp::Ordering;

use super::matcher::strip_nikud;
use super::types::{Direction, FieldWithTabOrder, FinalField};
use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy)]
pub struct TabOrderCalculator {
    row_tolerance: f32,
    direction: Direction,
}

impl Default for TabOrderCalculator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl TabOrderCalculator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            row_tolerance: config.row_tolerance,
            direction: config.direction,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sort and assign `tab_index` 1..=N.
    pub fn order(&self, mut fields: Vec<FinalField>) -> Vec<FieldWithTabOrder> {
        fields.sort_by(|a, b| {
            a.page_number()
                .cmp(&b.page_number())
                .then_with(|| a.bbox().y.total_cmp(&b.bbox().y))
        });

        for i in 1..fields.len() {
            let mut j = i;
            while j > 0 && self.compare(&fields[j - 1], &fields[j]) == Ordering::Greater {
                fields.swap(j - 1, j);
                j -= 1;
            }
        }

        tracing::debug!(
            fields = fields.len(),
            direction = self.direction.as_str(),
            "Tab order assigned"
        );

        fields
            .into_iter()
            .enumerate()
            .map(|(i, field)| FieldWithTabOrder {
                field,
                tab_index: (i + 1) as u32,
            })
            .collect()
    }

    pub fn compare(&self, a: &FinalField, b: &FinalField) -> Ordering {
        let page = a.page_number().cmp(&b.page_number());
        if page != Ordering::Equal {
            return page;
        }

        if let (Some(sa), Some(sb)) = (a.section_name(), b.section_name()) {
            let section = compare_hebrew(sa, sb);
            if section != Ordering::Equal {
                return section;
            }
        }

        let (ba, bb) = (a.bbox(), b.bbox());
        if (ba.y - bb.y).abs() > self.row_tolerance {
            return ba.y.total_cmp(&bb.y);
        }

        match self.direction {
            Direction::Rtl => bb.x.total_cmp(&ba.x),
            Direction::Ltr => ba.x.total_cmp(&bb.x),
        }
    }
}

/// Compare Hebrew strings ignoring nikud and final-letter forms;
/// ties fall back to plain code-point order.
pub fn compare_hebrew(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(s: &str) -> String {
    strip_nikud(s)
        .chars()
        .map(|c| match c {
            'ך' => 'כ',
            'ם' => 'מ',
            'ן' => 'נ',
            'ף' => 'פ',
            'ץ' => 'צ',
            other => other,
        })
        .collect()
}
