//! Region summary message building.

use serde::Serialize;

use linkwatch_core::codes::format_batch_seq;
use linkwatch_monitor::RegionBatchReport;

/// Marker line included when a region has zero broken items.
pub const ALL_CLEAR: &str = "all variant links healthy";

/// One group section of the summary: broken items under their group name.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSection {
    pub group_name: String,
    /// `code (brand)` lines.
    pub items: Vec<String>,
}

/// The message sent to a region's webhook after each batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub batch_seq: i64,
    /// Zero-padded display form of the batch sequence.
    pub batch: String,
    pub total: usize,
    pub broken_count: usize,
    pub error_count: usize,
    pub all_clear: bool,
    pub groups: Vec<GroupSection>,
    /// Human-readable rendering of the fields above.
    pub text: String,
}

impl RegionSummary {
    /// Build the summary for one region batch report.
    pub fn from_report(report: &RegionBatchReport) -> Self {
        // Group broken items under their variant-group name, preserving
        // first-seen order.
        let mut groups: Vec<GroupSection> = Vec::new();
        for item in &report.broken_items {
            let line = format!("{} ({})", item.code, item.brand);
            match groups.iter_mut().find(|g| g.group_name == item.group_name) {
                Some(section) => section.items.push(line),
                None => groups.push(GroupSection {
                    group_name: item.group_name.clone(),
                    items: vec![line],
                }),
            }
        }

        let mut summary = Self {
            region: report.region.clone(),
            batch_seq: report.batch_seq,
            batch: format_batch_seq(report.batch_seq),
            total: report.total,
            broken_count: report.broken_items.len(),
            error_count: report.error_count,
            all_clear: report.broken_items.is_empty(),
            groups,
            text: String::new(),
        };
        summary.text = summary.render_text();
        summary
    }

    /// Render the human-readable message body.
    fn render_text(&self) -> String {
        let mut text = format!(
            "[linkwatch] Region {} — batch {}\n",
            self.region, self.batch
        );

        if self.all_clear {
            text.push_str(&format!("Checked {} items: {ALL_CLEAR}\n", self.total));
        } else {
            text.push_str(&format!(
                "Checked {} items: {} broken\n",
                self.total, self.broken_count
            ));
            for section in &self.groups {
                text.push_str(&format!("Group \"{}\":\n", section.group_name));
                for line in &section.items {
                    text.push_str(&format!("  - {line}\n"));
                }
            }
        }

        if self.error_count > 0 {
            text.push_str(&format!(
                "{} checks failed to execute and were recorded as broken\n",
                self.error_count
            ));
        }

        text
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use linkwatch_monitor::BrokenItem;

    use super::*;

    fn report(broken: Vec<BrokenItem>) -> RegionBatchReport {
        RegionBatchReport {
            region: "US".to_string(),
            batch_seq: 42,
            total: 25,
            broken_items: broken,
            error_count: 0,
            elapsed: Default::default(),
        }
    }

    fn broken(code: &str, brand: &str, group: &str) -> BrokenItem {
        BrokenItem {
            code: code.to_string(),
            brand: brand.to_string(),
            group_name: group.to_string(),
        }
    }

    #[test]
    fn all_clear_message_when_nothing_broken() {
        let summary = RegionSummary::from_report(&report(vec![]));

        assert!(summary.all_clear);
        assert_eq!(summary.broken_count, 0);
        assert!(summary.text.contains(ALL_CLEAR));
        assert!(summary.text.contains("batch 00000042"));
    }

    #[test]
    fn broken_items_are_grouped_by_group_name() {
        let summary = RegionSummary::from_report(&report(vec![
            broken("B0BROKEN001", "Acme", "Shirts"),
            broken("B0BROKEN002", "Acme", "Pants"),
            broken("B0BROKEN003", "Zenith", "Shirts"),
        ]));

        assert!(!summary.all_clear);
        assert_eq!(summary.broken_count, 3);
        assert_eq!(summary.groups.len(), 2);
        assert_eq!(summary.groups[0].group_name, "Shirts");
        assert_eq!(
            summary.groups[0].items,
            vec!["B0BROKEN001 (Acme)", "B0BROKEN003 (Zenith)"]
        );
        assert_eq!(summary.groups[1].group_name, "Pants");
    }

    #[test]
    fn text_lists_code_and_brand() {
        let summary =
            RegionSummary::from_report(&report(vec![broken("B0BROKEN001", "Acme", "Shirts")]));

        assert!(summary.text.contains("Checked 25 items: 1 broken"));
        assert!(summary.text.contains("Group \"Shirts\""));
        assert!(summary.text.contains("B0BROKEN001 (Acme)"));
    }

    #[test]
    fn execution_failures_are_called_out() {
        let mut r = report(vec![broken("B0BROKEN001", "Acme", "Shirts")]);
        r.error_count = 2;
        let summary = RegionSummary::from_report(&r);

        assert!(summary.text.contains("2 checks failed to execute"));
    }
}
