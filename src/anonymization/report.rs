//! Detection reporting
//!
//! Summarises a detection pass for the `detect` command: how many entities of
//! each type were found, where, and how confident the detector was. Original
//! values are never included.

use crate::anonymization::models::{DetectionMethod, Entity, EntityType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one detection pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Pattern library version used
    pub pattern_version: String,

    /// Input length in bytes
    pub input_bytes: usize,

    /// Total entities after overlap resolution
    pub total_entities: usize,

    /// Entities per type
    pub entities_by_type: BTreeMap<EntityType, usize>,

    /// Mean confidence score, 0.0 when nothing was found
    pub average_score: f32,

    /// Detected spans in offset order
    pub spans: Vec<SpanSummary>,
}

/// Position and confidence of one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanSummary {
    pub entity_type: EntityType,
    pub begin: usize,
    pub end: usize,
    pub score: f32,
    pub method: DetectionMethod,
}

impl DetectionReport {
    /// Build a report from the final entity list
    pub fn new(pattern_version: impl Into<String>, input: &str, entities: &[Entity]) -> Self {
        let mut entities_by_type = BTreeMap::new();
        for entity in entities {
            *entities_by_type.entry(entity.entity_type).or_insert(0) += 1;
        }

        let average_score = if entities.is_empty() {
            0.0
        } else {
            entities.iter().map(|e| e.score).sum::<f32>() / entities.len() as f32
        };

        Self {
            pattern_version: pattern_version.into(),
            input_bytes: input.len(),
            total_entities: entities.len(),
            entities_by_type,
            average_score,
            spans: entities
                .iter()
                .map(|e| SpanSummary {
                    entity_type: e.entity_type,
                    begin: e.begin,
                    end: e.end,
                    score: e.score,
                    method: e.method,
                })
                .collect(),
        }
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let rule = "───────────────────────────────────────────────────────────────\n";
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                     PHI DETECTION REPORT                      \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n\n");

        output.push_str("SUMMARY\n");
        output.push_str(rule);
        output.push_str(&format!("  Pattern Library:   {}\n", self.pattern_version));
        output.push_str(&format!("  Input Size:        {} bytes\n", self.input_bytes));
        output.push_str(&format!("  Entities Detected: {}\n", self.total_entities));
        output.push_str(&format!(
            "  Average Score:     {:.2}\n\n",
            self.average_score
        ));

        if !self.entities_by_type.is_empty() {
            output.push_str("ENTITIES BY TYPE\n");
            output.push_str(rule);
            let mut by_count: Vec<_> = self.entities_by_type.iter().collect();
            by_count.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (entity_type, count) in by_count {
                output.push_str(&format!("  {:30} {:>5}\n", entity_type.label(), count));
            }
            output.push('\n');

            output.push_str("SPANS\n");
            output.push_str(rule);
            for span in &self.spans {
                output.push_str(&format!(
                    "  [{:>6}, {:>6})  {:22} {:.2}\n",
                    span.begin,
                    span.end,
                    span.entity_type.label(),
                    span.score
                ));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
