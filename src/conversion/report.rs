use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;

/// Everything that went wrong without stopping the conversion, plus a few counters.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ConversionReport {
    pub warnings: Vec<String>,
    /// Type tag -> how many components or assets carried it.
    pub skipped_types: BTreeMap<String, usize>,
    pub timed_out_assets: Vec<String>,
    pub failed_optional_assets: Vec<String>,
    pub nodes: usize,
    pub components: usize,
    pub assets: usize,
    pub deduplicated_assets: usize,
    pub deferred_work: usize,
}

impl ConversionReport {
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn skipped_type(&mut self, tag: &str) {
        warn!("No builder for type {}, skipping it", tag);
        *self.skipped_types.entry(tag.to_string()).or_default() += 1;
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty() || !self.skipped_types.is_empty() || !self.timed_out_assets.is_empty()
    }

    pub fn summary(&self) -> String {
        let skipped: usize = self.skipped_types.values().sum();
        format!(
            "Converted {} nodes, {} components and {} assets ({} shared), {} deferred steps; {} warnings, {} skipped, {} timed out",
            self.nodes,
            self.components,
            self.assets,
            self.deduplicated_assets,
            self.deferred_work,
            self.warnings.len(),
            skipped,
            self.timed_out_assets.len()
        )
    }
}
