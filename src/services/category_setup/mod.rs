//! Idempotent creation of a model's category tree.

pub mod hierarchy;

use std::fmt::Write as _;

use metrics::counter;
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::TeslaModel,
    services::{
        catalog_import::naming_convention,
        categories::{CategoryService, CreateOutcome, NewCategory, SortOrderSequence},
    },
};

use self::hierarchy::{builtin_hierarchy, CategoryDefinition, HierarchyDefinition};

/// Result of one setup run.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetupReport {
    pub success: bool,
    pub model: TeslaModel,
    pub total_created: usize,
    pub total_skipped: usize,
    pub errors: Vec<String>,
    /// Indented tree summary, one line per category.
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeStatus {
    Created,
    Existing,
    Failed,
}

impl NodeStatus {
    fn marker(self) -> &'static str {
        match self {
            NodeStatus::Created => "[created]",
            NodeStatus::Existing => "[exists] ",
            NodeStatus::Failed => "[failed] ",
        }
    }
}

#[derive(Debug, Default)]
struct SetupProgress {
    created: usize,
    skipped: usize,
    errors: Vec<String>,
    lines: Vec<String>,
}

impl SetupProgress {
    fn record(&mut self, depth: usize, name: &str, status: NodeStatus) {
        match status {
            NodeStatus::Created => self.created += 1,
            NodeStatus::Existing => self.skipped += 1,
            NodeStatus::Failed => {}
        }
        self.lines
            .push(format!("{}{} {}", "  ".repeat(depth), status.marker(), name));
    }

    fn into_report(self, model: TeslaModel) -> SetupReport {
        let mut message = format!(
            "Category setup for {}: {} created, {} skipped, {} failed",
            model.display_name(),
            self.created,
            self.skipped,
            self.errors.len()
        );
        for line in &self.lines {
            let _ = write!(message, "\n{line}");
        }

        SetupReport {
            success: self.errors.is_empty(),
            model,
            total_created: self.created,
            total_skipped: self.skipped,
            errors: self.errors,
            message,
        }
    }
}

/// Materializes category hierarchies in the store.
#[derive(Clone)]
pub struct CategorySetupService {
    categories: CategoryService,
}

impl CategorySetupService {
    pub fn new(categories: CategoryService) -> Self {
        Self { categories }
    }

    /// Creates every missing category of the hierarchy for `model`.
    ///
    /// Existing categories (matched by name or slug) are reused and counted
    /// as skipped. A node that fails is reported and its subtree is not
    /// attempted; the rest of the run continues.
    #[instrument(skip(self, hierarchy), fields(custom = hierarchy.is_some()))]
    pub async fn setup(
        &self,
        model: TeslaModel,
        hierarchy: Option<HierarchyDefinition>,
    ) -> Result<SetupReport, ServiceError> {
        let hierarchy = match hierarchy {
            Some(custom) => custom,
            None => builtin_hierarchy(model).map(HierarchyDefinition::from).ok_or_else(|| {
                ServiceError::BadRequest(format!(
                    "No built-in category hierarchy for {model}; supply one in the request"
                ))
            })?,
        };

        let convention = naming_convention(model);
        let mut sequence = SortOrderSequence::starting_after(self.categories.max_sort_order().await?);
        let mut progress = SetupProgress::default();

        // Depth-first, parents before children.
        let mut pending: Vec<(&CategoryDefinition, Option<Uuid>, usize)> = hierarchy
            .roots
            .iter()
            .rev()
            .map(|root| (root, None, 0))
            .collect();

        while let Some((node, parent_id, depth)) = pending.pop() {
            let name = convention.canonicalize(&node.name);
            let request = NewCategory::new(name.clone())
                .description(node.description.clone())
                .parent(parent_id);

            match self.categories.create_if_absent(request, &mut sequence).await {
                Ok(outcome) => {
                    let status = match outcome {
                        CreateOutcome::Created(_) => NodeStatus::Created,
                        CreateOutcome::Existing(_) => NodeStatus::Existing,
                    };
                    progress.record(depth, &name, status);
                    let id = outcome.id();
                    pending.extend(
                        node.children
                            .iter()
                            .rev()
                            .map(|child| (child, Some(id), depth + 1)),
                    );
                }
                Err(err) => {
                    warn!(%name, error = %err, "Category creation failed; skipping its subtree");
                    progress.errors.push(format!("{name}: {err}"));
                    progress.record(depth, &name, NodeStatus::Failed);
                }
            }
        }

        counter!("category_setup.created", progress.created as u64);
        counter!("category_setup.skipped", progress.skipped as u64);

        let report = progress.into_report(model);
        info!(
            %model,
            created = report.total_created,
            skipped = report.total_skipped,
            failed = report.errors.len(),
            "Category setup finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_message_lists_nodes_indented() {
        let mut progress = SetupProgress::default();
        progress.record(0, "Model Y", NodeStatus::Existing);
        progress.record(1, "Model Y - 10 - BODY", NodeStatus::Created);
        progress.record(2, "Model Y - 1001 - Bumper and Fascia", NodeStatus::Created);
        progress.errors.push("Broken: boom".into());
        progress.record(1, "Broken", NodeStatus::Failed);

        let report = progress.into_report(TeslaModel::ModelY);
        assert!(!report.success);
        assert_eq!(report.total_created, 2);
        assert_eq!(report.total_skipped, 1);

        let lines: Vec<&str> = report.message.lines().collect();
        assert_eq!(
            lines[0],
            "Category setup for Model Y: 2 created, 1 skipped, 1 failed"
        );
        assert_eq!(lines[1], "[exists]  Model Y");
        assert_eq!(lines[2], "  [created] Model Y - 10 - BODY");
        assert_eq!(lines[3], "    [created] Model Y - 1001 - Bumper and Fascia");
        assert_eq!(lines[4], "  [failed]  Broken");
    }
}
