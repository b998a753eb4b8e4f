// Dataset session: the current snapshot plus the panels compiled against it.

use crate::compiler::Compiler;
use crate::data::DatasetTable;
use crate::descriptor::{QueryResponse, VisualizationDescriptor};
use crate::error::CompileError;
use crate::plan::ChartPlan;
use crate::profile::DatasetProfile;
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const MISSING_VARIABLES_NOTICE: &str = "Unable to create visualization: missing variables";

/// What a single descriptor turned into
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PanelOutcome {
    Chart { plan: ChartPlan },
    Fallback { message: String },
    MissingVariables { notice: String },
}

impl PanelOutcome {
    pub fn plan(&self) -> Option<&ChartPlan> {
        match self {
            PanelOutcome::Chart { plan } => Some(plan),
            _ => None,
        }
    }
}

impl From<Result<ChartPlan, CompileError>> for PanelOutcome {
    fn from(result: Result<ChartPlan, CompileError>) -> Self {
        match result {
            Ok(plan) => match plan.fallback_message() {
                Some(message) => PanelOutcome::Fallback { message: message.to_string() },
                None => PanelOutcome::Chart { plan },
            },
            Err(CompileError::InsufficientVariables { .. }) => PanelOutcome::MissingVariables {
                notice: MISSING_VARIABLES_NOTICE.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub description: String,
    #[serde(flatten)]
    pub outcome: PanelOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPanels {
    pub primary: Panel,
    pub alternatives: Vec<Panel>,
}

/// Holds one dataset snapshot at a time.
/// Plans compiled from an older snapshot stay valid; a load swaps the snapshot wholesale.
#[derive(Debug, Default)]
pub struct Session {
    compiler: Compiler,
    dataset: Option<Arc<DatasetTable>>,
    profile: Option<Arc<DatasetProfile>>,
}

impl Session {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler,
            dataset: None,
            profile: None,
        }
    }

    pub fn load(&mut self, table: DatasetTable, profile: Option<DatasetProfile>) {
        info!(rows = table.len(), profiled = profile.is_some(), "dataset loaded");
        self.dataset = Some(Arc::new(table));
        self.profile = profile.map(Arc::new);
    }

    /// Replace the dataset with whatever `fetch` returns.
    /// On failure the previous snapshot is kept and the error is returned.
    pub fn reload_with<F>(&mut self, fetch: F) -> Result<()>
    where
        F: FnOnce() -> Result<(DatasetTable, Option<DatasetProfile>)>,
    {
        match fetch() {
            Ok((table, profile)) => {
                self.load(table, profile);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "dataset reload failed, keeping previous snapshot");
                Err(e.context("Failed to reload dataset"))
            }
        }
    }

    pub fn snapshot(&self) -> Option<Arc<DatasetTable>> {
        self.dataset.clone()
    }

    pub fn profile(&self) -> Option<&DatasetProfile> {
        self.profile.as_deref()
    }

    fn require_dataset(&self) -> Result<&DatasetTable> {
        self.dataset
            .as_deref()
            .ok_or_else(|| anyhow!("No dataset loaded"))
    }

    pub fn compile_panel(&self, descriptor: &VisualizationDescriptor) -> Result<Panel> {
        let table = self.require_dataset()?;
        Ok(self.panel(table, descriptor))
    }

    fn panel(&self, table: &DatasetTable, descriptor: &VisualizationDescriptor) -> Panel {
        let result = self.compiler.compile(table, descriptor, self.profile());
        Panel {
            description: descriptor.description.clone(),
            outcome: result.into(),
        }
    }

    /// Compile every suggestion independently; output order matches input order
    pub fn compile_suggestions(&self, descriptors: &[VisualizationDescriptor]) -> Result<Vec<Panel>> {
        let table = self
            .require_dataset()
            .context("Cannot compile suggestions")?;
        let panels: Vec<Panel> = descriptors.par_iter().map(|d| self.panel(table, d)).collect();
        info!(panels = panels.len(), "compiled suggestions");
        Ok(panels)
    }

    pub fn compile_query(&self, response: &QueryResponse) -> Result<QueryPanels> {
        let table = self.require_dataset().context("Cannot compile query")?;
        let primary = self.panel(table, &response.primary_visualization);
        let alternatives = response
            .alternative_visualizations
            .par_iter()
            .map(|d| self.panel(table, d))
            .collect();
        Ok(QueryPanels { primary, alternatives })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DatasetRow;

    fn make_table() -> DatasetTable {
        DatasetTable::new(vec![
            DatasetRow::new().with("region", "A").with("sales", 10.0),
            DatasetRow::new().with("region", "B").with("sales", 20.0),
        ])
    }

    fn loaded_session() -> Session {
        let mut session = Session::default();
        session.load(make_table(), None);
        session
    }

    #[test]
    fn test_compile_without_dataset_fails() {
        let session = Session::default();
        let descriptors = vec![VisualizationDescriptor::new("bar", ["region", "sales"])];
        assert!(session.compile_suggestions(&descriptors).is_err());
        assert!(session.compile_panel(&descriptors[0]).is_err());
    }

    #[test]
    fn test_panel_outcomes_in_order() {
        let session = loaded_session();
        let descriptors = vec![
            VisualizationDescriptor::new("bar", ["region", "sales"]).with_description("Sales"),
            VisualizationDescriptor::new("sankey", ["region"]),
            VisualizationDescriptor::new("pie", Vec::<String>::new()),
        ];
        let panels = session.compile_suggestions(&descriptors).unwrap();
        assert_eq!(panels.len(), 3);
        assert_eq!(panels[0].description, "Sales");
        assert!(panels[0].outcome.plan().is_some());
        assert_eq!(
            panels[1].outcome,
            PanelOutcome::Fallback { message: "Unsupported chart type: sankey".to_string() }
        );
        assert_eq!(
            panels[2].outcome,
            PanelOutcome::MissingVariables { notice: MISSING_VARIABLES_NOTICE.to_string() }
        );
    }

    #[test]
    fn test_query_panels() {
        let session = loaded_session();
        let response = QueryResponse {
            primary_visualization: VisualizationDescriptor::new("pie", ["region"]),
            alternative_visualizations: vec![
                VisualizationDescriptor::new("bar", ["region", "sales"]),
                VisualizationDescriptor::new("box", ["sales"]),
            ],
        };
        let panels = session.compile_query(&response).unwrap();
        assert!(panels.primary.outcome.plan().is_some());
        assert_eq!(panels.alternatives.len(), 2);

        let single = session.compile_panel(&response.primary_visualization).unwrap();
        assert_eq!(single, panels.primary);
    }

    #[test]
    fn test_failed_reload_keeps_snapshot() {
        let mut session = loaded_session();
        let before = session.snapshot().unwrap();

        let result = session.reload_with(|| Err(anyhow!("upstream unavailable")));
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &session.snapshot().unwrap()));

        session
            .reload_with(|| Ok((DatasetTable::default(), None)))
            .unwrap();
        assert!(session.snapshot().unwrap().is_empty());
        // The old snapshot is still usable by whoever held it
        assert_eq!(before.len(), 2);
    }
}
