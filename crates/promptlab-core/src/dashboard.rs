//! Assembly of every dashboard section from the dataset and the user's
//! selections. Building is a pure function of its inputs; renderers only
//! format what ends up in [`Dashboard`].

use crate::aggregate::{config_aggregates, group_mean, ConfigAggregate, GroupMean, Kpis};
use crate::dataset::Dataset;
use crate::efficiency::EfficiencyTable;
use crate::estimators_api::{run_all, EstimateOutcome, Estimator};
use crate::model::{Factor, FactorConfig, Outcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// User selections driving the selection-dependent sections.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardParams {
    /// Metric shown in the interaction heatmap.
    pub metric: Outcome,
    /// Draw configuration tags next to frontier points.
    pub show_labels: bool,
    /// Exact configuration for the drill-down KPIs.
    pub selection: FactorConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SelectedPerformance {
    Observed { config: FactorConfig, kpis: Kpis },
    NoData { config: FactorConfig },
}

impl SelectedPerformance {
    pub fn compute(data: &Dataset, config: FactorConfig) -> Self {
        match Kpis::from_trials(&data.select(&config)) {
            Some(kpis) => SelectedPerformance::Observed { config, kpis },
            None => SelectedPerformance::NoData { config },
        }
    }

    pub fn kpis(&self) -> Option<&Kpis> {
        match self {
            SelectedPerformance::Observed { kpis, .. } => Some(kpis),
            SelectedPerformance::NoData { .. } => None,
        }
    }
}

/// 2x2 grid of the chosen metric by (cot, fewshot); unobserved cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub metric: Outcome,
    /// `cells[cot][fewshot]`
    pub cells: [[Option<f64>; 2]; 2],
}

impl Heatmap {
    pub fn compute(data: &Dataset, metric: Outcome) -> Self {
        let mut cells = [[None; 2]; 2];
        for g in group_mean(&data.all(), &[Factor::Cot, Factor::Fewshot], metric) {
            let cot = usize::from(g.level(Factor::Cot).unwrap_or(false));
            let few = usize::from(g.level(Factor::Fewshot).unwrap_or(false));
            cells[cot][few] = Some(g.mean);
        }
        Self { metric, cells }
    }

    pub fn cell(&self, cot: bool, fewshot: bool) -> Option<f64> {
        self.cells[usize::from(cot)][usize::from(fewshot)]
    }

    /// Range of observed values, for colour scaling.
    pub fn range(&self) -> Option<(f64, f64)> {
        let vals: Vec<f64> = self.cells.iter().flatten().flatten().copied().collect();
        let min = vals.iter().copied().reduce(f64::min)?;
        let max = vals.iter().copied().reduce(f64::max)?;
        Some((min, max))
    }
}

/// Sections that depend only on the data, not on the selections.
#[derive(Debug, Clone, Serialize)]
pub struct StaticSections {
    pub overall: Option<Kpis>,
    pub cot_effect: Vec<GroupMean>,
    pub frontier: Vec<ConfigAggregate>,
    pub efficiency: EfficiencyTable,
    pub estimates: Vec<EstimateOutcome>,
}

impl StaticSections {
    pub fn compute(data: &Dataset, estimators: &[Arc<dyn Estimator>]) -> Self {
        let all = data.all();
        Self {
            overall: Kpis::from_trials(&all),
            cot_effect: group_mean(&all, &[Factor::Cot], Outcome::Correct),
            frontier: config_aggregates(&all),
            efficiency: EfficiencyTable::from_trials(&all),
            estimates: run_all(estimators, data),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub title: &'static str,
    pub params: DashboardParams,
    pub rows: usize,
    pub questions: usize,
    pub fingerprint: String,
    #[serde(flatten)]
    pub sections: StaticSections,
    pub selected: SelectedPerformance,
    pub heatmap: Heatmap,
    pub documentation: &'static str,
}

impl Dashboard {
    pub fn build(
        data: &Dataset,
        params: &DashboardParams,
        estimators: &[Arc<dyn Estimator>],
    ) -> Self {
        Self::with_sections(data, params, StaticSections::compute(data, estimators))
    }

    /// Rebuilds only the selection-dependent sections on top of precomputed
    /// static ones.
    pub fn with_sections(data: &Dataset, params: &DashboardParams, sections: StaticSections) -> Self {
        let dash = Self {
            title: crate::docs::TITLE,
            params: *params,
            rows: data.len(),
            questions: data.question_count(),
            fingerprint: data.fingerprint.clone(),
            sections,
            selected: SelectedPerformance::compute(data, params.selection),
            heatmap: Heatmap::compute(data, params.metric),
            documentation: crate::docs::DOCUMENTATION,
        };
        tracing::debug!(
            event = "dashboard_built",
            metric = %params.metric,
            selection = %params.selection,
            rows = dash.rows,
            has_selection_data = dash.selected.kpis().is_some(),
        );
        dash
    }
}
