use crate::dataset::Dataset;
use serde::Serialize;

/// A statistical estimate computed over the full dataset.
pub trait Estimator: Send + Sync {
    fn name(&self) -> &'static str;

    fn estimate(&self, data: &Dataset) -> anyhow::Result<Estimate>;
}

/// A named scalar; `None` marks an undefined value (e.g. an empty subgroup).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateValue {
    pub label: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub estimator: String,
    pub title: String,
    /// Headline values shown next to the title.
    pub values: Vec<EstimateValue>,
    /// Preformatted text block (e.g. a regression results table).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub details: serde_json::Value,
}

impl Estimate {
    pub fn new(estimator: &str, title: &str) -> Self {
        Self {
            estimator: estimator.to_string(),
            title: title.to_string(),
            values: Vec::new(),
            text: None,
            details: serde_json::json!({}),
        }
    }

    pub fn with_value(mut self, label: impl Into<String>, value: Option<f64>) -> Self {
        self.values.push(EstimateValue {
            label: label.into(),
            value,
        });
        self
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn value(&self, label: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.label == label)
            .and_then(|v| v.value)
    }
}

/// Outcome of running one estimator; a failure is kept next to the others
/// instead of aborting the whole dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EstimateOutcome {
    Ok(Estimate),
    Failed { estimator: String, message: String },
}

pub fn run_all(
    estimators: &[std::sync::Arc<dyn Estimator>],
    data: &Dataset,
) -> Vec<EstimateOutcome> {
    estimators
        .iter()
        .map(|e| match e.estimate(data) {
            Ok(est) => EstimateOutcome::Ok(est),
            Err(err) => {
                tracing::warn!(event = "estimator_failed", estimator = e.name(), error = %err);
                EstimateOutcome::Failed {
                    estimator: e.name().to_string(),
                    message: format!("{:#}", err),
                }
            }
        })
        .collect()
}
