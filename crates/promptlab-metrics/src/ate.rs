use promptlab_core::aggregate::Kpis;
use promptlab_core::dataset::Dataset;
use promptlab_core::estimators_api::{Estimate, Estimator};
use promptlab_core::model::Factor;
use serde_json::json;

/// Naive average treatment effect of one factor on accuracy:
/// `mean(correct | factor=1) - mean(correct | factor=0)`.
///
/// Undefined (`None`) when either arm has no rows.
pub fn ate(data: &Dataset, factor: Factor) -> Option<f64> {
    let treated = Kpis::from_trials(&data.at_level(factor, true))?;
    let control = Kpis::from_trials(&data.at_level(factor, false))?;
    Some(treated.accuracy - control.accuracy)
}

/// Raw mean difference per factor. Only valid as a causal estimate for a
/// balanced full-factorial design.
#[derive(Debug, Clone)]
pub struct NaiveAte {
    pub factors: Vec<Factor>,
}

impl Default for NaiveAte {
    fn default() -> Self {
        Self {
            factors: vec![Factor::Cot, Factor::Fewshot],
        }
    }
}

impl NaiveAte {
    pub fn all_factors() -> Self {
        Self {
            factors: Factor::ALL.to_vec(),
        }
    }

    pub fn label(factor: Factor) -> String {
        format!("ATE ({})", factor.label())
    }
}

impl Estimator for NaiveAte {
    fn name(&self) -> &'static str {
        "naive_ate"
    }

    fn estimate(&self, data: &Dataset) -> anyhow::Result<Estimate> {
        let mut est = Estimate::new(self.name(), "Average Treatment Effects (ATE)");
        let mut arms = serde_json::Map::new();

        for &factor in &self.factors {
            let treated = Kpis::from_trials(&data.at_level(factor, true));
            let control = Kpis::from_trials(&data.at_level(factor, false));
            let effect = treated.zip(control).map(|(t, c)| t.accuracy - c.accuracy);
            if effect.is_none() {
                tracing::warn!(event = "ate_undefined", factor = %factor, "empty treatment arm");
            }
            arms.insert(
                factor.column().to_string(),
                json!({
                    "ate": effect,
                    "treated_mean": treated.map(|k| k.accuracy),
                    "control_mean": control.map(|k| k.accuracy),
                    "n_treated": treated.map(|k| k.n).unwrap_or(0),
                    "n_control": control.map(|k| k.n).unwrap_or(0),
                }),
            );
            est = est.with_value(Self::label(factor), effect);
        }

        Ok(est.with_details(serde_json::Value::Object(arms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlab_core::model::{FactorConfig, Trial};

    fn t(config: FactorConfig, correct: f64) -> Trial {
        Trial {
            question_id: "q".into(),
            config,
            correct,
            total_tokens: 10,
            latency: 1.0,
        }
    }

    #[test]
    fn two_row_scenario() {
        let data = Dataset::from_trials(vec![
            t(FactorConfig::new(true, false, false, false), 1.0),
            t(FactorConfig::default(), 0.0),
        ]);
        assert_eq!(ate(&data, Factor::Cot), Some(1.0));
        // Nobody received few-shot examples.
        assert_eq!(ate(&data, Factor::Fewshot), None);
    }

    #[test]
    fn estimate_reports_undefined_arm() {
        let data = Dataset::from_trials(vec![
            t(FactorConfig::new(true, false, false, false), 1.0),
            t(FactorConfig::default(), 0.0),
        ]);
        let est = NaiveAte::default().estimate(&data).unwrap();
        assert_eq!(est.value("ATE (CoT)"), Some(1.0));
        assert_eq!(est.value("ATE (Few-shot)"), None);
        assert_eq!(est.details["fewshot"]["n_treated"], 0);
        assert!(est.details["fewshot"]["ate"].is_null());
    }

    #[test]
    fn estimate_agrees_with_free_function() {
        let data = Dataset::from_trials(vec![
            t(FactorConfig::new(true, true, false, false), 1.0),
            t(FactorConfig::new(true, false, false, false), 0.0),
            t(FactorConfig::new(false, true, false, false), 1.0),
            t(FactorConfig::default(), 0.0),
            t(FactorConfig::default(), 1.0),
        ]);
        let est = NaiveAte::default().estimate(&data).unwrap();
        for f in [Factor::Cot, Factor::Fewshot] {
            assert_eq!(est.value(&NaiveAte::label(f)), ate(&data, f));
            assert_eq!(est.details[f.column()]["ate"], serde_json::json!(ate(&data, f)));
        }
        // 1 - 1/3 for few-shot, 1/2 - 2/3 for CoT.
        assert!((est.value("ATE (Few-shot)").unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert!((est.value("ATE (CoT)").unwrap() + 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn all_factors_variant_covers_four() {
        let est = NaiveAte::all_factors()
            .estimate(&Dataset::from_trials(vec![t(FactorConfig::default(), 1.0)]))
            .unwrap();
        assert_eq!(est.values.len(), 4);
        assert!(est.values.iter().all(|v| v.value.is_none()));
    }
}
