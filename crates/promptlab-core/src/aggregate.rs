use crate::model::{Factor, FactorConfig, Outcome, Trial};
use serde::Serialize;
use std::collections::BTreeMap;

/// Mean of one outcome within one observed combination of factor levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub levels: Vec<(Factor, bool)>,
    pub mean: f64,
    pub n: usize,
}

impl GroupMean {
    pub fn level(&self, factor: Factor) -> Option<bool> {
        self.levels
            .iter()
            .find(|(f, _)| *f == factor)
            .map(|(_, on)| *on)
    }
}

/// Groups `trials` by the given factors and averages `metric`.
///
/// Only combinations that occur in the data are returned (no zero-fill),
/// ordered by their levels ascending.
pub fn group_mean(trials: &[&Trial], by: &[Factor], metric: Outcome) -> Vec<GroupMean> {
    let mut groups: BTreeMap<Vec<bool>, (f64, usize)> = BTreeMap::new();
    for t in trials {
        let key: Vec<bool> = by.iter().map(|f| t.level(*f)).collect();
        let slot = groups.entry(key).or_insert((0.0, 0));
        slot.0 += metric.value(t);
        slot.1 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (sum, n))| GroupMean {
            levels: by.iter().copied().zip(key).collect(),
            mean: sum / n as f64,
            n,
        })
        .collect()
}

/// Headline numbers: means of the three outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Kpis {
    pub accuracy: f64,
    pub tokens: f64,
    pub latency: f64,
    pub n: usize,
}

impl Kpis {
    /// `None` when there is nothing to average.
    pub fn from_trials(trials: &[&Trial]) -> Option<Self> {
        if trials.is_empty() {
            return None;
        }
        let n = trials.len() as f64;
        let sum = |o: Outcome| trials.iter().map(|t| o.value(t)).sum::<f64>();
        Some(Self {
            accuracy: sum(Outcome::Correct) / n,
            tokens: sum(Outcome::TotalTokens) / n,
            latency: sum(Outcome::Latency) / n,
            n: trials.len(),
        })
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Correct => self.accuracy,
            Outcome::TotalTokens => self.tokens,
            Outcome::Latency => self.latency,
        }
    }
}

/// Outcome means for one full 4-way configuration (a frontier point).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfigAggregate {
    pub config: FactorConfig,
    pub correct: f64,
    pub total_tokens: f64,
    pub latency: f64,
    pub n: usize,
}

pub fn config_aggregates(trials: &[&Trial]) -> Vec<ConfigAggregate> {
    by_config(trials)
        .into_iter()
        .filter_map(|(config, rows)| {
            Kpis::from_trials(&rows).map(|k| ConfigAggregate {
                config,
                correct: k.accuracy,
                total_tokens: k.tokens,
                latency: k.latency,
                n: k.n,
            })
        })
        .collect()
}

/// Rows bucketed by their exact configuration, in configuration order.
pub fn by_config<'a>(trials: &[&'a Trial]) -> BTreeMap<FactorConfig, Vec<&'a Trial>> {
    let mut out: BTreeMap<FactorConfig, Vec<&'a Trial>> = BTreeMap::new();
    for t in trials {
        out.entry(t.config).or_default().push(*t);
    }
    out
}

/// Per-row derived ratios, in row order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ratios {
    pub accuracy_per_token: Option<f64>,
    pub accuracy_per_second: Option<f64>,
}

pub fn derive_ratios(trials: &[&Trial]) -> Vec<Ratios> {
    trials
        .iter()
        .map(|t| Ratios {
            accuracy_per_token: t.accuracy_per_token(),
            accuracy_per_second: t.accuracy_per_second(),
        })
        .collect()
}

/// Mean over values that may be undefined: any undefined member (or an empty
/// input) makes the mean undefined.
pub fn mean_defined<I: IntoIterator<Item = Option<f64>>>(values: I) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += v?;
        n += 1;
    }
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(q: &str, config: FactorConfig, correct: f64, tokens: u64, latency: f64) -> Trial {
        Trial {
            question_id: q.into(),
            config,
            correct,
            total_tokens: tokens,
            latency,
        }
    }

    fn two_rows() -> Vec<Trial> {
        vec![
            t("q1", FactorConfig::new(true, false, false, false), 1.0, 10, 1.0),
            t("q2", FactorConfig::default(), 0.0, 20, 2.0),
        ]
    }

    #[test]
    fn group_mean_by_cot() {
        let rows = two_rows();
        let refs: Vec<&Trial> = rows.iter().collect();
        let g = group_mean(&refs, &[Factor::Cot], Outcome::Correct);
        assert_eq!(g.len(), 2);
        assert_eq!(g[0].level(Factor::Cot), Some(false));
        assert_eq!(g[0].mean, 0.0);
        assert_eq!(g[1].mean, 1.0);
        assert_eq!(g[1].level(Factor::Fewshot), None);
    }

    #[test]
    fn group_mean_has_no_zero_fill() {
        let rows = two_rows();
        let refs: Vec<&Trial> = rows.iter().collect();
        let g = group_mean(&refs, &[Factor::Cot, Factor::Fewshot], Outcome::Latency);
        assert_eq!(g.len(), 2);
        assert!(g.iter().all(|m| m.level(Factor::Fewshot) == Some(false)));
    }

    #[test]
    fn kpis_of_two_row_scenario() {
        let rows = two_rows();
        let refs: Vec<&Trial> = rows.iter().collect();
        let k = Kpis::from_trials(&refs).unwrap();
        assert_eq!(k.accuracy, 0.5);
        assert_eq!(k.tokens, 15.0);
        assert_eq!(k.latency, 1.5);
        assert_eq!(k.get(Outcome::TotalTokens), 15.0);
        assert!(Kpis::from_trials(&[]).is_none());
    }

    #[test]
    fn ratios_of_two_row_scenario() {
        let rows = two_rows();
        let refs: Vec<&Trial> = rows.iter().collect();
        let r = derive_ratios(&refs);
        assert_eq!(r[0].accuracy_per_token, Some(0.1));
        assert_eq!(r[1].accuracy_per_token, Some(0.0));
        assert_eq!(r[1].accuracy_per_second, Some(0.0));
    }

    #[test]
    fn mean_defined_propagates_undefined() {
        assert_eq!(mean_defined([Some(1.0), Some(3.0)]), Some(2.0));
        assert_eq!(mean_defined([Some(1.0), None]), None);
        assert_eq!(mean_defined(std::iter::empty::<Option<f64>>()), None);
    }

    #[test]
    fn config_aggregates_one_row_per_config() {
        let mut rows = two_rows();
        rows.push(t("q3", FactorConfig::default(), 1.0, 40, 4.0));
        let refs: Vec<&Trial> = rows.iter().collect();
        let agg = config_aggregates(&refs);
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].config, FactorConfig::default());
        assert_eq!(agg[0].n, 2);
        assert_eq!(agg[0].correct, 0.5);
        assert_eq!(agg[0].total_tokens, 30.0);
    }
}
