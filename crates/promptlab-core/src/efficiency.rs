//! Efficiency ranking: per-configuration means of the derived ratios next to
//! the raw outcome means, plus its CSV export.

use crate::aggregate::{by_config, derive_ratios, mean_defined, Kpis};
use crate::model::{flag, FactorConfig, Trial};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

pub const DEFAULT_EXPORT_NAME: &str = "efficiency_results.csv";

/// One row of the efficiency table. Field order is the export column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyRow {
    #[serde(with = "flag")]
    pub cot: bool,
    #[serde(with = "flag")]
    pub fewshot: bool,
    #[serde(with = "flag")]
    pub role: bool,
    #[serde(with = "flag")]
    pub constraint: bool,
    pub accuracy_per_token: Option<f64>,
    pub accuracy_per_second: Option<f64>,
    pub correct: f64,
    pub total_tokens: f64,
    pub latency: f64,
}

impl EfficiencyRow {
    pub fn config(&self) -> FactorConfig {
        FactorConfig::new(self.cot, self.fewshot, self.role, self.constraint)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EfficiencyTable {
    /// Rows in configuration order.
    pub rows: Vec<EfficiencyRow>,
}

impl EfficiencyTable {
    pub fn from_trials(trials: &[&Trial]) -> Self {
        let rows = by_config(trials)
            .into_iter()
            .filter_map(|(config, members)| {
                let k = Kpis::from_trials(&members)?;
                let ratios = derive_ratios(&members);
                Some(EfficiencyRow {
                    cot: config.cot,
                    fewshot: config.fewshot,
                    role: config.role,
                    constraint: config.constraint,
                    accuracy_per_token: mean_defined(ratios.iter().map(|r| r.accuracy_per_token)),
                    accuracy_per_second: mean_defined(ratios.iter().map(|r| r.accuracy_per_second)),
                    correct: k.accuracy,
                    total_tokens: k.tokens,
                    latency: k.latency,
                })
            })
            .collect();
        Self { rows }
    }

    /// Rows ranked by `accuracy_per_token` descending; undefined values last.
    pub fn ranked(&self) -> Vec<EfficiencyRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            rank_desc(a.accuracy_per_token, b.accuracy_per_token)
                .then_with(|| a.config().cmp(&b.config()))
        });
        rows
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        // Header-only output for an empty table keeps the file re-loadable.
        if self.rows.is_empty() {
            wtr.write_record(EXPORT_COLUMNS)?;
        }
        let bytes = wtr.into_inner().context("failed to flush csv writer")?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_csv_string()?)
            .with_context(|| format!("failed to write efficiency table: {}", path.display()))?;
        tracing::info!(event = "export_written", path = %path.display(), rows = self.rows.len());
        Ok(())
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read efficiency table: {}", path.display()))?;
        Self::from_csv_bytes(&raw)
    }

    pub fn from_csv_bytes(raw: &[u8]) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(raw);
        let mut rows = Vec::new();
        for rec in rdr.deserialize() {
            let row: EfficiencyRow = rec.context("malformed efficiency table row")?;
            rows.push(row);
        }
        rows.sort_by_key(|r| r.config());
        Ok(Self { rows })
    }
}

const EXPORT_COLUMNS: [&str; 9] = [
    "cot",
    "fewshot",
    "role",
    "constraint",
    "accuracy_per_token",
    "accuracy_per_second",
    "correct",
    "total_tokens",
    "latency",
];

fn rank_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(config: FactorConfig, correct: f64, tokens: u64, latency: f64) -> Trial {
        Trial {
            question_id: "q".into(),
            config,
            correct,
            total_tokens: tokens,
            latency,
        }
    }

    #[test]
    fn ranks_by_accuracy_per_token_with_undefined_last() {
        let a = FactorConfig::new(false, false, false, false);
        let b = FactorConfig::new(true, false, false, false);
        let c = FactorConfig::new(false, true, false, false);
        let rows = vec![
            t(a, 1.0, 100, 1.0),
            t(b, 1.0, 10, 1.0),
            t(c, 1.0, 0, 1.0),
        ];
        let refs: Vec<&Trial> = rows.iter().collect();
        let table = EfficiencyTable::from_trials(&refs);
        assert_eq!(table.rows.len(), 3);

        let ranked = table.ranked();
        assert_eq!(ranked[0].config(), b);
        assert_eq!(ranked[1].config(), a);
        assert_eq!(ranked[2].config(), c);
        assert_eq!(ranked[2].accuracy_per_token, None);
        assert_eq!(ranked[2].accuracy_per_second, Some(1.0));
    }

    #[test]
    fn csv_header_matches_export_columns() {
        let rows = vec![t(FactorConfig::default(), 1.0, 10, 2.0)];
        let refs: Vec<&Trial> = rows.iter().collect();
        let csv = EfficiencyTable::from_trials(&refs).to_csv_string().unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), EXPORT_COLUMNS.join(","));
        assert_eq!(lines.next().unwrap(), "0,0,0,0,0.1,0.5,1.0,10.0,2.0");
    }

    #[test]
    fn undefined_ratio_exports_as_empty_field_and_reads_back() {
        let rows = vec![t(FactorConfig::new(true, true, true, true), 1.0, 0, 0.0)];
        let refs: Vec<&Trial> = rows.iter().collect();
        let table = EfficiencyTable::from_trials(&refs);
        let csv = table.to_csv_string().unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("1,1,1,1,,,"));

        let back = EfficiencyTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn empty_table_exports_header_only() {
        let csv = EfficiencyTable::default().to_csv_string().unwrap();
        assert_eq!(csv.trim(), EXPORT_COLUMNS.join(","));
        assert!(EfficiencyTable::from_csv_bytes(csv.as_bytes())
            .unwrap()
            .rows
            .is_empty());
    }
}
