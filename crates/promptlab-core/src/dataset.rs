//! Loading of the experiment result table.
//!
//! The input is a header-bearing CSV with one row per benchmark trial.
//! Columns are matched by name; anything beyond the required set is ignored.

use crate::errors::DataError;
use crate::fingerprint;
use crate::model::{flag, Factor, FactorConfig, Trial};
use std::path::{Path, PathBuf};

pub const REQUIRED_COLUMNS: [&str; 8] = [
    "question_id",
    "cot",
    "fewshot",
    "role",
    "constraint",
    "correct",
    "total_tokens",
    "latency",
];

/// The immutable, in-memory result table.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub trials: Vec<Trial>,
    pub source: Option<PathBuf>,
    /// SHA-256 of the raw input bytes.
    pub fingerprint: String,
}

impl Dataset {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut ds = Self::from_bytes(&bytes)?;
        ds.source = Some(path.to_path_buf());

        tracing::info!(
            event = "dataset_loaded",
            path = %path.display(),
            rows = ds.trials.len(),
            questions = ds.question_count(),
            fingerprint = %fingerprint::short(&ds.fingerprint),
        );
        Ok(ds)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DataError> {
        let trials = parse_trials(bytes)?;
        Ok(Self {
            trials,
            source: None,
            fingerprint: fingerprint::sha256_hex(bytes),
        })
    }

    pub fn from_trials(trials: Vec<Trial>) -> Self {
        Self {
            trials,
            source: None,
            fingerprint: String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn all(&self) -> Vec<&Trial> {
        self.trials.iter().collect()
    }

    /// Rows run under exactly the given configuration.
    pub fn select(&self, config: &FactorConfig) -> Vec<&Trial> {
        self.trials.iter().filter(|t| t.config == *config).collect()
    }

    /// Rows where one factor sits at the given level.
    pub fn at_level(&self, factor: Factor, on: bool) -> Vec<&Trial> {
        self.trials.iter().filter(|t| t.level(factor) == on).collect()
    }

    /// Distinct question ids, sorted.
    pub fn questions(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.trials.iter().map(|t| t.question_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn question_count(&self) -> usize {
        self.questions().len()
    }
}

struct Columns {
    question_id: usize,
    flags: [usize; 4],
    correct: usize,
    total_tokens: usize,
    latency: usize,
}

impl Columns {
    fn locate(header: &csv::StringRecord) -> Result<Self, DataError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| DataError::MissingColumn {
                    column: name.to_string(),
                    header: header.iter().collect::<Vec<_>>().join(","),
                })
        };
        Ok(Self {
            question_id: find("question_id")?,
            flags: [
                find(Factor::Cot.column())?,
                find(Factor::Fewshot.column())?,
                find(Factor::Role.column())?,
                find(Factor::Constraint.column())?,
            ],
            correct: find("correct")?,
            total_tokens: find("total_tokens")?,
            latency: find("latency")?,
        })
    }
}

fn parse_trials(bytes: &[u8]) -> Result<Vec<Trial>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let cols = Columns::locate(rdr.headers()?)?;
    let mut trials = Vec::new();

    for rec in rdr.records() {
        let rec = rec?;
        let line = rec.position().map(|p| p.line()).unwrap_or(0);
        let field = |idx: usize| rec.get(idx).unwrap_or("");

        let mut levels = [false; 4];
        for (i, factor) in Factor::ALL.iter().enumerate() {
            let raw = field(cols.flags[i]);
            levels[i] = flag::parse(raw).ok_or_else(|| DataError::InvalidValue {
                line,
                column: factor.column(),
                value: raw.to_string(),
                reason: "expected 0 or 1",
            })?;
        }

        let question_id = field(cols.question_id);
        if question_id.is_empty() {
            return Err(DataError::InvalidValue {
                line,
                column: "question_id",
                value: String::new(),
                reason: "empty identifier",
            });
        }

        trials.push(Trial {
            question_id: question_id.to_string(),
            config: FactorConfig::new(levels[0], levels[1], levels[2], levels[3]),
            correct: parse_correct(field(cols.correct), line)?,
            total_tokens: parse_tokens(field(cols.total_tokens), line)?,
            latency: parse_latency(field(cols.latency), line)?,
        });
    }

    Ok(trials)
}

fn parse_correct(raw: &str, line: u64) -> Result<f64, DataError> {
    if let Some(b) = flag::parse(raw) {
        return Ok(if b { 1.0 } else { 0.0 });
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DataError::InvalidValue {
            line,
            column: "correct",
            value: raw.to_string(),
            reason: "expected a number",
        }),
    }
}

fn parse_tokens(raw: &str, line: u64) -> Result<u64, DataError> {
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n);
    }
    // Accept integral floats such as "812.0" written by dataframe exporters.
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
        _ => Err(DataError::InvalidValue {
            line,
            column: "total_tokens",
            value: raw.to_string(),
            reason: "expected a non-negative integer",
        }),
    }
}

fn parse_latency(raw: &str, line: u64) -> Result<f64, DataError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(DataError::InvalidValue {
            line,
            column: "latency",
            value: raw.to_string(),
            reason: "expected a non-negative number of seconds",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
question_id,cot,fewshot,role,constraint,correct,total_tokens,latency,model
q1,1,0,0,0,1,10,1.0,gpt
q2,0,0,0,0,0,20,2.0,gpt
";

    #[test]
    fn loads_rows_and_ignores_extra_columns() {
        let ds = Dataset::from_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.trials[0].question_id, "q1");
        assert!(ds.trials[0].config.cot);
        assert_eq!(ds.trials[1].total_tokens, 20);
        assert_eq!(ds.trials[1].latency, 2.0);
        assert_eq!(ds.fingerprint.len(), 64);
    }

    #[test]
    fn columns_are_matched_by_name() {
        let csv = "latency,total_tokens,correct,constraint,role,fewshot,cot,question_id\n\
                   1.5,300,1,1,0,1,0,7\n";
        let ds = Dataset::from_bytes(csv.as_bytes()).unwrap();
        let t = &ds.trials[0];
        assert_eq!(t.question_id, "7");
        assert_eq!(t.config, FactorConfig::new(false, true, false, true));
        assert_eq!(t.total_tokens, 300);
        assert_eq!(t.latency, 1.5);
    }

    #[test]
    fn missing_column_is_fatal() {
        let csv = "question_id,cot,fewshot,role,correct,total_tokens,latency\nq,1,0,0,1,5,1\n";
        let err = Dataset::from_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column, .. } if column == "constraint"));
    }

    #[test]
    fn flag_outside_binary_domain_is_rejected_with_line() {
        let csv = "question_id,cot,fewshot,role,constraint,correct,total_tokens,latency\n\
                   q1,1,0,0,0,1,10,1.0\n\
                   q2,2,0,0,0,1,10,1.0\n";
        let err = Dataset::from_bytes(csv.as_bytes()).unwrap_err();
        match err {
            DataError::InvalidValue { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "cot");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn accepts_boolean_spellings_and_integral_floats() {
        let csv = "question_id,cot,fewshot,role,constraint,correct,total_tokens,latency\n\
                   q1,True,False,0,1,True,812.0,0.75\n";
        let ds = Dataset::from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(ds.trials[0].correct, 1.0);
        assert_eq!(ds.trials[0].total_tokens, 812);
        assert!(ds.trials[0].config.cot && ds.trials[0].config.constraint);
    }

    #[test]
    fn zero_denominators_are_accepted() {
        let csv = "question_id,cot,fewshot,role,constraint,correct,total_tokens,latency\n\
                   q1,0,0,0,0,1,0,0\n";
        let ds = Dataset::from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(ds.trials[0].accuracy_per_token(), None);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Dataset::load("/definitely/not/here.csv").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }

    #[test]
    fn select_and_questions() {
        let ds = Dataset::from_bytes(SAMPLE.as_bytes()).unwrap();
        let cfg = FactorConfig::new(true, false, false, false);
        assert_eq!(ds.select(&cfg).len(), 1);
        assert!(ds.select(&FactorConfig::new(true, true, true, true)).is_empty());
        assert_eq!(ds.questions(), vec!["q1", "q2"]);
        assert_eq!(ds.at_level(Factor::Cot, false).len(), 1);
    }
}
