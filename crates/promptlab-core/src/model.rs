use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One of the four binary prompt-design factors of the experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Cot,
    Fewshot,
    Role,
    Constraint,
}

impl Factor {
    pub const ALL: [Factor; 4] = [
        Factor::Cot,
        Factor::Fewshot,
        Factor::Role,
        Factor::Constraint,
    ];

    /// Column name in the input file.
    pub fn column(&self) -> &'static str {
        match self {
            Factor::Cot => "cot",
            Factor::Fewshot => "fewshot",
            Factor::Role => "role",
            Factor::Constraint => "constraint",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Factor::Cot => "CoT",
            Factor::Fewshot => "Few-shot",
            Factor::Role => "Role",
            Factor::Constraint => "Constraint",
        }
    }

    /// Level of this factor in a configuration.
    pub fn level(&self, config: &FactorConfig) -> bool {
        match self {
            Factor::Cot => config.cot,
            Factor::Fewshot => config.fewshot,
            Factor::Role => config.role,
            Factor::Constraint => config.constraint,
        }
    }

    fn set(&self, config: &mut FactorConfig, on: bool) {
        match self {
            Factor::Cot => config.cot = on,
            Factor::Fewshot => config.fewshot = on,
            Factor::Role => config.role = on,
            Factor::Constraint => config.constraint = on,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Factor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cot" => Ok(Factor::Cot),
            "fewshot" | "few-shot" | "few_shot" => Ok(Factor::Fewshot),
            "role" => Ok(Factor::Role),
            "constraint" => Ok(Factor::Constraint),
            other => Err(format!(
                "unknown factor '{}' (expected cot|fewshot|role|constraint)",
                other
            )),
        }
    }
}

/// Outcome columns that can be aggregated and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Correct,
    TotalTokens,
    Latency,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Correct, Outcome::TotalTokens, Outcome::Latency];

    pub fn column(&self) -> &'static str {
        match self {
            Outcome::Correct => "correct",
            Outcome::TotalTokens => "total_tokens",
            Outcome::Latency => "latency",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Correct => "Mean Accuracy",
            Outcome::TotalTokens => "Mean Tokens",
            Outcome::Latency => "Mean Latency (s)",
        }
    }

    /// Decimal places used when a value of this outcome is displayed.
    pub fn precision(&self) -> usize {
        match self {
            Outcome::Correct => 3,
            Outcome::TotalTokens => 1,
            Outcome::Latency => 2,
        }
    }

    pub fn value(&self, trial: &Trial) -> f64 {
        match self {
            Outcome::Correct => trial.correct,
            Outcome::TotalTokens => trial.total_tokens as f64,
            Outcome::Latency => trial.latency,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "correct" | "accuracy" => Ok(Outcome::Correct),
            "total_tokens" | "tokens" => Ok(Outcome::TotalTokens),
            "latency" => Ok(Outcome::Latency),
            other => Err(format!(
                "unknown metric '{}' (expected correct|total_tokens|latency)",
                other
            )),
        }
    }
}

/// A single cell of the 2^4 factorial design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorConfig {
    #[serde(with = "flag")]
    pub cot: bool,
    #[serde(with = "flag")]
    pub fewshot: bool,
    #[serde(with = "flag")]
    pub role: bool,
    #[serde(with = "flag")]
    pub constraint: bool,
}

impl FactorConfig {
    pub fn new(cot: bool, fewshot: bool, role: bool, constraint: bool) -> Self {
        Self {
            cot,
            fewshot,
            role,
            constraint,
        }
    }

    /// All sixteen configurations in ascending (cot, fewshot, role, constraint) order.
    pub fn all() -> impl Iterator<Item = FactorConfig> {
        (0u8..16).map(|bits| {
            FactorConfig::new(bits & 8 != 0, bits & 4 != 0, bits & 2 != 0, bits & 1 != 0)
        })
    }

    pub fn with(mut self, factor: Factor, on: bool) -> Self {
        factor.set(&mut self, on);
        self
    }

    pub fn levels(&self) -> [u8; 4] {
        Factor::ALL.map(|f| u8::from(f.level(self)))
    }

    /// Compact tag such as `C1F0R1K0`, used for chart point labels.
    pub fn tag(&self) -> String {
        let [c, f, r, k] = self.levels();
        format!("C{}F{}R{}K{}", c, f, r, k)
    }
}

impl fmt::Display for FactorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [c, fs, r, k] = self.levels();
        write!(f, "CoT={} Few={} Role={} Cons={}", c, fs, r, k)
    }
}

/// One benchmark trial: a question answered under one factor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub question_id: String,
    #[serde(flatten)]
    pub config: FactorConfig,
    pub correct: f64,
    pub total_tokens: u64,
    pub latency: f64,
}

impl Trial {
    pub fn level(&self, factor: Factor) -> bool {
        factor.level(&self.config)
    }

    /// `correct / total_tokens`; undefined when the row has no tokens.
    pub fn accuracy_per_token(&self) -> Option<f64> {
        ratio(self.correct, self.total_tokens as f64)
    }

    /// `correct / latency`; undefined when latency is zero.
    pub fn accuracy_per_second(&self) -> Option<f64> {
        ratio(self.correct, self.latency)
    }
}

fn ratio(num: f64, denom: f64) -> Option<f64> {
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let v = num / denom;
    v.is_finite().then_some(v)
}

/// Serde adapter writing booleans as `0`/`1` and reading `0/1/true/false`.
pub mod flag {
    use super::*;

    pub fn serialize<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*v))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(u64),
        Float(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let parsed = match Raw::deserialize(d)? {
            Raw::Bool(b) => Some(b),
            Raw::Int(0) => Some(false),
            Raw::Int(1) => Some(true),
            Raw::Int(_) => None,
            Raw::Float(f) if f == 0.0 => Some(false),
            Raw::Float(f) if f == 1.0 => Some(true),
            Raw::Float(_) => None,
            Raw::Text(s) => parse(&s),
        };
        parsed.ok_or_else(|| serde::de::Error::custom("expected a 0/1 flag"))
    }

    pub fn parse(raw: &str) -> Option<bool> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "0" | "0.0" | "false" => Some(false),
            "1" | "1.0" | "true" => Some(true),
            _ => None,
        }
    }
}
