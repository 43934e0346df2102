pub mod console;
pub mod json;
pub mod markdown;

/// Formats a possibly undefined value with fixed decimals.
pub fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{:.*}", decimals, x),
        None => "undefined".to_string(),
    }
}

/// Ratios are tiny (accuracy per token); anything below 0.01 is shown in
/// scientific notation so one column never mixes both styles.
pub fn fmt_ratio(v: Option<f64>) -> String {
    match v {
        Some(x) if x != 0.0 && x.abs() < 1e-2 => format!("{:.3e}", x),
        Some(x) => format!("{:.6}", x),
        None => "undefined".to_string(),
    }
}
