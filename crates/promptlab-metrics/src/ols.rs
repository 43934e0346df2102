//! Ordinary least squares with per-question fixed effects.
//!
//! Model: `correct ~ 1 + cot + fewshot + role + constraint + C(question_id)`,
//! where the question id is dummy coded with the first sorted id as the
//! reference level. The normal equations are solved through the
//! Moore-Penrose pseudo-inverse so rank-deficient designs (e.g. a factor that
//! never varies) still produce estimates.

use nalgebra::{DMatrix, DVector};
use promptlab_core::dataset::Dataset;
use promptlab_core::estimators_api::{Estimate, Estimator};
use promptlab_core::model::Factor;
use serde_json::json;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use std::fmt::Write;

pub const INTERCEPT: &str = "Intercept";

#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    pub name: String,
    pub coef: f64,
    pub std_err: Option<f64>,
    pub t: Option<f64>,
    pub p_value: Option<f64>,
    pub ci_low: Option<f64>,
    pub ci_high: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionResults {
    pub dep_var: &'static str,
    pub n: usize,
    pub rank: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub fixed_effects: usize,
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
    pub f_statistic: Option<f64>,
    pub f_pvalue: Option<f64>,
    pub log_likelihood: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub coefficients: Vec<Coefficient>,
}

impl RegressionResults {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

/// Builds the design matrix, returning it with its column names.
fn design(data: &Dataset) -> (DMatrix<f64>, Vec<String>) {
    let questions = data.questions();
    let dummies = &questions[questions.len().min(1)..];

    let mut names = vec![INTERCEPT.to_string()];
    names.extend(Factor::ALL.iter().map(|f| f.column().to_string()));
    names.extend(dummies.iter().map(|q| format!("C(question_id)[T.{}]", q)));

    let k = names.len();
    let mut x = DMatrix::<f64>::zeros(data.len(), k);
    for (i, t) in data.trials.iter().enumerate() {
        x[(i, 0)] = 1.0;
        for (j, f) in Factor::ALL.iter().enumerate() {
            x[(i, j + 1)] = if t.level(*f) { 1.0 } else { 0.0 };
        }
        if let Ok(pos) = dummies.binary_search(&t.question_id.as_str()) {
            x[(i, 1 + Factor::ALL.len() + pos)] = 1.0;
        }
    }
    (x, names)
}

pub fn fit(data: &Dataset) -> anyhow::Result<RegressionResults> {
    if data.is_empty() {
        anyhow::bail!("cannot fit regression on an empty dataset");
    }

    let (x, names) = design(data);
    let y = DVector::from_iterator(data.len(), data.trials.iter().map(|t| t.correct));
    let n = data.len();
    let k = names.len();

    let xtx = x.transpose() * &x;
    let svd = xtx.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    let tol = max_sv * k as f64 * f64::EPSILON;
    let rank = svd.singular_values.iter().filter(|s| **s > tol).count();
    let xtx_pinv = svd
        .pseudo_inverse(tol)
        .map_err(|e| anyhow::anyhow!("pseudo-inverse failed: {}", e))?;

    let beta = &xtx_pinv * (x.transpose() * &y);
    let resid = &y - &x * &beta;
    let ssr = resid.dot(&resid);

    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let ess = tss - ssr;

    let df_model = rank.saturating_sub(1);
    let df_resid = n.saturating_sub(rank);
    let nf = n as f64;

    let r_squared = (tss > 0.0).then(|| 1.0 - ssr / tss);
    let adj_r_squared = r_squared
        .filter(|_| df_resid > 0)
        .map(|r2| 1.0 - (nf - 1.0) / df_resid as f64 * (1.0 - r2));

    let scale = (df_resid > 0).then(|| ssr / df_resid as f64);
    let t_dist = if df_resid > 0 {
        StudentsT::new(0.0, 1.0, df_resid as f64).ok()
    } else {
        None
    };
    let t_crit = t_dist.as_ref().map(|d| d.inverse_cdf(0.975));

    let coefficients = names
        .into_iter()
        .enumerate()
        .map(|(j, name)| {
            let coef = beta[j];
            let std_err = scale
                .map(|s| (s * xtx_pinv[(j, j)]).max(0.0).sqrt())
                .filter(|se| se.is_finite());
            let t = std_err.filter(|se| *se > 0.0).map(|se| coef / se);
            let p_value = match (&t_dist, t) {
                (Some(d), Some(t)) => Some(2.0 * d.sf(t.abs())),
                _ => None,
            };
            let (ci_low, ci_high) = match (std_err, t_crit) {
                (Some(se), Some(tc)) => (Some(coef - tc * se), Some(coef + tc * se)),
                _ => (None, None),
            };
            Coefficient {
                name,
                coef,
                std_err,
                t,
                p_value,
                ci_low,
                ci_high,
            }
        })
        .collect();

    let (f_statistic, f_pvalue) = if df_model > 0 && df_resid > 0 && ssr > 0.0 {
        let f = (ess / df_model as f64) / (ssr / df_resid as f64);
        let p = FisherSnedecor::new(df_model as f64, df_resid as f64)
            .ok()
            .map(|d| d.sf(f));
        (Some(f), p)
    } else {
        (None, None)
    };

    let log_likelihood = Some(-nf / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0))
        .filter(|v| v.is_finite());
    let params = (df_model + 1) as f64;
    let aic = log_likelihood.map(|ll| -2.0 * ll + 2.0 * params);
    let bic = log_likelihood.map(|ll| -2.0 * ll + nf.ln() * params);

    tracing::debug!(event = "ols_fit", n, k, rank, df_resid, ssr);

    Ok(RegressionResults {
        dep_var: "correct",
        n,
        rank,
        df_model,
        df_resid,
        fixed_effects: k - 1 - Factor::ALL.len(),
        r_squared,
        adj_r_squared,
        f_statistic,
        f_pvalue,
        log_likelihood,
        aic,
        bic,
        coefficients,
    })
}

fn num(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{:.*}", decimals, x),
        None => "nan".to_string(),
    }
}

fn pval(v: Option<f64>) -> String {
    match v {
        Some(p) if p > 0.0 && p < 1e-3 => format!("{:.2e}", p),
        other => num(other, 3),
    }
}

/// Text rendering in the layout of a classic OLS results table.
pub fn summary_text(r: &RegressionResults) -> String {
    let name_w = r
        .coefficients
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(12);
    let width = name_w + 66;
    let heavy = "=".repeat(width);
    let light = "-".repeat(width);

    let mut s = String::new();
    let _ = writeln!(s, "{:^w$}", "OLS Regression Results", w = width);
    let _ = writeln!(s, "{}", heavy);
    let rows: [(&str, String, &str, String); 7] = [
        ("Dep. Variable:", r.dep_var.to_string(), "R-squared:", num(r.r_squared, 3)),
        ("Model:", "OLS".into(), "Adj. R-squared:", num(r.adj_r_squared, 3)),
        ("Method:", "Least Squares".into(), "F-statistic:", num(r.f_statistic, 2)),
        ("No. Observations:", r.n.to_string(), "Prob (F-statistic):", pval(r.f_pvalue)),
        ("Df Residuals:", r.df_resid.to_string(), "Log-Likelihood:", num(r.log_likelihood, 2)),
        ("Df Model:", r.df_model.to_string(), "AIC:", num(r.aic, 1)),
        ("Covariance Type:", "nonrobust".into(), "BIC:", num(r.bic, 1)),
    ];
    for (l1, v1, l2, v2) in rows {
        let _ = writeln!(s, "{:<20}{:>16}   {:<20}{:>14}", l1, v1, l2, v2);
    }
    let _ = writeln!(
        s,
        "{:<20}{:>16}",
        "Fixed effects:",
        format!("question_id ({})", r.fixed_effects)
    );
    let _ = writeln!(s, "{}", heavy);
    let _ = writeln!(
        s,
        "{:<nw$}{:>10}{:>11}{:>10}{:>10}{:>12}{:>12}",
        "",
        "coef",
        "std err",
        "t",
        "P>|t|",
        "[0.025",
        "0.975]",
        nw = name_w
    );
    let _ = writeln!(s, "{}", light);
    for c in &r.coefficients {
        let _ = writeln!(
            s,
            "{:<nw$}{:>10.4}{:>11}{:>10}{:>10}{:>12}{:>12}",
            c.name,
            c.coef,
            num(c.std_err, 3),
            num(c.t, 3),
            num(c.p_value, 3),
            num(c.ci_low, 3),
            num(c.ci_high, 3),
            nw = name_w
        );
    }
    let _ = writeln!(s, "{}", heavy);
    if r.rank < r.coefficients.len() {
        let _ = writeln!(
            s,
            "Note: design matrix is rank deficient (rank {} of {} columns); estimates use the pseudo-inverse.",
            r.rank,
            r.coefficients.len()
        );
    }
    s
}

/// Accuracy regressed on the four factors with question fixed effects.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedEffectsOls;

impl Estimator for FixedEffectsOls {
    fn name(&self) -> &'static str {
        "fixed_effects_ols"
    }

    fn estimate(&self, data: &Dataset) -> anyhow::Result<Estimate> {
        let r = fit(data)?;
        let mut est = Estimate::new(self.name(), "Fixed Effects Regression (Accuracy)");
        for f in Factor::ALL {
            let coef = r.coefficient(f.column()).map(|c| c.coef);
            est = est.with_value(format!("{} coefficient", f.label()), coef);
        }
        est = est.with_value("R-squared", r.r_squared);

        let coefficients: Vec<_> = r
            .coefficients
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "coef": c.coef,
                    "std_err": c.std_err,
                    "t": c.t,
                    "p_value": c.p_value,
                    "ci_low": c.ci_low,
                    "ci_high": c.ci_high,
                })
            })
            .collect();
        let details = json!({
            "dep_var": r.dep_var,
            "n": r.n,
            "rank": r.rank,
            "df_model": r.df_model,
            "df_resid": r.df_resid,
            "fixed_effects": r.fixed_effects,
            "r_squared": r.r_squared,
            "adj_r_squared": r.adj_r_squared,
            "f_statistic": r.f_statistic,
            "f_pvalue": r.f_pvalue,
            "log_likelihood": r.log_likelihood,
            "aic": r.aic,
            "bic": r.bic,
            "coefficients": coefficients,
        });

        Ok(est.with_text(summary_text(&r)).with_details(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlab_core::model::{FactorConfig, Trial};

    fn trial(q: &str, config: FactorConfig, correct: f64) -> Trial {
        Trial {
            question_id: q.into(),
            config,
            correct,
            total_tokens: 100,
            latency: 1.0,
        }
    }

    /// Full factorial over 3 questions where accuracy is exactly
    /// `0.1 + 0.3*cot - 0.2*role + question offset`.
    fn exact_data() -> Dataset {
        let offsets = [("q1", 0.0), ("q2", 0.1), ("q3", -0.05)];
        let mut trials = Vec::new();
        for (q, off) in offsets {
            for c in FactorConfig::all() {
                let y = 0.1 + 0.3 * f64::from(u8::from(c.cot)) - 0.2 * f64::from(u8::from(c.role)) + off;
                trials.push(trial(q, c, y));
            }
        }
        Dataset::from_trials(trials)
    }

    #[test]
    fn recovers_exact_coefficients() {
        let r = fit(&exact_data()).unwrap();
        let get = |n: &str| r.coefficient(n).unwrap().coef;
        assert!((get(INTERCEPT) - 0.1).abs() < 1e-9);
        assert!((get("cot") - 0.3).abs() < 1e-9);
        assert!(get("fewshot").abs() < 1e-9);
        assert!((get("role") + 0.2).abs() < 1e-9);
        assert!(get("constraint").abs() < 1e-9);
        assert!((get("C(question_id)[T.q2]") - 0.1).abs() < 1e-9);
        assert!((get("C(question_id)[T.q3]") + 0.05).abs() < 1e-9);
        assert_eq!(r.n, 48);
        assert_eq!(r.rank, 7);
        assert_eq!(r.df_model, 6);
        assert_eq!(r.df_resid, 41);
        assert_eq!(r.fixed_effects, 2);
        assert!((r.r_squared.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_factor_is_rank_deficient_but_fits() {
        let mut trials = Vec::new();
        for (i, q) in ["a", "b", "c", "d"].iter().enumerate() {
            for cot in [false, true] {
                let y = if cot { 1.0 } else { (i % 2) as f64 };
                trials.push(trial(q, FactorConfig::new(cot, false, false, false), y));
            }
        }
        let r = fit(&Dataset::from_trials(trials)).unwrap();
        assert!(r.rank < r.coefficients.len());
        assert!(summary_text(&r).contains("rank deficient"));
        assert!(r.coefficient("cot").unwrap().coef.is_finite());
    }

    #[test]
    fn empty_dataset_is_an_error() {
        assert!(fit(&Dataset::default()).is_err());
    }

    #[test]
    fn single_row_has_undefined_inference() {
        let r = fit(&Dataset::from_trials(vec![trial("q", FactorConfig::default(), 1.0)])).unwrap();
        assert_eq!(r.df_resid, 0);
        assert!(r.coefficients.iter().all(|c| c.std_err.is_none() && c.p_value.is_none()));
        assert!(r.f_statistic.is_none());
    }

    #[test]
    fn noisy_fit_produces_inference() {
        let mut trials = Vec::new();
        for (i, q) in ["q1", "q2", "q3", "q4"].iter().enumerate() {
            for c in FactorConfig::all() {
                let noise = if (i + usize::from(c.fewshot) + usize::from(c.constraint)) % 3 == 0 { 1.0 } else { 0.0 };
                let y = if c.cot { 1.0 } else { noise };
                trials.push(trial(q, c, y));
            }
        }
        let r = fit(&Dataset::from_trials(trials)).unwrap();
        let cot = r.coefficient("cot").unwrap();
        assert!(cot.coef > 0.0);
        let p = cot.p_value.unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert!(cot.ci_low.unwrap() < cot.coef && cot.coef < cot.ci_high.unwrap());
        assert!(r.f_pvalue.is_some());
        assert!(r.aic.unwrap() < r.bic.unwrap());

        let text = summary_text(&r);
        assert!(text.contains("OLS Regression Results"));
        assert!(text.contains("No. Observations:"));
        assert!(text.contains("C(question_id)[T.q4]"));
    }

    #[test]
    fn estimator_exposes_factor_coefficients() {
        let est = FixedEffectsOls.estimate(&exact_data()).unwrap();
        assert!((est.value("CoT coefficient").unwrap() - 0.3).abs() < 1e-9);
        assert_eq!(est.details["n"], 48);
        assert!(est.text.unwrap().contains("Intercept"));
    }
}
