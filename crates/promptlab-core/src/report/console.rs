use super::{fmt_opt, fmt_ratio};
use crate::aggregate::{ConfigAggregate, GroupMean, Kpis};
use crate::dashboard::{Dashboard, Heatmap, SelectedPerformance};
use crate::efficiency::EfficiencyTable;
use crate::estimators_api::EstimateOutcome;
use crate::model::{Factor, Outcome};
use std::fmt::Write;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const BAR_WIDTH: usize = 40;

pub const NO_DATA_NOTICE: &str = "⚠️  No data for selected configuration.";

pub fn render_kpis(kpis: &Kpis) -> String {
    format!(
        "  {:<18} {:.3}\n  {:<18} {:.1}\n  {:<18} {:.2}\n",
        Outcome::Correct.label(),
        kpis.accuracy,
        Outcome::TotalTokens.label(),
        kpis.tokens,
        Outcome::Latency.label(),
        kpis.latency
    )
}

pub fn render_overall(overall: Option<&Kpis>) -> String {
    let mut s = String::from("Overall Performance Summary\n");
    match overall {
        Some(k) => s.push_str(&render_kpis(k)),
        None => s.push_str("  ⚠️  Dataset has no rows.\n"),
    }
    s
}

pub fn render_selected(selected: &SelectedPerformance) -> String {
    let mut s = String::new();
    match selected {
        SelectedPerformance::Observed { config, kpis } => {
            let _ = writeln!(s, "Selected Configuration Performance ({}, n={})", config, kpis.n);
            s.push_str(&render_kpis(kpis));
        }
        SelectedPerformance::NoData { config } => {
            let _ = writeln!(s, "Selected Configuration Performance ({})", config);
            let _ = writeln!(s, "  {}", NO_DATA_NOTICE);
        }
    }
    s
}

/// Horizontal bar chart of accuracy by CoT level.
pub fn render_cot_effect(groups: &[GroupMean]) -> String {
    let mut s = String::from("CoT Effect on Accuracy\n");
    if groups.is_empty() {
        s.push_str("  (no data)\n");
        return s;
    }
    let max = groups.iter().map(|g| g.mean).fold(0.0_f64, f64::max);
    for g in groups {
        let level = u8::from(g.level(Factor::Cot).unwrap_or(false));
        let width = if max > 0.0 {
            ((g.mean / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            s,
            "  CoT={} │{:<w$}│ {:.3} (n={})",
            level,
            "█".repeat(width),
            g.mean,
            g.n,
            w = BAR_WIDTH
        );
    }
    s
}

pub fn render_heatmap(h: &Heatmap) -> String {
    let p = h.metric.precision();
    let mut s = format!("Interaction Heatmap (CoT × Few-shot): {}\n", h.metric);
    let _ = writeln!(s, "  {:>10} {:>12} {:>12}", "", "Few-shot=0", "Few-shot=1");
    for cot in [false, true] {
        let _ = writeln!(
            s,
            "  {:>10} {:>12} {:>12}",
            format!("CoT={}", u8::from(cot)),
            cell(h.cell(cot, false), p),
            cell(h.cell(cot, true), p)
        );
    }
    s
}

fn cell(v: Option<f64>, decimals: usize) -> String {
    v.map(|x| format!("{:.*}", decimals, x))
        .unwrap_or_else(|| "-".to_string())
}

pub fn render_frontier(points: &[ConfigAggregate], show_labels: bool) -> String {
    let mut s = String::from("Token / Latency – Accuracy Frontier\n");
    let _ = writeln!(
        s,
        "  {:<4} {:<8} {:<5} {:<11} {:>4} {:>13} {:>12} {:>13}",
        "CoT", "Few-shot", "Role", "Constraint", "n", "Mean Tokens", "Mean Latency", "Mean Accuracy"
    );
    for p in points {
        let [c, f, r, k] = p.config.levels();
        let _ = write!(
            s,
            "  {:<4} {:<8} {:<5} {:<11} {:>4} {:>13.1} {:>12.2} {:>13.3}",
            c, f, r, k, p.n, p.total_tokens, p.latency, p.correct
        );
        if show_labels {
            let _ = write!(s, "  {}", p.config.tag());
        }
        s.push('\n');
    }
    s
}

pub fn render_efficiency(table: &EfficiencyTable) -> String {
    let mut s = String::from("Efficiency Ranking (by accuracy per token)\n");
    let _ = writeln!(
        s,
        "  {:<4} {:<8} {:<5} {:<11} {:>18} {:>19} {:>8} {:>13} {:>8}",
        "cot",
        "fewshot",
        "role",
        "constraint",
        "accuracy_per_token",
        "accuracy_per_second",
        "correct",
        "total_tokens",
        "latency"
    );
    for row in table.ranked() {
        let [c, f, r, k] = row.config().levels();
        let _ = writeln!(
            s,
            "  {:<4} {:<8} {:<5} {:<11} {:>18} {:>19} {:>8.3} {:>13.1} {:>8.2}",
            c,
            f,
            r,
            k,
            fmt_ratio(row.accuracy_per_token),
            fmt_ratio(row.accuracy_per_second),
            row.correct,
            row.total_tokens,
            row.latency
        );
    }
    s
}

pub fn render_estimates(estimates: &[EstimateOutcome]) -> String {
    let mut s = String::new();
    for outcome in estimates {
        match outcome {
            EstimateOutcome::Ok(est) => {
                let _ = writeln!(s, "{}", est.title);
                for v in &est.values {
                    let _ = writeln!(s, "  {}: {}", v.label, fmt_opt(v.value, 3));
                }
                if let Some(text) = &est.text {
                    s.push_str(text);
                    if !text.ends_with('\n') {
                        s.push('\n');
                    }
                }
            }
            EstimateOutcome::Failed { estimator, message } => {
                let _ = writeln!(s, "💥 {} unavailable: {}", estimator, message);
            }
        }
        s.push('\n');
    }
    s
}

/// Full text rendering of every dashboard section.
pub fn render_dashboard(d: &Dashboard) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{}", d.title);
    let _ = writeln!(
        s,
        "{} trials · {} questions · metric={} · labels={}",
        d.rows,
        d.questions,
        d.params.metric,
        if d.params.show_labels { "on" } else { "off" }
    );
    let _ = writeln!(s, "{}", RULE);

    s.push_str(&render_overall(d.sections.overall.as_ref()));
    s.push('\n');
    s.push_str(&render_selected(&d.selected));

    let _ = writeln!(s, "\n{}\nEffects\n{}", RULE, RULE);
    s.push_str(&render_cot_effect(&d.sections.cot_effect));
    s.push('\n');
    s.push_str(&render_heatmap(&d.heatmap));

    let _ = writeln!(s, "\n{}\nOptimization\n{}", RULE, RULE);
    s.push_str(&render_frontier(&d.sections.frontier, d.params.show_labels));
    s.push('\n');
    s.push_str(&render_efficiency(&d.sections.efficiency));

    let _ = writeln!(s, "\n{}\nStatistical Models\n{}", RULE, RULE);
    s.push_str(&render_estimates(&d.sections.estimates));

    let _ = writeln!(s, "{}\nDocumentation\n{}", RULE, RULE);
    s.push_str(d.documentation);
    s
}
