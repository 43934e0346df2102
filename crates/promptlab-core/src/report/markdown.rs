use super::{fmt_opt, fmt_ratio};
use crate::dashboard::{Dashboard, SelectedPerformance};
use crate::estimators_api::EstimateOutcome;
use crate::model::Factor;
use std::fmt::Write;

/// Chart files referenced from the report, relative to the report directory.
#[derive(Debug, Clone, Default)]
pub struct ChartLinks {
    pub cot_effect: Option<String>,
    pub heatmap: Option<String>,
    pub token_frontier: Option<String>,
    pub latency_frontier: Option<String>,
    pub export_csv: Option<String>,
}

pub fn render(d: &Dashboard, links: &ChartLinks) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "# {}\n", d.title);
    let _ = writeln!(
        s,
        "_{} trials, {} questions, dataset `{}`_\n",
        d.rows,
        d.questions,
        crate::fingerprint::short(&d.fingerprint)
    );

    s.push_str("## Overall Performance Summary\n\n");
    match &d.sections.overall {
        Some(k) => {
            s.push_str("| Mean Accuracy | Mean Tokens | Mean Latency (s) |\n|---:|---:|---:|\n");
            let _ = writeln!(s, "| {:.3} | {:.1} | {:.2} |\n", k.accuracy, k.tokens, k.latency);
        }
        None => s.push_str("> **Warning:** dataset has no rows.\n\n"),
    }

    s.push_str("## Selected Configuration Performance\n\n");
    match &d.selected {
        SelectedPerformance::Observed { config, kpis } => {
            let _ = writeln!(s, "`{}` (n={})\n", config, kpis.n);
            s.push_str("| Mean Accuracy | Mean Tokens | Mean Latency |\n|---:|---:|---:|\n");
            let _ = writeln!(
                s,
                "| {:.3} | {:.1} | {:.2} |\n",
                kpis.accuracy, kpis.tokens, kpis.latency
            );
        }
        SelectedPerformance::NoData { config } => {
            let _ = writeln!(
                s,
                "> **Warning:** No data for selected configuration (`{}`).\n",
                config
            );
        }
    }

    s.push_str("## Effects\n\n### Main Effect (Chain-of-Thought)\n\n");
    image(&mut s, "CoT Effect on Accuracy", &links.cot_effect);
    s.push_str("| CoT | Accuracy | n |\n|---:|---:|---:|\n");
    for g in &d.sections.cot_effect {
        let _ = writeln!(
            s,
            "| {} | {:.3} | {} |",
            u8::from(g.level(Factor::Cot).unwrap_or(false)),
            g.mean,
            g.n
        );
    }
    let _ = writeln!(
        s,
        "\n### Interaction Heatmap (CoT × Few-shot): `{}`\n",
        d.heatmap.metric
    );
    image(&mut s, "Interaction heatmap", &links.heatmap);
    let p = d.heatmap.metric.precision();
    s.push_str("| | Few-shot=0 | Few-shot=1 |\n|---|---:|---:|\n");
    for cot in [false, true] {
        let _ = writeln!(
            s,
            "| CoT={} | {} | {} |",
            u8::from(cot),
            fmt_cell(d.heatmap.cell(cot, false), p),
            fmt_cell(d.heatmap.cell(cot, true), p)
        );
    }

    s.push_str("\n## Optimization\n\n### Token–Accuracy Frontier\n\n");
    image(&mut s, "Token–Accuracy Tradeoff", &links.token_frontier);
    s.push_str("### Latency–Accuracy Frontier\n\n");
    image(&mut s, "Latency–Accuracy Tradeoff", &links.latency_frontier);
    s.push_str("| cot | fewshot | role | constraint | Mean Tokens | Mean Latency | Mean Accuracy |\n");
    s.push_str("|---:|---:|---:|---:|---:|---:|---:|\n");
    for pt in &d.sections.frontier {
        let [c, f, r, k] = pt.config.levels();
        let _ = writeln!(
            s,
            "| {} | {} | {} | {} | {:.1} | {:.2} | {:.3} |",
            c, f, r, k, pt.total_tokens, pt.latency, pt.correct
        );
    }

    s.push_str("\n### Efficiency Ranking\n\n");
    if let Some(csv) = &links.export_csv {
        let _ = writeln!(s, "[Download Efficiency Table]({})\n", csv);
    }
    s.push_str("| cot | fewshot | role | constraint | accuracy_per_token | accuracy_per_second | correct | total_tokens | latency |\n");
    s.push_str("|---:|---:|---:|---:|---:|---:|---:|---:|---:|\n");
    for row in d.sections.efficiency.ranked() {
        let [c, f, r, k] = row.config().levels();
        let _ = writeln!(
            s,
            "| {} | {} | {} | {} | {} | {} | {:.3} | {:.1} | {:.2} |",
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

    s.push_str("\n## Statistical Models\n\n");
    for outcome in &d.sections.estimates {
        match outcome {
            EstimateOutcome::Ok(est) => {
                let _ = writeln!(s, "### {}\n", est.title);
                for v in &est.values {
                    let _ = writeln!(s, "- {}: {}", v.label, fmt_opt(v.value, 3));
                }
                if let Some(text) = &est.text {
                    let _ = writeln!(s, "\n```text\n{}\n```", text.trim_end());
                }
                s.push('\n');
            }
            EstimateOutcome::Failed { estimator, message } => {
                let _ = writeln!(s, "> **{}** unavailable: {}\n", estimator, message);
            }
        }
    }

    s.push_str("## Documentation\n\n");
    s.push_str(d.documentation);
    s
}

fn image(s: &mut String, alt: &str, link: &Option<String>) {
    if let Some(path) = link {
        let _ = writeln!(s, "![{}]({})\n", alt, path);
    }
}

fn fmt_cell(v: Option<f64>, decimals: usize) -> String {
    v.map(|x| format!("{:.*}", decimals, x))
        .unwrap_or_else(|| "–".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::DashboardParams;
    use crate::dataset::Dataset;
    use crate::model::{FactorConfig, Trial};

    #[test]
    fn report_links_charts_and_warns_on_empty_selection() {
        let data = Dataset::from_trials(vec![Trial {
            question_id: "q1".into(),
            config: FactorConfig::default(),
            correct: 1.0,
            total_tokens: 10,
            latency: 1.0,
        }]);
        let params = DashboardParams {
            selection: FactorConfig::new(true, true, false, false),
            ..Default::default()
        };
        let d = Dashboard::build(&data, &params, &[]);
        let links = ChartLinks {
            heatmap: Some("charts/heatmap.svg".into()),
            export_csv: Some("efficiency_results.csv".into()),
            ..Default::default()
        };
        let md = render(&d, &links);
        assert!(md.contains("![Interaction heatmap](charts/heatmap.svg)"));
        assert!(md.contains("[Download Efficiency Table](efficiency_results.csv)"));
        assert!(md.contains("No data for selected configuration"));
        assert!(md.contains("| CoT=1 | – | – |"));
        assert!(md.ends_with(crate::docs::DOCUMENTATION));
    }
}
