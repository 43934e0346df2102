//! SVG rendering of the dashboard charts.

use plotters::prelude::*;
use promptlab_core::aggregate::{ConfigAggregate, GroupMean};
use promptlab_core::dashboard::{Dashboard, Heatmap};
use promptlab_core::model::{Factor, Outcome};

const SIZE: (u32, u32) = (800, 520);
const FONT: &str = "sans-serif";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    CotEffect,
    Heatmap,
    TokenFrontier,
    LatencyFrontier,
}

pub struct Chart {
    pub kind: ChartKind,
    pub file_name: &'static str,
    pub svg: String,
}

pub fn render_all(d: &Dashboard) -> anyhow::Result<Vec<Chart>> {
    let labels = d.params.show_labels;
    Ok(vec![
        Chart {
            kind: ChartKind::CotEffect,
            file_name: "cot_effect.svg",
            svg: cot_effect(&d.sections.cot_effect)?,
        },
        Chart {
            kind: ChartKind::Heatmap,
            file_name: "heatmap.svg",
            svg: heatmap(&d.heatmap)?,
        },
        Chart {
            kind: ChartKind::TokenFrontier,
            file_name: "token_frontier.svg",
            svg: frontier(&d.sections.frontier, Outcome::TotalTokens, labels)?,
        },
        Chart {
            kind: ChartKind::LatencyFrontier,
            file_name: "latency_frontier.svg",
            svg: frontier(&d.sections.frontier, Outcome::Latency, labels)?,
        },
    ])
}

/// Accuracy bar per CoT level.
pub fn cot_effect(groups: &[GroupMean]) -> anyhow::Result<String> {
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let y_max = groups.iter().map(|g| g.mean).fold(1.0_f64, f64::max) * 1.1;
        let mut chart = ChartBuilder::on(&root)
            .caption("CoT Effect on Accuracy", (FONT, 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5_f64..1.5_f64, 0.0_f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("CoT")
            .y_desc("Accuracy")
            .x_labels(3)
            .x_label_formatter(&|x| integer_tick(*x))
            .draw()?;

        let bars: Vec<(f64, f64)> = groups
            .iter()
            .map(|g| (f64::from(u8::from(g.level(Factor::Cot).unwrap_or(false))), g.mean))
            .collect();

        chart.draw_series(bars.iter().map(|&(x, y)| {
            Rectangle::new([(x - 0.3, 0.0), (x + 0.3, y)], BLUE.mix(0.7).filled())
        }))?;
        chart.draw_series(bars.iter().map(|&(x, y)| {
            Text::new(format!("{:.3}", y), (x - 0.08, y + y_max * 0.04), (FONT, 14).into_font())
        }))?;

        root.present()?;
    }
    Ok(buf)
}

/// 2x2 grid over (cot, fewshot), coloured red (low) to blue (high).
pub fn heatmap(h: &Heatmap) -> anyhow::Result<String> {
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let caption = format!("Interaction Heatmap (CoT × Few-shot): {}", h.metric);
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, (FONT, 22))
            .margin(10)
            .build_cartesian_2d(0.0_f64..2.0_f64, 0.0_f64..2.0_f64)?;

        let range = h.range();
        let decimals = h.metric.precision();
        for cot in [false, true] {
            for few in [false, true] {
                let x = f64::from(u8::from(cot));
                let y = f64::from(u8::from(few));
                let value = h.cell(cot, few);
                let fill = match (value, range) {
                    (Some(v), Some((lo, hi))) => rd_bu(scale(v, lo, hi)),
                    _ => RGBColor(220, 220, 220),
                };
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(x, y), (x + 1.0, y + 1.0)],
                    fill.filled(),
                )))?;
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(x, y), (x + 1.0, y + 1.0)],
                    WHITE.stroke_width(2),
                )))?;

                let label = format!("CoT={} Few-shot={}", u8::from(cot), u8::from(few));
                let text = value
                    .map(|v| format!("{:.*}", decimals, v))
                    .unwrap_or_else(|| "no data".to_string());
                chart.draw_series([
                    Text::new(label, (x + 0.3, y + 0.62), (FONT, 14).into_font()),
                    Text::new(text, (x + 0.4, y + 0.45), (FONT, 20).into_font()),
                ])?;
            }
        }

        root.present()?;
    }
    Ok(buf)
}

/// Mean accuracy per configuration against mean tokens or latency.
pub fn frontier(points: &[ConfigAggregate], x_metric: Outcome, show_labels: bool) -> anyhow::Result<String> {
    let (title, x_desc) = match x_metric {
        Outcome::Latency => ("Latency–Accuracy Tradeoff", "Mean Latency"),
        _ => ("Token–Accuracy Tradeoff", "Mean Tokens"),
    };
    let xy: Vec<(f64, f64, String)> = points
        .iter()
        .map(|p| {
            let x = match x_metric {
                Outcome::Latency => p.latency,
                Outcome::TotalTokens => p.total_tokens,
                Outcome::Correct => p.correct,
            };
            (x, p.correct, p.config.tag())
        })
        .collect();

    let x_range = padded(xy.iter().map(|p| p.0));
    let y_range = padded(xy.iter().map(|p| p.1));

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc("Mean Accuracy")
            .draw()?;

        chart.draw_series(
            xy.iter()
                .map(|(x, y, _)| Circle::new((*x, *y), 5, RED.mix(0.8).filled())),
        )?;
        if show_labels {
            let dx = (x_range.1 - x_range.0) * 0.01;
            chart.draw_series(
                xy.iter()
                    .map(|(x, y, tag)| Text::new(tag.clone(), (*x + dx, *y), (FONT, 12).into_font())),
            )?;
        }

        root.present()?;
    }
    Ok(buf)
}

fn integer_tick(x: f64) -> String {
    if (x - x.round()).abs() < 1e-9 && (0.0..=1.0).contains(&x) {
        format!("{}", x.round() as i64)
    } else {
        String::new()
    }
}

/// Axis range with a 5% margin; degenerate ranges are widened.
fn padded(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span <= f64::EPSILON {
        let pad = lo.abs().max(1.0) * 0.1;
        return (lo - pad, hi + pad);
    }
    (lo - span * 0.05, hi + span * 0.05)
}

fn scale(v: f64, lo: f64, hi: f64) -> f64 {
    if hi - lo <= f64::EPSILON {
        0.5
    } else {
        ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

/// Diverging red-white-blue ramp, `t` in [0, 1].
fn rd_bu(t: f64) -> RGBColor {
    let lerp = |a: u8, b: u8, t: f64| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    let (red, white, blue) = ((178, 24, 43), (247, 247, 247), (33, 102, 172));
    let (from, to, t) = if t < 0.5 {
        (red, white, t * 2.0)
    } else {
        (white, blue, (t - 0.5) * 2.0)
    };
    RGBColor(lerp(from.0, to.0, t), lerp(from.1, to.1, t), lerp(from.2, to.2, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlab_core::dashboard::DashboardParams;
    use promptlab_core::dataset::Dataset;
    use promptlab_core::model::{FactorConfig, Trial};

    fn dashboard(show_labels: bool) -> Dashboard {
        let data = Dataset::from_trials(vec![
            Trial {
                question_id: "q1".into(),
                config: FactorConfig::new(true, false, true, false),
                correct: 1.0,
                total_tokens: 120,
                latency: 1.5,
            },
            Trial {
                question_id: "q1".into(),
                config: FactorConfig::default(),
                correct: 0.0,
                total_tokens: 60,
                latency: 0.8,
            },
        ]);
        let params = DashboardParams {
            show_labels,
            ..Default::default()
        };
        Dashboard::build(&data, &params, &[])
    }

    #[test]
    fn renders_four_svg_documents() {
        let charts = render_all(&dashboard(false)).unwrap();
        assert_eq!(charts.len(), 4);
        for c in &charts {
            assert!(c.svg.starts_with("<svg"), "{} is not svg", c.file_name);
            assert!(c.svg.trim_end().ends_with("</svg>"));
        }
        assert!(charts[1].svg.contains("no data"));
    }

    #[test]
    fn frontier_labels_follow_toggle() {
        let d = dashboard(true);
        let on = frontier(&d.sections.frontier, Outcome::TotalTokens, true).unwrap();
        let off = frontier(&d.sections.frontier, Outcome::TotalTokens, false).unwrap();
        assert!(on.contains("C1F0R1K0"));
        assert!(!off.contains("C1F0R1K0"));
    }

    #[test]
    fn empty_frontier_still_renders() {
        assert!(frontier(&[], Outcome::Latency, true).unwrap().contains("Latency"));
    }

    #[test]
    fn colour_ramp_endpoints() {
        assert_eq!(rd_bu(0.0), RGBColor(178, 24, 43));
        assert_eq!(rd_bu(0.5), RGBColor(247, 247, 247));
        assert_eq!(rd_bu(1.0), RGBColor(33, 102, 172));
        assert_eq!(padded(std::iter::empty::<f64>()), (0.0, 1.0));
    }
}
