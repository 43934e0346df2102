use super::{estimators, exit_codes, Session};
use crate::charts;
use crate::cli::args::RenderArgs;
use anyhow::Context;
use promptlab_core::dashboard::Dashboard;
use promptlab_core::report::markdown::{self, ChartLinks};

pub const CHART_DIR: &str = "charts";
pub const REPORT_FILE: &str = "report.md";

pub fn cmd_render(session: Session, args: RenderArgs) -> anyhow::Result<i32> {
    let params = args.view.params(&session.cfg);
    let d = Dashboard::build(&session.data, &params, &estimators(args.all_factors));

    let chart_dir = args.out_dir.join(CHART_DIR);
    std::fs::create_dir_all(&chart_dir)
        .with_context(|| format!("failed to create {}", chart_dir.display()))?;

    let mut links = ChartLinks::default();
    for chart in charts::render_all(&d)? {
        let path = chart_dir.join(chart.file_name);
        std::fs::write(&path, &chart.svg)
            .with_context(|| format!("failed to write chart {}", path.display()))?;
        let rel = format!("{}/{}", CHART_DIR, chart.file_name);
        match chart.kind {
            charts::ChartKind::CotEffect => links.cot_effect = Some(rel),
            charts::ChartKind::Heatmap => links.heatmap = Some(rel),
            charts::ChartKind::TokenFrontier => links.token_frontier = Some(rel),
            charts::ChartKind::LatencyFrontier => links.latency_frontier = Some(rel),
        }
    }

    let export_name = &session.cfg.export.file_name;
    d.sections
        .efficiency
        .write_csv(args.out_dir.join(export_name))?;
    links.export_csv = Some(export_name.clone());

    let report = args.out_dir.join(REPORT_FILE);
    std::fs::write(&report, markdown::render(&d, &links))
        .with_context(|| format!("failed to write {}", report.display()))?;

    tracing::info!(
        event = "report_rendered",
        out_dir = %args.out_dir.display(),
        rows = d.rows,
    );
    eprintln!("wrote report: {}", report.display());
    Ok(exit_codes::OK)
}
