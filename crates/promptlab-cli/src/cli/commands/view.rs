use super::{exit_codes, Session};
use crate::cli::args::{EfficiencyArgs, ViewArgs};
use promptlab_core::aggregate::{config_aggregates, group_mean};
use promptlab_core::dashboard::{Dashboard, Heatmap, SelectedPerformance};
use promptlab_core::efficiency::EfficiencyTable;
use promptlab_core::model::{Factor, Outcome};
use promptlab_core::report::console;
use std::path::PathBuf;

pub fn cmd_summary(session: Session, args: ViewArgs) -> anyhow::Result<i32> {
    let params = args.params(&session.cfg);
    let d = Dashboard::build(&session.data, &params, &[]);
    print!("{}", console::render_overall(d.sections.overall.as_ref()));
    println!();
    print!("{}", console::render_selected(&d.selected));
    Ok(exit_codes::OK)
}

pub fn cmd_effects(session: Session, args: ViewArgs) -> anyhow::Result<i32> {
    let params = args.params(&session.cfg);
    let all = session.data.all();
    let cot = group_mean(&all, &[Factor::Cot], Outcome::Correct);
    print!("{}", console::render_cot_effect(&cot));
    println!();
    print!("{}", console::render_heatmap(&Heatmap::compute(&session.data, params.metric)));

    if let SelectedPerformance::NoData { config } =
        SelectedPerformance::compute(&session.data, params.selection)
    {
        println!();
        println!("{} ({})", console::NO_DATA_NOTICE, config);
    }
    Ok(exit_codes::OK)
}

pub fn cmd_frontier(session: Session, args: ViewArgs) -> anyhow::Result<i32> {
    let params = args.params(&session.cfg);
    let points = config_aggregates(&session.data.all());
    print!("{}", console::render_frontier(&points, params.show_labels));
    Ok(exit_codes::OK)
}

pub fn cmd_efficiency(session: Session, args: EfficiencyArgs) -> anyhow::Result<i32> {
    let table = EfficiencyTable::from_trials(&session.data.all());
    print!("{}", console::render_efficiency(&table));

    if let Some(target) = args.export {
        let path = target.unwrap_or_else(|| PathBuf::from(&session.cfg.export.file_name));
        table.write_csv(&path)?;
        eprintln!("wrote file: {}", path.display());
    }
    Ok(exit_codes::OK)
}
