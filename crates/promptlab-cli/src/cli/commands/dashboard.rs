use super::{estimators, exit_codes, write_output, Session};
use crate::cli::args::{DashboardArgs, OutputFormat};
use promptlab_core::dashboard::Dashboard;
use promptlab_core::report::{console, json};

pub fn cmd_dashboard(session: Session, args: DashboardArgs) -> anyhow::Result<i32> {
    let params = args.view.params(&session.cfg);
    let d = Dashboard::build(&session.data, &params, &estimators(args.all_factors));

    match (args.format, args.out.as_deref()) {
        (OutputFormat::Json, Some(path)) => {
            json::write_json(&d, path)?;
            eprintln!("wrote file: {}", path.display());
        }
        (OutputFormat::Json, None) => {
            println!("{}", serde_json::to_string_pretty(&json::to_json(&d)?)?);
        }
        (OutputFormat::Text, out) => write_output(out, &console::render_dashboard(&d))?,
    }
    Ok(exit_codes::OK)
}
