use super::{estimators, exit_codes, Session};
use crate::cli::args::ModelsArgs;
use promptlab_core::estimators_api::run_all;
use promptlab_core::report::console;

pub fn cmd_models(session: Session, args: ModelsArgs) -> anyhow::Result<i32> {
    let outcomes = run_all(&estimators(args.all_factors), &session.data);
    print!("{}", console::render_estimates(&outcomes));
    Ok(exit_codes::OK)
}
