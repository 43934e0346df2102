use super::args::*;
use anyhow::Context;
use promptlab_core::config::{load_config, LabConfig, DEFAULT_CONFIG_FILE};
use promptlab_core::dataset::Dataset;
use promptlab_core::estimators_api::Estimator;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod dashboard;
pub mod explore;
pub mod models;
pub mod render;
pub mod view;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let global = cli.global;
    match cli.cmd {
        Command::Init(args) => cmd_init(args),
        Command::Docs => {
            print!("{}", promptlab_core::docs::DOCUMENTATION);
            Ok(exit_codes::OK)
        }
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
        Command::Summary(args) => view::cmd_summary(load_session(&global).await?, args),
        Command::Effects(args) => view::cmd_effects(load_session(&global).await?, args),
        Command::Frontier(args) => view::cmd_frontier(load_session(&global).await?, args),
        Command::Efficiency(args) => view::cmd_efficiency(load_session(&global).await?, args),
        Command::Models(args) => models::cmd_models(load_session(&global).await?, args),
        Command::Dashboard(args) => dashboard::cmd_dashboard(load_session(&global).await?, args),
        Command::Render(args) => render::cmd_render(load_session(&global).await?, args),
        Command::Explore(args) => explore::cmd_explore(load_session(&global).await?, args),
    }
}

/// Resolved configuration plus the dataset it points at.
pub struct Session {
    pub cfg: LabConfig,
    pub data: Dataset,
}

pub async fn load_session(global: &GlobalArgs) -> anyhow::Result<Session> {
    let mut cfg = match resolve_config_path(global.config.as_deref()) {
        Some(path) => load_config(&path, global.strict_config)
            .map_err(|e| anyhow::anyhow!(e))?,
        None => LabConfig::default(),
    };
    if let Some(data) = &global.data {
        cfg.data = data.clone();
    }

    let data = read_dataset(&cfg.data).await?;
    Ok(Session { cfg, data })
}

/// An explicit `--config` must exist; the default file is optional.
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    }
}

async fn read_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let owned = path.to_path_buf();
    let data = tokio::task::spawn_blocking(move || Dataset::load(owned))
        .await?
        .with_context(|| format!("failed to load dataset {}", path.display()))?;
    if data.is_empty() {
        tracing::warn!(event = "dataset_empty", path = %path.display());
    }
    Ok(data)
}

pub fn estimators(all_factors: bool) -> Vec<Arc<dyn Estimator>> {
    if all_factors {
        promptlab_metrics::extended_estimators()
    } else {
        promptlab_metrics::default_estimators()
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if args.config.exists() {
        eprintln!("note: {} already exists", args.config.display());
        return Ok(exit_codes::OK);
    }
    if let Some(parent) = args.config.parent() {
        std::fs::create_dir_all(parent)?;
    }
    promptlab_core::config::write_sample_config(&args.config).map_err(|e| anyhow::anyhow!(e))?;
    eprintln!("created {}", args.config.display());
    Ok(exit_codes::OK)
}

pub(crate) fn write_output(out: Option<&Path>, rendered: &str) -> anyhow::Result<()> {
    match out {
        Some(p) => {
            std::fs::write(p, rendered)
                .with_context(|| format!("failed to write {}", p.display()))?;
            eprintln!("wrote file: {}", p.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_is_used_even_if_missing() {
        let p = PathBuf::from("/nonexistent/promptlab.yaml");
        assert_eq!(resolve_config_path(Some(&p)), Some(p));
    }

    #[tokio::test]
    async fn data_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("runs.csv");
        std::fs::write(
            &csv,
            "question_id,cot,fewshot,role,constraint,correct,total_tokens,latency\nq1,1,0,0,0,1,10,1.0\n",
        )
        .unwrap();
        let cfg = dir.path().join("lab.yaml");
        std::fs::write(&cfg, "version: 1\ndata: missing.csv\n").unwrap();

        let global = GlobalArgs {
            data: Some(csv.clone()),
            config: Some(cfg),
            strict_config: false,
        };
        let session = load_session(&global).await.unwrap();
        assert_eq!(session.cfg.data, csv);
        assert_eq!(session.data.len(), 1);
    }

    #[tokio::test]
    async fn missing_dataset_names_the_path() {
        let global = GlobalArgs {
            data: Some(PathBuf::from("/nonexistent/results.csv")),
            ..Default::default()
        };
        let err = load_session(&global).await.err().unwrap();
        assert!(format!("{:#}", err).contains("/nonexistent/results.csv"));
    }
}
