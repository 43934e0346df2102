use clap::{Args, Parser, Subcommand, ValueEnum};
use promptlab_core::config::LabConfig;
use promptlab_core::dashboard::DashboardParams;
use promptlab_core::model::{flag, Factor, Outcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "promptlab",
    version,
    about = "Causal analysis of prompt-engineering factorial experiments"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Experiment results CSV (overrides the config file)
    #[arg(long, global = true, env = "PROMPTLAB_DATA")]
    pub data: Option<PathBuf>,

    /// Config file; defaults to ./promptlab.yaml when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Reject unknown config keys instead of warning
    #[arg(long, global = true)]
    pub strict_config: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Overall and selected-configuration KPIs
    Summary(ViewArgs),
    /// CoT effect and the CoT x Few-shot interaction heatmap
    Effects(ViewArgs),
    /// Per-configuration token/latency vs accuracy aggregates
    Frontier(ViewArgs),
    /// Efficiency ranking with optional CSV export
    Efficiency(EfficiencyArgs),
    /// Fixed-effects regression and average treatment effects
    Models(ModelsArgs),
    /// Print the methodology notes
    Docs,
    /// Every section at once
    Dashboard(DashboardArgs),
    /// Write SVG charts, a markdown report and the efficiency CSV
    Render(RenderArgs),
    /// Interactive session reading commands from stdin
    Explore(ExploreArgs),
    /// Write a sample promptlab.yaml
    Init(InitArgs),
    Version,
}

/// Selection and display flags shared by the dashboard-style commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Heatmap metric: correct | total_tokens | latency
    #[arg(long)]
    pub metric: Option<Outcome>,

    /// Label frontier points with their configuration tag
    #[arg(long)]
    pub show_labels: bool,

    #[arg(long, value_parser = parse_flag)]
    pub cot: Option<bool>,

    #[arg(long, value_parser = parse_flag)]
    pub fewshot: Option<bool>,

    #[arg(long, value_parser = parse_flag)]
    pub role: Option<bool>,

    #[arg(long, value_parser = parse_flag)]
    pub constraint: Option<bool>,
}

impl ViewArgs {
    /// Config values overridden by whatever was given on the command line.
    pub fn params(&self, cfg: &LabConfig) -> DashboardParams {
        let mut params = cfg.params();
        if let Some(metric) = self.metric {
            params.metric = metric;
        }
        params.show_labels |= self.show_labels;
        for (factor, value) in [
            (Factor::Cot, self.cot),
            (Factor::Fewshot, self.fewshot),
            (Factor::Role, self.role),
            (Factor::Constraint, self.constraint),
        ] {
            if let Some(on) = value {
                params.selection = params.selection.with(factor, on);
            }
        }
        params
    }
}

pub fn parse_flag(raw: &str) -> Result<bool, String> {
    flag::parse(raw).ok_or_else(|| format!("expected 0 or 1, got '{}'", raw))
}

#[derive(Args, Debug, Clone)]
pub struct EfficiencyArgs {
    /// Write the efficiency table as CSV. A bare flag uses the configured file name.
    #[arg(long, num_args = 0..=1)]
    pub export: Option<Option<PathBuf>>,
}

#[derive(Args, Debug, Clone)]
pub struct ModelsArgs {
    /// Report treatment effects for role and constraint as well
    #[arg(long)]
    pub all_factors: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long)]
    pub all_factors: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(long, default_value = "promptlab-report")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub all_factors: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(long)]
    pub all_factors: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = promptlab_core::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlab_core::model::FactorConfig;

    #[test]
    fn flags_override_config_selection() {
        let cli = Cli::parse_from([
            "promptlab",
            "summary",
            "--cot",
            "1",
            "--constraint",
            "true",
            "--metric",
            "latency",
        ]);
        let Command::Summary(view) = cli.cmd else {
            panic!("expected summary");
        };
        let cfg = LabConfig {
            selection: FactorConfig::new(false, true, false, false),
            ..Default::default()
        };
        let p = view.params(&cfg);
        assert_eq!(p.selection, FactorConfig::new(true, true, false, true));
        assert_eq!(p.metric, Outcome::Latency);
        assert!(!p.show_labels);
    }

    #[test]
    fn rejects_non_binary_flag() {
        assert!(Cli::try_parse_from(["promptlab", "summary", "--role", "2"]).is_err());
    }

    #[test]
    fn global_data_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["promptlab", "docs", "--data", "x.csv"]).unwrap();
        assert_eq!(cli.global.data, Some(PathBuf::from("x.csv")));
    }

    #[test]
    fn bare_export_flag() {
        let cli = Cli::parse_from(["promptlab", "efficiency", "--export"]);
        let Command::Efficiency(args) = cli.cmd else {
            panic!("expected efficiency");
        };
        assert_eq!(args.export, Some(None));
    }
}
