//! Line-oriented interactive session.
//!
//! Each input line is one command. After every state change the
//! selection-dependent sections are rebuilt from the dataset; the estimator
//! output is computed once when the session starts.

use super::{estimators, exit_codes, Session};
use crate::cli::args::{parse_flag, ExploreArgs};
use promptlab_core::dashboard::{Dashboard, DashboardParams, StaticSections};
use promptlab_core::dataset::Dataset;
use promptlab_core::model::{Factor, FactorConfig, Outcome};
use promptlab_core::report::console;
use std::io::{BufRead, Write};
use std::str::FromStr;

const HELP: &str = "\
commands:
  metric <correct|total_tokens|latency>   heatmap metric
  labels <on|off>                         frontier point labels
  set <factor> <0|1>                      change one factor of the selection
  select <cot> <fewshot> <role> <constraint>
  show                                    print the full dashboard
  help
  quit
";

#[derive(Debug, Clone, PartialEq)]
pub enum ExploreCommand {
    Metric(Outcome),
    Labels(bool),
    Set(Factor, bool),
    Select(FactorConfig),
    Show,
    Help,
    Quit,
}

impl FromStr for ExploreCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["metric", m] => Ok(Self::Metric(m.parse()?)),
            ["labels", "on"] => Ok(Self::Labels(true)),
            ["labels", "off"] => Ok(Self::Labels(false)),
            ["set", factor, value] => Ok(Self::Set(factor.parse()?, parse_flag(value)?)),
            ["select", c, f, r, k] => Ok(Self::Select(FactorConfig::new(
                parse_flag(c)?,
                parse_flag(f)?,
                parse_flag(r)?,
                parse_flag(k)?,
            ))),
            ["show"] => Ok(Self::Show),
            ["help"] | ["?"] => Ok(Self::Help),
            ["quit"] | ["exit"] | ["q"] => Ok(Self::Quit),
            _ => Err(format!("unrecognised command '{}' (try 'help')", line.trim())),
        }
    }
}

impl ExploreCommand {
    /// New parameters after applying the command, or `None` if it does not
    /// change the selection.
    fn apply(&self, params: &DashboardParams) -> Option<DashboardParams> {
        let mut next = *params;
        match *self {
            Self::Metric(m) => next.metric = m,
            Self::Labels(on) => next.show_labels = on,
            Self::Set(factor, on) => next.selection = next.selection.with(factor, on),
            Self::Select(config) => next.selection = config,
            Self::Show | Self::Help | Self::Quit => return None,
        }
        Some(next)
    }
}

pub fn cmd_explore(session: Session, args: ExploreArgs) -> anyhow::Result<i32> {
    let params = args.view.params(&session.cfg);
    let sections = StaticSections::compute(&session.data, &estimators(args.all_factors));

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_session(&session.data, params, &sections, stdin.lock(), stdout.lock())?;
    Ok(exit_codes::OK)
}

/// Drives a session until `quit` or end of input. Returns the number of
/// dashboard rebuilds.
pub fn run_session<R: BufRead, W: Write>(
    data: &Dataset,
    mut params: DashboardParams,
    sections: &StaticSections,
    input: R,
    mut out: W,
) -> anyhow::Result<usize> {
    let mut rebuilds = 0;
    let dash = Dashboard::with_sections(data, &params, sections.clone());
    write!(out, "{}", console::render_dashboard(&dash))?;
    writeln!(out, "\ntype 'help' for commands")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let cmd = match trimmed.parse::<ExploreCommand>() {
            Ok(cmd) => cmd,
            Err(msg) => {
                writeln!(out, "error: {}", msg)?;
                out.flush()?;
                continue;
            }
        };
        tracing::debug!(event = "explore_command", command = ?cmd);

        match cmd {
            ExploreCommand::Quit => break,
            ExploreCommand::Help => write!(out, "{}", HELP)?,
            ExploreCommand::Show => {
                let dash = Dashboard::with_sections(data, &params, sections.clone());
                rebuilds += 1;
                write!(out, "{}", console::render_dashboard(&dash))?;
            }
            other => {
                if let Some(next) = other.apply(&params) {
                    params = next;
                }
                let dash = Dashboard::with_sections(data, &params, sections.clone());
                rebuilds += 1;
                write_selection_view(&mut out, &dash)?;
            }
        }
        out.flush()?;
    }
    Ok(rebuilds)
}

fn write_selection_view<W: Write>(out: &mut W, d: &Dashboard) -> std::io::Result<()> {
    writeln!(
        out,
        "\n[metric={} labels={} selection: {}]",
        d.params.metric,
        if d.params.show_labels { "on" } else { "off" },
        d.params.selection
    )?;
    write!(out, "{}", console::render_selected(&d.selected))?;
    writeln!(out)?;
    write!(out, "{}", console::render_heatmap(&d.heatmap))?;
    writeln!(out)?;
    write!(
        out,
        "{}",
        console::render_frontier(&d.sections.frontier, d.params.show_labels)
    )
}
