use crate::cli::{Cli, Commands};
use crate::services::analyze::{self, AnalyzeOptions};
use crate::services::html::format_count;
use crate::services::output::print_one;
use crate::services::preprocess;
use crate::services::storage::{default_period, validate_period};

pub fn handle_pipeline_commands(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Preprocess { dump, data_dir } => {
            let report = preprocess::run(dump, data_dir)?;
            print_one(cli.json, report, |r| {
                format!(
                    "preprocessed {} of {} keys ({} sigs) into {}",
                    format_count(r.scan.usable_keys),
                    format_count(r.scan.total_keys),
                    format_count(r.scan.total_sigs),
                    r.preprocessed_path
                )
            })?;
        }
        Commands::Analyze {
            data_dir,
            period,
            top,
            no_individual,
            flat_dirs,
        } => {
            let period = period.clone().unwrap_or_else(default_period);
            validate_period(&period)?;
            let opts = AnalyzeOptions {
                period,
                top: *top,
                individual_reports: !no_individual,
                flat_dirs: *flat_dirs,
            };
            let summary = analyze::run(data_dir, &cli.output_dir, &opts)?;
            print_one(cli.json, summary, |s| {
                format!(
                    "period {}: strong set {} / signed {} / average MSD {:.4}",
                    s.period,
                    format_count(s.strong.size),
                    format_count(s.strong.signed),
                    s.msd.average
                )
            })?;
        }
        _ => unreachable!("handled by report command tree"),
    }
    Ok(())
}
