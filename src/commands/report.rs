use crate::cli::{Cli, Commands};
use crate::domain::models::TopRow;
use crate::services::html::render_report_page;
use crate::services::output::{print_one, print_out};
use crate::services::storage::{default_period, load_report_config, load_summary, validate_period};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct PageReport {
    period: String,
    path: String,
    bytes: usize,
}

pub fn handle_report_commands(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Top { period, count } => {
            let period = period.clone().unwrap_or_else(default_period);
            validate_period(&period)?;
            let summary = load_summary(&cli.output_dir, &period)?;
            let rows: Vec<TopRow> = summary
                .top
                .iter()
                .take(*count)
                .map(|t| TopRow {
                    rank: t.rank,
                    key_id: t.key_id.to_string(),
                    short_id: t.key_id.short_hex(),
                    name: t.name.clone(),
                    msd: t.msd,
                })
                .collect();
            print_out(cli.json, &rows, |r| {
                format!("{}\t0x{}\t{:.4}\t{}", r.rank, r.short_id, r.msd, r.name)
            })?;
        }
        Commands::Report {
            period,
            previous,
            config,
            out,
        } => {
            let period = period.clone().unwrap_or_else(default_period);
            validate_period(&period)?;
            let summary = load_summary(&cli.output_dir, &period)?;
            let previous = match previous {
                Some(prev) => {
                    validate_period(prev)?;
                    Some(load_summary(&cli.output_dir, prev)?)
                }
                None => None,
            };
            let cfg = load_report_config(config.as_deref())?;
            let page = render_report_page(&summary, previous.as_ref(), &cfg);

            let path = out
                .clone()
                .unwrap_or_else(|| cli.output_dir.join(format!("report-{}.html", period)));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &page)?;
            info!(path = %path.display(), "report page written");

            let report = PageReport {
                period,
                path: path.to_string_lossy().to_string(),
                bytes: page.len(),
            };
            print_one(cli.json, report, |r| {
                format!("wrote report for {} to {}", r.period, r.path)
            })?;
        }
        _ => unreachable!("handled by pipeline command tree"),
    }
    Ok(())
}
