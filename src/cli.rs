use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wotstat", version, about = "Keyring web-of-trust analysis CLI")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        default_value = "output",
        help = "Base directory holding one subdirectory of artifacts per period"
    )]
    pub output_dir: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Turn a pgpring colon dump into the preprocessed signature graph
    Preprocess {
        #[arg(long, help = "Keyring dump file (pgpring colon format)")]
        dump: PathBuf,
        #[arg(long, default_value = ".", help = "Directory for preprocessed outputs")]
        data_dir: PathBuf,
    },
    /// Compute the strong set and per-key MSD, writing period artifacts
    Analyze {
        #[arg(long, default_value = ".", help = "Directory holding preprocess outputs")]
        data_dir: PathBuf,
        #[arg(long, help = "Reporting period YYYYMM (default: current month)")]
        period: Option<String>,
        #[arg(long, default_value_t = 50, help = "Best-connected entries kept in the summary")]
        top: usize,
        #[arg(long, default_value_t = false, help = "Skip individual key reports")]
        no_individual: bool,
        #[arg(
            long,
            default_value_t = false,
            help = "Write key reports directly under keys/ instead of two-hex subdirectories"
        )]
        flat_dirs: bool,
    },
    /// List the best-connected keys of an analyzed period
    Top {
        #[arg(long, help = "Reporting period YYYYMM (default: current month)")]
        period: Option<String>,
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Render the monthly strong-set report page
    Report {
        #[arg(long, help = "Reporting period YYYYMM (default: current month)")]
        period: Option<String>,
        #[arg(long, help = "Previous period for percentage deltas")]
        previous: Option<String>,
        #[arg(long, help = "Report config TOML (title, prose, key comments)")]
        config: Option<PathBuf>,
        #[arg(long, help = "Page path (default: <output-dir>/report-<period>.html)")]
        out: Option<PathBuf>,
    },
}
