mod commands;
mod obs;

use clap::{Parser, Subcommand};
use commands::Command;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "reversa")]
#[command(
    about = "Reversal-label feature preparation and signal backtests",
    version,
    arg_required_else_help = true
)]
#[command(
    after_help = "Examples:\n  reversa validate --config configs/aapl.toml --strict\n  reversa prepare --config configs/aapl.toml --out runs/\n  reversa backtest --config configs/aapl.toml --out runs/\n  reversa importances --input runs/aapl/importances.csv\n"
)]
struct Cli {
    /// Log format on stderr: text | json. Filter with env REVERSA_LOG.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Prometheus metrics listen addr (e.g. 127.0.0.1:9898). Optional.
    #[arg(long, global = true, env = "REVERSA_METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Load the dataset, run the pipeline and report data quality.
    Validate {
        /// Config file path (TOML).
        #[arg(long, env = "REVERSA_CONFIG")]
        config: PathBuf,
        /// Fail with exit code 2 when a [data_quality] limit is exceeded.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Write the features, target and interest views.
    Prepare {
        #[arg(long, env = "REVERSA_CONFIG")]
        config: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replay the labeled signals and write the trade log and summary.
    Backtest {
        #[arg(long, env = "REVERSA_CONFIG")]
        config: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Rank `feature,importance` rows, least important first.
    Importances {
        #[arg(long)]
        input: PathBuf,
        /// Print a single JSON line instead of text bars.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl CliCommand {
    fn name(&self) -> &'static str {
        match self {
            CliCommand::Validate { .. } => "validate",
            CliCommand::Prepare { .. } => "prepare",
            CliCommand::Backtest { .. } => "backtest",
            CliCommand::Importances { .. } => "importances",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let name = cli.command.name();
    let command = match cli.command {
        CliCommand::Validate { config, strict } => Command::Validate { config, strict },
        CliCommand::Prepare { config, out } => Command::Prepare { config, out },
        CliCommand::Backtest { config, out } => Command::Backtest { config, out },
        CliCommand::Importances { input, json } => Command::Importances { input, json },
    };

    let start = Instant::now();
    let result = commands::run(command);
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::histogram!("reversa.cli.command_ms", "command" => name, "result" => result_label)
        .record(start.elapsed().as_millis() as f64);

    match result {
        Ok(output) => println!("{output}"),
        Err(err) => {
            let code = if err.contains("strict validation failed") {
                2
            } else {
                1
            };
            eprintln!("error: {err}");
            std::process::exit(code);
        }
    }
}
