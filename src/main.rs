//! tfhydrate - materialize Terraform module trees from Kubernetes manifests

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tfhydrate::hydrate::{Config, Hydrator};

/// Hydrate a stream of Terraform Workspace manifests into a module tree
#[derive(Parser, Debug)]
#[command(name = "tfhydrate", version, about, long_about = None)]
struct Cli {
    /// Path to the manifest stream (standard input when omitted)
    #[arg(short, long, env = "FILE")]
    file: Option<PathBuf>,

    /// Path to the output directory; must not exist yet
    #[arg(short, long, env = "OUTPUT", default_value = tfhydrate::DEFAULT_OUTPUT_DIR)]
    out: PathBuf,

    /// Workers used to decode manifests (defaults to host parallelism)
    #[arg(long, env = "WORKERS")]
    workers: Option<usize>,

    /// Exit early on the first error
    #[arg(long, env = "FAIL_FAST")]
    fail_fast: bool,

    /// Do not exit non-zero if an error occurred
    #[arg(long, env = "ALLOW_FAILURE")]
    allow_failure: bool,

    /// Log level [debug,info,warn,error]
    #[arg(short = 'l', long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format [json,console]
    #[arg(short = 'e', long, env = "LOG_ENCODING", default_value = "json")]
    log_encoding: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(message) = init_tracing(&cli.log_level, &cli.log_encoding) {
        eprintln!("{message}");
        std::process::exit(1);
    }

    let workers = cli.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    });

    let hydrator = Hydrator::new(Config {
        out: cli.out,
        workers,
        fail_fast: cli.fail_fast,
    });

    let result = match &cli.file {
        Some(path) => match File::open(path).await {
            Ok(file) => hydrator.run(BufReader::new(file)).await,
            Err(err) => Err(err.into()),
        },
        None => hydrator.run(BufReader::new(tokio::io::stdin())).await,
    };

    if let Err(err) = result {
        eprintln!("{err}");
        if !cli.allow_failure {
            std::process::exit(1);
        }
    }
}

/// Initialize the tracing subscriber from the CLI flags
fn init_tracing(level: &str, encoding: &str) -> Result<(), String> {
    let filter =
        EnvFilter::try_new(level).map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    match encoding {
        "json" => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
        "console" => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
        other => return Err(format!("invalid log encoding `{other}`, expected json or console")),
    }

    Ok(())
}
