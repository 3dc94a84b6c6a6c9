use std::env::var;
use std::process::ExitCode;

use pit::cli::{self, Cli};
use pit::ui::output;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{registry, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(e) = setup(cli.debug) {
        output::error(format!("failed to initialize logging: {e}"));
        return ExitCode::FAILURE;
    }

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--debug`.
fn setup(debug: bool) -> anyhow::Result<()> {
    let directives = match var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => value,
        _ if debug => "pit=debug".to_owned(),
        _ => "pit=warn".to_owned(),
    };

    registry()
        .with(EnvFilter::builder().parse(directives)?)
        .with(layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}
