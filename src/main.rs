use anyhow::Result;
use std::sync::Arc;
use tabkeep::cli;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    // Process CLI arguments first (before logging init for cleaner output)
    let (options, cli) = match cli::process_cli() {
        cli::CliResult::Exit(code) => std::process::exit(code),
        cli::CliResult::Continue(options, cli) => (options, cli),
    };
    // Routes log::info!() etc. to /tmp/tabkeep_debug.log, mirrored to stderr when RUST_LOG is set.
    // CLI --log-level takes precedence over DEBUG_LEVEL.
    tabkeep::debug::init_log_bridge(options.log_level);

    log::info!("Starting tabkeep {}", tabkeep::VERSION);

    // Runtime for background session writes
    let runtime = Arc::new(Runtime::new()?);
    let result = cli::run(cli, Arc::clone(&runtime));

    // Give a hung background write a bounded window rather than blocking exit
    if let Ok(rt) = Arc::try_unwrap(runtime) {
        rt.shutdown_timeout(std::time::Duration::from_secs(2));
    }

    if let Err(e) = result {
        eprintln!("tabkeep: error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
