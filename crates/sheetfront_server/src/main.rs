use clap::Parser;
use sheetfront_error::{Result, ResultExt};
use sheetfront_server::config::{self, Arguments, ServerConfig};
use sheetfront_server::server;

fn main() {
    // Values from a .env file act as defaults for the environment.
    if let Err(err) = config::load_env_file() {
        println!("ERROR: {err}");
        std::process::exit(1);
    }

    let args = Arguments::parse();
    logutil::configure_global_logger(tracing::Level::INFO, args.log_format, std::io::stderr);

    if let Err(err) = run(args) {
        println!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn run(args: Arguments) -> Result<()> {
    // Validate config before starting anything.
    let config = ServerConfig::try_from_args(args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(server::serve(config))
}
