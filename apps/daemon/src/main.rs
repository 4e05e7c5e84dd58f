//! chunkyard daemon entry point.

mod app;
mod config;

use std::path::PathBuf;

use chunkyard_protocol::DEFAULT_CHUNK_SIZE;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Resumable chunked upload server.
#[derive(Parser, Debug)]
#[command(name = "chunkyardd")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the upload server.
    Serve(ServeArgs),
    /// Upload a file to a running server.
    Push(PushArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, env = "CHUNKYARD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding session chunks and committed files
    #[arg(long)]
    content_path: Option<PathBuf>,

    /// TCP port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct PushArgs {
    /// File to upload
    file: PathBuf,

    /// Server base URL, e.g. http://127.0.0.1:19502
    #[arg(short, long, env = "CHUNKYARD_SERVER")]
    server: String,

    /// Destination name on the server (defaults to the file name)
    #[arg(short, long)]
    name: Option<String>,

    /// Bytes per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Command::Serve(args) => {
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting chunkyardd");

            let mut config = config::Config::load(args.config.as_deref())?;
            config.apply_overrides(args.content_path, args.port);
            tracing::info!(
                content_path = %config.content_path.display(),
                port = config.port,
                "configuration loaded"
            );

            rt.block_on(app::serve(config))?;
            tracing::info!("daemon shut down cleanly");
        }
        Command::Push(args) => {
            rt.block_on(app::push(
                &args.file,
                &args.server,
                args.name,
                args.chunk_size,
            ))?;
        }
    }

    Ok(())
}
