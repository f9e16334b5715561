//! Demo code-model worker.
//!
//! Started by the editor side with the endpoint to connect back to as its
//! only argument. Serves [`DemoBackend`] until the editor sends `End` or
//! closes the connection.

use std::path::PathBuf;

use clap::Parser;
use ipcbridge::demo::DemoBackend;
use ipcbridge::logging::{init_logging, LogFormat, LogLevel};
use ipcbridge_connection::{ConnectionServer, ServerConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ipcbridge-backend", version, about = "Demo code-model worker")]
struct Args {
    /// Endpoint the editor is listening on.
    endpoint: PathBuf,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", env = "IPCBRIDGE_LOG_FORMAT")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", env = "IPCBRIDGE_LOG_LEVEL")]
    log_level: LogLevel,
}

fn main() {
    let args = Args::parse();
    init_logging(args.log_format, args.log_level);

    let config = ServerConfig::from_env();
    info!(
        endpoint = %args.endpoint.display(),
        alive_interval = ?config.alive_interval,
        "backend starting"
    );

    let mut server = ConnectionServer::new(DemoBackend::new(), config);
    if let Err(err) = server.connect(&args.endpoint) {
        error!(error = %err, "failed to connect to editor");
        std::process::exit(1);
    }
    server.run();

    let backend = server.into_inner();
    info!(
        ended = backend.has_ended(),
        translation_units = backend.translation_unit_count(),
        "backend finished"
    );
}
