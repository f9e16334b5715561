use clap::{Args, Subcommand};
use std::path::PathBuf;

use ipcbridge::logging::LogLevel;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod doctor;
pub mod ping;
pub mod version;

/// Environment variable naming the worker binary.
pub const BACKEND_ENV: &str = "IPCBRIDGE_BACKEND";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a backend worker, send completion requests and time the replies.
    Ping(PingArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat, log_level: LogLevel) -> CliResult<i32> {
    match command {
        Command::Ping(args) => ping::run(args, format, log_level),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Worker binary. Default: `ipcbridge-backend` next to this executable.
    #[arg(long, value_name = "PATH", env = BACKEND_ENV)]
    pub backend: Option<PathBuf>,
    /// Number of completion requests to send.
    #[arg(long, short = 'c', default_value = "3")]
    pub count: usize,
    /// Per-request and connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    /// Worker binary to check. Default: `ipcbridge-backend` next to this executable.
    #[arg(long, value_name = "PATH", env = BACKEND_ENV)]
    pub backend: Option<PathBuf>,
}

/// The worker binary to use: explicit path first, then the sibling of the
/// running executable.
pub fn resolve_backend(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let exe = std::env::current_exe().ok()?;
    let name = format!("ipcbridge-backend{}", std::env::consts::EXE_SUFFIX);
    Some(exe.parent()?.join(name))
}
