use serde::Serialize;

use crate::cmd::{resolve_backend, DoctorArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        platform_transport_check(),
        temp_dir_socket_check(),
        backend_binary_check(args),
        alive_timer_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput { checks, overall };
    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("ipcbridge doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<22} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn platform_transport_check() -> CheckResult {
    if cfg!(unix) {
        CheckResult::new(
            "platform_transport",
            CheckStatus::Pass,
            "Unix domain sockets available",
        )
    } else {
        CheckResult::new(
            "platform_transport",
            CheckStatus::Fail,
            "worker connections need Unix domain sockets",
        )
    }
}

/// Binds an endpoint the same way the supervisor does: inside a fresh
/// per-run temp directory.
fn temp_dir_socket_check() -> CheckResult {
    #[cfg(unix)]
    {
        use ipcbridge_transport::{endpoint_path, UnixDomainSocket};

        let dir = match tempfile::Builder::new().prefix("ipcbridge-doctor-").tempdir() {
            Ok(dir) => dir,
            Err(err) => {
                return CheckResult::new(
                    "temp_dir_socket",
                    CheckStatus::Fail,
                    format!("cannot create temp dir: {err}"),
                )
            }
        };
        let endpoint = endpoint_path(dir.path(), "doctor");
        match UnixDomainSocket::bind(&endpoint) {
            Ok(_) => CheckResult::new(
                "temp_dir_socket",
                CheckStatus::Pass,
                format!("bound {}", endpoint.display()),
            ),
            Err(err) => CheckResult::new(
                "temp_dir_socket",
                CheckStatus::Fail,
                format!("socket bind failed: {err}"),
            ),
        }
    }

    #[cfg(not(unix))]
    {
        CheckResult::new(
            "temp_dir_socket",
            CheckStatus::Skip,
            "temp socket check not implemented on this platform",
        )
    }
}

fn backend_binary_check(args: DoctorArgs) -> CheckResult {
    match resolve_backend(args.backend) {
        Some(path) if path.is_file() => {
            CheckResult::new("backend_binary", CheckStatus::Pass, path.display().to_string())
        }
        Some(path) => CheckResult::new(
            "backend_binary",
            CheckStatus::Fail,
            format!("{} does not exist", path.display()),
        ),
        None => CheckResult::new(
            "backend_binary",
            CheckStatus::Fail,
            "cannot locate the running executable",
        ),
    }
}

fn alive_timer_check() -> CheckResult {
    let config = ipcbridge_connection::ClientConfig::from_env();
    match config.alive_interval {
        Some(interval) => CheckResult::new(
            "alive_timer",
            CheckStatus::Info,
            format!("restart unresponsive worker after {interval:?}"),
        ),
        None => CheckResult::new(
            "alive_timer",
            CheckStatus::Warn,
            format!(
                "disabled by {}; hung workers are never restarted",
                ipcbridge_connection::NO_ALIVE_TIMER_ENV
            ),
        ),
    }
}
