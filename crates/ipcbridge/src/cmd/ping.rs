use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ipcbridge::logging::LogLevel;
use ipcbridge_connection::{ClientConfig, CommandLauncher, ConnectionClient};
use ipcbridge_messages::*;
use tracing::{debug, info, warn};

use crate::cmd::{resolve_backend, PingArgs};
use crate::exit::{connection_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT, USAGE, WORKER_ERROR};
use crate::output::{print_ping, OutputFormat, PingReply, PingReport};

/// Environment variable the worker reads its log level from.
pub const WORKER_LOG_LEVEL_ENV: &str = "IPCBRIDGE_LOG_LEVEL";

const PING_FILE: &str = "ipcbridge-ping.cpp";
const PING_SOURCE: &str = "int answer = 42;\nint main() {\n    return answer;\n}\n";

/// Editor-side handler that only cares about completion answers.
#[derive(Debug, Default)]
struct PingClient {
    answers: HashMap<u64, usize>,
    missing_units: usize,
}

impl CodeModelClient for PingClient {
    fn alive(&mut self) {}

    fn echo(&mut self, message: EchoMessage) {
        debug!(message = %message.message, "echo from worker");
    }

    fn code_completed(&mut self, message: CodeCompletedMessage) {
        self.answers
            .insert(message.ticket_number, message.code_completions.len());
    }

    fn document_annotations_changed(&mut self, _message: DocumentAnnotationsChangedMessage) {}

    fn references(&mut self, _message: ReferencesMessage) {}

    fn follow_symbol(&mut self, _message: FollowSymbolMessage) {}

    fn tool_tip(&mut self, _message: ToolTipMessage) {}

    fn translation_unit_does_not_exist(&mut self, message: TranslationUnitDoesNotExistMessage) {
        warn!(file = %message.file_container.file_path, "worker does not know the ping file");
        self.missing_units += 1;
    }

    fn project_parts_do_not_exist(&mut self, message: ProjectPartsDoNotExistMessage) {
        warn!(ids = ?message.project_part_ids, "worker does not know project parts");
    }
}

pub fn run(args: PingArgs, format: OutputFormat, log_level: LogLevel) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }
    let timeout = parse_duration(&args.timeout)?;
    let backend = resolve_backend(args.backend)
        .ok_or_else(|| CliError::new(USAGE, "cannot locate ipcbridge-backend; pass --backend"))?;
    if !backend.is_file() {
        return Err(CliError::new(
            WORKER_ERROR,
            format!("worker binary not found: {}", backend.display()),
        ));
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut config = ClientConfig::from_env();
    config.connect_timeout = timeout;
    let launcher = CommandLauncher::new(&backend).env(WORKER_LOG_LEVEL_ENV, log_level.as_arg());
    let mut client = ConnectionClient::new(PingClient::default(), Box::new(launcher), config);

    client
        .start()
        .map_err(|err| connection_error("failed to start worker", err))?;
    client
        .wait_for_connection(timeout)
        .map_err(|err| connection_error("worker did not connect", err))?;
    let endpoint = client.endpoint().map(|p| p.display().to_string());
    info!(backend = %backend.display(), ?endpoint, "worker connected");

    let mut registered_for = None;
    let mut replies = Vec::with_capacity(args.count);
    let mut sent = 0usize;
    let mut timed_out = false;

    for ticket in 1..=args.count as u64 {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        if !client.is_connected() {
            if let Err(err) = client.wait_for_connection(timeout) {
                warn!(error = %err, "worker not connected");
                timed_out = true;
                break;
            }
        }

        // A restarted worker starts empty.
        if registered_for != Some(client.restart_count()) {
            register_ping_file(&mut client);
            registered_for = Some(client.restart_count());
        }

        let Some(server) = client.server() else {
            warn!("worker not connected");
            timed_out = true;
            break;
        };
        let started = Instant::now();
        server.complete_code(CompleteCodeMessage {
            file_path: PING_FILE.to_string(),
            line: 3,
            column: 12,
            ticket_number: ticket,
            ..CompleteCodeMessage::default()
        });
        sent += 1;

        let answered = client.run_until(
            |c| c.handler().answers.contains_key(&ticket) || !running.load(Ordering::SeqCst),
            timeout,
        );
        match client.handler().answers.get(&ticket) {
            Some(&completions) if answered => {
                replies.push(PingReply::new(ticket, started.elapsed(), completions));
            }
            _ if !running.load(Ordering::SeqCst) => break,
            _ => {
                warn!(ticket, ?timeout, "no answer from worker");
                timed_out = true;
                break;
            }
        }
    }

    let restarts = client.restart_count();
    client.finish();

    let backend_text = backend.display().to_string();
    let mut report = PingReport::new(&backend_text, sent, &replies);
    report.endpoint = endpoint;
    report.restarts = restarts;
    print_ping(&report, format);

    if timed_out {
        Ok(TIMEOUT)
    } else if client.handler().missing_units > 0 {
        Ok(WORKER_ERROR)
    } else {
        Ok(SUCCESS)
    }
}

fn register_ping_file(client: &mut ConnectionClient<PingClient>) {
    let Some(server) = client.server() else {
        return;
    };
    server.register_translation_units_for_editor(RegisterTranslationUnitsForEditorMessage {
        file_containers: vec![FileContainer::new(PING_FILE, "").with_unsaved_content(PING_SOURCE, 1)],
        current_editor_file_path: PING_FILE.to_string(),
        visible_editor_file_paths: vec![PING_FILE.to_string()],
    });
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
