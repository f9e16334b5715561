#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ipcbridge::connection::{
    ClientConfig, CommandLauncher, ConnectionClient, ConnectionObserver, ConnectionState,
};
use ipcbridge::messages::*;

const WAIT: Duration = Duration::from_secs(10);

fn backend_exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ipcbridge-backend"))
}

#[derive(Default)]
struct Replies {
    completed: Vec<CodeCompletedMessage>,
    missing: Vec<FileContainer>,
    references: Vec<ReferencesMessage>,
}

impl CodeModelClient for Replies {
    fn alive(&mut self) {}
    fn echo(&mut self, _message: EchoMessage) {}
    fn code_completed(&mut self, message: CodeCompletedMessage) {
        self.completed.push(message);
    }
    fn document_annotations_changed(&mut self, _message: DocumentAnnotationsChangedMessage) {}
    fn references(&mut self, message: ReferencesMessage) {
        self.references.push(message);
    }
    fn follow_symbol(&mut self, _message: FollowSymbolMessage) {}
    fn tool_tip(&mut self, _message: ToolTipMessage) {}
    fn translation_unit_does_not_exist(&mut self, message: TranslationUnitDoesNotExistMessage) {
        self.missing.push(message.file_container);
    }
    fn project_parts_do_not_exist(&mut self, _message: ProjectPartsDoNotExistMessage) {}
}

#[derive(Clone, Default)]
struct Finished(Arc<Mutex<Vec<Option<i32>>>>);

impl ConnectionObserver for Finished {
    fn process_finished(&mut self, exit_code: Option<i32>) {
        self.0.lock().unwrap().push(exit_code);
    }
}

fn config() -> ClientConfig {
    ClientConfig {
        component: "roundtrip-backend".to_string(),
        alive_interval: None,
        connect_timeout: WAIT,
        end_wait: WAIT,
        ..ClientConfig::default()
    }
}

fn start() -> (ConnectionClient<Replies>, Finished) {
    let launcher = CommandLauncher::new(backend_exe()).env("IPCBRIDGE_LOG_LEVEL", "warn");
    let mut client = ConnectionClient::new(Replies::default(), Box::new(launcher), config());
    let finished = Finished::default();
    client.set_observer(Box::new(finished.clone()));
    client.start().expect("backend should launch");
    client.wait_for_connection(WAIT).expect("backend should connect");
    (client, finished)
}

#[test]
fn completion_roundtrip_and_graceful_finish() {
    let (mut client, finished) = start();
    assert!(client.is_connected());

    let server = client.server().unwrap();
    server.register_translation_units_for_editor(RegisterTranslationUnitsForEditorMessage {
        file_containers: vec![
            FileContainer::new("/src/a.cpp", "").with_unsaved_content("int alpha = 1;\n", 1)
        ],
        current_editor_file_path: "/src/a.cpp".to_string(),
        visible_editor_file_paths: vec!["/src/a.cpp".to_string()],
    });
    server.complete_code(CompleteCodeMessage {
        file_path: "/src/a.cpp".to_string(),
        line: 1,
        column: 5,
        ticket_number: 11,
        ..CompleteCodeMessage::default()
    });

    assert!(client.run_until(|c| !c.handler().completed.is_empty(), WAIT));
    let answer = &client.handler().completed[0];
    assert_eq!(answer.ticket_number, 11);
    assert!(answer.code_completions.iter().any(|c| c.text == "alpha"));

    client.finish();
    assert_eq!(client.state(), ConnectionState::Finished);
    assert_eq!(*finished.0.lock().unwrap(), vec![Some(0)]);
}

#[test]
fn unknown_file_and_references() {
    let (mut client, _) = start();

    let server = client.server().unwrap();
    server.complete_code(CompleteCodeMessage {
        file_path: "/src/missing.cpp".to_string(),
        ticket_number: 1,
        ..CompleteCodeMessage::default()
    });
    server.register_translation_units_for_editor(RegisterTranslationUnitsForEditorMessage {
        file_containers: vec![FileContainer::new("/src/b.cpp", "")
            .with_unsaved_content("int x = 1;\nint y = x + x;\n", 1)],
        ..RegisterTranslationUnitsForEditorMessage::default()
    });
    server.request_references(RequestReferencesMessage {
        file_container: FileContainer::new("/src/b.cpp", ""),
        line: 1,
        column: 5,
        ticket_number: 2,
        local: true,
    });

    assert!(client.run_until(
        |c| !c.handler().missing.is_empty() && !c.handler().references.is_empty(),
        WAIT
    ));
    assert_eq!(client.handler().missing[0].file_path, "/src/missing.cpp");
    assert_eq!(client.handler().references[0].references.len(), 3);
    assert!(client.handler().completed.is_empty());

    client.finish();
}

#[test]
fn ping_reports_every_answer() {
    let output = Command::new(env!("CARGO_BIN_EXE_ipcbridge"))
        .args(["--log-level", "error", "--format", "json", "ping", "--count", "3"])
        .arg("--backend")
        .arg(backend_exe())
        .output()
        .expect("ping should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("ping should print json");
    assert_eq!(report["sent"], 3);
    assert_eq!(report["received"], 3);
    assert_eq!(report["restarts"], 0);
}

#[test]
fn ping_without_backend_binary_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_ipcbridge"))
        .args(["ping", "--backend", "/nonexistent/ipcbridge-backend"])
        .output()
        .expect("ping should run");

    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn doctor_finds_backend() {
    let output = Command::new(env!("CARGO_BIN_EXE_ipcbridge"))
        .args(["--format", "json", "doctor", "--backend"])
        .arg(backend_exe())
        .output()
        .expect("doctor should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"backend_binary\""));
    assert!(stdout.contains("\"overall\":\"pass\""));
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_ipcbridge"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("ipcbridge {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn backend_gives_up_without_editor() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(backend_exe())
        .arg(dir.path().join("nobody.sock"))
        .env("IPCBRIDGE_LOG_LEVEL", "error")
        .env("IPCBRIDGE_CONNECT_TIMEOUT_MS", "200")
        .output()
        .expect("backend should run");

    assert_eq!(output.status.code(), Some(1));
}
