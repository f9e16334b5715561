//! A small code-model backend used by `ipcbridge-backend`.
//!
//! It keeps the registered project parts, translation units and unsaved files
//! in memory and answers requests with a word-level view of the file
//! contents. Good enough to exercise every message of the protocol end to end.

use std::collections::BTreeMap;

use ipcbridge_messages::*;
use tracing::{debug, info};

const KEYWORDS: &[&str] = &[
    "auto", "bool", "break", "case", "class", "const", "continue", "else", "enum", "for", "if",
    "int", "namespace", "return", "struct", "switch", "template", "void", "while",
];

/// In-memory backend state.
#[derive(Debug, Default)]
pub struct DemoBackend {
    dispatcher: ClientDispatcher,
    project_parts: BTreeMap<String, ProjectPartContainer>,
    translation_units: BTreeMap<(String, String), FileContainer>,
    unsaved_files: BTreeMap<String, FileContainer>,
    current_file: String,
    visible_files: Vec<String>,
    ended: bool,
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn translation_unit_count(&self) -> usize {
        self.translation_units.len()
    }

    pub fn project_part_count(&self) -> usize {
        self.project_parts.len()
    }

    pub fn current_file(&self) -> &str {
        &self.current_file
    }

    pub fn visible_files(&self) -> &[String] {
        &self.visible_files
    }

    fn key(file: &FileContainer) -> (String, String) {
        (file.file_path.clone(), file.project_part_id.clone())
    }

    /// An empty project part id names the default project, which always exists.
    fn project_part_exists(&self, id: &str) -> bool {
        id.is_empty() || self.project_parts.contains_key(id)
    }

    fn missing_project_parts<'a>(&self, files: impl IntoIterator<Item = &'a FileContainer>) -> Vec<String> {
        let mut missing: Vec<String> = files
            .into_iter()
            .map(|file| file.project_part_id.clone())
            .filter(|id| !self.project_part_exists(id))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// The registered container for `file`, or a does-not-exist reply.
    fn lookup(&mut self, file_path: &str, project_part_id: &str) -> Option<FileContainer> {
        let key = (file_path.to_string(), project_part_id.to_string());
        match self.translation_units.get(&key) {
            Some(file) => Some(file.clone()),
            None => {
                debug!(file_path, project_part_id, "request for unknown translation unit");
                self.dispatcher
                    .translation_unit_does_not_exist(TranslationUnitDoesNotExistMessage {
                        file_container: FileContainer::new(file_path, project_part_id),
                    });
                None
            }
        }
    }

    /// Unsaved editor content wins over the container's own content, which
    /// wins over the file on disk.
    fn content(&self, file: &FileContainer) -> String {
        if let Some(unsaved) = self
            .unsaved_files
            .get(&file.file_path)
            .and_then(|f| f.unsaved_content.clone())
        {
            return unsaved;
        }
        if let Some(content) = &file.unsaved_content {
            return content.clone();
        }
        std::fs::read_to_string(&file.file_path).unwrap_or_default()
    }
}

/// A word with its 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Word<'a> {
    line: u32,
    column: u32,
    text: &'a str,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn words(content: &str) -> Vec<Word<'_>> {
    let mut out = Vec::new();
    for (line_index, line) in content.lines().enumerate() {
        let mut start = None;
        for (i, c) in line.char_indices().chain(std::iter::once((line.len(), ' '))) {
            match (start, is_word_char(c)) {
                (None, true) => start = Some(i),
                (Some(s), false) => {
                    let text = &line[s..i];
                    if !text.starts_with(|c: char| c.is_ascii_digit()) {
                        out.push(Word {
                            line: line_index as u32 + 1,
                            column: s as u32 + 1,
                            text,
                        });
                    }
                    start = None;
                }
                _ => {}
            }
        }
    }
    out
}

fn word_at(content: &str, line: u32, column: u32) -> Option<Word<'_>> {
    words(content).into_iter().find(|w| {
        w.line == line && column >= w.column && column < w.column + w.text.len() as u32
    })
}

fn token_kind(word: &str) -> TokenKind {
    if KEYWORDS.contains(&word) {
        TokenKind::Keyword
    } else if word.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        TokenKind::Type
    } else {
        TokenKind::LocalVariable
    }
}

impl CodeModelServer for DemoBackend {
    fn end(&mut self) {
        info!("end requested");
        self.ended = true;
    }

    fn register_translation_units_for_editor(
        &mut self,
        message: RegisterTranslationUnitsForEditorMessage,
    ) {
        let missing = self.missing_project_parts(&message.file_containers);
        if !missing.is_empty() {
            self.dispatcher
                .project_parts_do_not_exist(ProjectPartsDoNotExistMessage {
                    project_part_ids: missing,
                });
            return;
        }
        for file in message.file_containers {
            self.translation_units.insert(Self::key(&file), file);
        }
        self.current_file = message.current_editor_file_path;
        self.visible_files = message.visible_editor_file_paths;
        debug!(units = self.translation_units.len(), "translation units registered");
    }

    fn update_translation_units_for_editor(&mut self, message: UpdateTranslationUnitsForEditorMessage) {
        for file in message.file_containers {
            let key = Self::key(&file);
            match self.translation_units.get_mut(&key) {
                Some(existing) => *existing = file,
                None => self
                    .dispatcher
                    .translation_unit_does_not_exist(TranslationUnitDoesNotExistMessage {
                        file_container: file,
                    }),
            }
        }
    }

    fn unregister_translation_units_for_editor(
        &mut self,
        message: UnregisterTranslationUnitsForEditorMessage,
    ) {
        for file in message.file_containers {
            if self.translation_units.remove(&Self::key(&file)).is_none() {
                self.dispatcher
                    .translation_unit_does_not_exist(TranslationUnitDoesNotExistMessage {
                        file_container: file,
                    });
            }
        }
    }

    fn register_project_parts_for_editor(&mut self, message: RegisterProjectPartsForEditorMessage) {
        for part in message.project_containers {
            self.project_parts.insert(part.project_part_id.clone(), part);
        }
    }

    fn unregister_project_parts_for_editor(
        &mut self,
        message: UnregisterProjectPartsForEditorMessage,
    ) {
        let missing: Vec<String> = message
            .project_part_ids
            .into_iter()
            .filter(|id| self.project_parts.remove(id).is_none())
            .collect();
        if !missing.is_empty() {
            self.dispatcher
                .project_parts_do_not_exist(ProjectPartsDoNotExistMessage {
                    project_part_ids: missing,
                });
        }
    }

    fn register_unsaved_files_for_editor(&mut self, message: RegisterUnsavedFilesForEditorMessage) {
        for file in message.file_containers {
            self.unsaved_files.insert(file.file_path.clone(), file);
        }
    }

    fn unregister_unsaved_files_for_editor(
        &mut self,
        message: UnregisterUnsavedFilesForEditorMessage,
    ) {
        for file in message.file_containers {
            self.unsaved_files.remove(&file.file_path);
        }
    }

    fn complete_code(&mut self, message: CompleteCodeMessage) {
        let Some(file) = self.lookup(&message.file_path, &message.project_part_id) else {
            return;
        };
        let content = self.content(&file);

        let mut seen: BTreeMap<&str, CompletionKind> = BTreeMap::new();
        for keyword in KEYWORDS {
            seen.insert(*keyword, CompletionKind::Keyword);
        }
        for word in words(&content) {
            seen.entry(word.text).or_insert(CompletionKind::Variable);
        }
        let code_completions = seen
            .into_iter()
            .map(|(text, kind)| {
                let priority = if kind == CompletionKind::Keyword { 50 } else { 10 };
                CodeCompletion::new(text, kind, priority)
            })
            .collect();

        self.dispatcher.code_completed(CodeCompletedMessage {
            code_completions,
            ticket_number: message.ticket_number,
            never_complete: false,
        });
    }

    fn request_document_annotations(&mut self, message: RequestDocumentAnnotationsMessage) {
        let requested = message.file_container;
        let Some(file) = self.lookup(&requested.file_path, &requested.project_part_id) else {
            return;
        };
        let content = self.content(&file);
        let token_infos = words(&content)
            .into_iter()
            .map(|w| TokenInfo {
                line: w.line,
                column: w.column,
                length: w.text.len() as u32,
                kind: token_kind(w.text),
            })
            .collect();

        self.dispatcher
            .document_annotations_changed(DocumentAnnotationsChangedMessage {
                file_container: file,
                token_infos,
                ..DocumentAnnotationsChangedMessage::default()
            });
    }

    fn request_references(&mut self, message: RequestReferencesMessage) {
        let requested = message.file_container;
        let Some(file) = self.lookup(&requested.file_path, &requested.project_part_id) else {
            return;
        };
        let content = self.content(&file);
        let references = match word_at(&content, message.line, message.column) {
            Some(target) => words(&content)
                .into_iter()
                .filter(|w| w.text == target.text)
                .map(|w| ReferenceLocation {
                    line: w.line,
                    column: w.column,
                    length: w.text.len() as u32,
                })
                .collect(),
            None => Vec::new(),
        };

        self.dispatcher.references(ReferencesMessage {
            file_container: file,
            references,
            ticket_number: message.ticket_number,
            is_local_variable: message.local,
        });
    }

    fn request_follow_symbol(&mut self, message: RequestFollowSymbolMessage) {
        let requested = message.file_container;
        let Some(file) = self.lookup(&requested.file_path, &requested.project_part_id) else {
            return;
        };
        let content = self.content(&file);
        let range = word_at(&content, message.line, message.column).and_then(|target| {
            words(&content)
                .into_iter()
                .find(|w| w.text == target.text)
                .map(|first| {
                    SourceRange::new(
                        SourceLocation::new(&file.file_path, first.line, first.column),
                        SourceLocation::new(
                            &file.file_path,
                            first.line,
                            first.column + first.text.len() as u32,
                        ),
                    )
                })
        });

        self.dispatcher.follow_symbol(FollowSymbolMessage {
            file_container: file,
            range,
            ticket_number: message.ticket_number,
        });
    }

    fn request_tool_tip(&mut self, message: RequestToolTipMessage) {
        let requested = message.file_container;
        let Some(file) = self.lookup(&requested.file_path, &requested.project_part_id) else {
            return;
        };
        let content = self.content(&file);
        let tool_tip = match word_at(&content, message.line, message.column) {
            Some(word) => ToolTipInfo {
                text: word.text.to_string(),
                brief_comment: KEYWORDS.contains(&word.text).then(|| "keyword".to_string()),
                help_ids: vec![word.text.to_string()],
            },
            None => ToolTipInfo::default(),
        };

        self.dispatcher.tool_tip(ToolTipMessage {
            file_container: file,
            tool_tip,
            ticket_number: message.ticket_number,
        });
    }

    fn update_visible_translation_units(&mut self, message: UpdateVisibleTranslationUnitsMessage) {
        self.current_file = message.current_editor_file_path;
        self.visible_files = message.visible_editor_file_paths;
    }
}

impl BackendServer for DemoBackend {
    fn client_dispatcher(&mut self) -> &mut ClientDispatcher {
        &mut self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Collect(Rc<RefCell<Vec<ClientMessage>>>);

    impl CodeModelClient for Collect {
        fn alive(&mut self) {
            self.0.borrow_mut().push(ClientMessage::Alive(AliveMessage));
        }
        fn echo(&mut self, message: EchoMessage) {
            self.0.borrow_mut().push(ClientMessage::Echo(message));
        }
        fn code_completed(&mut self, message: CodeCompletedMessage) {
            self.0.borrow_mut().push(ClientMessage::CodeCompleted(message));
        }
        fn document_annotations_changed(&mut self, message: DocumentAnnotationsChangedMessage) {
            self.0
                .borrow_mut()
                .push(ClientMessage::DocumentAnnotationsChanged(message));
        }
        fn references(&mut self, message: ReferencesMessage) {
            self.0.borrow_mut().push(ClientMessage::References(message));
        }
        fn follow_symbol(&mut self, message: FollowSymbolMessage) {
            self.0.borrow_mut().push(ClientMessage::FollowSymbol(message));
        }
        fn tool_tip(&mut self, message: ToolTipMessage) {
            self.0.borrow_mut().push(ClientMessage::ToolTip(message));
        }
        fn translation_unit_does_not_exist(&mut self, message: TranslationUnitDoesNotExistMessage) {
            self.0
                .borrow_mut()
                .push(ClientMessage::TranslationUnitDoesNotExist(message));
        }
        fn project_parts_do_not_exist(&mut self, message: ProjectPartsDoNotExistMessage) {
            self.0
                .borrow_mut()
                .push(ClientMessage::ProjectPartsDoNotExist(message));
        }
    }

    const SOURCE: &str = "int main() {\n    int value = 1;\n    return value;\n}\n";

    fn backend() -> (DemoBackend, Rc<RefCell<Vec<ClientMessage>>>) {
        let received = Rc::new(RefCell::new(Vec::new()));
        let mut backend = DemoBackend::new();
        backend
            .client_dispatcher()
            .add_client(Box::new(Collect(Rc::clone(&received))));
        backend.register_translation_units_for_editor(RegisterTranslationUnitsForEditorMessage {
            file_containers: vec![FileContainer::new("/src/main.cpp", "").with_unsaved_content(SOURCE, 1)],
            current_editor_file_path: "/src/main.cpp".to_string(),
            visible_editor_file_paths: vec!["/src/main.cpp".to_string()],
        });
        (backend, received)
    }

    fn last(received: &Rc<RefCell<Vec<ClientMessage>>>) -> ClientMessage {
        received.borrow().last().cloned().unwrap()
    }

    #[test]
    fn words_have_one_based_positions() {
        let found = words("ab  cd\n_x 9z");
        assert_eq!(
            found,
            vec![
                Word { line: 1, column: 1, text: "ab" },
                Word { line: 1, column: 5, text: "cd" },
                Word { line: 2, column: 1, text: "_x" },
            ]
        );
        assert_eq!(word_at("ab  cd", 1, 6).map(|w| w.text), Some("cd"));
        assert_eq!(word_at("ab  cd", 1, 3), None);
    }

    #[test]
    fn completion_answers_with_same_ticket() {
        let (mut backend, received) = backend();
        backend.complete_code(CompleteCodeMessage {
            file_path: "/src/main.cpp".to_string(),
            ticket_number: 77,
            ..CompleteCodeMessage::default()
        });

        match last(&received) {
            ClientMessage::CodeCompleted(message) => {
                assert_eq!(message.ticket_number, 77);
                assert!(message
                    .code_completions
                    .iter()
                    .any(|c| c.text == "value" && c.kind == CompletionKind::Variable));
                assert!(message
                    .code_completions
                    .iter()
                    .any(|c| c.text == "return" && c.kind == CompletionKind::Keyword));
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn unknown_file_gets_does_not_exist() {
        let (mut backend, received) = backend();
        backend.complete_code(CompleteCodeMessage {
            file_path: "/src/other.cpp".to_string(),
            ticket_number: 1,
            ..CompleteCodeMessage::default()
        });

        assert_eq!(
            last(&received),
            ClientMessage::TranslationUnitDoesNotExist(TranslationUnitDoesNotExistMessage {
                file_container: FileContainer::new("/src/other.cpp", ""),
            })
        );
    }

    #[test]
    fn unknown_project_part_is_rejected() {
        let (mut backend, received) = backend();
        backend.register_translation_units_for_editor(RegisterTranslationUnitsForEditorMessage {
            file_containers: vec![FileContainer::new("/src/lib.cpp", "lib")],
            ..RegisterTranslationUnitsForEditorMessage::default()
        });

        assert_eq!(backend.translation_unit_count(), 1);
        assert_eq!(
            last(&received),
            ClientMessage::ProjectPartsDoNotExist(ProjectPartsDoNotExistMessage {
                project_part_ids: vec!["lib".to_string()],
            })
        );

        backend.register_project_parts_for_editor(RegisterProjectPartsForEditorMessage {
            project_containers: vec![ProjectPartContainer::new("lib", vec!["-std=c++17".into()])],
        });
        backend.register_translation_units_for_editor(RegisterTranslationUnitsForEditorMessage {
            file_containers: vec![FileContainer::new("/src/lib.cpp", "lib")],
            ..RegisterTranslationUnitsForEditorMessage::default()
        });
        assert_eq!(backend.translation_unit_count(), 2);
    }

    #[test]
    fn references_find_every_occurrence() {
        let (mut backend, received) = backend();
        backend.request_references(RequestReferencesMessage {
            file_container: FileContainer::new("/src/main.cpp", ""),
            line: 2,
            column: 9,
            ticket_number: 3,
            local: true,
        });

        match last(&received) {
            ClientMessage::References(message) => {
                assert_eq!(message.ticket_number, 3);
                assert!(message.is_local_variable);
                assert_eq!(
                    message.references,
                    vec![
                        ReferenceLocation { line: 2, column: 9, length: 5 },
                        ReferenceLocation { line: 3, column: 12, length: 5 },
                    ]
                );
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn follow_symbol_jumps_to_first_occurrence() {
        let (mut backend, received) = backend();
        backend.request_follow_symbol(RequestFollowSymbolMessage {
            file_container: FileContainer::new("/src/main.cpp", ""),
            line: 3,
            column: 13,
            ticket_number: 4,
        });

        match last(&received) {
            ClientMessage::FollowSymbol(message) => {
                let range = message.range.unwrap();
                assert_eq!(range.start, SourceLocation::new("/src/main.cpp", 2, 9));
                assert_eq!(range.end, SourceLocation::new("/src/main.cpp", 2, 14));
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn unsaved_file_overrides_content() {
        let (mut backend, received) = backend();
        backend.register_unsaved_files_for_editor(RegisterUnsavedFilesForEditorMessage {
            file_containers: vec![
                FileContainer::new("/src/main.cpp", "").with_unsaved_content("fresh", 2)
            ],
        });
        backend.request_tool_tip(RequestToolTipMessage {
            file_container: FileContainer::new("/src/main.cpp", ""),
            line: 1,
            column: 1,
            ticket_number: 5,
        });

        match last(&received) {
            ClientMessage::ToolTip(message) => assert_eq!(message.tool_tip.text, "fresh"),
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn annotations_classify_tokens() {
        let (mut backend, received) = backend();
        backend.request_document_annotations(RequestDocumentAnnotationsMessage {
            file_container: FileContainer::new("/src/main.cpp", ""),
        });

        match last(&received) {
            ClientMessage::DocumentAnnotationsChanged(message) => {
                assert_eq!(message.token_infos[0].kind, TokenKind::Keyword);
                assert_eq!(message.token_infos[1].kind, TokenKind::LocalVariable);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn unregister_and_end() {
        let (mut backend, received) = backend();
        backend.unregister_translation_units_for_editor(UnregisterTranslationUnitsForEditorMessage {
            file_containers: vec![FileContainer::new("/src/main.cpp", "")],
        });
        assert_eq!(backend.translation_unit_count(), 0);
        assert!(received.borrow().is_empty());

        backend.update_visible_translation_units(UpdateVisibleTranslationUnitsMessage {
            current_editor_file_path: "/src/a.cpp".to_string(),
            visible_editor_file_paths: vec!["/src/a.cpp".to_string()],
        });
        assert_eq!(backend.current_file(), "/src/a.cpp");

        backend.end();
        assert!(backend.has_ended());
    }
}
