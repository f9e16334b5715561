//! Plain records carried inside messages.

use serde::{Deserialize, Serialize};

/// A source file as the editor knows it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileContainer {
    pub file_path: String,
    pub project_part_id: String,
    #[serde(default)]
    pub file_arguments: Vec<String>,
    /// Editor buffer content when it differs from the file on disk.
    #[serde(default)]
    pub unsaved_content: Option<String>,
    #[serde(default)]
    pub document_revision: u32,
}

impl FileContainer {
    pub fn new(file_path: impl Into<String>, project_part_id: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            project_part_id: project_part_id.into(),
            ..Self::default()
        }
    }

    pub fn with_unsaved_content(mut self, content: impl Into<String>, revision: u32) -> Self {
        self.unsaved_content = Some(content.into());
        self.document_revision = revision;
        self
    }

    pub fn has_unsaved_content(&self) -> bool {
        self.unsaved_content.is_some()
    }
}

/// Compiler arguments shared by a group of files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectPartContainer {
    pub project_part_id: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl ProjectPartContainer {
    pub fn new(project_part_id: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            project_part_id: project_part_id.into(),
            arguments,
        }
    }
}

/// 1-based line and column in a file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file_path: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file_path: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file_path: file_path.into(),
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceRange {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    Ignored,
    Note,
    #[default]
    Warning,
    Error,
    Fatal,
}

/// One compiler diagnostic, possibly with attached notes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiagnosticContainer {
    pub text: String,
    #[serde(default)]
    pub category: String,
    pub severity: DiagnosticSeverity,
    pub location: SourceLocation,
    #[serde(default)]
    pub ranges: Vec<SourceRange>,
    #[serde(default)]
    pub children: Vec<DiagnosticContainer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    #[default]
    Other,
    Function,
    Variable,
    Class,
    Enumeration,
    Keyword,
    Namespace,
    Macro,
}

/// A single completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeCompletion {
    pub text: String,
    pub kind: CompletionKind,
    pub priority: u32,
    #[serde(default)]
    pub has_parameters: bool,
    #[serde(default)]
    pub brief_comment: Option<String>,
}

impl CodeCompletion {
    pub fn new(text: impl Into<String>, kind: CompletionKind, priority: u32) -> Self {
        Self {
            text: text.into(),
            kind,
            priority,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    #[default]
    Invalid,
    Keyword,
    Type,
    Function,
    LocalVariable,
    Field,
    Enumeration,
    Preprocessor,
    StringLiteral,
    NumberLiteral,
    Comment,
}

/// A highlighted token span.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenInfo {
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub kind: TokenKind,
}

/// A use of a symbol found by a references request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReferenceLocation {
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolTipInfo {
    pub text: String,
    #[serde(default)]
    pub brief_comment: Option<String>,
    #[serde(default)]
    pub help_ids: Vec<String>,
}
