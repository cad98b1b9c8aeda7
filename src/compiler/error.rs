use thiserror::Error;

use crate::common::span::Span;
use crate::{config::ConfigError, wasm::encode::EncodeError};

/// A location in source code with an optional hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub span: Span,
    pub hint: Option<String>,
}

impl Note {
    pub fn new(span: &Span) -> Note {
        Note { span: span.clone(), hint: None }
    }

    pub fn new_with_hint(hint: &str, span: &Span) -> Note {
        Note { span: span.clone(), hint: Some(hint.to_string()) }
    }
}

/// Everything that can stop a tree from becoming a module.
/// Type errors are caught before the back end ever runs,
/// so what remains are scoping mistakes, unsupported constructs,
/// and broken runtime modules.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("the identifier `{name}` is not bound here")]
    Resolution { name: String, note: Note },
    #[error("no compiler registered for {node} nodes")]
    Unimplemented { node: String, note: Note },
    /// A runtime module refers to something that neither it
    /// nor its dependencies define.
    #[error("the runtime module `{module}` does not assemble: {source}")]
    Parse { module: String, source: EncodeError },
    #[error("the linked module is malformed: {0}")]
    Encode(#[from] EncodeError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl CompileError {
    pub fn resolution(name: &str, span: &Span) -> CompileError {
        CompileError::Resolution { name: name.to_string(), note: Note::new(span) }
    }

    pub fn unimplemented(node: &str, hint: &str, span: &Span) -> CompileError {
        CompileError::Unimplemented {
            node: node.to_string(),
            note: Note::new_with_hint(hint, span),
        }
    }

    /// The source location the error points at, if any.
    pub fn note(&self) -> Option<&Note> {
        match self {
            CompileError::Resolution { note, .. }
            | CompileError::Unimplemented { note, .. } => Some(note),
            CompileError::Parse { .. }
            | CompileError::Encode(_)
            | CompileError::Config(_) => None,
        }
    }

    pub fn span(&self) -> Option<&Span> {
        self.note().map(|note| &note.span)
    }

    /// Renders the error against its source, for printing to a terminal.
    pub fn report(&self) -> String {
        let mut out = String::new();
        if let Some(note) = self.note() {
            let formatted = note.span.format();
            out.push_str(&formatted.to_string());
            if let Some(ref hint) = note.hint {
                let padding = " ".repeat(formatted.gutter_padding());
                out.push_str(&format!("{} ├─ note: {}\n", padding, hint));
            }
        }
        out.push_str(&format!("Compile Error: {}", self));
        out
    }
}
