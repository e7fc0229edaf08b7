//! Structured diagnostics extracted from Rolldown and oxc errors.
//!
//! Rolldown's error types are not stable across releases, so bundle failures
//! are reduced to an [`ExtractedDiagnostic`] read from their formatted text.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDiagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub help: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ParseError,
    UnresolvedEntry,
    UnresolvedImport,
    MissingExport,
    Plugin,
    /// The bundle split into more than one chunk.
    CodeSplitting,
    Other,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::ParseError => "ParseError",
            DiagnosticKind::UnresolvedEntry => "UnresolvedEntry",
            DiagnosticKind::UnresolvedImport => "UnresolvedImport",
            DiagnosticKind::MissingExport => "MissingExport",
            DiagnosticKind::Plugin => "Plugin",
            DiagnosticKind::CodeSplitting => "CodeSplitting",
            DiagnosticKind::Other => "Error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

impl ExtractedDiagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            file: None,
            line: None,
            column: None,
            help: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Extract diagnostics from a Rolldown error batch.
pub fn extract_from_rolldown_error(error: &dyn fmt::Debug) -> Vec<ExtractedDiagnostic> {
    let text = format!("{error:?}");

    let parts: Vec<&str> = text
        .split("BuildDiagnostic")
        .map(str::trim)
        .filter(|part| part.len() > 2)
        .collect();

    if parts.len() > 1 {
        parts.into_iter().map(extract_single).collect()
    } else {
        vec![extract_single(&text)]
    }
}

fn extract_single(text: &str) -> ExtractedDiagnostic {
    let kind = if text.contains("UnresolvedEntry") {
        DiagnosticKind::UnresolvedEntry
    } else if text.contains("UnresolvedImport") || text.contains("Could not resolve") {
        DiagnosticKind::UnresolvedImport
    } else if text.contains("MissingExport") {
        DiagnosticKind::MissingExport
    } else if text.contains("Parse")
        || text.contains("Syntax")
        || text.contains("Unexpected token")
        || text.contains("Expected")
    {
        DiagnosticKind::ParseError
    } else if text.contains("Plugin") {
        DiagnosticKind::Plugin
    } else {
        DiagnosticKind::Other
    };

    let severity = if text.contains("Warning") {
        DiagnosticSeverity::Warning
    } else {
        DiagnosticSeverity::Error
    };

    let (line, column) = extract_position(text).unzip();

    ExtractedDiagnostic {
        kind,
        severity,
        message: text.to_string(),
        file: extract_file_path(text),
        line,
        column,
        help: extract_help(text),
    }
}

/// First path-looking token ending in a script or style extension.
fn extract_file_path(text: &str) -> Option<String> {
    const EXTENSIONS: [&str; 9] = [
        ".tsx", ".ts", ".jsx", ".mjs", ".cjs", ".js", ".vue", ".css", ".mts",
    ];

    text.split(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | ','))
        .map(|token| token.trim_end_matches(|c: char| c == ':' || c.is_ascii_digit()))
        .find(|token| {
            token.contains('/') && EXTENSIONS.iter().any(|ext| token.ends_with(ext))
        })
        .map(str::to_string)
}

/// `file.ts:12:5` style positions.
fn extract_position(text: &str) -> Option<(u32, u32)> {
    let bytes = text.as_bytes();
    let mut idx = 0;
    while let Some(offset) = memchr::memchr(b':', &bytes[idx..]) {
        let start = idx + offset + 1;
        let rest = &text[start..];
        let line: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if !line.is_empty() {
            let after = &rest[line.len()..];
            if let Some(col_text) = after.strip_prefix(':') {
                let column: String = col_text.chars().take_while(char::is_ascii_digit).collect();
                if let (Ok(l), Ok(c)) = (line.parse(), column.parse()) {
                    return Some((l, c));
                }
            }
        }
        idx = start;
    }
    None
}

fn extract_help(text: &str) -> Option<String> {
    ["help: ", "Help: ", "hint: "].iter().find_map(|marker| {
        let pos = text.find(marker)?;
        let rest = &text[pos + marker.len()..];
        // Debug output escapes newlines, so stop at either form.
        let end = [rest.find('\n'), rest.find("\\n"), rest.find('"')]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(rest.len());
        let help = rest[..end].trim();
        (!help.is_empty()).then(|| help.to_string())
    })
}
