//! Declaration (`.d.ts`) extraction for the top-level entry sources.

use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_isolated_declarations::{IsolatedDeclarations, IsolatedDeclarationsOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use tracing::{info, warn};

use crate::writer::write_atomic;
use crate::{Error, Result};

/// Entry sources eligible for declaration emission: `*.ts`, `*.tsx` and
/// `*.mts` directly under `entries_root`, excluding existing declarations.
///
/// A missing `entries_root` yields no sources.
pub fn collect_declaration_sources(entries_root: &Path) -> Result<Vec<PathBuf>> {
    let read = match std::fs::read_dir(entries_root) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %entries_root.display(), "entries root not found, no declarations to emit");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(Error::Discovery {
                path: entries_root.to_path_buf(),
                source,
            });
        }
    };

    let mut sources = Vec::new();
    for entry in read {
        let entry = entry.map_err(|source| Error::Discovery {
            path: entries_root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".d.ts") || name.ends_with(".d.mts") {
            continue;
        }
        if [".ts", ".tsx", ".mts"].iter().any(|ext| name.ends_with(ext)) {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

/// Result of emitting declarations for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationUnit {
    pub source_file: PathBuf,
    pub emitted: Vec<PathBuf>,
    /// Isolated-declaration diagnostics; never fatal.
    pub warnings: Vec<String>,
}

/// Extracts isolated declarations for one source file at a time into a
/// shared staging directory, replacing the alias token with `.`.
#[derive(Debug, Clone)]
pub struct TypeEmitter {
    staging_dir: PathBuf,
    alias_token: String,
}

impl TypeEmitter {
    pub fn new(staging_dir: impl Into<PathBuf>, alias_token: impl Into<String>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            alias_token: alias_token.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub async fn emit(&self, source: &Path) -> Result<DeclarationUnit> {
        let fail = |message: String| Error::TypeEmit {
            file: source.to_path_buf(),
            message,
        };

        info!("Emitting file: {}", source.display());

        let text = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| fail(e.to_string()))?;
        let (declarations, warnings) = generate_declarations(&text, source).map_err(fail)?;
        for warning in &warnings {
            warn!(file = %source.display(), "{warning}");
        }

        let declarations = declarations.replace(&self.alias_token, ".");
        let output = self.staging_dir.join(declaration_file_name(source));
        write_atomic(&self.staging_dir, &output, declarations.as_bytes())
            .await
            .map_err(|e| fail(format!("cannot write {}: {e}", output.display())))?;

        info!("Definition for file generated: {}", output.display());
        Ok(DeclarationUnit {
            source_file: source.to_path_buf(),
            emitted: vec![output],
            warnings,
        })
    }
}

/// `button.ts` → `button.d.ts`, `button.mts` → `button.d.mts`.
fn declaration_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");
    match source.extension().and_then(|e| e.to_str()) {
        Some("mts") => format!("{stem}.d.mts"),
        _ => format!("{stem}.d.ts"),
    }
}

fn generate_declarations(
    source: &str,
    path: &Path,
) -> std::result::Result<(String, Vec<String>), String> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).map_err(|e| e.to_string())?;

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        let messages: Vec<String> = parsed.errors.iter().map(|e| e.to_string()).collect();
        return Err(format!("parse failed: {}", messages.join(", ")));
    }

    let dts = IsolatedDeclarations::new(
        &allocator,
        IsolatedDeclarationsOptions {
            strip_internal: true,
        },
    )
    .build(&parsed.program);

    let warnings = dts.errors.iter().map(|e| e.to_string()).collect();
    let code = Codegen::new().build(&dts.program).code;
    Ok((code, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn collects_top_level_typescript_only() {
        let tmp = TempDir::new().unwrap();
        for name in ["index.ts", "extra.mts", "view.tsx", "old.d.ts", "readme.md"] {
            std::fs::write(tmp.path().join(name), "").unwrap();
        }
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested/deep.ts"), "").unwrap();

        let names: Vec<_> = collect_declaration_sources(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["extra.mts", "index.ts", "view.tsx"]);
    }

    #[test]
    fn missing_entries_root_has_no_sources() {
        let tmp = TempDir::new().unwrap();
        let sources = collect_declaration_sources(&tmp.path().join("absent")).unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn replaces_alias_token_in_declarations() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("index.ts");
        std::fs::write(
            &source,
            "export { Button } from '@kiln/button';\nexport const version: string = '1.0.0';\n",
        )
        .unwrap();
        let staging = tmp.path().join("dist/types/components");

        let unit = TypeEmitter::new(&staging, "@kiln").emit(&source).await.unwrap();

        assert_eq!(unit.emitted, vec![staging.join("index.d.ts")]);
        let text = std::fs::read_to_string(staging.join("index.d.ts")).unwrap();
        assert!(!text.contains("@kiln"));
        assert!(text.contains("./button"));
        assert!(text.contains("version: string"));
    }

    #[tokio::test]
    async fn missing_annotations_only_warn() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("util.ts");
        std::fs::write(
            &source,
            "function compute(): number { return 1; }\nexport const value = compute();\n",
        )
        .unwrap();

        let unit = TypeEmitter::new(tmp.path().join("out"), "@kiln")
            .emit(&source)
            .await
            .unwrap();

        assert!(!unit.warnings.is_empty());
        assert!(tmp.path().join("out/util.d.ts").is_file());
    }

    #[tokio::test]
    async fn syntax_errors_are_type_emit_errors() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("bad.ts");
        std::fs::write(&source, "export const = ;").unwrap();

        let err = TypeEmitter::new(tmp.path().join("out"), "@kiln")
            .emit(&source)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TypeEmit { ref file, .. } if file == &source));
    }

    #[test]
    fn declaration_names_follow_extension() {
        assert_eq!(declaration_file_name(Path::new("a/button.ts")), "button.d.ts");
        assert_eq!(declaration_file_name(Path::new("a/view.tsx")), "view.d.ts");
        assert_eq!(declaration_file_name(Path::new("a/mod.mts")), "mod.d.mts");
    }
}
