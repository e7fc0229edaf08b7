//! The target-agnostic result of bundling one unit.
//!
//! Rolldown produces a single ESM chunk. That chunk is parsed once here and
//! its top-level module syntax recorded by byte range, so every output target
//! can be rendered from the same text without parsing again.

use std::ops::Range;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPatternKind, Declaration, ExportDefaultDeclarationKind, Expression,
    ImportDeclarationSpecifier, ImportExpression, ModuleExportName, Statement, StringLiteral,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::diagnostics::{DiagnosticKind, ExtractedDiagnostic};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct BundleGraph {
    pub unit: String,
    pub code: String,
    pub syntax: ModuleSyntax,
}

impl BundleGraph {
    pub fn analyze(unit: impl Into<String>, code: String) -> Result<Self> {
        let unit = unit.into();
        let syntax = ModuleSyntax::parse(&code).map_err(|diagnostics| Error::Bundle {
            unit: unit.clone(),
            diagnostics,
        })?;
        Ok(Self { unit, code, syntax })
    }
}

/// A string literal naming another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// Byte range of the literal, quotes included.
    pub span: Range<usize>,
    pub specifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBinding {
    Default(String),
    Namespace(String),
    Named { imported: String, local: String },
}

/// `local as exported`; for re-exports `local` is the name in the source module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportName {
    pub local: String,
    pub exported: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultExport {
    /// `export default function name() {}` / `export default class Name {}`
    Declaration(String),
    /// `export default function () {}` / `export default class {}`
    AnonymousDeclaration,
    Expression,
}

/// One top-level import or export statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleItem {
    /// `import d, { a as b } from "x"`; no bindings for `import "x"`.
    Import {
        span: Range<usize>,
        source: SourceRef,
        bindings: Vec<ImportBinding>,
    },
    /// `export { a, b as c }`
    ExportLocal {
        span: Range<usize>,
        names: Vec<ExportName>,
    },
    /// `export { a, b as c } from "x"`
    ExportFrom {
        span: Range<usize>,
        source: SourceRef,
        names: Vec<ExportName>,
    },
    /// `export * from "x"` / `export * as ns from "x"`
    ExportAll {
        span: Range<usize>,
        source: SourceRef,
        alias: Option<String>,
    },
    /// `export const a = 1`; `declaration_start` is where the declaration
    /// itself begins.
    ExportDeclaration {
        span: Range<usize>,
        declaration_start: usize,
        names: Vec<String>,
    },
    ExportDefault {
        span: Range<usize>,
        body_start: usize,
        kind: DefaultExport,
    },
}

impl ModuleItem {
    pub fn source(&self) -> Option<&SourceRef> {
        match self {
            ModuleItem::Import { source, .. }
            | ModuleItem::ExportFrom { source, .. }
            | ModuleItem::ExportAll { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn span(&self) -> &Range<usize> {
        match self {
            ModuleItem::Import { span, .. }
            | ModuleItem::ExportLocal { span, .. }
            | ModuleItem::ExportFrom { span, .. }
            | ModuleItem::ExportAll { span, .. }
            | ModuleItem::ExportDeclaration { span, .. }
            | ModuleItem::ExportDefault { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSyntax {
    /// Top-level module statements in source order.
    pub items: Vec<ModuleItem>,
    /// `import("x")` calls with a literal specifier, anywhere in the chunk.
    pub dynamic_imports: Vec<SourceRef>,
}

impl ModuleSyntax {
    pub fn parse(code: &str) -> std::result::Result<Self, Vec<ExtractedDiagnostic>> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, SourceType::mjs()).parse();
        if ret.panicked || !ret.errors.is_empty() {
            let mut diagnostics: Vec<_> = ret
                .errors
                .iter()
                .map(|e| ExtractedDiagnostic::error(DiagnosticKind::ParseError, e.to_string()))
                .collect();
            if diagnostics.is_empty() {
                diagnostics.push(ExtractedDiagnostic::error(
                    DiagnosticKind::ParseError,
                    "bundled chunk could not be parsed",
                ));
            }
            return Err(diagnostics);
        }

        let mut items = Vec::new();
        for stmt in &ret.program.body {
            if let Some(item) = module_item(stmt)? {
                items.push(item);
            }
        }

        let mut dynamic = DynamicImports::default();
        dynamic.visit_program(&ret.program);

        Ok(Self {
            items,
            dynamic_imports: dynamic.0,
        })
    }

    /// Every exported name, in declaration order.
    pub fn export_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for item in &self.items {
            match item {
                ModuleItem::ExportLocal { names: list, .. }
                | ModuleItem::ExportFrom { names: list, .. } => {
                    names.extend(list.iter().map(|n| n.exported.as_str()));
                }
                ModuleItem::ExportAll {
                    alias: Some(alias), ..
                } => names.push(alias.as_str()),
                ModuleItem::ExportDeclaration { names: list, .. } => {
                    names.extend(list.iter().map(String::as_str));
                }
                ModuleItem::ExportDefault { .. } => names.push("default"),
                _ => {}
            }
        }
        names
    }

    /// `export * from` without an alias re-exports an unknown set of names.
    pub fn has_star_reexport(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, ModuleItem::ExportAll { alias: None, .. }))
    }

    pub fn has_exports(&self) -> bool {
        self.has_star_reexport() || !self.export_names().is_empty()
    }

    /// Whether the only export is `default`.
    pub fn is_default_only(&self) -> bool {
        !self.has_star_reexport() && self.export_names() == ["default"]
    }
}

fn module_item(
    stmt: &Statement<'_>,
) -> std::result::Result<Option<ModuleItem>, Vec<ExtractedDiagnostic>> {
    let item = match stmt {
        Statement::ImportDeclaration(import) => {
            let bindings = import
                .specifiers
                .iter()
                .flatten()
                .map(|spec| match spec {
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        ImportBinding::Default(s.local.name.to_string())
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        ImportBinding::Namespace(s.local.name.to_string())
                    }
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        let imported = export_name(&s.imported);
                        let local = s.local.name.to_string();
                        if imported == "default" {
                            ImportBinding::Default(local)
                        } else {
                            ImportBinding::Named { imported, local }
                        }
                    }
                })
                .collect();
            ModuleItem::Import {
                span: range(import.span),
                source: source_ref(&import.source),
                bindings,
            }
        }
        Statement::ExportNamedDeclaration(export) => {
            let names: Vec<ExportName> = export
                .specifiers
                .iter()
                .map(|s| ExportName {
                    local: export_name(&s.local),
                    exported: export_name(&s.exported),
                })
                .collect();

            match (&export.source, &export.declaration) {
                (Some(source), _) => ModuleItem::ExportFrom {
                    span: range(export.span),
                    source: source_ref(source),
                    names,
                },
                (None, Some(declaration)) => ModuleItem::ExportDeclaration {
                    span: range(export.span),
                    declaration_start: declaration.span().start as usize,
                    names: declared_names(declaration)?,
                },
                (None, None) => ModuleItem::ExportLocal {
                    span: range(export.span),
                    names,
                },
            }
        }
        Statement::ExportDefaultDeclaration(export) => {
            let kind = match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(f) => f
                    .id
                    .as_ref()
                    .map_or(DefaultExport::AnonymousDeclaration, |id| {
                        DefaultExport::Declaration(id.name.to_string())
                    }),
                ExportDefaultDeclarationKind::ClassDeclaration(c) => c
                    .id
                    .as_ref()
                    .map_or(DefaultExport::AnonymousDeclaration, |id| {
                        DefaultExport::Declaration(id.name.to_string())
                    }),
                _ => DefaultExport::Expression,
            };
            ModuleItem::ExportDefault {
                span: range(export.span),
                body_start: export.declaration.span().start as usize,
                kind,
            }
        }
        Statement::ExportAllDeclaration(export) => ModuleItem::ExportAll {
            span: range(export.span),
            source: source_ref(&export.source),
            alias: export.exported.as_ref().map(export_name),
        },
        _ => return Ok(None),
    };
    Ok(Some(item))
}

fn declared_names(
    declaration: &Declaration<'_>,
) -> std::result::Result<Vec<String>, Vec<ExtractedDiagnostic>> {
    let names = match declaration {
        Declaration::FunctionDeclaration(f) => f.id.iter().map(|id| id.name.to_string()).collect(),
        Declaration::ClassDeclaration(c) => c.id.iter().map(|id| id.name.to_string()).collect(),
        Declaration::VariableDeclaration(var) => {
            let mut names = Vec::new();
            for declarator in &var.declarations {
                match &declarator.id.kind {
                    BindingPatternKind::BindingIdentifier(ident) => {
                        names.push(ident.name.to_string());
                    }
                    _ => {
                        return Err(vec![ExtractedDiagnostic::error(
                            DiagnosticKind::Other,
                            "destructuring export declarations are not supported in bundled output",
                        )]);
                    }
                }
            }
            names
        }
        _ => Vec::new(),
    };
    Ok(names)
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

fn source_ref(literal: &StringLiteral<'_>) -> SourceRef {
    SourceRef {
        span: range(literal.span),
        specifier: literal.value.to_string(),
    }
}

fn range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

#[derive(Default)]
struct DynamicImports(Vec<SourceRef>);

impl<'a> Visit<'a> for DynamicImports {
    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(literal) = &expr.source {
            self.0.push(source_ref(literal));
        }
        walk::walk_import_expression(self, expr);
    }
}
