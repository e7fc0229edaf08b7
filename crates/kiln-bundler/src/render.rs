//! Rendering one [`BundleGraph`] into a target's module convention.
//!
//! Rendering is pure text editing over the byte ranges recorded when the
//! graph was analyzed. ESM output only replaces rewritten specifiers; CommonJS
//! output additionally lowers the top-level import and export statements.

use std::ops::Range;

use kiln_config::{ExportConvention, ModuleFormat, OutputTarget};

use crate::graph::{BundleGraph, DefaultExport, ImportBinding, ModuleItem, SourceRef};
use crate::rewrite::{PathRewriter, Rewrite};
use crate::{Error, Result};

const INTEROP: &str = "__kiln_interop";
const DEFAULT_LOCAL: &str = "__kiln_default";

pub fn render(graph: &BundleGraph, target: &OutputTarget, rewriter: &PathRewriter) -> Result<String> {
    let syntax = &graph.syntax;
    let fail = |reason: String| Error::Render {
        unit: graph.unit.clone(),
        target: target.id.clone(),
        reason,
    };

    if target.export_convention == ExportConvention::Default && !syntax.is_default_only() {
        let found = if syntax.has_star_reexport() {
            "a star re-export".to_string()
        } else {
            syntax.export_names().join(", ")
        };
        return Err(fail(format!(
            "the `default` export convention needs `default` as the only export, found: {}",
            if found.is_empty() { "no exports" } else { found.as_str() }
        )));
    }

    match target.format {
        ModuleFormat::Esm => Ok(render_esm(graph, target, rewriter)),
        ModuleFormat::Cjs => {
            let style = match target.export_convention {
                ExportConvention::Default => CjsExports::ModuleExports,
                ExportConvention::Named => CjsExports::Named,
                ExportConvention::None if syntax.is_default_only() => CjsExports::ModuleExports,
                ExportConvention::None => CjsExports::Named,
            };
            Ok(CjsRenderer::new(graph, target, rewriter, style).render())
        }
    }
}

fn render_esm(graph: &BundleGraph, target: &OutputTarget, rewriter: &PathRewriter) -> String {
    let edits = graph
        .syntax
        .items
        .iter()
        .filter_map(ModuleItem::source)
        .chain(&graph.syntax.dynamic_imports)
        .filter_map(|source| match rewriter.rewrite(&source.specifier, target) {
            Rewrite::Keep => None,
            Rewrite::To(path) => Some(Edit::replace(source.span.clone(), quote(&path))),
        })
        .collect();
    apply_edits(&graph.code, edits)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CjsExports {
    /// `exports.name = ...` plus the `__esModule` marker.
    Named,
    /// `module.exports = <default>`.
    ModuleExports,
}

/// One exported binding after lowering.
struct Lowered {
    name: String,
    value: String,
    /// Re-exports stay live through a getter.
    getter: bool,
}

struct CjsRenderer<'a> {
    graph: &'a BundleGraph,
    target: &'a OutputTarget,
    rewriter: &'a PathRewriter,
    style: CjsExports,
    edits: Vec<Edit>,
    exports: Vec<Lowered>,
    needs_interop: bool,
    next_require: usize,
}

impl<'a> CjsRenderer<'a> {
    fn new(
        graph: &'a BundleGraph,
        target: &'a OutputTarget,
        rewriter: &'a PathRewriter,
        style: CjsExports,
    ) -> Self {
        Self {
            graph,
            target,
            rewriter,
            style,
            edits: Vec::new(),
            exports: Vec::new(),
            needs_interop: false,
            next_require: 0,
        }
    }

    fn render(mut self) -> String {
        let graph = self.graph;
        for item in &graph.syntax.items {
            self.lower(item);
        }
        for source in &graph.syntax.dynamic_imports {
            if let Rewrite::To(path) = self.rewriter.rewrite(&source.specifier, self.target) {
                self.edits
                    .push(Edit::replace(source.span.clone(), quote(&path)));
            }
        }

        let body = apply_edits(&graph.code, std::mem::take(&mut self.edits));

        let mut out = String::from("'use strict';\n\n");
        if self.style == CjsExports::Named && graph.syntax.has_exports() {
            out.push_str("Object.defineProperty(exports, '__esModule', { value: true });\n\n");
        }
        if self.needs_interop {
            out.push_str(&format!(
                "function {INTEROP}(m) {{ return m && typeof m === 'object' && 'default' in m ? m['default'] : m; }}\n\n"
            ));
        }
        out.push_str(body.trim_end());
        out.push('\n');

        let tail = self.export_lines();
        if !tail.is_empty() {
            out.push('\n');
            out.push_str(&tail.join("\n"));
            out.push('\n');
        }
        out
    }

    fn lower(&mut self, item: &ModuleItem) {
        match item {
            ModuleItem::Import {
                span,
                source,
                bindings,
            } => {
                let text = self.lower_import(source, bindings);
                self.edits.push(Edit::replace(span.clone(), text));
            }
            ModuleItem::ExportLocal { span, names } => {
                self.edits.push(Edit::replace(span.clone(), String::new()));
                for name in names {
                    self.export(&name.exported, name.local.clone(), false);
                }
            }
            ModuleItem::ExportFrom {
                span,
                source,
                names,
            } => {
                let (var, decl) = self.require_var(source);
                self.edits.push(Edit::replace(span.clone(), decl));
                for name in names {
                    let value = if name.local == "default" {
                        self.needs_interop = true;
                        format!("{INTEROP}({var})")
                    } else {
                        member(&var, &name.local)
                    };
                    self.export(&name.exported, value, true);
                }
            }
            ModuleItem::ExportAll {
                span,
                source,
                alias: Some(alias),
            } => {
                let (var, decl) = self.require_var(source);
                self.edits.push(Edit::replace(span.clone(), decl));
                self.export(alias, var, false);
            }
            ModuleItem::ExportAll {
                span,
                source,
                alias: None,
            } => {
                let (var, decl) = self.require_var(source);
                let text = format!(
                    "{decl}\nObject.keys({var}).forEach(function (k) {{\n\tif (k !== 'default' && !Object.prototype.hasOwnProperty.call(exports, k)) Object.defineProperty(exports, k, {{\n\t\tenumerable: true,\n\t\tget: function () {{ return {var}[k]; }}\n\t}});\n}});"
                );
                self.edits.push(Edit::replace(span.clone(), text));
            }
            ModuleItem::ExportDeclaration {
                span,
                declaration_start,
                names,
            } => {
                self.edits
                    .push(Edit::replace(span.start..*declaration_start, String::new()));
                for name in names {
                    self.export(name, name.clone(), false);
                }
            }
            ModuleItem::ExportDefault {
                span,
                body_start,
                kind,
            } => match kind {
                DefaultExport::Declaration(local) => {
                    self.edits
                        .push(Edit::replace(span.start..*body_start, String::new()));
                    self.export("default", local.clone(), false);
                }
                DefaultExport::AnonymousDeclaration | DefaultExport::Expression => {
                    self.edits.push(Edit::replace(
                        span.start..*body_start,
                        format!("const {DEFAULT_LOCAL} = "),
                    ));
                    if *kind == DefaultExport::AnonymousDeclaration {
                        self.edits.push(Edit::replace(span.end..span.end, ";".into()));
                    }
                    self.export("default", DEFAULT_LOCAL.to_string(), false);
                }
            },
        }
    }

    fn lower_import(&mut self, source: &SourceRef, bindings: &[ImportBinding]) -> String {
        let require = format!("require({})", self.specifier(source));

        let mut default = None;
        let mut namespace = None;
        let mut named = Vec::new();
        for binding in bindings {
            match binding {
                ImportBinding::Default(local) => default = Some(local),
                ImportBinding::Namespace(local) => namespace = Some(local),
                ImportBinding::Named { imported, local } => named.push((imported, local)),
            }
        }
        let pattern = || {
            let fields: Vec<String> = named
                .iter()
                .map(|(imported, local)| {
                    if imported == local {
                        (*local).clone()
                    } else {
                        format!("{}: {local}", property_key(imported))
                    }
                })
                .collect();
            format!("{{ {} }}", fields.join(", "))
        };

        match (default, namespace, named.is_empty()) {
            (None, None, true) => format!("{require};"),
            (None, Some(ns), true) => format!("const {ns} = {require};"),
            (Some(d), None, true) => {
                self.needs_interop = true;
                format!("const {d} = {INTEROP}({require});")
            }
            (None, None, false) => format!("const {} = {require};", pattern()),
            _ => {
                let var = self.next_var();
                let mut lines = vec![format!("const {var} = {require};")];
                if let Some(d) = default {
                    self.needs_interop = true;
                    lines.push(format!("const {d} = {INTEROP}({var});"));
                }
                if let Some(ns) = namespace {
                    lines.push(format!("const {ns} = {var};"));
                }
                if !named.is_empty() {
                    lines.push(format!("const {} = {var};", pattern()));
                }
                lines.join("\n")
            }
        }
    }

    fn require_var(&mut self, source: &SourceRef) -> (String, String) {
        let var = self.next_var();
        let decl = format!("const {var} = require({});", self.specifier(source));
        (var, decl)
    }

    fn next_var(&mut self) -> String {
        let var = format!("__kiln_req{}", self.next_require);
        self.next_require += 1;
        var
    }

    fn specifier(&self, source: &SourceRef) -> String {
        quote(
            self.rewriter
                .rewrite(&source.specifier, self.target)
                .apply(&source.specifier),
        )
    }

    fn export(&mut self, name: &str, value: String, getter: bool) {
        self.exports.push(Lowered {
            name: name.to_string(),
            value,
            getter,
        });
    }

    fn export_lines(&self) -> Vec<String> {
        match self.style {
            CjsExports::ModuleExports => self
                .exports
                .iter()
                .filter(|e| e.name == "default")
                .map(|e| format!("module.exports = {};", e.value))
                .collect(),
            CjsExports::Named => self
                .exports
                .iter()
                .map(|e| {
                    if e.getter {
                        format!(
                            "Object.defineProperty(exports, {}, {{\n\tenumerable: true,\n\tget: function () {{ return {}; }}\n}});",
                            quote(&e.name),
                            e.value
                        )
                    } else {
                        format!("{} = {};", member("exports", &e.name), e.value)
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug)]
struct Edit {
    range: Range<usize>,
    text: String,
}

impl Edit {
    fn replace(range: Range<usize>, text: String) -> Self {
        Self { range, text }
    }
}

/// Apply non-overlapping edits in source order.
fn apply_edits(code: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            continue;
        }
        out.push_str(&code[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&code[cursor..]);
    out
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn member(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{object}.{name}")
    } else {
        format!("{object}[{}]", quote(name))
    }
}

fn property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::InternalPackages;
    use kiln_config::TargetConfig;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn target(format: ModuleFormat, convention: ExportConvention, bundle_path: &str) -> OutputTarget {
        OutputTarget::new(
            format.to_string(),
            &TargetConfig {
                format,
                output_dir: PathBuf::from("out"),
                bundle_path: bundle_path.into(),
                export_convention: convention,
                extension: "js".into(),
            },
        )
    }

    fn rewriter() -> PathRewriter {
        PathRewriter::new(Arc::new(InternalPackages::new(
            ["@kiln/utils".to_string()],
            "@kiln",
        )))
    }

    fn graph(code: &str) -> BundleGraph {
        BundleGraph::analyze("button", code.to_string()).unwrap()
    }

    const CHUNK: &str = r#"import { ref } from "vue";
import { isString } from "@kiln/utils";
const Button = { setup() { return { a: ref(isString("x")) }; } };
const lazy = () => import("@kiln/utils/lazy");
export { Button, Button as default, lazy };
"#;

    #[test]
    fn esm_only_rewrites_internal_specifiers() {
        let out = render(
            &graph(CHUNK),
            &target(ModuleFormat::Esm, ExportConvention::None, "kiln/es"),
            &rewriter(),
        )
        .unwrap();

        assert!(out.contains(r#"import { ref } from "vue";"#));
        assert!(out.contains(r#"import { isString } from "kiln/es/utils";"#));
        assert!(out.contains(r#"import("kiln/es/utils/lazy")"#));
        assert!(out.contains("export { Button, Button as default, lazy };"));
        assert!(!out.contains("@kiln"));
    }

    #[test]
    fn esm_without_internal_imports_is_unchanged() {
        let code = "import { h } from 'vue';\nexport const x = h('div');\n";
        let out = render(
            &graph(code),
            &target(ModuleFormat::Esm, ExportConvention::Named, "kiln/es"),
            &rewriter(),
        )
        .unwrap();
        assert_eq!(out, code);
    }

    #[test]
    fn cjs_named_lowers_imports_and_exports() {
        let out = render(
            &graph(CHUNK),
            &target(ModuleFormat::Cjs, ExportConvention::Named, "kiln/lib"),
            &rewriter(),
        )
        .unwrap();

        assert!(out.starts_with("'use strict';\n\nObject.defineProperty(exports, '__esModule', { value: true });"));
        assert!(out.contains(r#"const { ref } = require("vue");"#));
        assert!(out.contains(r#"const { isString } = require("kiln/lib/utils");"#));
        assert!(out.contains(r#"import("kiln/lib/utils/lazy")"#));
        assert!(out.contains("exports.Button = Button;"));
        assert!(out.contains("exports.default = Button;"));
        assert!(out.contains("exports.lazy = lazy;"));
        assert!(!out.contains("export {"));
        assert!(!out.contains("import {"));
    }

    #[test]
    fn cjs_default_only_module_uses_module_exports() {
        let code = "import Vue, * as all from \"vue\";\nvar index = { name: Vue.version, all };\nexport { index as default };\n";
        let out = render(
            &graph(code),
            &target(ModuleFormat::Cjs, ExportConvention::None, "kiln/lib"),
            &rewriter(),
        )
        .unwrap();

        assert!(!out.contains("__esModule"));
        assert!(out.contains("function __kiln_interop(m)"));
        assert!(out.contains("const __kiln_req0 = require(\"vue\");"));
        assert!(out.contains("const Vue = __kiln_interop(__kiln_req0);"));
        assert!(out.contains("const all = __kiln_req0;"));
        assert!(out.trim_end().ends_with("module.exports = index;"));
    }

    #[test]
    fn default_convention_rejects_named_exports() {
        let err = render(
            &graph(CHUNK),
            &target(ModuleFormat::Cjs, ExportConvention::Default, "kiln/lib"),
            &rewriter(),
        )
        .unwrap_err();
        match err {
            Error::Render { unit, target, reason } => {
                assert_eq!(unit, "button");
                assert_eq!(target, "cjs");
                assert!(reason.contains("Button"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn cjs_reexports_use_getters() {
        let code = "export * from \"@kiln/utils\";\nexport { debounce as throttle, default as dayjs } from \"dayjs\";\nexport * as helpers from \"./helpers\";\n";
        let out = render(
            &graph(code),
            &target(ModuleFormat::Cjs, ExportConvention::None, "kiln/lib"),
            &rewriter(),
        )
        .unwrap();

        assert!(out.contains("const __kiln_req0 = require(\"kiln/lib/utils\");\nObject.keys(__kiln_req0).forEach"));
        assert!(out.contains("Object.defineProperty(exports, \"throttle\", {\n\tenumerable: true,\n\tget: function () { return __kiln_req1.debounce; }\n});"));
        assert!(out.contains("get: function () { return __kiln_interop(__kiln_req1); }"));
        assert!(out.contains("exports.helpers = __kiln_req2;"));
    }

    #[test]
    fn cjs_default_expression_and_declarations() {
        let code = "export const size = 'md';\nexport default function () { return size; }\n";
        let out = render(
            &graph(code),
            &target(ModuleFormat::Cjs, ExportConvention::Named, ""),
            &rewriter(),
        )
        .unwrap();

        assert!(out.contains("const size = 'md';"));
        assert!(out.contains("const __kiln_default = function () { return size; };"));
        assert!(out.contains("exports.size = size;"));
        assert!(out.contains("exports.default = __kiln_default;"));
    }

    #[test]
    fn non_identifier_names_are_quoted() {
        assert_eq!(member("exports", "a-b"), "exports[\"a-b\"]");
        assert_eq!(member("exports", "$ok_1"), "exports.$ok_1");
        assert_eq!(property_key("x y"), "\"x y\"");
    }
}
