//! Per-target rewriting of internal package specifiers.

use std::sync::Arc;

use kiln_config::OutputTarget;

use crate::workspace::InternalPackages;

/// Outcome of rewriting one specifier.
///
/// `To("")` is a real rewrite to the target's root and is distinct from
/// `Keep`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Keep,
    To(String),
}

impl Rewrite {
    pub fn apply<'a>(&'a self, specifier: &'a str) -> &'a str {
        match self {
            Rewrite::Keep => specifier,
            Rewrite::To(path) => path,
        }
    }
}

/// Maps internal package specifiers onto a target's `bundle_path`, so
/// `@kiln/utils` becomes `<bundle_path>/utils`.
#[derive(Debug, Clone)]
pub struct PathRewriter {
    packages: Arc<InternalPackages>,
}

impl PathRewriter {
    pub fn new(packages: Arc<InternalPackages>) -> Self {
        Self { packages }
    }

    /// Swap the internal namespace of a recognized package specifier for the
    /// target's `bundle_path`. Anything that is not an internal package is
    /// kept verbatim.
    pub fn rewrite(&self, specifier: &str, target: &OutputTarget) -> Rewrite {
        if self.packages.package_of(specifier).is_none() {
            return Rewrite::Keep;
        }

        // package_of only matches names under the namespace, so the prefix
        // is always present here.
        let remainder = specifier
            .strip_prefix(self.packages.namespace())
            .unwrap_or(specifier)
            .trim_start_matches('/');
        let base = target.bundle_path.trim_end_matches('/');

        Rewrite::To(match (base.is_empty(), remainder.is_empty()) {
            (true, _) => remainder.to_string(),
            (false, true) => base.to_string(),
            (false, false) => format!("{base}/{remainder}"),
        })
    }
}
