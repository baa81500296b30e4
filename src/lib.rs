//! # Template Binding Compiler
//!
//! Compiles a parsed component-markup tree into a static skeleton plus a
//! declarative binding tree, then renders both as a runtime-callable factory.
//!
//! ## Compile Invariants
//!
//! 1. **Scope Container**: every compiled expression is an arrow `scope => ...`.
//!    Free identifiers read from `scope`; `this.x` reads as `scope.x`.
//!
//! 2. **Markers**: each dynamic node gets an `exprN` attribute. N starts at 0 for
//!    every top-level compile and counts up through nested templates and slots.
//!
//! 3. **Classification Priority**: a node is decided exactly once, in this order:
//!    1. `each` directive → EACH (owns `if` and `key` as well)
//!    2. `if` directive → IF
//!    3. custom component or `is` attribute → TAG
//!    4. dynamic attributes or text → SIMPLE
//!    5. otherwise static markup
//!
//! 4. **Purity**: identical input produces byte-identical output. Nothing is
//!    evaluated at compile time.

#[cfg(feature = "napi")]
use napi_derive::napi;

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

pub mod ast;
pub mod bindings;
pub mod cache;
pub mod codegen;
pub mod lowering;
pub mod marker;
pub mod options;
pub mod scope;
pub mod script;
pub mod static_eval;
pub mod transform;
pub mod validate;
pub mod visitor;

#[cfg(test)]
mod codegen_tests;
#[cfg(test)]
mod expression_tests;

pub use bindings::{Binding, BindingKind, BindingType, ExpressionDescriptor, Slot, Template};
pub use cache::CompileCache;
pub use codegen::generate_template_function;
pub use options::{CompileOptions, ExpressionPolicy, ExpressionType, NamingPolicy};
pub use scope::{scopeify, Evaluator};
pub use script::{check_export_style, ExportStyle};
pub use static_eval::EvalError;
pub use transform::TemplateBuilder;
pub use validate::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub template: Template,
    pub code: String,
}

/// Compiler configured with options and an attribute policy.
pub struct Compiler {
    options: CompileOptions,
    policy: Box<dyn ExpressionPolicy>,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        let policy = Box::new(NamingPolicy::from_options(&options));
        Compiler { options, policy }
    }

    pub fn with_policy(mut self, policy: Box<dyn ExpressionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&self, root: Option<&TemplateRoot>) -> Result<CompileResult, CompilerError> {
        debug!(
            "compiling {} ({} root node(s))",
            display_file(&self.options.file_path),
            root.map_or(0, |r| r.nodes.len())
        );

        let mut builder = TemplateBuilder::new(&self.options, self.policy.as_ref());
        let template = builder.build(root)?;
        let code = generate_template_function(&template);

        debug!(
            "compiled {}: {} binding(s), {} marker(s)",
            display_file(&self.options.file_path),
            template.bindings.len(),
            builder.markers_allocated()
        );
        Ok(CompileResult { template, code })
    }

    /// Compiles through `cache`. The key covers the tree, the options and this
    /// compiler's policy, so one cache can be shared between compilers.
    pub fn compile_cached(
        &self,
        cache: &CompileCache,
        root: Option<&TemplateRoot>,
    ) -> Result<CompileResult, CompilerError> {
        cache.get_or_compile(root, &self.options, self.policy.as_ref(), || self.compile(root))
    }
}

fn display_file(file: &str) -> &str {
    if file.is_empty() {
        "<anonymous>"
    } else {
        file
    }
}

/// Compiles one tree with the default policy for `options`.
pub fn compile(
    root: Option<&TemplateRoot>,
    options: &CompileOptions,
) -> Result<CompileResult, CompilerError> {
    Compiler::new(options.clone()).compile(root)
}

/// Compiles a tree given as JSON. `null` compiles to an empty template.
pub fn compile_json(json: &str, options: &CompileOptions) -> Result<CompileResult, CompilerError> {
    let root: Option<TemplateRoot> = serde_json::from_str(json).map_err(|e| {
        CompilerError::new(
            ERR_INVALID_TEMPLATE,
            &format!("Malformed template tree: {}", e),
            &options.file_path,
            e.line() as u32,
            e.column() as u32,
        )
    })?;
    compile(root.as_ref(), options)
}

/// Compiles many trees in parallel. Each compile owns its markers, so the
/// results match compiling them one by one.
pub fn compile_all(
    roots: &[TemplateRoot],
    options: &CompileOptions,
) -> Vec<Result<CompileResult, CompilerError>> {
    let compiler = Compiler::new(options.clone());
    roots
        .par_iter()
        .map(|root| compiler.compile(Some(root)))
        .collect()
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_template_native(
    template_json: String,
    options_json: Option<String>,
) -> napi::Result<String> {
    let options: CompileOptions = match options_json {
        Some(json) => {
            serde_json::from_str(&json).map_err(|e| napi::Error::from_reason(e.to_string()))?
        }
        None => CompileOptions::default(),
    };
    let result = compile_json(&template_json, &options)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    Ok(result.code)
}

#[cfg(feature = "napi")]
#[napi]
pub fn check_export_style_native(script: String, file_path: String) -> napi::Result<String> {
    let style =
        check_export_style(&script, &file_path).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_string(&style).map_err(|e| napi::Error::from_reason(e.to_string()))
}
