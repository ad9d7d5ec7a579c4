//! Rewrites `#p` markers in JavaScript/TypeScript sources into inline debug
//! prints.
//!
//! `let #p count = 1;` becomes `let count = 1; console.log("#p count => ", count);`
//! and `f(#p (a + b))` logs `a + b` under the label `(a + b)` before passing
//! the value on. The crate works either as an SWC plugin ([`process_transform`])
//! or on plain source text ([`transform_source`]).

use swc_core::{
    common::errors::HANDLER,
    ecma::ast::Program,
    plugin::{plugin_transform, proxies::TransformPluginProgramMetadata},
};
use tracing::warn;

pub mod config;
pub mod error;
pub mod label;
pub mod marks;
pub mod pipeline;
pub mod preprocess;
pub mod skip;
pub mod transform;
pub mod wrap;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use error::Error;
pub use marks::{strip_marks, MarkSet};
pub use pipeline::transform_source;
pub use preprocess::Preprocessor;
pub use transform::rewrite;

// -----------------------------------------------------------------------------
// Plugin entry
// -----------------------------------------------------------------------------

/// SWC plugin entry.
///
/// The host has already parsed the file, so the markers must have been
/// rewritten into the reserved prefix upstream (e.g. by a loader running
/// [`Preprocessor`]). Every identifier carrying the prefix counts as marked.
#[plugin_transform]
pub fn process_transform(mut program: Program, metadata: TransformPluginProgramMetadata) -> Program {
    let config = metadata
        .get_transform_plugin_config()
        .map(|s| {
            Config::from_json(&s).unwrap_or_else(|err| {
                warn!(%err, "ignoring plugin config");
                Config::default()
            })
        })
        .unwrap_or_default();

    let marks = strip_marks(&mut program, &config.prefix, None);
    if !marks.dangling.is_empty() {
        HANDLER.with(|handler| {
            for span in &marks.dangling {
                handler
                    .struct_span_err(*span, "debug marker is not followed by a name or an expression")
                    .emit();
            }
        });
    }

    rewrite(&mut program, &config, marks);
    program
}
