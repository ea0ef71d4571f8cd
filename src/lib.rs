//! # Verve Compiler
//!
//! Build-time source-to-source compiler for verve components. A unit (one
//! host-language module) goes through a single pass:
//!
//! 1. **Annotation resolution** ([`annotations`]): decorators on classes and
//!    members are matched against the verve vocabulary.
//! 2. **Member classification** ([`classify`]): annotated fields become
//!    runtime-routed accessor pairs; computed accessors, methods and
//!    watchers are renamed behind public wrappers.
//! 3. **Template scoping** ([`template`], [`scoped_style`]): the component's
//!    markup asset is stamped with a unique scope token and its
//!    `<style scoped>` blocks are rewritten to match only inside it.
//! 4. **Synthesis** ([`codegen`]): a `static constructor` descriptor is
//!    appended to every annotated class.
//! 5. **Registration** ([`registrar`]): the entry unit gets
//!    `registerComponent` calls for every component its imports and its own
//!    body provide.
//!
//! All rewrites accumulate as non-overlapping text edits ([`edits`]) against
//! the original buffer and are applied once, so untouched code survives
//! byte-for-byte. [`compile`] ties the pass together and fans whole source
//! trees out across a thread pool.

pub mod annotations;
pub mod assets;
pub mod classify;
pub mod codegen;
pub mod compile;
pub mod edits;
pub mod errors;
pub mod metadata;
pub mod registrar;
pub mod scoped_style;
pub mod template;

#[cfg(test)]
mod pipeline_tests;

pub use assets::{AssetReader, AssetWriter, FsAssets, MemoryAssets};
pub use compile::{compile_library, compile_source, compile_unit, CompileResult, LibrarySummary};
pub use errors::{CompilerError, FatalError};
pub use metadata::{ComponentKind, ComponentMetadata};
pub use template::ScopedTemplate;

#[cfg(feature = "napi-bindings")]
#[napi_derive::napi]
pub fn compile_bridge() -> String {
    "Verve Native Bridge Connected".to_string()
}
