//! Error reporting for the verve compiler.
//!
//! Two classes of failure exist:
//! - [`CompilerError`]: locally recoverable validation problems. The offending
//!   declaration's rewrite is skipped, the rest of the unit proceeds. These are
//!   collected per unit and reported one-way to stderr.
//! - [`FatalError`]: structural problems that abort the whole unit. No output
//!   artifact is written for a unit that hits one of these.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::AssetError;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_COMPUTED_SHAPE: &str = "V-ERR-COMPUTED-001";
pub const ERR_SETTER_WITHOUT_GETTER: &str = "V-ERR-COMPUTED-002";
pub const ERR_METHOD_SHAPE: &str = "V-ERR-METHOD-001";
pub const ERR_WATCH_ARITY: &str = "V-ERR-WATCH-001";
pub const ERR_WATCH_TARGET: &str = "V-ERR-WATCH-002";
pub const ERR_TEMPLATE_CONTAINER: &str = "V-ERR-TEMPLATE-001";
pub const ERR_TEMPLATE_NONE: &str = "V-ERR-TEMPLATE-002";
pub const ERR_TEMPLATE_MULTI: &str = "V-ERR-TEMPLATE-003";
pub const ERR_STYLE_PARSE: &str = "V-ERR-STYLE-001";
pub const ERR_ASSET_MISSING: &str = "V-ERR-ASSET-001";
pub const ERR_PARSE: &str = "V-ERR-PARSE-001";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_COMPUTED_SHAPE => "@computed only applies to getters and setters.",
        ERR_SETTER_WITHOUT_GETTER => "A computed setter must follow its getter in the same class.",
        ERR_METHOD_SHAPE => "@method only applies to plain methods.",
        ERR_WATCH_ARITY => "A watcher takes at most (newValue, oldValue).",
        ERR_WATCH_TARGET => "A watcher observes exactly one declared reactive member.",
        ERR_TEMPLATE_CONTAINER => "Template assets wrap markup in a <template> container.",
        ERR_TEMPLATE_NONE => "Exactly one <template verve> element carries the scoping directive.",
        ERR_TEMPLATE_MULTI => "Exactly one <template verve> element carries the scoping directive.",
        ERR_STYLE_PARSE => "Scoped style blocks must parse as CSS; unparsable blocks bleed unscoped.",
        ERR_ASSET_MISSING => "A component with an unresolvable template compiles without one.",
        ERR_PARSE => "Source units must parse under the host grammar.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
        }
    }

    /// One-way report to the logging sink. Nothing downstream consumes the
    /// error structurally; the unit either completes with skips or aborts.
    pub fn report(&self) {
        eprintln!(
            "[Verve] {} {}:{}:{} {}",
            self.code, self.file, self.line, self.column, self.message
        );
    }
}

/// 1-based line/column for a byte offset, for error context.
pub fn line_col(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let mut line = 1u32;
    let mut col = 1u32;
    for ch in source[..offset].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

// ═══════════════════════════════════════════════════════════════════════════════
// FATAL ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum FatalError {
    #[error("{file}: entry point body must be a plain block")]
    EntryBody { file: String },

    #[error("{file}: source unit failed to parse: {message}")]
    Parse { file: String, message: String },

    #[error(transparent)]
    Asset(#[from] AssetError),
}
