//! Unit compilation pipeline.
//!
//! One unit compiles in a single pass over its parsed program: every
//! annotated class is classified, its template resolved and scoped, its
//! descriptor appended, and entry-unit registration applied; all rewrites
//! accumulate as text edits and are realized once. Library compilation fans
//! units out across a thread pool and writes `.verve` artifacts next to
//! their sources.

use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_ast::ast::Expression;
use oxc_parser::Parser;
use oxc_span::SourceType;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::annotations::{expr_text, split_arguments, AnnotationArguments};
use crate::assets::{
    artifact_path, resolve_template_asset, AssetError, AssetReader, AssetWriter, FsAssets,
};
use crate::classify::{class_role, classify_members, strip_marker_fields, top_level_classes};
use crate::codegen::{self, DescriptorInput};
use crate::edits::EditList;
use crate::errors::{line_col, CompilerError, FatalError, ERR_ASSET_MISSING, ERR_PARSE};
use crate::metadata::ComponentKind;
use crate::registrar;
use crate::template::{
    classify_template_reference, generate_scope_token, scope_template, ScopedTemplate,
    TemplateSource,
};

/// Outcome of compiling one unit. Recoverable errors have already been
/// reported; they ride along for callers that surface them structurally.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub code: String,
    pub errors: Vec<CompilerError>,
}

fn host_source_type() -> SourceType {
    SourceType::default().with_typescript(true).with_module(true)
}

/// Compiles one unit's source text. Template assets are read through
/// `assets`; the caller owns artifact output.
pub fn compile_source(
    path: &Path,
    source: &str,
    assets: &dyn AssetReader,
) -> Result<CompileResult, FatalError> {
    let file = path.to_string_lossy().to_string();

    // Bare marker fields panic the host parser; erase them up front.
    let source = strip_marker_fields(source);
    let source = source.as_ref();

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, host_source_type()).parse();
    if ret.panicked {
        return Err(FatalError::Parse {
            file,
            message: ret
                .errors
                .first()
                .map(|e| format!("{:?}", e))
                .unwrap_or_else(|| "unknown parse failure".to_string()),
        });
    }

    let mut edits = EditList::new();
    let mut errors = Vec::new();

    // Recoverable diagnostics do not stop the unit; the host toolchain sees
    // them again when it consumes the artifact.
    for diag in &ret.errors {
        let offset = diag
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|l| l.offset() as u32)
            .unwrap_or(0);
        let (line, column) = line_col(source, offset);
        let err = CompilerError::new(ERR_PARSE, &format!("{:?}", diag), &file, line, column);
        err.report();
        errors.push(err);
    }

    let mut local_components: Vec<String> = Vec::new();

    for class in top_level_classes(&ret.program) {
        let Some((kind, ann)) = class_role(class) else {
            continue;
        };
        let Some(name) = class.id.as_ref().map(|id| id.name.to_string()) else {
            continue;
        };
        let args = split_arguments(ann.call);

        let meta = classify_members(class, &name, kind, source, &file, &mut edits, &mut errors);

        let template = match kind {
            ComponentKind::Component => {
                resolve_template(path, &name, args.named_str("template"), assets, &mut errors)?
            }
            // Mixins carry markup only when the annotation names it; there is
            // no sibling auto-resolution for them.
            ComponentKind::Mixin => match args.named_str("template") {
                Some(reference) => {
                    resolve_template(path, &name, Some(reference), assets, &mut errors)?
                }
                None => None,
            },
            ComponentKind::App => None,
        };

        let mixins = expr_list_texts(&args, "mixins", source);
        let components = expr_list_texts(&args, "components", source);
        let el = args.named.get("el").map(|e| expr_text(e, source).to_string());

        edits.delete(ann.span.start, ann.span.end);

        let body_end = class.body.span.end;
        if kind == ComponentKind::Mixin {
            edits.insert(
                body_end - 1,
                format!("\n  {}\n", codegen::mixin_ambient_declarations()),
            );
        }
        let descriptor = codegen::descriptor(&DescriptorInput {
            meta: &meta,
            template: template.as_ref(),
            mixins: &mixins,
            components: &components,
            el: el.as_deref(),
        });
        edits.insert(body_end - 1, format!("\n  {}\n", descriptor));

        if kind == ComponentKind::Component {
            local_components.push(name);
        }
    }

    registrar::apply_registrations(
        &ret.program,
        path,
        source,
        assets,
        &local_components,
        &mut edits,
    )?;

    Ok(CompileResult {
        code: edits.apply(source),
        errors,
    })
}

fn expr_list_texts(args: &AnnotationArguments, key: &str, source: &str) -> Vec<String> {
    match args.named.get(key) {
        Some(Expression::ArrayExpression(arr)) => arr
            .elements
            .iter()
            .filter_map(|el| el.as_expression())
            .map(|e| expr_text(e, source).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Resolves and scopes a component's template. An unresolvable asset is
/// reported and the component compiles without one.
fn resolve_template(
    unit_path: &Path,
    class_name: &str,
    reference: Option<&str>,
    assets: &dyn AssetReader,
    errors: &mut Vec<CompilerError>,
) -> Result<Option<ScopedTemplate>, FatalError> {
    match classify_template_reference(reference) {
        TemplateSource::Inline(markup) => Ok(Some(ScopedTemplate {
            markup,
            style_inject: String::new(),
        })),
        TemplateSource::External(relative) => {
            let asset_path = resolve_template_asset(unit_path, relative.as_deref());
            match assets.read(&asset_path) {
                Ok(markup) => {
                    let token =
                        generate_scope_token(&unit_path.to_string_lossy(), class_name);
                    Ok(scope_template(
                        &markup,
                        &token,
                        &asset_path.to_string_lossy(),
                        errors,
                    ))
                }
                Err(AssetError::NotFound(_)) => {
                    let err = CompilerError::new(
                        ERR_ASSET_MISSING,
                        &format!("template asset not found: {}", asset_path.display()),
                        &unit_path.to_string_lossy(),
                        1,
                        1,
                    );
                    err.report();
                    errors.push(err);
                    Ok(None)
                }
                Err(e) => Err(FatalError::Asset(e)),
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIBRARY COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiles one unit end to end: read source, compile, write the artifact.
pub fn compile_unit(
    path: &Path,
    reader: &dyn AssetReader,
    writer: &dyn AssetWriter,
) -> Result<CompileResult, FatalError> {
    let source = reader.read(path)?;
    let result = compile_source(path, &source, reader)?;
    writer.write(&artifact_path(path), &result.code)?;
    Ok(result)
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySummary {
    pub units_compiled: usize,
    pub units_failed: usize,
    pub error_count: usize,
}

fn is_source_unit(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".ts") && !name.ends_with(".verve.ts") && !name.ends_with(".d.ts")
}

/// Compiles every source unit under `root` against the filesystem, in
/// parallel. Failed units are reported and skipped; the rest still produce
/// artifacts.
pub fn compile_library(root: &Path) -> LibrarySummary {
    let units: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_source_unit(p))
        .collect();

    let results: Vec<Result<CompileResult, FatalError>> = units
        .par_iter()
        .map(|path| compile_unit(path, &FsAssets, &FsAssets))
        .collect();

    let mut summary = LibrarySummary::default();
    for result in results {
        match result {
            Ok(r) => {
                summary.units_compiled += 1;
                summary.error_count += r.errors.len();
            }
            Err(e) => {
                eprintln!("[Verve] {}", e);
                summary.units_failed += 1;
            }
        }
    }
    summary
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE BINDINGS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi-bindings")]
#[napi_derive::napi(js_name = "compileSource")]
pub fn compile_source_napi(path: String, source: String) -> napi::Result<String> {
    let result = compile_source(Path::new(&path), &source, &FsAssets)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_string(&result).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(feature = "napi-bindings")]
#[napi_derive::napi(js_name = "compileLibrary")]
pub fn compile_library_napi(root: String) -> napi::Result<String> {
    let summary = compile_library(Path::new(&root));
    serde_json::to_string(&summary).map_err(|e| napi::Error::from_reason(e.to_string()))
}
