//! Entry-unit component registration.
//!
//! The unit declaring the top-level `main` function is the application entry.
//! Its relative imports are scanned for units that declare components; each
//! contributing import is retargeted at its compiled artifact and a
//! `registerComponent` call is prepended to `main`'s body, imported units
//! first in import order, then the entry unit's own components.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{Declaration, Function, ImportDeclarationSpecifier, Program, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::assets::{artifact_specifier, resolve_sibling_unit, AssetReader};
use crate::classify::{class_role, strip_marker_fields, top_level_classes};
use crate::edits::EditList;
use crate::errors::FatalError;
use crate::metadata::{ComponentKind, ImportedComponentRef};

pub const ENTRY_FUNCTION: &str = "main";

fn entry_function<'a, 'b>(program: &'b Program<'a>) -> Option<&'b Function<'a>> {
    let is_entry = |f: &Function| f.id.as_ref().map(|id| id.name.as_str()) == Some(ENTRY_FUNCTION);
    for stmt in &program.body {
        match stmt {
            Statement::FunctionDeclaration(f) if is_entry(f) => return Some(f),
            Statement::ExportNamedDeclaration(export) => {
                if let Some(Declaration::FunctionDeclaration(f)) = &export.declaration {
                    if is_entry(f) {
                        return Some(f);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// Component class names declared by another unit's source. A unit that does
/// not parse contributes nothing here; it fails on its own compile.
fn unit_component_names(source: &str) -> Vec<String> {
    let source = strip_marker_fields(source);
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_typescript(true).with_module(true);
    let ret = Parser::new(&allocator, &source, source_type).parse();
    if ret.panicked {
        return Vec::new();
    }
    top_level_classes(&ret.program)
        .into_iter()
        .filter(|c| matches!(class_role(c), Some((ComponentKind::Component, _))))
        .filter_map(|c| c.id.as_ref().map(|id| id.name.to_string()))
        .collect()
}

/// Applies entry-unit registration when `program` declares the entry
/// function. Returns whether this unit is the entry. Non-entry units are
/// left alone.
pub fn apply_registrations(
    program: &Program,
    unit_path: &Path,
    source: &str,
    assets: &dyn AssetReader,
    local_components: &[String],
    edits: &mut EditList,
) -> Result<bool, FatalError> {
    let Some(main) = entry_function(program) else {
        return Ok(false);
    };
    let Some(body) = main.body.as_deref() else {
        return Err(FatalError::EntryBody {
            file: unit_path.to_string_lossy().to_string(),
        });
    };

    let mut refs: Vec<ImportedComponentRef> = Vec::new();
    for stmt in &program.body {
        let Statement::ImportDeclaration(import) = stmt else {
            continue;
        };
        let specifier = import.source.value.as_str();
        if !is_relative(specifier) {
            continue;
        }
        let sibling = resolve_sibling_unit(unit_path, specifier);
        let Ok(text) = assets.read(&sibling) else {
            continue;
        };
        let names = unit_component_names(&text);
        if names.is_empty() {
            continue;
        }

        // Namespace imports register through their local alias; named
        // imports expose the class identifiers directly.
        let prefix = import.specifiers.as_ref().and_then(|specs| {
            specs.iter().find_map(|s| match s {
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(ns) => {
                    Some(ns.local.name.to_string())
                }
                _ => None,
            })
        });

        // Contributing units are consumed through their compiled artifacts.
        let literal = import.source.span;
        let quote = source[literal.start as usize..]
            .chars()
            .next()
            .unwrap_or('\'');
        edits.replace(
            literal.start,
            literal.end,
            format!("{}{}{}", quote, artifact_specifier(specifier), quote),
        );

        for name in names {
            refs.push(ImportedComponentRef {
                prefix: prefix.clone(),
                name,
            });
        }
    }

    for name in local_components {
        refs.push(ImportedComponentRef {
            prefix: None,
            name: name.clone(),
        });
    }

    if !refs.is_empty() {
        let calls: Vec<String> = refs
            .iter()
            .map(|r| format!("registerComponent('{}', {});", r.name, r.constructor_ref()))
            .collect();
        edits.insert(body.span.start + 1, format!("\n  {}", calls.join("\n  ")));
    }

    Ok(true)
}
