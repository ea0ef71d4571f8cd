//! Template resolution and scoping.
//!
//! A component's markup lives in a sibling `.html` asset (or inline in the
//! annotation). The asset wraps markup in a `<template>` container; exactly
//! one such element must carry the `verve` scoping directive. Scoping
//! generates a unique token, stamps a `data-verve-<token>` marker on every
//! element of the directive subtree, and rewrites each `<style scoped>`
//! block's selectors to require that marker. Blocks additionally flagged
//! `bleed` keep their selectors global.

use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, Attribute, LocalName, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use sha2::{Digest, Sha256};

use crate::errors::{CompilerError, ERR_STYLE_PARSE, ERR_TEMPLATE_CONTAINER, ERR_TEMPLATE_MULTI, ERR_TEMPLATE_NONE};
use crate::scoped_style::scope_css;

/// Name of the scoping directive attribute on the template container.
pub const SCOPING_DIRECTIVE: &str = "verve";

/// Markup and style text ready for embedding into a descriptor.
#[derive(Debug, Clone)]
pub struct ScopedTemplate {
    pub markup: String,
    pub style_inject: String,
}

/// How the `template:` annotation argument resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Markup given directly; emitted verbatim, never scoped.
    Inline(String),
    /// Sibling asset at a relative path; `None` resolves the unit's base name.
    External(Option<String>),
}

/// Inline templates are recognized by their leading `<`; anything else is a
/// relative asset reference (empty/absent means auto).
pub fn classify_template_reference(reference: Option<&str>) -> TemplateSource {
    match reference {
        Some(text) if text.trim_start().starts_with('<') => {
            TemplateSource::Inline(text.to_string())
        }
        Some(path) if !path.is_empty() => TemplateSource::External(Some(path.to_string())),
        _ => TemplateSource::External(None),
    }
}

/// Unique scope token for one template+style compilation. Derived from the
/// unit path and component name, so it is collision-free across a build and
/// stable within one compilation.
pub fn generate_scope_token(unit_path: &str, component_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(unit_path.as_bytes());
    hasher.update(b"::");
    hasher.update(component_name.as_bytes());
    let digest = hasher.finalize();
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn scope_attr_name(token: &str) -> String {
    format!("data-verve-{}", token)
}

pub fn scope_attr_selector(token: &str) -> String {
    format!("[data-verve-{}]", token)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOM HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn element_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn has_attr(handle: &Handle, attr_name: &str) -> bool {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .any(|a| a.name.local.as_ref() == attr_name),
        _ => false,
    }
}

/// Depth-first walk over the whole tree, including template contents.
fn walk<F: FnMut(&Handle)>(handle: &Handle, f: &mut F) {
    f(handle);
    if let NodeData::Element {
        template_contents, ..
    } = &handle.data
    {
        if let Some(contents) = template_contents.borrow().as_ref() {
            walk(contents, f);
        }
    }
    for child in handle.children.borrow().iter() {
        walk(child, f);
    }
}

fn text_content(handle: &Handle) -> String {
    let mut out = String::new();
    walk(handle, &mut |node| {
        if let NodeData::Text { contents } = &node.data {
            out.push_str(&contents.borrow());
        }
    });
    out
}

fn attach_scope_marker(handle: &Handle, attr_name: &str) {
    walk(handle, &mut |node| {
        if let NodeData::Element { attrs, .. } = &node.data {
            attrs.borrow_mut().push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                value: StrTendril::new(),
            });
        }
    });
}

fn serialize_children(handle: &Handle) -> String {
    let mut out: Vec<u8> = Vec::new();
    for child in handle.children.borrow().iter() {
        let serializable: SerializableHandle = child.clone().into();
        // Serialization into a Vec cannot fail.
        let _ = serialize(
            &mut out,
            &serializable,
            SerializeOpts {
                traversal_scope: TraversalScope::IncludeNode,
                ..Default::default()
            },
        );
    }
    String::from_utf8_lossy(&out).to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPING ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses a resolved template asset, applies the scope token to the single
/// directive subtree, and rewrites every `<style scoped>` block. Returns
/// `None` (the "no template" fallback) when the directive structure is
/// invalid; style parse problems only skip the affected block.
pub fn scope_template(
    markup: &str,
    token: &str,
    file: &str,
    errors: &mut Vec<CompilerError>,
) -> Option<ScopedTemplate> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut markup.as_bytes())
        .ok()?;

    let mut containers: Vec<Handle> = Vec::new();
    let mut styles: Vec<Handle> = Vec::new();
    walk(&dom.document, &mut |node| match element_name(node).as_deref() {
        Some("template") => containers.push(node.clone()),
        Some("style") => styles.push(node.clone()),
        _ => {}
    });

    if containers.is_empty() {
        let err = CompilerError::new(
            ERR_TEMPLATE_CONTAINER,
            "template asset has no top-level <template> container",
            file,
            1,
            1,
        );
        err.report();
        errors.push(err);
        return None;
    }

    let directives: Vec<Handle> = containers
        .iter()
        .filter(|t| has_attr(t, SCOPING_DIRECTIVE))
        .cloned()
        .collect();

    if directives.is_empty() {
        let err = CompilerError::new(ERR_TEMPLATE_NONE, "no markup found", file, 1, 1);
        err.report();
        errors.push(err);
        return None;
    }
    if directives.len() > 1 {
        let err = CompilerError::new(
            ERR_TEMPLATE_MULTI,
            &format!(
                "expected exactly one <template {}> element, found {}",
                SCOPING_DIRECTIVE,
                directives.len()
            ),
            file,
            1,
            1,
        );
        err.report();
        errors.push(err);
        return None;
    }

    // The parser stores <template> children in its contents fragment.
    let directive = &directives[0];
    let contents = match &directive.data {
        NodeData::Element {
            template_contents, ..
        } => template_contents
            .borrow()
            .as_ref()
            .cloned()
            .unwrap_or_else(|| directive.clone()),
        _ => directive.clone(),
    };

    let attr_name = scope_attr_name(token);
    attach_scope_marker(&contents, &attr_name);
    let scoped_markup = serialize_children(&contents);

    // Best-effort style pass: a block that fails to parse is reported and
    // skipped; the others still contribute to the injection string.
    let attr_selector = scope_attr_selector(token);
    let mut style_inject = String::new();
    for style in &styles {
        if !has_attr(style, "scoped") {
            continue;
        }
        let css = text_content(style);
        let printed = if has_attr(style, "bleed") {
            Some(css.trim().to_string())
        } else {
            match scope_css(&css, &attr_selector) {
                Ok(scoped) => Some(scoped.trim().to_string()),
                Err(e) => {
                    let err = CompilerError::new(ERR_STYLE_PARSE, &e.message, file, 1, 1);
                    err.report();
                    errors.push(err);
                    None
                }
            }
        };
        if let Some(text) = printed {
            if !text.is_empty() {
                if !style_inject.is_empty() {
                    style_inject.push('\n');
                }
                style_inject.push_str(&text);
            }
        }
    }

    Some(ScopedTemplate {
        markup: scoped_markup.trim().to_string(),
        style_inject,
    })
}
