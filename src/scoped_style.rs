//! Scoped-style rewriting.
//!
//! Parses a stylesheet with a block-placeholder pass (top-level `{...}` bodies
//! are escaped out, rules are matched over the flattened text, bodies are
//! substituted back) and conjoins every selector with the component's scope
//! token attribute selector, so rules only match inside the component's
//! rendered subtree. Conditional group at-rules (`@media`, `@supports`, ...)
//! are scoped recursively; name-defining at-rules (`@keyframes`, `@font-face`,
//! ...) are left untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const BLOCK_PLACEHOLDER: &str = "%BLOCK%";

/// At-rules whose body is itself a list of style rules.
const SCOPED_AT_RULE_IDENTIFIERS: &[&str] = &[
    "@media",
    "@supports",
    "@document",
    "@layer",
    "@container",
    "@scope",
    "@starting-style",
];

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\*[\s\S]*?\*/").unwrap());

static RULE_RE: Lazy<Regex> = Lazy::new(|| {
    let block = regex::escape(BLOCK_PLACEHOLDER);
    Regex::new(&format!(r"(?s)([^;{{}}]+?)\s*(\{{{}\}}|;)", block)).unwrap()
});

#[derive(Debug, Clone, Error)]
#[error("stylesheet parse error: {message}")]
pub struct StyleParseError {
    pub message: String,
}

impl StyleParseError {
    fn new(message: impl Into<String>) -> Self {
        StyleParseError {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CssRule {
    pub selector: String,
    pub content: String,
}

struct EscapedBlocks {
    escaped: String,
    blocks: Vec<String>,
}

/// Replaces every top-level `{...}` body with a placeholder so rule matching
/// never sees nested braces. Unbalanced braces are a parse error.
fn escape_blocks(input: &str) -> Result<EscapedBlocks, StyleParseError> {
    let mut escaped = String::with_capacity(input.len());
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut block_start = 0usize;

    for (i, ch) in input.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    escaped.push('{');
                    escaped.push_str(BLOCK_PLACEHOLDER);
                    block_start = i + 1;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(StyleParseError::new("unbalanced '}'"));
                }
                depth -= 1;
                if depth == 0 {
                    blocks.push(input[block_start..i].to_string());
                    escaped.push('}');
                }
            }
            _ => {
                if depth == 0 {
                    escaped.push(ch);
                }
            }
        }
    }

    if depth != 0 {
        return Err(StyleParseError::new("unbalanced '{'"));
    }

    Ok(EscapedBlocks { escaped, blocks })
}

/// Applies `rule_callback` to every rule of `input`. At-statements without a
/// body (`@import ...;`) come through with empty content.
pub fn process_rules<F>(input: &str, rule_callback: &mut F) -> Result<String, StyleParseError>
where
    F: FnMut(CssRule) -> CssRule,
{
    let escaped = escape_blocks(input)?;
    let mut out = String::with_capacity(input.len());
    let mut last_end = 0usize;
    let mut next_block = 0usize;

    for caps in RULE_RE.captures_iter(&escaped.escaped) {
        let m = caps.get(0).unwrap();
        let gap = &escaped.escaped[last_end..m.start()];
        if !gap.trim().is_empty() {
            return Err(StyleParseError::new(format!(
                "unexpected text before rule: {}",
                gap.trim()
            )));
        }
        last_end = m.end();

        let selector = caps.get(1).unwrap().as_str().trim();
        let has_body = caps.get(2).unwrap().as_str().starts_with('{');
        let content = if has_body {
            let block = escaped.blocks[next_block].clone();
            next_block += 1;
            block
        } else {
            String::new()
        };

        let rule = rule_callback(CssRule {
            selector: selector.to_string(),
            content,
        });
        if has_body {
            out.push_str(&format!("{} {{{}}}\n", rule.selector, rule.content));
        } else {
            out.push_str(&format!("{};\n", rule.selector));
        }
    }

    let tail = &escaped.escaped[last_end..];
    if !tail.trim().is_empty() {
        return Err(StyleParseError::new(format!(
            "trailing text after last rule: {}",
            tail.trim()
        )));
    }

    Ok(out)
}

/// Rewrites every selector of `css` to additionally require the scope-token
/// attribute `scope_attr` (e.g. `[data-verve-1a2b3c4d]`).
pub fn scope_css(css: &str, scope_attr: &str) -> Result<String, StyleParseError> {
    let stripped = COMMENT_RE.replace_all(css, "");
    process_rules(&stripped, &mut |rule| scope_rule(rule, scope_attr))
}

fn scope_rule(rule: CssRule, scope_attr: &str) -> CssRule {
    let selector = rule.selector.trim();
    if selector.starts_with('@') {
        if SCOPED_AT_RULE_IDENTIFIERS
            .iter()
            .any(|id| selector.starts_with(id))
        {
            // Conditional group: the body is a nested rule list. It came from
            // a balanced block, so re-processing it cannot fail structurally;
            // on the off chance it does, the body is left unscoped.
            let content = scope_css(&rule.content, scope_attr).unwrap_or(rule.content);
            return CssRule {
                selector: rule.selector,
                content,
            };
        }
        // @keyframes, @font-face, @import, @charset, @page: never scoped.
        return rule;
    }

    CssRule {
        selector: scope_selector_list(selector, scope_attr),
        content: rule.content,
    }
}

/// Splits a selector list on top-level commas and scopes each part.
fn scope_selector_list(selector: &str, scope_attr: &str) -> String {
    split_top_level(selector, ',')
        .into_iter()
        .map(|part| scope_selector_part(part.trim(), scope_attr))
        .collect::<Vec<_>>()
        .join(", ")
}

fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, ch) in input.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Conjoins one compound-selector chain with the scope attribute. The
/// attribute lands on the last compound, before any pseudo suffix, so
/// `.a .b:hover` becomes `.a .b[attr]:hover`.
fn scope_selector_part(part: &str, scope_attr: &str) -> String {
    if part.is_empty() {
        return part.to_string();
    }

    // Locate the start of the last compound (after the last top-level
    // combinator).
    let mut depth = 0i32;
    let mut compound_start = 0usize;
    for (i, ch) in part.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ' ' | '\t' | '\n' | '>' | '+' | '~' if depth == 0 => {
                compound_start = i + ch.len_utf8();
            }
            _ => {}
        }
    }

    let (prefix, compound) = part.split_at(compound_start);
    if compound == "*" {
        return format!("{}{}", prefix, scope_attr);
    }

    // Insert before the first top-level pseudo of the compound.
    let mut depth = 0i32;
    for (i, ch) in compound.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ':' if depth == 0 => {
                return format!(
                    "{}{}{}{}",
                    prefix,
                    &compound[..i],
                    scope_attr,
                    &compound[i..]
                );
            }
            _ => {}
        }
    }

    format!("{}{}{}", prefix, compound, scope_attr)
}
