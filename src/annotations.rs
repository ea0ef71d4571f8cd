//! Annotation resolution over parsed declarations.
//!
//! An annotation is a decorator in either bare (`@prop`) or call
//! (`@watch('count', { deep: true })`) form. Resolution is a pure lookup over
//! the declaration's decorator list; argument splitting separates positional
//! expressions from the name-keyed entries contributed by object-literal
//! arguments.

use std::collections::HashMap;

use oxc_ast::ast::{CallExpression, Decorator, Expression, ObjectPropertyKind, PropertyKey};
use oxc_span::{GetSpan, Span};

/// A matched annotation on a declaration.
pub struct Annotation<'a, 'b> {
    pub name: &'b str,
    /// Span of the whole `@...` decorator, for deletion from the output.
    pub span: Span,
    pub call: Option<&'b CallExpression<'a>>,
}

/// Positional and named argument expressions of one annotation.
/// Duplicate named arguments follow the general argument-list rule: last wins.
#[derive(Default)]
pub struct AnnotationArguments<'a, 'b> {
    pub positional: Vec<&'b Expression<'a>>,
    pub named: HashMap<String, &'b Expression<'a>>,
}

impl<'a, 'b> AnnotationArguments<'a, 'b> {
    pub fn named_str(&self, name: &str) -> Option<&'b str> {
        self.named.get(name).and_then(|e| string_literal(e))
    }

    pub fn named_bool(&self, name: &str) -> Option<bool> {
        match self.named.get(name) {
            Some(Expression::BooleanLiteral(b)) => Some(b.value),
            _ => None,
        }
    }
}

fn decorator_parts<'a, 'b>(
    decorator: &'b Decorator<'a>,
) -> Option<(&'b str, Option<&'b CallExpression<'a>>)> {
    match &decorator.expression {
        Expression::Identifier(ident) => Some((ident.name.as_str(), None)),
        Expression::CallExpression(call) => match &call.callee {
            Expression::Identifier(ident) => Some((ident.name.as_str(), Some(call))),
            _ => None,
        },
        _ => None,
    }
}

/// Returns the first decorator matching one of `names`, or none.
pub fn find_annotation<'a, 'b>(
    decorators: &'b [Decorator<'a>],
    names: &[&str],
) -> Option<Annotation<'a, 'b>> {
    for decorator in decorators {
        if let Some((name, call)) = decorator_parts(decorator) {
            if names.contains(&name) {
                return Some(Annotation {
                    name,
                    span: decorator.span(),
                    call,
                });
            }
        }
    }
    None
}

/// Splits an annotation's argument list. Object-literal arguments contribute
/// their properties to the named map; everything else is positional.
pub fn split_arguments<'a, 'b>(
    call: Option<&'b CallExpression<'a>>,
) -> AnnotationArguments<'a, 'b> {
    let mut args = AnnotationArguments::default();
    let Some(call) = call else {
        return args;
    };
    for arg in &call.arguments {
        let Some(expr) = arg.as_expression() else {
            continue;
        };
        if let Expression::ObjectExpression(obj) = expr {
            for prop in &obj.properties {
                if let ObjectPropertyKind::ObjectProperty(p) = prop {
                    if let Some(name) = static_key_name(&p.key) {
                        args.named.insert(name.to_string(), &p.value);
                    }
                }
            }
        } else {
            args.positional.push(expr);
        }
    }
    args
}

/// Statically known name of a property key (identifier or string form).
pub fn static_key_name<'a, 'b>(key: &'b PropertyKey<'a>) -> Option<&'b str> {
    match key {
        PropertyKey::StaticIdentifier(ident) => Some(ident.name.as_str()),
        PropertyKey::StringLiteral(lit) => Some(lit.value.as_str()),
        _ => None,
    }
}

pub fn string_literal<'a, 'b>(expr: &'b Expression<'a>) -> Option<&'b str> {
    match expr {
        Expression::StringLiteral(lit) => Some(lit.value.as_str()),
        _ => None,
    }
}

/// Source slice of an expression, for verbatim forwarding into generated text.
pub fn expr_text<'a>(expr: &Expression<'_>, source: &'a str) -> &'a str {
    let span = expr.span();
    &source[span.start as usize..span.end as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn with_class_decorators<F: FnOnce(&[Decorator], &str)>(source: &str, f: F) {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_typescript(true).with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        assert!(!ret.panicked, "fixture failed to parse");
        for stmt in &ret.program.body {
            if let oxc_ast::ast::Statement::ClassDeclaration(class) = stmt {
                f(&class.decorators, source);
                return;
            }
        }
        panic!("no class in fixture");
    }

    #[test]
    fn test_bare_annotation() {
        with_class_decorators("@mixin class M {}", |decorators, _| {
            let ann = find_annotation(decorators, &["component", "mixin"]).unwrap();
            assert_eq!(ann.name, "mixin");
            assert!(ann.call.is_none());
        });
    }

    #[test]
    fn test_first_match_wins() {
        with_class_decorators("@other @component({}) class C {}", |decorators, _| {
            let ann = find_annotation(decorators, &["component", "other"]).unwrap();
            assert_eq!(ann.name, "other");
        });
    }

    #[test]
    fn test_unrecognized_is_none() {
        with_class_decorators("@frozen class C {}", |decorators, _| {
            assert!(find_annotation(decorators, &["component"]).is_none());
        });
    }

    #[test]
    fn test_split_positional_and_named() {
        with_class_decorators(
            "@watch('count', { deep: true, deep: false }) class C {}",
            |decorators, _| {
                let ann = find_annotation(decorators, &["watch"]).unwrap();
                let args = split_arguments(ann.call);
                assert_eq!(args.positional.len(), 1);
                assert_eq!(string_literal(args.positional[0]), Some("count"));
                // last named duplicate wins
                assert_eq!(args.named_bool("deep"), Some(false));
            },
        );
    }

    #[test]
    fn test_named_string_and_expr_text() {
        with_class_decorators(
            "@component({ template: './counter.html', components: [Child] }) class C {}",
            |decorators, source| {
                let ann = find_annotation(decorators, &["component"]).unwrap();
                let args = split_arguments(ann.call);
                assert_eq!(args.named_str("template"), Some("./counter.html"));
                let components = args.named.get("components").unwrap();
                assert_eq!(expr_text(components, source), "[Child]");
            },
        );
    }
}
