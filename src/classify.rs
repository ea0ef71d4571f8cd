//! Member classification.
//!
//! Walks one annotated class and decides, member by member, which rewrite
//! applies: reactive fields become accessor pairs, computed accessors and
//! methods are renamed behind public wrappers, watchers are renamed and
//! recorded. Each decision lands as edits against the unit's edit list plus
//! an entry in the class's metadata. A member that fails validation is
//! reported and left untouched; the rest of the class still compiles.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use oxc_ast::ast::{
    BindingPattern, Class, ClassElement, Declaration, ExportDefaultDeclarationKind,
    MethodDefinition, MethodDefinitionKind, Program, PropertyDefinition, Statement,
    TSTypeAnnotation,
};
use oxc_span::{GetSpan, Span};
use regex::Regex;

use crate::annotations::{
    expr_text, find_annotation, split_arguments, static_key_name, string_literal, Annotation,
};
use crate::codegen;
use crate::edits::EditList;
use crate::errors::{
    line_col, CompilerError, ERR_COMPUTED_SHAPE, ERR_METHOD_SHAPE, ERR_SETTER_WITHOUT_GETTER,
    ERR_WATCH_ARITY, ERR_WATCH_TARGET,
};
use crate::metadata::{
    ComponentKind, ComponentMetadata, ComputedSpec, MethodSpec, PropSpec, StateSpec, WatcherSpec,
};

// A bare `constructor = null;` field is not a class member under the host
// grammar; the parser panics on it. It is erased ahead of parsing, leaving
// the line in place so positions stay stable. The quoted form
// (`'constructor' = null;`) parses as an ordinary field and is removed
// member by member in `classify_field`.
static MARKER_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*constructor[ \t]*=[ \t]*[^;\n]*;[ \t]*\r?$").unwrap());

/// Erases bare `constructor = ...;` marker lines before the unit is parsed.
pub fn strip_marker_fields(source: &str) -> Cow<'_, str> {
    MARKER_FIELD_RE.replace_all(source, "")
}

const FIELD_ANNOTATIONS: &[&str] = &["prop", "state", "data", "ref"];
const METHOD_ANNOTATIONS: &[&str] = &["computed", "method", "watch"];
const TYPE_ANNOTATIONS: &[&str] = &["component", "mixin", "app"];

/// Top-level class declarations of a unit, looking through export wrappers.
pub fn top_level_classes<'a, 'b>(program: &'b Program<'a>) -> Vec<&'b Class<'a>> {
    let mut classes = Vec::new();
    for stmt in &program.body {
        match stmt {
            Statement::ClassDeclaration(class) => classes.push(&**class),
            Statement::ExportNamedDeclaration(export) => {
                if let Some(Declaration::ClassDeclaration(class)) = &export.declaration {
                    classes.push(&**class);
                }
            }
            Statement::ExportDefaultDeclaration(export) => {
                if let ExportDefaultDeclarationKind::ClassDeclaration(class) = &export.declaration {
                    classes.push(&**class);
                }
            }
            _ => {}
        }
    }
    classes
}

/// Role of a class, if its type-level annotation marks it as compiled.
pub fn class_role<'a, 'b>(class: &'b Class<'a>) -> Option<(ComponentKind, Annotation<'a, 'b>)> {
    let ann = find_annotation(&class.decorators, TYPE_ANNOTATIONS)?;
    let kind = match ann.name {
        "component" => ComponentKind::Component,
        "mixin" => ComponentKind::Mixin,
        _ => ComponentKind::App,
    };
    Some((kind, ann))
}

fn span_text<'s>(span: Span, source: &'s str) -> &'s str {
    &source[span.start as usize..span.end as usize]
}

fn annotated_type<'s>(ta: Option<&TSTypeAnnotation>, source: &'s str) -> Option<&'s str> {
    ta.map(|t| span_text(t.type_annotation.span(), source))
}

fn report(errors: &mut Vec<CompilerError>, code: &str, message: &str, file: &str, source: &str, at: Span) {
    let (line, column) = line_col(source, at.start);
    let err = CompilerError::new(code, message, file, line, column);
    err.report();
    errors.push(err);
}

/// Classifies every member of `class`, accumulating rewrites into `edits` and
/// returning the metadata the descriptor synthesizer consumes.
pub fn classify_members(
    class: &Class,
    name: &str,
    kind: ComponentKind,
    source: &str,
    file: &str,
    edits: &mut EditList,
    errors: &mut Vec<CompilerError>,
) -> ComponentMetadata {
    let mut meta = ComponentMetadata::new(name, kind);
    let mut pending_watchers: Vec<(WatcherSpec, Span)> = Vec::new();

    for element in &class.body.body {
        match element {
            ClassElement::PropertyDefinition(field) => {
                classify_field(field, source, &mut meta, edits);
            }
            ClassElement::MethodDefinition(method) => {
                classify_method(
                    method,
                    source,
                    file,
                    &mut meta,
                    &mut pending_watchers,
                    edits,
                    errors,
                );
            }
            _ => {}
        }
    }

    // Watch targets are validated against the finished member set, so a
    // watcher may observe a member declared after it.
    for (watcher, at) in pending_watchers {
        if meta.declares_reactive(&watcher.target) {
            meta.watchers.push(watcher);
        } else {
            report(
                errors,
                ERR_WATCH_TARGET,
                &format!("'{}' is not a reactive member of this class", watcher.target),
                file,
                source,
                at,
            );
        }
    }

    meta
}

fn classify_field(
    field: &PropertyDefinition,
    source: &str,
    meta: &mut ComponentMetadata,
    edits: &mut EditList,
) {
    let Some(name) = static_key_name(&field.key) else {
        return;
    };

    // Marker field kept by authors for editor tooling. The bare form never
    // reaches this point (erased before parsing); the quoted form does.
    if name == "constructor" {
        edits.delete(field.span.start, field.span.end);
        return;
    }

    let Some(ann) = find_annotation(&field.decorators, FIELD_ANNOTATIONS) else {
        return;
    };

    let ts_type = annotated_type(field.type_annotation.as_deref(), source).map(str::to_string);
    let init = field
        .value
        .as_ref()
        .map(|v| expr_text(v, source).to_string());

    // The replacement covers the whole field span, decorators included.
    match ann.name {
        "prop" => {
            edits.replace(
                field.span.start,
                field.span.end,
                codegen::reactive_accessors(name, ts_type.as_deref()),
            );
            meta.props.push(PropSpec {
                name: name.to_string(),
                ts_type,
                default: init,
            });
        }
        "state" | "data" => {
            edits.replace(
                field.span.start,
                field.span.end,
                codegen::reactive_accessors(name, ts_type.as_deref()),
            );
            meta.states.push(StateSpec {
                name: name.to_string(),
                init,
            });
        }
        "ref" => {
            edits.replace(
                field.span.start,
                field.span.end,
                codegen::ref_accessor(name, ts_type.as_deref()),
            );
        }
        _ => {}
    }
}

fn classify_method(
    method: &MethodDefinition,
    source: &str,
    file: &str,
    meta: &mut ComponentMetadata,
    pending_watchers: &mut Vec<(WatcherSpec, Span)>,
    edits: &mut EditList,
    errors: &mut Vec<CompilerError>,
) {
    let Some(name) = static_key_name(&method.key) else {
        return;
    };
    let Some(ann) = find_annotation(&method.decorators, METHOD_ANNOTATIONS) else {
        return;
    };
    let key_span = method.key.span();

    match (ann.name, method.kind) {
        ("computed", MethodDefinitionKind::Get) => {
            edits.delete(ann.span.start, ann.span.end);
            edits.replace(key_span.start, key_span.end, codegen::computed_impl_name(name));
            let return_type =
                annotated_type(method.value.return_type.as_deref(), source);
            edits.insert(
                method.span.end,
                format!("\n  {}", codegen::computed_public_getter(name, return_type)),
            );
            meta.computed.push(ComputedSpec {
                name: name.to_string(),
                has_setter: false,
            });
        }
        ("computed", MethodDefinitionKind::Set) => {
            let Some(entry) = meta.computed_mut(name) else {
                report(
                    errors,
                    ERR_SETTER_WITHOUT_GETTER,
                    &format!("computed setter '{}' has no preceding getter", name),
                    file,
                    source,
                    key_span,
                );
                return;
            };
            entry.has_setter = true;
            edits.delete(ann.span.start, ann.span.end);
            edits.replace(key_span.start, key_span.end, codegen::computed_impl_name(name));
            let value_type = method
                .value
                .params
                .items
                .first()
                .and_then(|p| annotated_type(p.type_annotation.as_deref(), source));
            edits.insert(
                method.span.end,
                format!("\n  {}", codegen::computed_public_setter(name, value_type)),
            );
        }
        ("computed", _) => {
            report(
                errors,
                ERR_COMPUTED_SHAPE,
                &format!("@computed on '{}' requires a getter or setter", name),
                file,
                source,
                key_span,
            );
        }
        ("method", MethodDefinitionKind::Method) => {
            let mut call_args = Vec::new();
            let mut signature_parts = Vec::new();
            for param in &method.value.params.items {
                match &param.pattern {
                    BindingPattern::BindingIdentifier(id) => {
                        call_args.push(id.name.to_string());
                        signature_parts.push(span_text(param.span, source).to_string());
                    }
                    _ => {
                        report(
                            errors,
                            ERR_METHOD_SHAPE,
                            &format!("parameters of @method '{}' must be plain identifiers", name),
                            file,
                            source,
                            param.span,
                        );
                        return;
                    }
                }
            }
            edits.delete(ann.span.start, ann.span.end);
            edits.replace(key_span.start, key_span.end, codegen::method_impl_name(name));
            edits.insert(
                method.span.end,
                format!(
                    "\n  {}",
                    codegen::method_wrapper(name, &signature_parts.join(", "), &call_args)
                ),
            );
            meta.methods.push(MethodSpec {
                name: name.to_string(),
                params: call_args,
            });
        }
        ("method", _) => {
            report(
                errors,
                ERR_METHOD_SHAPE,
                &format!("@method on '{}' requires a plain method", name),
                file,
                source,
                key_span,
            );
        }
        ("watch", MethodDefinitionKind::Method) => {
            let args = split_arguments(ann.call);
            let Some(target) = args.positional.first().and_then(|e| string_literal(e)) else {
                report(
                    errors,
                    ERR_WATCH_TARGET,
                    &format!("@watch on '{}' requires a string-literal target", name),
                    file,
                    source,
                    ann.span,
                );
                return;
            };
            let arity = method.value.params.items.len();
            if arity > 2 {
                report(
                    errors,
                    ERR_WATCH_ARITY,
                    &format!("watcher '{}' declares {} parameters", name, arity),
                    file,
                    source,
                    key_span,
                );
                return;
            }
            edits.delete(ann.span.start, ann.span.end);
            edits.replace(key_span.start, key_span.end, codegen::watch_impl_name(name));
            pending_watchers.push((
                WatcherSpec {
                    handler: name.to_string(),
                    target: target.to_string(),
                    arity,
                    deep: args.named_bool("deep").unwrap_or(false),
                },
                key_span,
            ));
        }
        ("watch", _) => {
            report(
                errors,
                ERR_METHOD_SHAPE,
                &format!("@watch on '{}' requires a plain method", name),
                file,
                source,
                key_span,
            );
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn classify_fixture(source: &str) -> (String, ComponentMetadata, Vec<CompilerError>) {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_typescript(true).with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        let mut edits = EditList::new();
        let mut errors = Vec::new();
        for stmt in &ret.program.body {
            if let oxc_ast::ast::Statement::ClassDeclaration(class) = stmt {
                let meta = classify_members(
                    class,
                    "C",
                    ComponentKind::Component,
                    source,
                    "c.ts",
                    &mut edits,
                    &mut errors,
                );
                return (edits.apply(source), meta, errors);
            }
        }
        panic!("no class in fixture");
    }

    #[test]
    fn test_class_role_and_export_lookthrough() {
        let source = "export class A {}\n\
                      @component({}) export class B {}\n\
                      @mixin class M {}\n\
                      @app({ el: '#app' }) class Root {}";
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_typescript(true).with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        let classes = top_level_classes(&ret.program);
        assert_eq!(classes.len(), 4);
        assert!(class_role(classes[0]).is_none());
        assert_eq!(class_role(classes[1]).map(|r| r.0), Some(ComponentKind::Component));
        assert_eq!(class_role(classes[2]).map(|r| r.0), Some(ComponentKind::Mixin));
        assert_eq!(class_role(classes[3]).map(|r| r.0), Some(ComponentKind::App));
    }

    #[test]
    fn test_prop_becomes_accessor_pair() {
        let (out, meta, errors) = classify_fixture("class C {\n  @prop count: number = 0;\n}");
        assert!(errors.is_empty());
        assert!(out.contains("get count(): number { return this.$vGet('count'); }"));
        assert!(out.contains("set count(value: number) { this.$vSet('count', value); }"));
        assert!(!out.contains("@prop"));
        assert_eq!(meta.props[0].name, "count");
        assert_eq!(meta.props[0].ts_type.as_deref(), Some("number"));
        assert_eq!(meta.props[0].default.as_deref(), Some("0"));
    }

    #[test]
    fn test_state_and_data_alias() {
        let (out, meta, _) =
            classify_fixture("class C {\n  @state x = 1;\n  @data y: string;\n}");
        assert!(out.contains("this.$vGet('x')"));
        assert!(out.contains("this.$vSet('y', value)"));
        assert_eq!(meta.states.len(), 2);
        assert_eq!(meta.states[0].init.as_deref(), Some("1"));
        assert!(meta.states[1].init.is_none());
    }

    #[test]
    fn test_ref_is_getter_only() {
        let (out, meta, _) = classify_fixture("class C {\n  @ref input: HTMLElement;\n}");
        assert!(out.contains("get input(): HTMLElement { return this.$vRef('input'); }"));
        assert!(!out.contains("set input"));
        assert!(meta.props.is_empty() && meta.states.is_empty());
    }

    #[test]
    fn test_marker_field_stripped_before_parse() {
        let src = "class C {\n  constructor = null;\n  @state x = 1;\n}";
        let stripped = strip_marker_fields(src);
        assert!(!stripped.contains("constructor"));
        let (out, _, errors) = classify_fixture(&stripped);
        assert!(errors.is_empty());
        assert!(out.contains("this.$vGet('x')"));
    }

    #[test]
    fn test_marker_strip_leaves_other_lines_alone() {
        let src = "const a = 1;\nobj.constructor = f;\nconstructor = null;\n";
        let stripped = strip_marker_fields(src);
        assert!(stripped.contains("obj.constructor = f;"));
        assert!(stripped.contains("const a = 1;"));
        assert!(!stripped.contains("\nconstructor = null;"));
    }

    #[test]
    fn test_quoted_marker_field_deleted() {
        let (out, _, errors) =
            classify_fixture("class C {\n  'constructor' = null;\n  @state x = 1;\n}");
        assert!(errors.is_empty());
        assert!(!out.contains("'constructor' = null"));
        assert!(out.contains("this.$vGet('x')"));
    }

    #[test]
    fn test_undecorated_members_untouched() {
        let src = "class C {\n  plain = 1;\n  helper() { return 2; }\n}";
        let (out, meta, errors) = classify_fixture(src);
        assert_eq!(out, src);
        assert!(errors.is_empty());
        assert!(meta.methods.is_empty());
    }

    #[test]
    fn test_computed_getter_renamed_behind_public_getter() {
        let (out, meta, errors) = classify_fixture(
            "class C {\n  @computed get total(): number { return 1; }\n}",
        );
        assert!(errors.is_empty());
        assert!(out.contains("get $verve_computed_total(): number { return 1; }"));
        assert!(out.contains("get total(): number { return this.$vGet('total'); }"));
        assert_eq!(meta.computed.len(), 1);
        assert!(!meta.computed[0].has_setter);
    }

    #[test]
    fn test_computed_setter_pairs_with_getter() {
        let (out, meta, errors) = classify_fixture(
            "class C {\n  @computed get total(): number { return 1; }\n  @computed set total(v: number) { }\n}",
        );
        assert!(errors.is_empty());
        assert!(out.contains("set $verve_computed_total(v: number)"));
        assert!(out.contains("set total(value: number) { this.$vSet('total', value); }"));
        assert!(meta.computed[0].has_setter);
    }

    #[test]
    fn test_setter_without_getter_rejected() {
        let src = "class C {\n  @computed set total(v: number) { }\n}";
        let (out, meta, errors) = classify_fixture(src);
        assert_eq!(errors[0].code, ERR_SETTER_WITHOUT_GETTER);
        assert_eq!(out, src);
        assert!(meta.computed.is_empty());
    }

    #[test]
    fn test_computed_on_plain_method_rejected() {
        let src = "class C {\n  @computed total() { return 1; }\n}";
        let (out, _, errors) = classify_fixture(src);
        assert_eq!(errors[0].code, ERR_COMPUTED_SHAPE);
        assert_eq!(out, src);
    }

    #[test]
    fn test_method_renamed_behind_wrapper() {
        let (out, meta, errors) = classify_fixture(
            "class C {\n  @method go(a: number, b: number) { return a + b; }\n}",
        );
        assert!(errors.is_empty());
        assert!(out.contains("$verve_method_go(a: number, b: number) { return a + b; }"));
        assert!(out.contains("go(a: number, b: number) { return this.$vGet('go')(a, b); }"));
        assert_eq!(meta.methods[0].params, vec!["a", "b"]);
    }

    #[test]
    fn test_method_with_destructured_param_rejected() {
        let src = "class C {\n  @method go({ a }) { return a; }\n}";
        let (out, meta, errors) = classify_fixture(src);
        assert_eq!(errors[0].code, ERR_METHOD_SHAPE);
        assert_eq!(out, src);
        assert!(meta.methods.is_empty());
    }

    #[test]
    fn test_method_on_getter_rejected() {
        let src = "class C {\n  @method get go() { return 1; }\n}";
        let (out, _, errors) = classify_fixture(src);
        assert_eq!(errors[0].code, ERR_METHOD_SHAPE);
        assert_eq!(out, src);
    }

    #[test]
    fn test_watcher_recorded_and_renamed() {
        let (out, meta, errors) = classify_fixture(
            "class C {\n  @state count = 0;\n  @watch('count', { deep: true }) onCount(next: number, prev: number) { }\n}",
        );
        assert!(errors.is_empty());
        assert!(out.contains("$verve_watch_onCount(next: number, prev: number)"));
        assert_eq!(meta.watchers.len(), 1);
        assert_eq!(meta.watchers[0].target, "count");
        assert_eq!(meta.watchers[0].arity, 2);
        assert!(meta.watchers[0].deep);
    }

    #[test]
    fn test_watcher_may_observe_later_member() {
        let (_, meta, errors) = classify_fixture(
            "class C {\n  @watch('count') onCount() { }\n  @state count = 0;\n}",
        );
        assert!(errors.is_empty());
        assert_eq!(meta.watchers.len(), 1);
    }

    #[test]
    fn test_watcher_with_three_params_rejected() {
        let src = "class C {\n  @state x = 0;\n  @watch('x') f(a, b, c) { }\n}";
        let (out, meta, errors) = classify_fixture(src);
        assert_eq!(errors[0].code, ERR_WATCH_ARITY);
        assert!(meta.watchers.is_empty());
        assert!(out.contains("@watch('x') f(a, b, c)"));
    }

    #[test]
    fn test_watcher_on_undeclared_target_dropped() {
        let (out, meta, errors) =
            classify_fixture("class C {\n  @watch('ghost') f() { }\n}");
        assert_eq!(errors[0].code, ERR_WATCH_TARGET);
        assert!(meta.watchers.is_empty());
        // The implementation rename already happened; only the table entry is dropped.
        assert!(out.contains("$verve_watch_f"));
    }

    #[test]
    fn test_watch_without_literal_target_rejected() {
        let src = "class C {\n  @watch(name) f() { }\n}";
        let (out, meta, errors) = classify_fixture(src);
        assert_eq!(errors[0].code, ERR_WATCH_TARGET);
        assert!(meta.watchers.is_empty());
        assert_eq!(out, src);
    }
}
