//! End-to-end pipeline tests: real units compiled against in-memory assets,
//! asserting on the emitted artifact text.

use std::path::Path;

use crate::assets::MemoryAssets;
use crate::compile::{compile_source, CompileResult};
use crate::errors::{ERR_ASSET_MISSING, ERR_PARSE, ERR_TEMPLATE_NONE, ERR_WATCH_ARITY};

fn compile(path: &str, source: &str, assets: &MemoryAssets) -> CompileResult {
    compile_source(Path::new(path), source, assets).expect("unit compiles")
}

fn scope_token(code: &str) -> String {
    let idx = code.find("data-verve-").expect("scope token present");
    code[idx + "data-verve-".len()..idx + "data-verve-".len() + 8].to_string()
}

const COUNTER_SOURCE: &str = "\
import { VerveComponentConstructor } from 'verve';

@component({ template: './counter.html' })
export class Counter {
  @prop start: number = 0;
  @state count: number = 0;

  @computed get total(): number { return this.count + this.start; }

  @method increment(step: number) { this.count = this.count + step; }

  @watch('count') onCount(next: number) { }

  helper() { return 1; }
}
";

const COUNTER_TEMPLATE: &str = "\
<template verve><div class=\"x\"><span>hi</span></div></template>
<style scoped>.x { color: red; }</style>
<style scoped bleed>body { margin: 0; }</style>
";

fn counter_result() -> CompileResult {
    let assets = MemoryAssets::new();
    assets.insert("src/counter.html", COUNTER_TEMPLATE);
    compile("src/counter.ts", COUNTER_SOURCE, &assets)
}

#[test]
fn test_reactive_fields_become_accessors() {
    let result = counter_result();
    assert!(result.errors.is_empty());
    let code = &result.code;
    assert!(code.contains("get start(): number { return this.$vGet('start'); }"));
    assert!(code.contains("set start(value: number) { this.$vSet('start', value); }"));
    assert!(code.contains("get count(): number { return this.$vGet('count'); }"));
    assert!(!code.contains("@prop"));
    assert!(!code.contains("@state"));
    assert!(!code.contains("@component"));
}

#[test]
fn test_members_renamed_behind_wrappers() {
    let code = counter_result().code;
    assert!(code.contains("get $verve_computed_total(): number { return this.count + this.start; }"));
    assert!(code.contains("get total(): number { return this.$vGet('total'); }"));
    assert!(code.contains("$verve_method_increment(step: number)"));
    assert!(code.contains("increment(step: number) { return this.$vGet('increment')(step); }"));
    assert!(code.contains("$verve_watch_onCount(next: number)"));
}

#[test]
fn test_descriptor_tables() {
    let code = counter_result().code;
    assert!(code.contains("static constructor = VerveComponentConstructor({"));
    assert!(code.contains("name: 'Counter'"));
    assert!(code.contains("creator: () => new Counter()"));
    assert!(code.contains(
        "start: { type: 'number', check: (v) => typeof v === 'number', default: 0 }"
    ));
    assert!(code.contains("data: { count: 0 }"));
    assert!(code.contains("total: { get: (vm) => vm.$verve_computed_total, set: null }"));
    assert!(code.contains(
        "{ prop: 'count', handler: (vm, next) => vm.$verve_watch_onCount(next), deep: false }"
    ));
    assert!(code.contains("increment: (vm, step) => vm.$verve_method_increment(step)"));
}

#[test]
fn test_template_scoped_into_descriptor() {
    let code = counter_result().code;
    let token = scope_token(&code);
    // Both template elements carry the marker, and the scoped rule reuses it.
    assert!(code.matches(&format!("data-verve-{}", token)).count() >= 3);
    // Scoped rule conjoined with the token attribute, bleed rule untouched.
    assert!(code.contains(&format!(".x[data-verve-{}]", token)));
    assert!(code.contains("body { margin: 0; }"));
    assert!(!code.contains(&format!("body[data-verve-{}]", token)));
}

#[test]
fn test_untouched_code_survives_byte_for_byte() {
    let code = counter_result().code;
    assert!(code.contains("helper() { return 1; }"));
    assert!(code.contains("import { VerveComponentConstructor } from 'verve';"));
}

#[test]
fn test_missing_directive_falls_back_to_null_template() {
    let assets = MemoryAssets::new();
    assets.insert("src/c.html", "<template><div></div></template>");
    let result = compile(
        "src/c.ts",
        "@component({ template: './c.html' })\nclass C { }\n",
        &assets,
    );
    assert_eq!(result.errors[0].code, ERR_TEMPLATE_NONE);
    assert!(result.code.contains("template: null"));
    assert!(result.code.contains("styleInject: ''"));
}

#[test]
fn test_missing_asset_falls_back_to_null_template() {
    let assets = MemoryAssets::new();
    let result = compile("src/c.ts", "@component({})\nclass C { }\n", &assets);
    assert_eq!(result.errors[0].code, ERR_ASSET_MISSING);
    assert!(result.code.contains("template: null"));
}

#[test]
fn test_auto_template_resolves_sibling_asset() {
    let assets = MemoryAssets::new();
    assets.insert(
        "src/widget.html",
        "<template verve><p>w</p></template>",
    );
    let result = compile("src/widget.ts", "@component({})\nclass Widget { }\n", &assets);
    assert!(result.errors.is_empty());
    assert!(result.code.contains("data-verve-"));
}

#[test]
fn test_inline_template_embedded_verbatim() {
    let assets = MemoryAssets::new();
    let result = compile(
        "src/c.ts",
        "@component({ template: '<div>{{msg}}</div>' })\nclass C { }\n",
        &assets,
    );
    assert!(result.errors.is_empty());
    assert!(result.code.contains(r#"template: "<div>{{msg}}</div>""#));
    assert!(!result.code.contains("data-verve-"));
}

#[test]
fn test_overlong_watcher_leaves_empty_table() {
    let assets = MemoryAssets::new();
    assets.insert("src/w.html", "<template verve><i></i></template>");
    let result = compile(
        "src/w.ts",
        "@component({ template: './w.html' })\nclass W {\n  @state x = 0;\n  @watch('x') f(a, b, c) { }\n}\n",
        &assets,
    );
    assert_eq!(result.errors[0].code, ERR_WATCH_ARITY);
    assert!(result.code.contains("watchers: []"));
    // The offending member is left exactly as written.
    assert!(result.code.contains("@watch('x') f(a, b, c)"));
}

#[test]
fn test_marker_field_does_not_abort_the_unit() {
    let assets = MemoryAssets::new();
    let result = compile(
        "src/c.ts",
        "@component({ template: '<i>c</i>' })\nclass C {\n  constructor = null;\n  @state x = 1;\n}\n",
        &assets,
    );
    assert!(result.errors.is_empty());
    assert!(!result.code.contains("constructor = null"));
    assert!(result.code.contains("get x() { return this.$vGet('x'); }"));
    assert!(result.code.contains("data: { x: 1 }"));
}

#[test]
fn test_recoverable_diagnostic_carries_position() {
    let assets = MemoryAssets::new();
    let source = "const y = 1;\nconst b = a ?? c || d;\n";
    let result = compile("src/dup.ts", source, &assets);
    assert_eq!(result.errors[0].code, ERR_PARSE);
    assert_eq!(result.errors[0].line, 2);
}

#[test]
fn test_mixin_template_argument_resolved() {
    let assets = MemoryAssets::new();
    assets.insert(
        "src/m.html",
        "<template verve><div class=\"m\"></div></template>\
         <style scoped>.m { color: blue; }</style>",
    );
    let result = compile(
        "src/themed.ts",
        "@mixin({ template: './m.html' })\nclass Themed { }\n",
        &assets,
    );
    assert!(result.errors.is_empty());
    assert!(!result.code.contains("template: null"));
    assert!(result.code.contains("data-verve-"));
    assert!(result.code.contains(".m[data-verve-"));
    assert!(!result.code.contains("creator:"));
}

#[test]
fn test_mixin_gets_ambient_declarations_and_no_creator() {
    let assets = MemoryAssets::new();
    let result = compile(
        "src/log.ts",
        "@mixin\nclass Log {\n  @method log(msg: string) { console.log(msg); }\n}\n",
        &assets,
    );
    assert!(result.errors.is_empty());
    assert!(result.code.contains("$vGet!: (key: string) => any;"));
    assert!(result.code.contains("$vSet!: (key: string, value: any) => void;"));
    assert!(result.code.contains("VerveComponentConstructor({"));
    assert!(!result.code.contains("creator:"));
    assert!(result.code.contains("log: (vm, msg) => vm.$verve_method_log(msg)"));
}

#[test]
fn test_entry_unit_registers_imports_then_locals() {
    let assets = MemoryAssets::new();
    assets.insert("src/lib1.ts", "@component({}) export class A {}");
    let source = "\
import * as x from './lib1';

@app({ el: '#app' })
class Root {
  @state msg: string = 'hi';
}

@component({ template: '<b>l</b>' })
class Local { }

function main() {
  mount();
}
";
    let result = compile("src/app.ts", source, &assets);
    let code = &result.code;
    assert!(code.contains("static constructor = VerveAppConstructor({"));
    assert!(code.contains("el: '#app'"));
    assert!(code.contains("data: { msg: 'hi' }"));
    assert!(code.contains("from './lib1.verve'"));
    let a = code.find("registerComponent('A', x.A.constructor);").unwrap();
    let local = code.find("registerComponent('Local', Local.constructor);").unwrap();
    assert!(a < local);
    assert!(local < code.find("mount();").unwrap());
    // App roots are mounted, never registered.
    assert!(!code.contains("registerComponent('Root'"));
}

#[test]
fn test_mixin_and_component_lists_forwarded() {
    let assets = MemoryAssets::new();
    let result = compile(
        "src/c.ts",
        "@component({ template: '<i>c</i>', mixins: [Log, Timed], components: [Child] })\nclass C { }\n",
        &assets,
    );
    assert!(result.code.contains("mixins: [Log, Timed]"));
    assert!(result.code.contains("components: [Child.constructor]"));
}
