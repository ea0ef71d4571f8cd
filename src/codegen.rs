//! Synthesis of generated member text and registration descriptors.
//!
//! Everything the compiler writes into a unit is built here as plain source
//! text: reactive accessor pairs, renamed-implementation wrappers, and the
//! `static constructor = ...` descriptor appended to each annotated class.
//! The classifier decides *where* these land; this module decides *what* they
//! say.

use crate::metadata::{
    ComponentKind, ComponentMetadata, ComputedSpec, MethodSpec, PropSpec, StateSpec, WatcherSpec,
};
use crate::template::ScopedTemplate;

// ═══════════════════════════════════════════════════════════════════════════════
// INTERNAL NAMES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn computed_impl_name(name: &str) -> String {
    format!("$verve_computed_{}", name)
}

pub fn method_impl_name(name: &str) -> String {
    format!("$verve_method_{}", name)
}

pub fn watch_impl_name(name: &str) -> String {
    format!("$verve_watch_{}", name)
}

/// JS string literal with escaping, valid in generated source.
pub fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMBER TEXT
// ═══════════════════════════════════════════════════════════════════════════════

fn type_suffix(ts_type: Option<&str>) -> String {
    ts_type.map(|t| format!(": {}", t)).unwrap_or_default()
}

/// Accessor pair standing in for a reactive field. Reads and writes route
/// through the runtime store so dependency tracking sees them.
pub fn reactive_accessors(name: &str, ts_type: Option<&str>) -> String {
    let ty = type_suffix(ts_type);
    format!(
        "get {name}(){ty} {{ return this.$vGet('{name}'); }}\n  \
         set {name}(value{ty}) {{ this.$vSet('{name}', value); }}",
        name = name,
        ty = ty
    )
}

/// Read-only accessor standing in for an element-reference field.
pub fn ref_accessor(name: &str, ts_type: Option<&str>) -> String {
    format!(
        "get {name}(){ty} {{ return this.$vRef('{name}'); }}",
        name = name,
        ty = type_suffix(ts_type)
    )
}

/// Public getter shadowing a renamed computed implementation.
pub fn computed_public_getter(name: &str, return_type: Option<&str>) -> String {
    format!(
        "get {name}(){ty} {{ return this.$vGet('{name}'); }}",
        name = name,
        ty = type_suffix(return_type)
    )
}

/// Public setter shadowing a renamed computed setter implementation.
pub fn computed_public_setter(name: &str, value_type: Option<&str>) -> String {
    format!(
        "set {name}(value{ty}) {{ this.$vSet('{name}', value); }}",
        name = name,
        ty = type_suffix(value_type)
    )
}

/// Public wrapper shadowing a renamed method implementation. `signature` is
/// the original formal-parameter text, forwarded verbatim.
pub fn method_wrapper(name: &str, signature: &str, call_args: &[String]) -> String {
    format!(
        "{name}({signature}) {{ return this.$vGet('{name}')({args}); }}",
        name = name,
        signature = signature,
        args = call_args.join(", ")
    )
}

/// Runtime-capability declarations appended to mixin classes so their method
/// bodies type-check without inheriting from a component base.
pub fn mixin_ambient_declarations() -> &'static str {
    "$vGet!: (key: string) => any;\n  \
     $vSet!: (key: string, value: any) => void;\n  \
     $vRef!: (key: string) => any;"
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROP TYPE CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Runtime type tag derived from a declared annotation type. Unrecognized or
/// absent types degrade to `any`.
pub fn prop_type_tag(ts_type: Option<&str>) -> &'static str {
    let Some(t) = ts_type else {
        return "any";
    };
    let t = t.trim();
    if t.ends_with("[]") || t.starts_with("Array<") {
        return "array";
    }
    match t {
        "number" => "number",
        "string" => "string",
        "boolean" => "boolean",
        "object" => "object",
        _ => "any",
    }
}

fn prop_check_expr(tag: &str) -> String {
    match tag {
        "number" | "string" | "boolean" => format!("(v) => typeof v === '{}'", tag),
        "array" => "(v) => Array.isArray(v)".to_string(),
        "object" => "(v) => typeof v === 'object'".to_string(),
        _ => "(v) => true".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTOR TABLES
// ═══════════════════════════════════════════════════════════════════════════════

fn props_table(props: &[PropSpec]) -> String {
    if props.is_empty() {
        return "{}".to_string();
    }
    let entries: Vec<String> = props
        .iter()
        .map(|p| {
            let tag = prop_type_tag(p.ts_type.as_deref());
            format!(
                "{}: {{ type: '{}', check: {}, default: {} }}",
                p.name,
                tag,
                prop_check_expr(tag),
                p.default.as_deref().unwrap_or("null")
            )
        })
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

fn data_table(states: &[StateSpec]) -> String {
    if states.is_empty() {
        return "{}".to_string();
    }
    let entries: Vec<String> = states
        .iter()
        .map(|s| format!("{}: {}", s.name, s.init.as_deref().unwrap_or("null")))
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

fn computed_table(computed: &[ComputedSpec]) -> String {
    if computed.is_empty() {
        return "{}".to_string();
    }
    let entries: Vec<String> = computed
        .iter()
        .map(|c| {
            let implementation = computed_impl_name(&c.name);
            let set = if c.has_setter {
                format!("(vm, value) => {{ vm.{} = value; }}", implementation)
            } else {
                "null".to_string()
            };
            format!(
                "{}: {{ get: (vm) => vm.{}, set: {} }}",
                c.name, implementation, set
            )
        })
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

fn watchers_table(watchers: &[WatcherSpec]) -> String {
    if watchers.is_empty() {
        return "[]".to_string();
    }
    let entries: Vec<String> = watchers
        .iter()
        .map(|w| {
            let implementation = watch_impl_name(&w.handler);
            // Forward only as many change arguments as the callback declared.
            let handler = match w.arity {
                0 => format!("(vm) => vm.{}()", implementation),
                1 => format!("(vm, next) => vm.{}(next)", implementation),
                _ => format!("(vm, next, prev) => vm.{}(next, prev)", implementation),
            };
            format!(
                "{{ prop: '{}', handler: {}, deep: {} }}",
                w.target, handler, w.deep
            )
        })
        .collect();
    format!("[{}]", entries.join(", "))
}

fn methods_table(methods: &[MethodSpec]) -> String {
    if methods.is_empty() {
        return "{}".to_string();
    }
    let entries: Vec<String> = methods
        .iter()
        .map(|m| {
            let implementation = method_impl_name(&m.name);
            let forwarded = m.params.join(", ");
            let vm_params = if m.params.is_empty() {
                "(vm)".to_string()
            } else {
                format!("(vm, {})", forwarded)
            };
            format!(
                "{}: {} => vm.{}({})",
                m.name, vm_params, implementation, forwarded
            )
        })
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

fn expr_list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

/// Component references register through their descriptors.
fn components_list(items: &[String]) -> String {
    let refs: Vec<String> = items.iter().map(|c| format!("{}.constructor", c)).collect();
    format!("[{}]", refs.join(", "))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Inputs to descriptor synthesis for one class.
pub struct DescriptorInput<'a> {
    pub meta: &'a ComponentMetadata,
    pub template: Option<&'a ScopedTemplate>,
    pub mixins: &'a [String],
    pub components: &'a [String],
    /// Mount-element expression; app roots only.
    pub el: Option<&'a str>,
}

fn template_fields(template: Option<&ScopedTemplate>) -> String {
    match template {
        Some(t) => format!(
            "template: {},\n    styleInject: {},",
            js_string(&t.markup),
            js_string(&t.style_inject)
        ),
        None => "template: null,\n    styleInject: '',".to_string(),
    }
}

/// The `static constructor = ...` text appended before the class's closing
/// brace. Shape depends on the class's role.
pub fn descriptor(input: &DescriptorInput) -> String {
    let meta = input.meta;
    match meta.kind {
        ComponentKind::App => format!(
            "static constructor = VerveAppConstructor({{\n    \
             el: {},\n    \
             data: {},\n    \
             computed: {},\n    \
             watchers: {},\n    \
             methods: {},\n    \
             components: {},\n  \
             }});",
            input.el.unwrap_or("null"),
            data_table(&meta.states),
            computed_table(&meta.computed),
            watchers_table(&meta.watchers),
            methods_table(&meta.methods),
            components_list(input.components),
        ),
        ComponentKind::Component | ComponentKind::Mixin => {
            let creator = match meta.kind {
                ComponentKind::Component => format!("creator: () => new {}(),\n    ", meta.name),
                _ => String::new(),
            };
            format!(
                "static constructor = VerveComponentConstructor({{\n    \
                 name: '{}',\n    \
                 {}{}\n    \
                 props: {},\n    \
                 mixins: {},\n    \
                 data: {},\n    \
                 computed: {},\n    \
                 watchers: {},\n    \
                 methods: {},\n    \
                 components: {},\n  \
                 }});",
                meta.name,
                creator,
                template_fields(input.template),
                props_table(&meta.props),
                expr_list(input.mixins),
                data_table(&meta.states),
                computed_table(&meta.computed),
                watchers_table(&meta.watchers),
                methods_table(&meta.methods),
                components_list(input.components),
            )
        }
    }
}
