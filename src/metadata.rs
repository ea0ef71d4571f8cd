//! Per-class metadata accumulated by the member classifier and consumed once
//! by the descriptor synthesizer.

use serde::{Deserialize, Serialize};

/// Role of a component-bearing type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    /// Full component: independently instantiable, gets a creator closure.
    Component,
    /// Capability bundle mixed into other components; not instantiable.
    Mixin,
    /// Application root; registered against a mount element, never listed.
    App,
}

/// A value received from the parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropSpec {
    pub name: String,
    /// Declared type annotation text, if any.
    pub ts_type: Option<String>,
    /// Default-value expression text, if any.
    pub default: Option<String>,
}

/// Component-local mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSpec {
    pub name: String,
    pub init: Option<String>,
}

/// A derived, cached value. Getter and setter share one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedSpec {
    pub name: String,
    pub has_setter: bool,
}

/// An invokable behavior exposed to the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSpec {
    pub name: String,
    /// Ordered formal parameter names, forwarded verbatim.
    pub params: Vec<String>,
}

/// A reaction to property changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherSpec {
    /// Name of the callback member.
    pub handler: String,
    /// Name of the observed property.
    pub target: String,
    /// 0..=2: (), (newValue), (newValue, oldValue).
    pub arity: usize,
    /// Whether nested structural mutations also trigger the callback.
    pub deep: bool,
}

/// Everything the synthesizer needs about one class's members.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    pub name: String,
    pub kind: ComponentKind,
    pub props: Vec<PropSpec>,
    pub states: Vec<StateSpec>,
    pub methods: Vec<MethodSpec>,
    pub watchers: Vec<WatcherSpec>,
    /// Keyed by name; kept in first-seen order for deterministic output.
    pub computed: Vec<ComputedSpec>,
}

impl ComponentMetadata {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        ComponentMetadata {
            name: name.into(),
            kind,
            props: Vec::new(),
            states: Vec::new(),
            methods: Vec::new(),
            watchers: Vec::new(),
            computed: Vec::new(),
        }
    }

    pub fn computed_mut(&mut self, name: &str) -> Option<&mut ComputedSpec> {
        self.computed.iter_mut().find(|c| c.name == name)
    }

    /// True when `name` is a reactive member a watcher may observe.
    pub fn declares_reactive(&self, name: &str) -> bool {
        self.props.iter().any(|p| p.name == name)
            || self.states.iter().any(|s| s.name == name)
            || self.computed.iter().any(|c| c.name == name)
    }
}

/// A component found in another unit, used only to generate a registration
/// call in the entry unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedComponentRef {
    pub prefix: Option<String>,
    pub name: String,
}

impl ImportedComponentRef {
    /// `x.A.constructor` or `A.constructor`.
    pub fn constructor_ref(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}.{}.constructor", prefix, self.name),
            None => format!("{}.constructor", self.name),
        }
    }
}
