//! Component registries and the search for the one instrument to host.
//!
//! A registry mirrors the platform's component catalogue: `find_next` walks
//! every component matching a query, starting after `previous`. Zero fields in
//! a query are wildcards and flags are compared under the query's mask.

use crate::error::OsStatus;
use crate::instance::PluginInstance;
use synthcast_core::FourCharCode;

/// Music device (instrument) component type.
pub const MUSIC_DEVICE: FourCharCode = FourCharCode::new(b"aumu");

/// Component flag marking a component as usable from a sandboxed host.
pub const SANDBOX_SAFE: u32 = 0x2;

/// Opaque registry token for one component. For platform registries this is
/// the native component handle cast to `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentRef(usize);

impl ComponentRef {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentDescription {
    pub component_type: FourCharCode,
    pub subtype: FourCharCode,
    pub manufacturer: FourCharCode,
    pub flags: u32,
    pub flags_mask: u32,
}

impl ComponentDescription {
    /// Matches every component.
    pub fn wildcard() -> Self {
        Self::default()
    }

    pub fn instrument(subtype: FourCharCode, manufacturer: FourCharCode) -> Self {
        Self {
            component_type: MUSIC_DEVICE,
            subtype,
            manufacturer,
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: u32, mask: u32) -> Self {
        self.flags = flags;
        self.flags_mask = mask;
        self
    }

    /// Query semantics: zero identifier fields match anything, flags are
    /// compared under `flags_mask`.
    pub fn matches(&self, candidate: &ComponentDescription) -> bool {
        let field = |query: FourCharCode, value: FourCharCode| query.is_wildcard() || query == value;
        field(self.component_type, candidate.component_type)
            && field(self.subtype, candidate.subtype)
            && field(self.manufacturer, candidate.manufacturer)
            && (candidate.flags & self.flags_mask) == (self.flags & self.flags_mask)
    }
}

/// The platform's catalogue of plugin components.
pub trait ComponentRegistry {
    /// Next component after `previous` (or the first one) matching `query`.
    fn find_next(
        &self,
        previous: Option<ComponentRef>,
        query: &ComponentDescription,
    ) -> Option<ComponentRef>;

    fn describe(&self, component: ComponentRef) -> Option<ComponentDescription>;

    fn name(&self, _component: ComponentRef) -> Option<String> {
        None
    }

    fn instantiate(&self, component: ComponentRef) -> Result<Box<dyn PluginInstance>, OsStatus>;
}

/// Identifiers of the instrument to host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCriteria {
    pub component_type: FourCharCode,
    pub subtype: FourCharCode,
    pub manufacturer: FourCharCode,
}

impl MatchCriteria {
    pub fn instrument(subtype: FourCharCode, manufacturer: FourCharCode) -> Self {
        Self {
            component_type: MUSIC_DEVICE,
            subtype,
            manufacturer,
        }
    }

    fn query(&self) -> ComponentDescription {
        ComponentDescription {
            component_type: self.component_type,
            subtype: self.subtype,
            manufacturer: self.manufacturer,
            ..ComponentDescription::default()
        }
    }

    /// Direct identifier comparison used by the exhaustive scan.
    pub fn identifies(&self, candidate: &ComponentDescription) -> bool {
        candidate.subtype == self.subtype && candidate.manufacturer == self.manufacturer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Exact identifiers, default flags.
    Exact,
    /// Exact identifiers under the sandbox-safe flag set.
    SandboxSafe,
    /// Every registered component, identifiers compared directly.
    Scan,
}

impl SearchStrategy {
    pub const ALL: [SearchStrategy; 3] = [
        SearchStrategy::Exact,
        SearchStrategy::SandboxSafe,
        SearchStrategy::Scan,
    ];
}

impl std::fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchStrategy::Exact => write!(f, "standard"),
            SearchStrategy::SandboxSafe => write!(f, "sandbox safe"),
            SearchStrategy::Scan => write!(f, "exhaustive scan"),
        }
    }
}

/// Locate the component named by `criteria`, trying each strategy in order.
///
/// A component returned by the registry whose identifiers do not match the
/// criteria is never accepted.
pub fn find_component(
    registry: &dyn ComponentRegistry,
    criteria: &MatchCriteria,
) -> Option<(ComponentRef, SearchStrategy)> {
    SearchStrategy::ALL.into_iter().find_map(|strategy| {
        let found = search(registry, criteria, strategy);
        tracing::debug!(
            "Strategy {} : {}",
            strategy,
            if found.is_some() { "found" } else { "not found" }
        );
        found.map(|component| (component, strategy))
    })
}

fn search(
    registry: &dyn ComponentRegistry,
    criteria: &MatchCriteria,
    strategy: SearchStrategy,
) -> Option<ComponentRef> {
    let accept = |component: ComponentRef| {
        registry
            .describe(component)
            .is_some_and(|desc| criteria.identifies(&desc))
    };

    match strategy {
        SearchStrategy::Exact => registry
            .find_next(None, &criteria.query())
            .filter(|c| accept(*c)),
        SearchStrategy::SandboxSafe => {
            let query = criteria.query().with_flags(SANDBOX_SAFE, SANDBOX_SAFE);
            registry.find_next(None, &query).filter(|c| accept(*c))
        }
        SearchStrategy::Scan => {
            let query = ComponentDescription::wildcard();
            let mut current = None;
            while let Some(component) = registry.find_next(current, &query) {
                if let Some(desc) = registry.describe(component) {
                    tracing::debug!(
                        "  Found component: type={}, sub={}, mfr={}",
                        desc.component_type,
                        desc.subtype,
                        desc.manufacturer
                    );
                    if criteria.identifies(&desc) {
                        return Some(component);
                    }
                }
                current = Some(component);
            }
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSummary {
    pub description: ComponentDescription,
    pub name: Option<String>,
}

/// Every registered component of `component_type`.
pub fn list_components(
    registry: &dyn ComponentRegistry,
    component_type: FourCharCode,
) -> Vec<ComponentSummary> {
    let query = ComponentDescription {
        component_type,
        ..ComponentDescription::default()
    };
    let mut summaries = Vec::new();
    let mut current = None;
    while let Some(component) = registry.find_next(current, &query) {
        if let Some(description) = registry.describe(component) {
            summaries.push(ComponentSummary {
                description,
                name: registry.name(component),
            });
        }
        current = Some(component);
    }
    summaries
}

pub type InstanceFactory =
    Box<dyn Fn() -> Result<Box<dyn PluginInstance>, OsStatus> + Send + Sync>;

struct RegisteredComponent {
    description: ComponentDescription,
    name: String,
    factory: InstanceFactory,
}

/// In-process registry with the same find-next semantics as the platform's.
#[derive(Default)]
pub struct MemoryRegistry {
    components: Vec<RegisteredComponent>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in test-tone instrument.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            ComponentDescription::instrument(
                crate::tone::TONE_SUBTYPE,
                crate::tone::TONE_MANUFACTURER,
            )
            .with_flags(SANDBOX_SAFE, 0),
            "synthcast: Test Tone",
            || Ok(Box::new(crate::tone::ToneInstrument::default()) as Box<dyn PluginInstance>),
        );
        registry
    }

    pub fn register<F>(
        &mut self,
        description: ComponentDescription,
        name: impl Into<String>,
        factory: F,
    ) -> ComponentRef
    where
        F: Fn() -> Result<Box<dyn PluginInstance>, OsStatus> + Send + Sync + 'static,
    {
        self.components.push(RegisteredComponent {
            description,
            name: name.into(),
            factory: Box::new(factory),
        });
        ComponentRef(self.components.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl ComponentRegistry for MemoryRegistry {
    fn find_next(
        &self,
        previous: Option<ComponentRef>,
        query: &ComponentDescription,
    ) -> Option<ComponentRef> {
        let start = previous.map_or(0, |c| c.0 + 1);
        self.components
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, entry)| query.matches(&entry.description))
            .map(|(index, _)| ComponentRef(index))
    }

    fn describe(&self, component: ComponentRef) -> Option<ComponentDescription> {
        self.components.get(component.0).map(|c| c.description)
    }

    fn name(&self, component: ComponentRef) -> Option<String> {
        self.components.get(component.0).map(|c| c.name.clone())
    }

    fn instantiate(&self, component: ComponentRef) -> Result<Box<dyn PluginInstance>, OsStatus> {
        let entry = self.components.get(component.0).ok_or(-1)?;
        (entry.factory)()
    }
}
