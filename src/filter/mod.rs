//! Candidate filtering ahead of selection
//!
//! Two independent gates run before any bounds work: a per-kind enable mask
//! over the node type catalog, and case-insensitive substring matching on
//! resource paths and debug names. Both default to wide open, so an empty
//! filter admits every record.

use bit_vec::BitVec;

use crate::model::{NodeRecord, NodeTypeId, NODE_TYPE_COUNT};

/// Enable mask over the node type catalog, one bit per kind.
#[derive(Debug, Clone)]
pub struct NodeTypeFilter {
    mask: BitVec,
}

impl Default for NodeTypeFilter {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl NodeTypeFilter {
    pub fn all_enabled() -> Self {
        NodeTypeFilter {
            mask: BitVec::from_elem(NODE_TYPE_COUNT, true),
        }
    }

    pub fn none_enabled() -> Self {
        NodeTypeFilter {
            mask: BitVec::from_elem(NODE_TYPE_COUNT, false),
        }
    }

    /// Enable only the named kinds. Names not in the catalog are ignored.
    pub fn only<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut filter = Self::none_enabled();
        for name in names {
            filter.enable(name);
        }
        filter
    }

    pub fn set_enabled(&mut self, id: NodeTypeId, enabled: bool) {
        self.mask.set(id.index(), enabled);
    }

    /// Enable a kind by name; returns false for uncataloged names.
    pub fn enable(&mut self, name: &str) -> bool {
        match NodeTypeId::of(name) {
            Some(id) => {
                self.set_enabled(id, true);
                true
            }
            None => false,
        }
    }

    /// Disable a kind by name; returns false for uncataloged names.
    pub fn disable(&mut self, name: &str) -> bool {
        match NodeTypeId::of(name) {
            Some(id) => {
                self.set_enabled(id, false);
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: NodeTypeId) -> bool {
        self.mask.get(id.index()).unwrap_or(false)
    }

    /// Whether the named kind passes. Uncataloged names never pass.
    pub fn is_enabled_name(&self, name: &str) -> bool {
        NodeTypeId::of(name).is_some_and(|id| self.is_enabled(id))
    }

    pub fn enabled_count(&self) -> usize {
        self.mask.iter().filter(|b| *b).count()
    }

    /// True when every cataloged kind is enabled, the no-op state.
    pub fn is_unrestricted(&self) -> bool {
        self.enabled_count() == NODE_TYPE_COUNT
    }
}

/// How the resource and debug term lists combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// A hit in either list admits the record.
    #[default]
    Or,
    /// Every non-empty list must hit.
    And,
}

/// Case-insensitive substring filter over resource paths and debug names.
///
/// Exclusion terms veto a record regardless of mode. Empty term lists do not
/// constrain anything.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    resource_terms: Vec<String>,
    debug_terms: Vec<String>,
    exclude_terms: Vec<String>,
    mode: FilterMode,
}

impl NameFilter {
    pub fn new(mode: FilterMode) -> Self {
        NameFilter {
            mode,
            ..Default::default()
        }
    }

    pub fn with_resource_term(mut self, term: &str) -> Self {
        push_term(&mut self.resource_terms, term);
        self
    }

    pub fn with_debug_term(mut self, term: &str) -> Self {
        push_term(&mut self.debug_terms, term);
        self
    }

    pub fn with_exclusion(mut self, term: &str) -> Self {
        push_term(&mut self.exclude_terms, term);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.resource_terms.is_empty()
            && self.debug_terms.is_empty()
            && self.exclude_terms.is_empty()
    }

    /// Test a record's resource path and debug name against the terms.
    pub fn matches(&self, resource: Option<&str>, debug_name: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        let resource = resource.map(str::to_lowercase);
        let debug_name = debug_name.to_lowercase();

        let hits = |terms: &[String], hay: &str| terms.iter().any(|t| hay.contains(t.as_str()));

        if self
            .exclude_terms
            .iter()
            .any(|t| resource.as_deref().is_some_and(|r| r.contains(t.as_str())) || debug_name.contains(t.as_str()))
        {
            return false;
        }

        let resource_hit = (!self.resource_terms.is_empty())
            .then(|| resource.as_deref().is_some_and(|r| hits(&self.resource_terms, r)));
        let debug_hit =
            (!self.debug_terms.is_empty()).then(|| hits(&self.debug_terms, &debug_name));

        match (resource_hit, debug_hit) {
            // Only exclusions were configured.
            (None, None) => true,
            (Some(r), None) => r,
            (None, Some(d)) => d,
            (Some(r), Some(d)) => match self.mode {
                FilterMode::Or => r || d,
                FilterMode::And => r && d,
            },
        }
    }
}

fn push_term(terms: &mut Vec<String>, term: &str) {
    let term = term.trim().to_lowercase();
    if !term.is_empty() {
        terms.push(term);
    }
}

/// Combined admission test run per candidate before bounds resolution.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub types: NodeTypeFilter,
    pub names: NameFilter,
}

impl CandidateFilter {
    pub fn admits(&self, node: &NodeRecord) -> bool {
        self.types.is_enabled_name(node.node_type())
            && self.names.matches(node.resource_path(), node.debug_name())
    }
}
