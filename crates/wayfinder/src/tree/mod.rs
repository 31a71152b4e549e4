//! Named route tree
//!
//! Nodes form an arena: each node is addressed by index, stores a
//! non-owning parent id and owns its children as a priority-ordered id
//! list. A node with no pattern (empty name/path) acts as a structural
//! root only.

use std::cmp::Ordering;

use wayfinder_path::{BuildOptions, ParamValue, Params, PathPattern, UrlParamsEncoding};

use crate::error::ConfigurationError;
use crate::hooks::{OnEnterFn, PreEnterFn};

pub mod matcher;

// ============================================================================
// Options
// ============================================================================

/// Trailing slash handling when building paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingSlashMode {
    /// Keep whatever the patterns produce
    #[default]
    Default,
    /// Trim a trailing slash (except on the root path)
    Never,
    /// Always end with a slash
    Always,
}

/// Query param handling when matching and building paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryParamsMode {
    /// Undeclared keys are captured but never serialized
    #[default]
    Default,
    /// Undeclared keys fail the match and are never serialized
    Strict,
    /// Undeclared keys are captured and serialized
    Loose,
}

/// Options for building a full path from a route name
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildPathOptions {
    pub trailing_slash_mode: TrailingSlashMode,
    pub query_params_mode: QueryParamsMode,
}

// ============================================================================
// Definitions
// ============================================================================

/// A nested route definition, normalized into tree nodes on `add`
#[derive(Debug, Clone, Default)]
pub struct RouteDefinition {
    /// Local segment name, or a dotted name addressing an existing parent
    pub name: String,
    /// Path template per the wayfinder-path grammar; empty for structural nodes
    pub path: String,
    pub children: Vec<RouteDefinition>,
    pub default_params: Params,
    /// Absolute nodes are re-parented under the master root and stay
    /// addressable from the top of a URL regardless of nesting depth
    pub absolute: bool,
    /// Opts this node out of reload invalidation during transitions
    pub skip_reload: bool,
}

impl RouteDefinition {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        RouteDefinition {
            name: name.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_child(mut self, child: RouteDefinition) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_default_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.default_params.insert(name.into(), value.into());
        self
    }

    pub fn absolute(mut self) -> Self {
        self.absolute = true;
        self
    }

    pub fn skip_reload(mut self) -> Self {
        self.skip_reload = true;
        self
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Arena index of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) pattern: Option<PathPattern>,
    pub(crate) parent: Option<NodeId>,
    /// Priority-ordered; re-sorted after every structural insertion
    pub(crate) children: Vec<NodeId>,
    pub(crate) absolute: bool,
    pub(crate) default_params: Params,
    pub(crate) skip_reload: bool,
    /// Original definition order; the comparator's final tiebreak
    pub(crate) insertion_index: usize,
    pub(crate) pre_enter: Option<PreEnterFn>,
    pub(crate) on_enter: Option<OnEnterFn>,
}

/// The named route tree
pub struct RouteTree {
    pub(crate) nodes: Vec<NodeData>,
    encoding: UrlParamsEncoding,
    insertions: usize,
}

impl RouteTree {
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self::with_encoding(UrlParamsEncoding::Default)
    }

    pub fn with_encoding(encoding: UrlParamsEncoding) -> Self {
        RouteTree {
            nodes: vec![NodeData {
                name: String::new(),
                pattern: None,
                parent: None,
                children: Vec::new(),
                absolute: false,
                default_params: Params::new(),
                skip_reload: false,
                insertion_index: 0,
                pre_enter: None,
                on_enter: None,
            }],
            encoding,
            insertions: 0,
        }
    }

    pub(crate) fn encoding(&self) -> UrlParamsEncoding {
        self.encoding
    }

    /// Adds one definition and re-sorts the affected sibling sets
    pub fn add(&mut self, definition: RouteDefinition) -> Result<NodeId, ConfigurationError> {
        self.insert_definition(definition, Self::ROOT, true)
    }

    /// Adds a batch of definitions with a single final sort
    pub fn add_all(
        &mut self,
        definitions: impl IntoIterator<Item = RouteDefinition>,
    ) -> Result<(), ConfigurationError> {
        for definition in definitions {
            self.insert_definition(definition, Self::ROOT, false)?;
        }
        self.sort_all();
        Ok(())
    }

    fn insert_definition(
        &mut self,
        definition: RouteDefinition,
        context: NodeId,
        sort: bool,
    ) -> Result<NodeId, ConfigurationError> {
        let RouteDefinition {
            name,
            path,
            children,
            default_params,
            absolute,
            skip_reload,
        } = definition;

        let (found_parent, local_name) = self.resolve_parent(&name, context)?;
        let parent = if absolute { Self::ROOT } else { found_parent };

        let pattern = if path.is_empty() {
            None
        } else {
            Some(PathPattern::with_encoding(&path, self.encoding)?)
        };

        // Sibling names and sibling pattern sources must both be unique,
        // otherwise two routes become indistinguishable.
        for &sibling in &self.nodes[parent.0].children {
            let sibling = &self.nodes[sibling.0];
            if sibling.name == local_name {
                return Err(ConfigurationError::DuplicateRoute { name });
            }
            if let (Some(new), Some(old)) = (&pattern, &sibling.pattern) {
                if new.source() == old.source() {
                    return Err(ConfigurationError::DuplicateRoute { name });
                }
            }
        }

        let id = NodeId(self.nodes.len());
        self.insertions += 1;
        self.nodes.push(NodeData {
            name: local_name,
            pattern,
            parent: Some(parent),
            children: Vec::new(),
            absolute,
            default_params,
            skip_reload,
            insertion_index: self.insertions,
            pre_enter: None,
            on_enter: None,
        });
        self.nodes[parent.0].children.push(id);

        if absolute && self.ancestry_has_params(found_parent) {
            tracing::warn!(
                route = %self.full_name(id),
                "absolute route was declared under a parameterized ancestor"
            );
        }

        if sort {
            self.sort_children(parent);
        }

        for child in children {
            self.insert_definition(child, id, sort)?;
        }

        Ok(id)
    }

    /// Resolves a possibly dotted name into (parent id, local segment name)
    fn resolve_parent(
        &self,
        name: &str,
        context: NodeId,
    ) -> Result<(NodeId, String), ConfigurationError> {
        let segments: Vec<&str> = name.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ConfigurationError::InvalidRouteName {
                name: name.to_string(),
            });
        }

        let mut parent = context;
        for segment in &segments[..segments.len() - 1] {
            parent = self.child_by_name(parent, segment).ok_or_else(|| {
                ConfigurationError::MissingParent {
                    name: name.to_string(),
                    missing: segment.to_string(),
                }
            })?;
        }

        Ok((parent, segments[segments.len() - 1].to_string()))
    }

    fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].name == name)
    }

    /// Whether any ancestor pattern up to the root carries parameters
    fn ancestry_has_params(&self, mut node: NodeId) -> bool {
        loop {
            let data = &self.nodes[node.0];
            if let Some(pattern) = &data.pattern {
                if !pattern.url_params().is_empty()
                    || !pattern.splat_params().is_empty()
                    || !pattern.matrix_params().is_empty()
                    || !pattern.query_params().is_empty()
                {
                    return true;
                }
            }
            match data.parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolves a dotted route name to its node chain, root to leaf
    pub fn segments(&self, name: &str) -> Option<Vec<NodeId>> {
        let mut chain = Vec::new();
        let mut node = Self::ROOT;
        for segment in name.split('.') {
            node = self.child_by_name(node, segment)?;
            chain.push(node);
        }
        if chain.is_empty() {
            None
        } else {
            Some(chain)
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    /// Fully qualified dotted name of a node
    pub(crate) fn full_name(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut node = id;
        loop {
            let data = &self.nodes[node.0];
            match data.parent {
                Some(parent) => {
                    parts.push(data.name.clone());
                    node = parent;
                }
                None => break,
            }
        }
        parts.reverse();
        parts.join(".")
    }

    /// Default params merged along a chain, root to leaf
    pub(crate) fn default_params_for(&self, chain: &[NodeId]) -> Params {
        let mut merged = Params::new();
        for id in chain {
            for (key, value) in &self.nodes[id.0].default_params {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    /// Builds a full path for a dotted route name
    ///
    /// Each node in the chain builds its own part and hands the leftover
    /// params down; declared query params of the whole chain are
    /// serialized at the end.
    pub fn build_path(
        &self,
        name: &str,
        params: &Params,
        options: &BuildPathOptions,
    ) -> Result<String, ConfigurationError> {
        let chain = self
            .segments(name)
            .ok_or_else(|| ConfigurationError::UnknownRoute {
                name: name.to_string(),
            })?;

        let mut base = String::new();
        let mut declared: Vec<String> = Vec::new();
        let mut remaining = params.clone();
        for id in &chain {
            if let Some(pattern) = &self.nodes[id.0].pattern {
                let built = pattern.build(
                    &remaining,
                    &BuildOptions {
                        ignore_search: true,
                        ignore_constraints: false,
                    },
                )?;
                base.push_str(&built.base);
                declared.extend(pattern.query_params().iter().cloned());
                remaining = built.remaining;
            }
        }
        if base.is_empty() {
            base.push('/');
        }

        match options.trailing_slash_mode {
            TrailingSlashMode::Default => {}
            TrailingSlashMode::Always => {
                if !base.ends_with('/') {
                    base.push('/');
                }
            }
            TrailingSlashMode::Never => {
                if base.len() > 1 && base.ends_with('/') {
                    base.pop();
                }
            }
        }

        let mut query = wayfinder_path::search::build_search(
            declared
                .iter()
                .filter_map(|name| params.get_key_value(name))
                .map(|(k, v)| (k.as_str(), v)),
            self.encoding,
        );
        if options.query_params_mode == QueryParamsMode::Loose {
            let mut extras: Vec<(&String, &ParamValue)> = remaining
                .iter()
                .filter(|(key, _)| !declared.contains(key))
                .collect();
            extras.sort_by(|a, b| a.0.cmp(b.0));
            let extra_query = wayfinder_path::search::build_search(
                extras.into_iter().map(|(k, v)| (k.as_str(), v)),
                self.encoding,
            );
            if !extra_query.is_empty() {
                if query.is_empty() {
                    query = extra_query;
                } else {
                    query = format!("{query}&{extra_query}");
                }
            }
        }

        if query.is_empty() {
            Ok(base)
        } else {
            Ok(format!("{base}?{query}"))
        }
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    /// Re-sorts one sibling set by match priority
    pub(crate) fn sort_children(&mut self, parent: NodeId) {
        let mut children = self.nodes[parent.0].children.clone();
        children.sort_by(|&a, &b| self.compare_siblings(a, b));
        self.nodes[parent.0].children = children;
    }

    /// Re-sorts every sibling set; used after batch insertion
    pub(crate) fn sort_all(&mut self) {
        for index in 0..self.nodes.len() {
            self.sort_children(NodeId(index));
        }
    }

    /// Sibling priority comparator
    ///
    /// First decisive rule wins; the final tiebreak is the original
    /// definition order, encoded explicitly because a comparator rewrite
    /// must not depend on the host sort's stability.
    fn compare_siblings(&self, a: NodeId, b: NodeId) -> Ordering {
        let a_key = SortKey::of(&self.nodes[a.0]);
        let b_key = SortKey::of(&self.nodes[b.0]);

        // 1. the bare root path sorts last
        if a_key.is_root_path != b_key.is_root_path {
            return if a_key.is_root_path {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        // 2. splat routes sort last
        if a_key.has_splat != b_key.has_splat {
            return if a_key.has_splat {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        // 3. more segments = more specific = earlier
        if a_key.segment_count != b_key.segment_count {
            return b_key.segment_count.cmp(&a_key.segment_count);
        }
        // 4. fewer positional params = earlier
        if a_key.param_count != b_key.param_count {
            return a_key.param_count.cmp(&b_key.param_count);
        }
        // 5. longer final segment = earlier
        if a_key.last_segment_len != b_key.last_segment_len {
            return b_key.last_segment_len.cmp(&a_key.last_segment_len);
        }
        // 6. original definition order
        a_key.insertion_index.cmp(&b_key.insertion_index)
    }
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-computed comparison key for one sibling
struct SortKey {
    is_root_path: bool,
    has_splat: bool,
    segment_count: usize,
    param_count: usize,
    last_segment_len: usize,
    insertion_index: usize,
}

impl SortKey {
    fn of(node: &NodeData) -> Self {
        let stripped = node
            .pattern
            .as_ref()
            .map(|p| comparable_path(p.path()))
            .unwrap_or_default();
        SortKey {
            is_root_path: stripped == "/",
            has_splat: node.pattern.as_ref().map(|p| p.has_splat()).unwrap_or(false),
            segment_count: stripped.matches('/').count(),
            param_count: node
                .pattern
                .as_ref()
                .map(|p| p.url_params().len())
                .unwrap_or(0),
            last_segment_len: stripped.rsplit('/').next().unwrap_or_default().len(),
            insertion_index: node.insertion_index,
        }
    }
}

/// Path with constraints and the query block stripped, trailing slash trimmed
fn comparable_path(path: &str) -> String {
    let mut stripped = String::new();
    let mut depth = 0usize;
    for c in path.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            '?' if depth == 0 => break,
            _ if depth == 0 => stripped.push(c),
            _ => {}
        }
    }
    if stripped.len() > 1 && stripped.ends_with('/') {
        stripped.pop();
    }
    stripped
}
