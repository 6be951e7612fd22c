//! Component identity and the ownership tree.
//!
//! Every hardware block of the model is a node in a `ComponentTree`. The tree is
//! strictly hierarchical: each component has at most one owner, and its name is the
//! dotted path from the root (`system.cpu0.icache`). Port connections are not part of
//! this tree; they live in the separate routing graph held by
//! [`PortRegistry`](crate::soc::port::PortRegistry).

use std::fmt;

use crate::common::TopologyError;

/// Index of a component inside its `ComponentTree`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub u32);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a cache in the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheLevel {
    /// Private L1 instruction cache.
    L1Instruction,
    /// Private L1 data cache.
    L1Data,
    /// Shared last-level cache.
    LastLevel,
}

/// The kind of hardware block a component models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Top-level system container.
    System,
    /// Source clock domain.
    ClockDomain,
    /// Voltage domain feeding a clock domain.
    VoltageDomain,
    /// Processing element.
    Cpu,
    /// A cache at the given level.
    Cache(CacheLevel),
    /// Bus or crossbar.
    Crossbar,
    /// Per-core interrupt controller.
    InterruptController,
    /// Memory controller.
    MemCtrl,
    /// DRAM backing-store model owned by a memory controller.
    Dram,
    /// System-wide workload descriptor.
    Workload,
    /// A process bound to one cpu.
    Process,
}

impl ComponentKind {
    /// Returns `true` for kinds that are driven by a clock.
    pub const fn is_clocked(self) -> bool {
        matches!(
            self,
            Self::Cpu
                | Self::Cache(_)
                | Self::Crossbar
                | Self::InterruptController
                | Self::MemCtrl
                | Self::Dram
        )
    }
}

/// One node of the ownership tree.
#[derive(Clone, Debug)]
pub struct ComponentNode {
    /// Identity of the node.
    pub id: ComponentId,
    /// Local name (last path segment).
    pub name: String,
    /// Full dotted path from the root.
    pub path: String,
    /// What the node models.
    pub kind: ComponentKind,
    /// Owner, `None` for the root.
    pub parent: Option<ComponentId>,
    /// Owned children in creation order.
    pub children: Vec<ComponentId>,
    /// Clock domain assigned directly to this node, overriding the inherited one.
    pub clock_domain: Option<ComponentId>,
}

/// Arena of components with tree-shaped ownership.
#[derive(Clone, Debug, Default)]
pub struct ComponentTree {
    nodes: Vec<ComponentNode>,
}

impl ComponentTree {
    /// Creates an empty tree.
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Adds the root node. Its path is its name.
    pub fn add_root(&mut self, name: &str, kind: ComponentKind) -> ComponentId {
        self.push(name.to_string(), name.to_string(), kind, None)
    }

    /// Adds a node owned by `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownComponent`] if `parent` is not in the tree.
    pub fn add_child(
        &mut self,
        parent: ComponentId,
        name: &str,
        kind: ComponentKind,
    ) -> Result<ComponentId, TopologyError> {
        let path = format!("{}.{}", self.get(parent)?.path, name);
        let id = self.push(name.to_string(), path, kind, Some(parent));
        self.nodes[parent.0 as usize].children.push(id);
        Ok(id)
    }

    fn push(
        &mut self,
        name: String,
        path: String,
        kind: ComponentKind,
        parent: Option<ComponentId>,
    ) -> ComponentId {
        let id = ComponentId(self.nodes.len() as u32);
        tracing::debug!(component = %path, ?kind, "created component");
        self.nodes.push(ComponentNode {
            id,
            name,
            path,
            kind,
            parent,
            children: Vec::new(),
            clock_domain: None,
        });
        id
    }

    /// Looks up a node.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownComponent`] if `id` is not in the tree.
    pub fn get(&self, id: ComponentId) -> Result<&ComponentNode, TopologyError> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(TopologyError::UnknownComponent(id.0))
    }

    /// Dotted path of a node, or `"<unknown #n>"` for foreign ids.
    pub fn path(&self, id: ComponentId) -> String {
        self.get(id)
            .map_or_else(|_| format!("<unknown {id}>"), |node| node.path.clone())
    }

    /// Assigns a clock domain directly to `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownComponent`] if either id is foreign.
    pub fn set_clock_domain(
        &mut self,
        id: ComponentId,
        domain: ComponentId,
    ) -> Result<(), TopologyError> {
        let _ = self.get(domain)?;
        let node = self
            .nodes
            .get_mut(id.0 as usize)
            .ok_or(TopologyError::UnknownComponent(id.0))?;
        node.clock_domain = Some(domain);
        Ok(())
    }

    /// The clock domain driving `id`: its own assignment, else the nearest ancestor's.
    pub fn clock_domain_of(&self, id: ComponentId) -> Option<ComponentId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.get(current).ok()?;
            if node.clock_domain.is_some() {
                return node.clock_domain;
            }
            cursor = node.parent;
        }
        None
    }

    /// Finds a node by its dotted path.
    pub fn find(&self, path: &str) -> Option<ComponentId> {
        self.nodes.iter().find(|n| n.path == path).map(|n| n.id)
    }

    /// Number of nodes of the given kind.
    pub fn count(&self, kind: ComponentKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    /// All nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentNode> + '_ {
        self.nodes.iter()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
