//! Capability descriptors and query result types shared by every backend.

use std::collections::BTreeMap;
use std::fmt;

use crate::graph::Graph;
use crate::triple::Node;

/// A single optional backend operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    LoadGraph,
    SaveGraph,
    UpdateGraph,
    DeleteGraph,
    ListGraphs,
    Query,
    Update,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::LoadGraph,
        Capability::SaveGraph,
        Capability::UpdateGraph,
        Capability::DeleteGraph,
        Capability::ListGraphs,
        Capability::Query,
        Capability::Update,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Capability::LoadGraph => "graph loading",
            Capability::SaveGraph => "graph saving",
            Capability::UpdateGraph => "incremental graph updates",
            Capability::DeleteGraph => "graph deletion",
            Capability::ListGraphs => "graph listing",
            Capability::Query => "query execution",
            Capability::Update => "update execution",
        };
        f.write_str(label)
    }
}

/// The set of capabilities a backend advertises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub load_graph: bool,
    pub save_graph: bool,
    pub update_graph: bool,
    pub delete_graph: bool,
    pub list_graphs: bool,
    pub query: bool,
    pub update: bool,
}

impl Capabilities {
    pub const fn none() -> Self {
        Self {
            load_graph: false,
            save_graph: false,
            update_graph: false,
            delete_graph: false,
            list_graphs: false,
            query: false,
            update: false,
        }
    }

    pub const fn all() -> Self {
        Self {
            load_graph: true,
            save_graph: true,
            update_graph: true,
            delete_graph: true,
            list_graphs: true,
            query: true,
            update: true,
        }
    }

    /// Whole-graph load and save only.
    pub const fn read_write() -> Self {
        Self {
            load_graph: true,
            save_graph: true,
            ..Self::none()
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::LoadGraph => self.load_graph,
            Capability::SaveGraph => self.save_graph,
            Capability::UpdateGraph => self.update_graph,
            Capability::DeleteGraph => self.delete_graph,
            Capability::ListGraphs => self.list_graphs,
            Capability::Query => self.query,
            Capability::Update => self.update,
        }
    }

    pub fn with(self, capability: Capability) -> Self {
        self.set(capability, true)
    }

    pub fn without(self, capability: Capability) -> Self {
        self.set(capability, false)
    }

    fn set(mut self, capability: Capability, enabled: bool) -> Self {
        let slot = match capability {
            Capability::LoadGraph => &mut self.load_graph,
            Capability::SaveGraph => &mut self.save_graph,
            Capability::UpdateGraph => &mut self.update_graph,
            Capability::DeleteGraph => &mut self.delete_graph,
            Capability::ListGraphs => &mut self.list_graphs,
            Capability::Query => &mut self.query,
            Capability::Update => &mut self.update,
        };
        *slot = enabled;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::read_write()
    }
}

/// Tabular query results; each row maps bound variable names to nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub variables: Vec<String>,
    pub rows: Vec<BTreeMap<String, Node>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Tagged result of a read-only query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryResult {
    Boolean(bool),
    Bindings(ResultSet),
    Graph(Graph),
}

impl QueryResult {
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            QueryResult::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bindings(&self) -> Option<&ResultSet> {
        match self {
            QueryResult::Bindings(results) => Some(results),
            _ => None,
        }
    }

    pub fn as_graph(&self) -> Option<&Graph> {
        match self {
            QueryResult::Graph(graph) => Some(graph),
            _ => None,
        }
    }
}
