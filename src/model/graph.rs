// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::ids::{EdgeId, NodeId};

/// The payload contract a document handle needs from its graph.
///
/// Everything else about the graph is opaque to the lifecycle core; encoding goes through a
/// [`crate::codec::PersistenceCodec`].
pub trait Graph: Send + 'static {
    /// File-type filter offered when the user picks a new save location.
    fn extension_filter(&self) -> ExtensionFilter;
}

/// A file-type filter: human readable description plus the extension (including the dot).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtensionFilter {
    description: SmolStr,
    extension: SmolStr,
}

impl ExtensionFilter {
    pub fn new(description: impl AsRef<str>, extension: impl AsRef<str>) -> Self {
        let extension = extension.as_ref();
        let extension = if extension.starts_with('.') {
            SmolStr::new(extension)
        } else {
            SmolStr::new(format!(".{extension}"))
        };
        Self {
            description: SmolStr::new(description.as_ref()),
            extension,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Case-insensitive suffix match on a bare filename.
    pub fn matches(&self, filename: &str) -> bool {
        let extension = self.extension.as_str();
        filename.len() > extension.len()
            && filename
                .get(filename.len() - extension.len()..)
                .is_some_and(|suffix| suffix.eq_ignore_ascii_case(extension))
    }

    /// Appends the extension unless `filename` already carries it.
    pub fn apply(&self, filename: &str) -> String {
        if self.matches(filename) {
            filename.to_owned()
        } else {
            format!("{filename}{}", self.extension)
        }
    }
}

impl fmt::Display for ExtensionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (*{})", self.description, self.extension)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramKind {
    Class,
    Activity,
    Sequence,
    State,
    UseCase,
    Object,
}

impl DiagramKind {
    fn file_type(self) -> (&'static str, &'static str) {
        match self {
            Self::Class => ("Class Diagram Files", ".class.violet.html"),
            Self::Activity => ("Activity Diagram Files", ".activity.violet.html"),
            Self::Sequence => ("Sequence Diagram Files", ".seq.violet.html"),
            Self::State => ("State Diagram Files", ".state.violet.html"),
            Self::UseCase => ("Use Case Diagram Files", ".ucase.violet.html"),
            Self::Object => ("Object Diagram Files", ".obj.violet.html"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    label: String,
    #[serde(default)]
    position: (i32, i32),
}

impl GraphNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            position: (0, 0),
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = (x, y);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    pub fn move_to(&mut self, x: i32, y: i32) {
        self.position = (x, y);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    from: NodeId,
    to: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl GraphEdge {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self {
            from,
            to,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn from(&self) -> &NodeId {
        &self.from
    }

    pub fn to(&self) -> &NodeId {
        &self.to
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn touches(&self, node_id: &NodeId) -> bool {
        &self.from == node_id || &self.to == node_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    DuplicateNode { node_id: NodeId },
    DuplicateEdge { edge_id: EdgeId },
    UnknownNode { edge_id: EdgeId, node_id: NodeId },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode { node_id } => write!(f, "node {node_id} already exists"),
            Self::DuplicateEdge { edge_id } => write!(f, "edge {edge_id} already exists"),
            Self::UnknownNode { edge_id, node_id } => {
                write!(f, "edge {edge_id} references unknown node {node_id}")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// A node/edge diagram of one [`DiagramKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramGraph {
    kind: DiagramKind,
    #[serde(default)]
    nodes: BTreeMap<NodeId, GraphNode>,
    #[serde(default)]
    edges: BTreeMap<EdgeId, GraphEdge>,
}

impl DiagramGraph {
    pub fn new(kind: DiagramKind) -> Self {
        Self {
            kind,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, GraphNode> {
        &self.nodes
    }

    pub fn edges(&self) -> &BTreeMap<EdgeId, GraphEdge> {
        &self.edges
    }

    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(node_id)
    }

    pub fn add_node(&mut self, node_id: NodeId, node: GraphNode) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node_id) {
            return Err(GraphError::DuplicateNode { node_id });
        }
        self.nodes.insert(node_id, node);
        Ok(())
    }

    pub fn add_edge(&mut self, edge_id: EdgeId, edge: GraphEdge) -> Result<(), GraphError> {
        if self.edges.contains_key(&edge_id) {
            return Err(GraphError::DuplicateEdge { edge_id });
        }
        for endpoint in [edge.from(), edge.to()] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::UnknownNode {
                    node_id: endpoint.clone(),
                    edge_id,
                });
            }
        }
        self.edges.insert(edge_id, edge);
        Ok(())
    }

    /// Removes the node together with every edge attached to it.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<GraphNode> {
        let node = self.nodes.remove(node_id)?;
        self.edges.retain(|_, edge| !edge.touches(node_id));
        Some(node)
    }

    pub fn remove_edge(&mut self, edge_id: &EdgeId) -> Option<GraphEdge> {
        self.edges.remove(edge_id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl Graph for DiagramGraph {
    fn extension_filter(&self) -> ExtensionFilter {
        let (description, extension) = self.kind.file_type();
        ExtensionFilter::new(description, extension)
    }
}
