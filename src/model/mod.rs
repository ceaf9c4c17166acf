// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Payload types.
//!
//! The document core treats the graph as opaque and only needs the [`Graph`] contract;
//! [`DiagramGraph`] is the concrete node/edge payload used by the default JSON codec.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod graph;
pub mod ids;

pub use graph::{
    DiagramGraph, DiagramKind, ExtensionFilter, Graph, GraphEdge, GraphError, GraphNode,
};
pub use ids::{DocumentId, EdgeId, Id, IdError, NodeId};
