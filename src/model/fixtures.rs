// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::graph::{DiagramGraph, DiagramKind, GraphEdge, GraphNode};
use super::ids::{EdgeId, NodeId};

fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

fn eid(value: &str) -> EdgeId {
    EdgeId::new(value).expect("edge id")
}

pub(crate) fn class_diagram_small() -> DiagramGraph {
    let mut graph = DiagramGraph::new(DiagramKind::Class);

    let customer = nid("n:customer");
    let order = nid("n:order");
    let item = nid("n:item");

    graph
        .add_node(customer.clone(), GraphNode::new("Customer").at(10, 10))
        .expect("customer");
    graph
        .add_node(order.clone(), GraphNode::new("Order").at(200, 10))
        .expect("order");
    graph
        .add_node(item.clone(), GraphNode::new("Item").at(200, 150))
        .expect("item");

    graph
        .add_edge(
            eid("e:places"),
            GraphEdge::new(customer.clone(), order.clone()).with_label("places"),
        )
        .expect("places");
    graph
        .add_edge(eid("e:contains"), GraphEdge::new(order, item.clone()))
        .expect("contains");
    graph
        .add_edge(eid("e:likes"), GraphEdge::new(customer, item))
        .expect("likes");

    graph
}
