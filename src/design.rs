//! The top-level container: arenas of nodes, ports and arcs, addressed by
//! the stable indices in [`crate::ids`].

use crate::arc::Arc;
use crate::datatype::DataType;
use crate::error::{IrError, IrResult};
use crate::ids::{ArcId, NodeId, PortDirection, PortId};
use crate::node::Node;
use crate::port::Port;
use serde::{Deserialize, Serialize};

/// References to the design's master boundary nodes, populated once the
/// corresponding nodes are constructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Masters {
    /// The external-input master.
    pub input: Option<NodeId>,
    /// The external-output master.
    pub output: Option<NodeId>,
    /// The unscheduled-but-must-run-anyway terminator master.
    pub terminator: Option<NodeId>,
    /// The unconnected-port sink master.
    pub unconnected: Option<NodeId>,
}

/// The whole graph: arena-backed nodes, ports and arcs plus the top-level
/// node list and master references.
///
/// Arenas never compact on deletion; a deleted slot becomes `None` so that
/// ids issued earlier in a pass's batch remain valid addresses (they simply
/// resolve to nothing) until the driver commits the pass's edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    nodes: Vec<Option<Node>>,
    ports: Vec<Option<Port>>,
    arcs: Vec<Option<Arc>>,
    /// Nodes with no parent.
    pub top_level_nodes: Vec<NodeId>,
    /// The design's boundary nodes.
    pub masters: Masters,
}

impl Design {
    /// An empty design.
    pub fn new() -> Self {
        Design::default()
    }

    /// Reserve a fresh node id and insert the given node under it. The
    /// node's `common.id` must already equal the id this call will return;
    /// use [`Design::next_node_id`] beforehand to construct it.
    pub fn insert_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        if id.index() == self.nodes.len() {
            self.nodes.push(Some(node));
        } else {
            self.nodes[id.index()] = Some(node);
        }
        id
    }

    /// The id a node constructed next would receive.
    pub fn next_node_id(&self) -> NodeId {
        NodeId::new(self.nodes.len())
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(|n| n.as_ref())
    }

    /// Mutably look up a node by id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(|n| n.as_mut())
    }

    /// Tombstone a node's arena slot. Callers are responsible for having
    /// already removed it from its parent's child list and for having
    /// disconnected its ports.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.get_mut(id.index()).and_then(|n| n.take())
    }

    /// Iterate over every live node, in ascending id order (arena order).
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(|n| n.as_ref())
    }

    /// Reserve and insert a fresh port owned by `owner`.
    pub fn add_port(&mut self, owner: NodeId, direction: PortDirection) -> PortId {
        let id = PortId::new(self.ports.len());
        self.ports.push(Some(Port::new(owner, direction)));
        id
    }

    /// Look up a port by id.
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.index()).and_then(|p| p.as_ref())
    }

    /// Mutably look up a port by id.
    pub fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.get_mut(id.index()).and_then(|p| p.as_mut())
    }

    /// Look up an arc by id.
    pub fn arc(&self, id: ArcId) -> Option<&Arc> {
        self.arcs.get(id.index()).and_then(|a| a.as_ref())
    }

    /// Mutably look up an arc by id.
    pub fn arc_mut(&mut self, id: ArcId) -> Option<&mut Arc> {
        self.arcs.get_mut(id.index()).and_then(|a| a.as_mut())
    }

    /// Create an arc between `src_port` and `dst_port` and register it on
    /// both ports' attached sets, atomically with respect to the endpoints.
    pub fn connect(
        &mut self,
        src_port: PortId,
        dst_port: PortId,
        data_type: DataType,
        sample_time: f64,
    ) -> IrResult<ArcId> {
        let id = ArcId::new(self.arcs.len());
        self.arcs.push(Some(Arc::new(src_port, dst_port, data_type, sample_time)));
        self.port_mut(src_port)
            .ok_or_else(|| missing_port_err(src_port))?
            .attach(id);
        self.port_mut(dst_port)
            .ok_or_else(|| missing_port_err(dst_port))?
            .attach(id);
        Ok(id)
    }

    /// Remove an arc from both of its endpoints' attached sets and tombstone
    /// its arena slot.
    pub fn disconnect(&mut self, arc_id: ArcId) {
        if let Some(arc) = self.arcs.get(arc_id.index()).and_then(|a| a.as_ref()).cloned() {
            if let Some(p) = self.port_mut(arc.src_port) {
                p.detach(arc_id);
            }
            if let Some(p) = self.port_mut(arc.dst_port) {
                p.detach(arc_id);
            }
        }
        if let Some(slot) = self.arcs.get_mut(arc_id.index()) {
            *slot = None;
        }
    }

    /// Rewire an arc's destination port, detaching from the previous
    /// destination only after the new one is bound ("update new, update
    /// previous").
    pub fn set_arc_dst_port(&mut self, arc_id: ArcId, new_dst: PortId) -> IrResult<()> {
        let old_dst = self.arc(arc_id).ok_or_else(|| missing_arc_err(arc_id))?.dst_port;
        self.port_mut(new_dst).ok_or_else(|| missing_port_err(new_dst))?.attach(arc_id);
        if let Some(p) = self.port_mut(old_dst) {
            p.detach(arc_id);
        }
        self.arc_mut(arc_id).unwrap().dst_port = new_dst;
        Ok(())
    }

    /// Rewire an arc's source port, detaching from the previous source only
    /// after the new one is bound.
    pub fn set_arc_src_port(&mut self, arc_id: ArcId, new_src: PortId) -> IrResult<()> {
        let old_src = self.arc(arc_id).ok_or_else(|| missing_arc_err(arc_id))?.src_port;
        self.port_mut(new_src).ok_or_else(|| missing_port_err(new_src))?.attach(arc_id);
        if let Some(p) = self.port_mut(old_src) {
            p.detach(arc_id);
        }
        self.arc_mut(arc_id).unwrap().src_port = new_src;
        Ok(())
    }

    /// Remove `child` from `parent`'s child list and clear `child`'s parent
    /// pointer.
    pub fn detach_child(&mut self, parent: NodeId, child: NodeId) -> IrResult<()> {
        if let Some(children) = self.node_mut(parent).and_then(|n| n.children_mut()) {
            children.retain(|c| *c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.common.parent = None;
        }
        Ok(())
    }

    /// Append `child` to `parent`'s child list and set `child`'s parent
    /// pointer.
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> IrResult<()> {
        let is_subsystem = self.node(parent).map(|n| n.is_subsystem()).unwrap_or(false);
        if !is_subsystem {
            return Err(IrError::Structural {
                node_id: parent,
                node_name: self.node(parent).map(|n| n.common.name.clone()).unwrap_or_default(),
                message: "cannot attach a child to a non-subsystem node".to_string(),
            });
        }
        if let Some(children) = self.node_mut(parent).and_then(|n| n.children_mut()) {
            children.push(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.common.parent = Some(parent);
        }
        Ok(())
    }

    /// Validate invariant 1: every arc's endpoints are owned by live nodes.
    /// Validate invariant 2: every node with a parent appears in that
    /// parent's child list. Used by tests and by the end of a pass driver.
    pub fn check_structural_invariants(&self) -> IrResult<()> {
        for node in self.iter_nodes() {
            if let Some(parent) = node.common.parent {
                let parent_node = self.node(parent).ok_or_else(|| IrError::Invariant {
                    node_id: node.id(),
                    node_name: node.common.name.clone(),
                    message: "parent does not exist".to_string(),
                })?;
                if !parent_node.children().contains(&node.id()) {
                    return Err(IrError::Invariant {
                        node_id: node.id(),
                        node_name: node.common.name.clone(),
                        message: "parent does not list this node as a child".to_string(),
                    });
                }
            }
        }
        for slot in &self.arcs {
            let Some(arc) = slot else { continue };
            for port_id in [arc.src_port, arc.dst_port] {
                let port = self.port(port_id).ok_or_else(|| IrError::Invariant {
                    node_id: NodeId::new(0),
                    node_name: String::new(),
                    message: format!("arc references missing port {port_id:?}"),
                })?;
                if self.node(port.owner).is_none() {
                    return Err(IrError::Invariant {
                        node_id: port.owner,
                        node_name: String::new(),
                        message: "port's owning node does not exist".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// All direct input arcs of a node's data input ports, in port order.
    pub fn input_arcs(&self, node_id: NodeId) -> Vec<ArcId> {
        let Some(node) = self.node(node_id) else { return Vec::new() };
        node.common
            .input_ports
            .iter()
            .filter_map(|p| self.port(*p))
            .flat_map(|p| p.arcs.iter().copied())
            .collect()
    }

    /// All direct output arcs of a node's data output ports, in port order.
    pub fn output_arcs(&self, node_id: NodeId) -> Vec<ArcId> {
        let Some(node) = self.node(node_id) else { return Vec::new() };
        node.common
            .output_ports
            .iter()
            .filter_map(|p| self.port(*p))
            .flat_map(|p| p.arcs.iter().copied())
            .collect()
    }
}

fn missing_port_err(port: PortId) -> IrError {
    IrError::Invariant {
        node_id: NodeId::new(0),
        node_name: String::new(),
        message: format!("port {port:?} does not exist"),
    }
}

fn missing_arc_err(arc: ArcId) -> IrError {
    IrError::Invariant {
        node_id: NodeId::new(0),
        node_name: String::new(),
        message: format!("arc {arc:?} does not exist"),
    }
}
