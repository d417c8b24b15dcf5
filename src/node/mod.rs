//! The node hierarchy: the polymorphic unit of the graph.
//!
//! Every node is represented as one [`Node`] value: a [`NodeCommon`] record
//! shared by all kinds (id, name, parent, ports, partition, context) plus a
//! [`NodeKind`] holding the fields specific to what the node actually is.
//! Kind-specific behaviour (`validate`, `expand`, `shallow_clone`) is
//! implemented as free functions that `match` on `NodeKind` rather than as a
//! trait-object hierarchy, since the set of kinds is closed and fixed by this
//! module.

pub mod blocking;
pub mod fifo;
pub mod highlevel;
pub mod master;
pub mod primitive;
pub mod subsystem;

use crate::context::ContextStack;
use crate::ids::{NodeId, PortId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub use blocking::BlockingDomainBridge;
pub use fifo::ThreadCrossingFifo;
pub use highlevel::DiscreteFir;
pub use master::{Master, MasterKind};
pub use primitive::Primitive;
pub use subsystem::{
    BlockingDomain, ClockDomain, EnableInput, EnableOutput, EnabledSubSystem, ExpandedNode, SubSystem,
};

/// Fields shared by every node kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCommon {
    /// Stable id, unique within a design.
    pub id: NodeId,
    /// Human-readable name, not necessarily unique.
    pub name: String,
    /// Enclosing subsystem, or `None` at the top level.
    pub parent: Option<NodeId>,
    /// Data input ports, in declared order.
    pub input_ports: SmallVec<[PortId; 4]>,
    /// Data output ports, in declared order.
    pub output_ports: SmallVec<[PortId; 4]>,
    /// The enable-condition input, present only on children of an
    /// [`EnabledSubSystem`].
    pub enable_port: Option<PortId>,
    /// Ordering-only input, used to sequence side-effecting nodes.
    pub order_constraint_input: Option<PortId>,
    /// Ordering-only output.
    pub order_constraint_output: Option<PortId>,
    /// Scheduling partition; `-1` (represented as `None`) means unassigned.
    pub partition: Option<i32>,
    /// The base sub-blocking length this node was scheduled at, once
    /// blocking has been decided.
    pub base_sub_blocking_length: usize,
    /// Outermost-to-innermost stack of enclosing conditional-execution scopes.
    pub context: ContextStack,
}

impl NodeCommon {
    /// A fresh common record with empty ports and no context, at the given id.
    pub fn new(id: NodeId, name: impl Into<String>, parent: Option<NodeId>) -> Self {
        NodeCommon {
            id,
            name: name.into(),
            parent,
            input_ports: SmallVec::new(),
            output_ports: SmallVec::new(),
            enable_port: None,
            order_constraint_input: None,
            order_constraint_output: None,
            partition: None,
            base_sub_blocking_length: 1,
            context: ContextStack::new(),
        }
    }
}

/// The kind-specific payload of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// A leaf primitive operator.
    Primitive(Primitive),
    /// A synthesisable high-level block.
    DiscreteFir(DiscreteFir),
    /// A plain subsystem: just a container of children.
    SubSystem(SubSystem),
    /// A subsystem gated by an enable condition.
    EnabledSubSystem(EnabledSubSystem),
    /// A child of an [`EnabledSubSystem`] that gates one external input.
    EnableInput(EnableInput),
    /// A child of an [`EnabledSubSystem`] that gates one internal output.
    EnableOutput(EnableOutput),
    /// The wrapper left behind after a high-level node is expanded.
    ExpandedNode(ExpandedNode),
    /// A subsystem whose children run at a re-rated clock.
    ClockDomain(ClockDomain),
    /// A subsystem whose children share a base sub-blocking length.
    BlockingDomain(BlockingDomain),
    /// A design boundary node (input, output, terminator, or unconnected stub).
    Master(Master),
    /// A thread-crossing queue.
    Fifo(ThreadCrossingFifo),
    /// A placeholder edge between nodes in different base blocking domains,
    /// replaced by a FIFO during partition-crossing insertion.
    BlockingDomainBridge(BlockingDomainBridge),
}

/// A single node in the design: shared fields plus a kind-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Fields shared by all kinds.
    pub common: NodeCommon,
    /// The kind-specific payload.
    pub kind: NodeKind,
}

impl Node {
    /// This node's stable id.
    pub fn id(&self) -> NodeId {
        self.common.id
    }

    /// A short, stable tag for this node's kind, matching the tag an
    /// external GraphML exporter would write as `block_node_type`.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Primitive(p) => p.type_name(),
            NodeKind::DiscreteFir(_) => "DiscreteFIR",
            NodeKind::SubSystem(_) => "Subsystem",
            NodeKind::EnabledSubSystem(_) => "Enabled Subsystem",
            NodeKind::EnableInput(_) => "EnableInput",
            NodeKind::EnableOutput(_) => "EnableOutput",
            NodeKind::ExpandedNode(_) => "Expanded",
            NodeKind::ClockDomain(_) => "ClockDomain",
            NodeKind::BlockingDomain(_) => "BlockingDomain",
            NodeKind::Master(m) => m.kind.type_name(),
            NodeKind::Fifo(_) => "ThreadCrossingFIFO",
            NodeKind::BlockingDomainBridge(_) => "BlockingDomainBridge",
        }
    }

    /// `true` for node kinds that own a set of children.
    pub fn is_subsystem(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::SubSystem(_)
                | NodeKind::EnabledSubSystem(_)
                | NodeKind::ExpandedNode(_)
                | NodeKind::ClockDomain(_)
                | NodeKind::BlockingDomain(_)
        )
    }

    /// The child node ids of a subsystem-shaped node, empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::SubSystem(s) => &s.children,
            NodeKind::EnabledSubSystem(s) => &s.children,
            NodeKind::ExpandedNode(s) => &s.children,
            NodeKind::ClockDomain(s) => &s.children,
            NodeKind::BlockingDomain(s) => &s.children,
            _ => &[],
        }
    }

    /// Mutable access to the child node ids of a subsystem-shaped node.
    pub fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.kind {
            NodeKind::SubSystem(s) => Some(&mut s.children),
            NodeKind::EnabledSubSystem(s) => Some(&mut s.children),
            NodeKind::ExpandedNode(s) => Some(&mut s.children),
            NodeKind::ClockDomain(s) => Some(&mut s.children),
            NodeKind::BlockingDomain(s) => Some(&mut s.children),
            _ => None,
        }
    }

    /// `true` for high-level nodes that can be rewritten into primitives.
    pub fn can_expand(&self) -> bool {
        matches!(self.kind, NodeKind::DiscreteFir(_))
    }
}
