//! Partition-crossing FIFO insertion: replacing groups of same-source,
//! cross-partition arcs (and [`crate::node::BlockingDomainBridge`] edges)
//! with a single [`crate::node::ThreadCrossingFifo`].

use crate::context::{Context, ContextRootKind};
use crate::design::Design;
use crate::error::{IrError, IrResult};
use crate::ids::{ArcId, NodeId, PortDirection};
use crate::node::fifo::FifoPortState;
use crate::node::{Node, NodeCommon, NodeKind, ThreadCrossingFifo};
use crate::PassEdits;
use std::collections::HashMap;

fn missing(id: NodeId) -> IrError {
    IrError::Invariant { node_id: id, node_name: String::new(), message: "node does not exist".to_string() }
}

/// One group of arcs sharing a single source port that must cross from
/// `src_partition` to `dst_partition`.
#[derive(Debug, Clone)]
pub struct CrossingGroup {
    /// The arcs to redirect through the new FIFO.
    pub arcs: Vec<ArcId>,
}

/// The context a newly inserted FIFO or blocking bridge should sit in: the
/// source's enclosing scope with clock-domain and blocking-domain entries
/// stripped (those re-rate or re-block the FIFO itself, so it cannot sit
/// "inside" one), but enable/mux scopes preserved (the FIFO must not run
/// unconditionally if its source wouldn't have).
pub fn find_context_for_blocking_bridge_or_fifo(src_context: &[Context]) -> Vec<Context> {
    src_context
        .iter()
        .copied()
        .filter(|c| !matches!(c.root_kind, ContextRootKind::ClockDomain | ContextRootKind::BlockingDomain))
        .collect()
}

/// Where a new FIFO (or blocking bridge) should be parented: the source
/// node's own parent, unless the source is itself a subsystem, in which
/// case its own id.
pub fn find_insertion_point_for_blocking_bridge_or_fifo(design: &Design, src_node: NodeId) -> NodeId {
    design.node(src_node).and_then(|n| n.common.parent).unwrap_or(src_node)
}

/// Insert one FIFO per `(src_partition, dst_partition, src_port)` crossing
/// group. `groups` maps each arc to the source port and partition pair it
/// crosses; callers build this by walking all arcs and comparing the
/// partitions of each endpoint's owning node.
pub fn insert_partition_crossing_fifos(
    design: &mut Design,
    groups: &HashMap<(i32, i32), Vec<CrossingGroup>>,
    fifo_length: usize,
    edits: &mut PassEdits,
) -> IrResult<Vec<NodeId>> {
    let mut created = Vec::new();
    let mut keys: Vec<_> = groups.keys().copied().collect();
    keys.sort();
    for key in keys {
        for group in &groups[&key] {
            let fifo_id = insert_one_fifo(design, group, fifo_length, edits)?;
            created.push(fifo_id);
        }
    }
    Ok(created)
}

fn insert_one_fifo(
    design: &mut Design,
    group: &CrossingGroup,
    fifo_length: usize,
    edits: &mut PassEdits,
) -> IrResult<NodeId> {
    if group.arcs.is_empty() {
        return Err(IrError::Precondition {
            node_id: NodeId::new(0),
            node_name: String::new(),
            message: "crossing group has no arcs".to_string(),
        });
    }
    let first_arc = design.arc(group.arcs[0]).ok_or_else(|| missing(NodeId::new(0)))?;
    let src_port_id = first_arc.src_port;
    let src_node_id = design.port(src_port_id).unwrap().owner;
    let src_node = design.node(src_node_id).ok_or_else(|| missing(src_node_id))?;
    let src_partition = src_node.common.partition;
    let src_base_sub_blocking = src_node.common.base_sub_blocking_length;
    let src_context = src_node.common.context.clone();

    let is_bridge = matches!(src_node.kind, NodeKind::BlockingDomainBridge(_));

    let fifo_context = find_context_for_blocking_bridge_or_fifo(&src_context);
    let fifo_parent = if is_bridge {
        src_node.common.parent.ok_or_else(|| IrError::Structural {
            node_id: src_node_id,
            node_name: src_node.common.name.clone(),
            message: "blocking domain bridge has no parent".to_string(),
        })?
    } else {
        find_insertion_point_for_blocking_bridge_or_fifo(design, src_node_id)
    };

    let dst_base_sub_blocking = {
        let mut values = Vec::new();
        for a in &group.arcs {
            let arc = design.arc(*a).unwrap();
            let dst_node = design.node(design.port(arc.dst_port).unwrap().owner).unwrap();
            values.push(dst_node.common.base_sub_blocking_length);
        }
        let first = values[0];
        if values.iter().any(|v| *v != first) {
            return Err(IrError::Invariant {
                node_id: src_node_id,
                node_name: src_node.common.name.clone(),
                message: "arcs in a crossing group disagree on destination base sub-blocking length".to_string(),
            });
        }
        first
    };

    let fifo_id = design.next_node_id();
    let mut common = NodeCommon::new(fifo_id, format!("fifo_{}", fifo_id.index()), Some(fifo_parent));
    common.partition = src_partition;
    common.base_sub_blocking_length = src_base_sub_blocking;
    common.context = fifo_context.into_iter().collect();
    let fifo_in = design.add_port(fifo_id, PortDirection::Input(0));
    let fifo_out = design.add_port(fifo_id, PortDirection::Output(0));
    common.input_ports.push(fifo_in);
    common.output_ports.push(fifo_out);

    let mut fifo = ThreadCrossingFifo::new(fifo_length);
    fifo.input_state.insert(
        0,
        FifoPortState { init_conditions: vec![], block_size: src_base_sub_blocking, sub_block_size: 1, clock_domain: None, index_exprs: vec![] },
    );
    fifo.output_state.insert(
        0,
        FifoPortState { init_conditions: vec![], block_size: dst_base_sub_blocking, sub_block_size: 1, clock_domain: None, index_exprs: vec![] },
    );

    design.insert_node(Node { common, kind: NodeKind::Fifo(fifo) });
    design.attach_child(fifo_parent, fifo_id)?;
    edits.new_nodes.push(fifo_id);

    for arc in &group.arcs {
        design.set_arc_src_port(*arc, fifo_out)?;
    }

    if is_bridge {
        let bridge_in_arcs = design.node(src_node_id).unwrap().common.input_ports.clone();
        for (i, _p) in bridge_in_arcs.iter().enumerate() {
            let port = design.node(src_node_id).unwrap().common.input_ports[i];
            let arcs: Vec<ArcId> = design.port(port).map(|p| p.arcs.clone()).unwrap_or_default();
            for a in &arcs {
                design.set_arc_dst_port(*a, fifo_in)?;
            }
        }
        let bridge_oc_in = design.node(src_node_id).unwrap().common.order_constraint_input;
        if let Some(oc) = bridge_oc_in {
            let fifo_oc_in = design.add_port(fifo_id, PortDirection::OrderConstraintInput);
            design.node_mut(fifo_id).unwrap().common.order_constraint_input = Some(fifo_oc_in);
            let arcs: Vec<ArcId> = design.port(oc).map(|p| p.arcs.clone()).unwrap_or_default();
            for a in &arcs {
                design.set_arc_dst_port(*a, fifo_oc_in)?;
            }
        }
        let bridge_oc_out = design.node(src_node_id).unwrap().common.order_constraint_output;
        if let Some(oc) = bridge_oc_out {
            let fifo_oc_out = design.add_port(fifo_id, PortDirection::OrderConstraintOutput);
            design.node_mut(fifo_id).unwrap().common.order_constraint_output = Some(fifo_oc_out);
            let arcs: Vec<ArcId> = design.port(oc).map(|p| p.arcs.clone()).unwrap_or_default();
            for a in &arcs {
                design.set_arc_src_port(*a, fifo_oc_out)?;
            }
        }
        if let Some(parent) = design.node(src_node_id).unwrap().common.parent {
            design.detach_child(parent, src_node_id)?;
        }
        edits.deleted_nodes.push(src_node_id);
    } else {
        let new_arc_type = first_arc.data_type.clone();
        let sample_time = first_arc.sample_time;
        design.connect(src_port_id, fifo_in, new_arc_type, sample_time)?;
    }

    Ok(fifo_id)
}
