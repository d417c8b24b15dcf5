//! FIFO merging: bundling several single-purpose FIFOs between the same
//! partition pair into one multi-port FIFO.

use crate::context::{find_most_specific_common_context, reduced_context_stack, Context};
use crate::design::Design;
use crate::error::{IrError, IrResult};
use crate::ids::{ArcId, NodeId};
use crate::node::NodeKind;
use crate::passes::reshape::reshape_fifo_port_to_size_blocks;
use crate::PassEdits;
use std::collections::HashMap;

fn missing(id: NodeId) -> IrError {
    IrError::Invariant { node_id: id, node_name: String::new(), message: "node does not exist".to_string() }
}

/// Bucket a set of FIFOs sitting between the same two partitions into merge
/// groups: one group per unique reduced context stack, unless
/// `ignore_contexts` is set, in which case they all merge into one group.
pub fn bucket_merge_groups(design: &Design, fifos: &[NodeId], ignore_contexts: bool) -> Vec<Vec<NodeId>> {
    if ignore_contexts {
        return vec![fifos.to_vec()];
    }
    let mut buckets: HashMap<Vec<Context>, Vec<NodeId>> = HashMap::new();
    for id in fifos {
        let Some(node) = design.node(*id) else { continue };
        let reduced: Vec<Context> = reduced_context_stack(&node.common.context).into_iter().collect();
        buckets.entry(reduced).or_default().push(*id);
    }
    buckets.into_values().collect()
}

/// The minimum initial-condition block count across every input port of
/// every FIFO in a merge group; each member is reshaped down to this size
/// before merging. Only `input_state` is considered since
/// [`reshape_fifo_port_to_size_blocks`] only ever reshapes a FIFO's input
/// side.
fn min_init_condition_blocks(design: &Design, group: &[NodeId]) -> IrResult<usize> {
    let mut min_blocks: Option<usize> = None;
    for id in group {
        let NodeKind::Fifo(f) = &design.node(*id).ok_or_else(|| missing(*id))?.kind else {
            return Err(missing(*id));
        };
        for state in f.input_state.values() {
            let unit = state.block_size * state.sub_block_size.max(1);
            let blocks = if unit == 0 { 0 } else { state.init_conditions.len() / unit };
            min_blocks = Some(min_blocks.map_or(blocks, |m: usize| m.min(blocks)));
        }
    }
    Ok(min_blocks.unwrap_or(0))
}

/// Merge every FIFO in a group into the first member, reshaping all members
/// down to the group's minimum initial-condition block count first. Returns
/// the surviving FIFO's id.
pub fn merge_fifo_group(
    design: &mut Design,
    group: &[NodeId],
    blocking_already_occurred: bool,
    edits: &mut PassEdits,
) -> IrResult<NodeId> {
    if group.is_empty() {
        return Err(IrError::Precondition {
            node_id: NodeId::new(0),
            node_name: String::new(),
            message: "cannot merge an empty FIFO group".to_string(),
        });
    }
    let target_blocks = min_init_condition_blocks(design, group)?;
    for id in group {
        let ports: Vec<usize> = match &design.node(*id).unwrap().kind {
            NodeKind::Fifo(f) => f.input_state.keys().copied().collect(),
            _ => continue,
        };
        for p in ports {
            reshape_fifo_port_to_size_blocks(design, *id, p, target_blocks, blocking_already_occurred, edits)?;
        }
    }

    let target_id = group[0];
    let mut common_ancestors: Vec<NodeId> = design
        .node(target_id)
        .and_then(|n| n.common.parent)
        .into_iter()
        .collect();
    let mut common_context = design.node(target_id).unwrap().common.context.to_vec();

    for other_id in &group[1..] {
        merge_one_into(design, target_id, *other_id, edits)?;
        if let Some(other_parent) = design.node(*other_id).and_then(|n| n.common.parent) {
            common_ancestors.push(other_parent);
        }
        let other_context = design.node(*other_id).map(|n| n.common.context.to_vec()).unwrap_or_default();
        let shared = find_most_specific_common_context(&common_context, &other_context);
        common_context.truncate(shared);
    }

    relocate_to_common_ancestor(design, target_id, &common_ancestors)?;
    design.node_mut(target_id).unwrap().common.context = common_context.into_iter().collect();

    Ok(target_id)
}

fn merge_one_into(design: &mut Design, target_id: NodeId, other_id: NodeId, edits: &mut PassEdits) -> IrResult<()> {
    let other_ports: Vec<(usize, crate::node::fifo::FifoPortState)> = match &design.node(other_id).ok_or_else(|| missing(other_id))?.kind {
        NodeKind::Fifo(f) => f.input_state.iter().map(|(k, v)| (*k, v.clone())).collect(),
        _ => return Err(missing(other_id)),
    };

    for (old_port, in_state) in other_ports {
        let new_port_index = match &design.node(target_id).unwrap().kind {
            NodeKind::Fifo(f) => f.input_state.len(),
            _ => return Err(missing(target_id)),
        };
        let new_in_port = design.add_port(target_id, crate::ids::PortDirection::Input(new_port_index));
        let new_out_port = design.add_port(target_id, crate::ids::PortDirection::Output(new_port_index));
        design.node_mut(target_id).unwrap().common.input_ports.push(new_in_port);
        design.node_mut(target_id).unwrap().common.output_ports.push(new_out_port);

        let out_state = match &design.node(other_id).unwrap().kind {
            NodeKind::Fifo(f) => f.output_state.get(&old_port).cloned().unwrap_or_default(),
            _ => Default::default(),
        };
        if let NodeKind::Fifo(f) = &mut design.node_mut(target_id).unwrap().kind {
            f.input_state.insert(new_port_index, in_state);
            f.output_state.insert(new_port_index, out_state);
        }

        let old_in_port = design.node(other_id).unwrap().common.input_ports[old_port];
        let old_in_arcs = design.port(old_in_port).map(|p| p.arcs.clone()).unwrap_or_default();
        for a in &old_in_arcs {
            design.set_arc_dst_port(*a, new_in_port)?;
        }
        let old_out_port = design.node(other_id).unwrap().common.output_ports[old_port];
        let old_out_arcs = design.port(old_out_port).map(|p| p.arcs.clone()).unwrap_or_default();
        for a in &old_out_arcs {
            design.set_arc_src_port(*a, new_out_port)?;
        }
    }

    transfer_order_constraints(design, target_id, other_id)?;

    if let Some(parent) = design.node(other_id).and_then(|n| n.common.parent) {
        design.detach_child(parent, other_id).ok();
    }
    edits.deleted_nodes.push(other_id);
    Ok(())
}

fn transfer_order_constraints(design: &mut Design, target_id: NodeId, other_id: NodeId) -> IrResult<()> {
    let other_oc_in = design.node(other_id).unwrap().common.order_constraint_input;
    if let Some(oc) = other_oc_in {
        let target_oc_in = match design.node(target_id).unwrap().common.order_constraint_input {
            Some(p) => p,
            None => {
                let p = design.add_port(target_id, crate::ids::PortDirection::OrderConstraintInput);
                design.node_mut(target_id).unwrap().common.order_constraint_input = Some(p);
                p
            }
        };
        let arcs: Vec<ArcId> = design.port(oc).map(|p| p.arcs.clone()).unwrap_or_default();
        for a in &arcs {
            design.set_arc_dst_port(*a, target_oc_in)?;
        }
    }
    let other_oc_out = design.node(other_id).unwrap().common.order_constraint_output;
    if let Some(oc) = other_oc_out {
        let target_oc_out = match design.node(target_id).unwrap().common.order_constraint_output {
            Some(p) => p,
            None => {
                let p = design.add_port(target_id, crate::ids::PortDirection::OrderConstraintOutput);
                design.node_mut(target_id).unwrap().common.order_constraint_output = Some(p);
                p
            }
        };
        let arcs: Vec<ArcId> = design.port(oc).map(|p| p.arcs.clone()).unwrap_or_default();
        for a in &arcs {
            design.set_arc_src_port(*a, target_oc_out)?;
        }
    }
    Ok(())
}

/// Move `target_id` to the shallowest node that is an ancestor of every
/// node in `candidates` (typically the merged FIFOs' original parents),
/// falling back to the design's top level if there is no common ancestor.
fn relocate_to_common_ancestor(design: &mut Design, target_id: NodeId, candidates: &[NodeId]) -> IrResult<()> {
    let Some(&first) = candidates.first() else { return Ok(()) };
    let mut common = ancestor_chain(design, first);
    for &other in &candidates[1..] {
        let chain = ancestor_chain(design, other);
        common.retain(|a| chain.contains(a));
    }
    let new_parent = common.into_iter().next();
    if new_parent != design.node(target_id).unwrap().common.parent {
        if let Some(old_parent) = design.node(target_id).unwrap().common.parent {
            design.detach_child(old_parent, target_id)?;
        }
        if let Some(p) = new_parent {
            design.attach_child(p, target_id)?;
        } else {
            design.top_level_nodes.push(target_id);
        }
    }
    Ok(())
}

/// `node_id` itself followed by every ancestor up to the top level, nearest
/// first.
fn ancestor_chain(design: &Design, node_id: NodeId) -> Vec<NodeId> {
    let mut chain = vec![node_id];
    let mut cur = node_id;
    while let Some(parent) = design.node(cur).and_then(|n| n.common.parent) {
        chain.push(parent);
        cur = parent;
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PortDirection;
    use crate::node::fifo::{FifoPortState, ThreadCrossingFifo};
    use crate::node::{Node, NodeCommon};
    use crate::numeric::NumericValue;

    fn iv(v: i64) -> NumericValue {
        NumericValue::Integer { value: v, signed: false }
    }

    fn make_fifo(design: &mut Design, parent: NodeId, init_len: usize) -> NodeId {
        let id = design.next_node_id();
        let mut common = NodeCommon::new(id, "fifo", Some(parent));
        common.input_ports.push(design.add_port(id, PortDirection::Input(0)));
        common.output_ports.push(design.add_port(id, PortDirection::Output(0)));
        let mut fifo = ThreadCrossingFifo::new(8);
        fifo.input_state.insert(
            0,
            FifoPortState {
                init_conditions: (0..init_len as i64)
                    .map(|v| crate::numeric::NumericValue::Integer { value: v, signed: false })
                    .collect(),
                block_size: 2,
                sub_block_size: 1,
                clock_domain: None,
                index_exprs: vec![],
            },
        );
        fifo.output_state.insert(0, FifoPortState { init_conditions: vec![], block_size: 2, sub_block_size: 1, clock_domain: None, index_exprs: vec![] });
        let node = Node { common, kind: NodeKind::Fifo(fifo) };
        design.insert_node(node)
    }

    #[test]
    fn merge_combines_ports_and_deletes_source() {
        let mut design = Design::new();
        let top = design.insert_node(Node {
            common: NodeCommon::new(NodeId::new(100), "top", None),
            kind: NodeKind::SubSystem(Default::default()),
        });
        let a = make_fifo(&mut design, top, 6);
        let b = make_fifo(&mut design, top, 10);
        design.attach_child(top, a).unwrap();
        design.attach_child(top, b).unwrap();

        let mut edits = PassEdits::new();
        let merged = merge_fifo_group(&mut design, &[a, b], false, &mut edits).unwrap();
        edits.commit(&mut design);

        assert_eq!(merged, a);
        let NodeKind::Fifo(f) = &design.node(merged).unwrap().kind else { panic!() };
        assert_eq!(f.input_state.len(), 2);
        // target_blocks = min(6/2, 10/2) = 3 blocks of size 2: a's 6 elements
        // were already at that size, b's 10 got reshaped down to 6 by moving
        // its newest 4 elements into a reshape delay.
        let expected: Vec<NumericValue> = (0..6).map(iv).collect();
        assert_eq!(f.input_state[&0].init_conditions, expected);
        assert_eq!(f.input_state[&1].init_conditions, expected);
        assert!(design.node(b).is_none());
    }
}
