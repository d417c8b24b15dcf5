//! Initial-condition reshaping: aligning a FIFO's initial-condition count to
//! a whole number of blocks (or, for merging, down to a target block count)
//! by moving the surplus into an adjacent [`crate::node::primitive::Delay`].

use crate::design::Design;
use crate::error::{IrError, IrResult};
use crate::ids::{NodeId, PortDirection};
use crate::node::fifo::FifoPortState;
use crate::node::primitive::Delay;
use crate::node::{MasterKind, Node, NodeCommon, NodeKind, Primitive};
use crate::PassEdits;

fn missing(id: NodeId) -> IrError {
    IrError::Invariant { node_id: id, node_name: String::new(), message: "node does not exist".to_string() }
}

/// Reshape every port of a FIFO so its initial-condition length becomes a
/// multiple of `blockSize * elementsPerItem`, moving the surplus into a
/// freshly created Delay.
///
/// If the FIFO's input-side source is not a MasterInput, the new Delay is
/// inserted on the *input* side and takes the *tail* of the surplus (nearest
/// the FIFO). If the source is a MasterInput, there is nowhere upstream to
/// insert a delay, so it is placed on the *output* side instead and takes
/// the *head* of the surplus; this requires every output of the FIFO to
/// share a single partition and context, which become the new Delay's.
pub fn reshape_fifo_initial_conditions_for_block_size(
    design: &mut Design,
    fifo_id: NodeId,
    blocking_already_occurred: bool,
    edits: &mut PassEdits,
) -> IrResult<()> {
    let ports: Vec<usize> = match &design.node(fifo_id).ok_or_else(|| missing(fifo_id))?.kind {
        NodeKind::Fifo(f) => f.input_state.keys().copied().collect(),
        _ => return Err(missing(fifo_id)),
    };
    for port in ports {
        let (block_size, sub_block_size, cur_len) = {
            let NodeKind::Fifo(f) = &design.node(fifo_id).unwrap().kind else { unreachable!() };
            let state = &f.input_state[&port];
            (state.block_size, state.sub_block_size.max(1), state.init_conditions.len())
        };
        let elements_per_item = sub_block_size;
        let unit = block_size * elements_per_item;
        if unit == 0 || cur_len % unit == 0 {
            continue;
        }
        let target_blocks = cur_len / unit;
        reshape_fifo_port_to_size_blocks(design, fifo_id, port, target_blocks, blocking_already_occurred, edits)?;
    }
    Ok(())
}

/// Shrink a single FIFO port's initial-condition count down to exactly
/// `target_blocks * block_size * elements_per_item`, moving the surplus into
/// a new adjacent Delay. Used directly by FIFO merging once the minimum
/// block count across a merge group is known.
pub fn reshape_fifo_port_to_size_blocks(
    design: &mut Design,
    fifo_id: NodeId,
    port: usize,
    target_blocks: usize,
    blocking_already_occurred: bool,
    edits: &mut PassEdits,
) -> IrResult<()> {
    let fifo_node = design.node(fifo_id).ok_or_else(|| missing(fifo_id))?;
    let fifo_name = fifo_node.common.name.clone();
    let fifo_parent = fifo_node.common.parent;
    let (block_size, sub_block_size, cur_init) = match &fifo_node.kind {
        NodeKind::Fifo(f) => {
            let state = &f.input_state[&port];
            (state.block_size, state.sub_block_size.max(1), state.init_conditions.clone())
        }
        _ => return Err(missing(fifo_id)),
    };
    let elements_per_item = sub_block_size;
    let unit = block_size * elements_per_item;
    let target_len = target_blocks * unit;
    if cur_init.len() <= target_len {
        return Ok(());
    }
    let surplus = cur_init.len() - target_len;

    let in_port_id = design.node(fifo_id).unwrap().common.input_ports[port];
    let in_arcs = design.port(in_port_id).map(|p| p.arcs.clone()).unwrap_or_default();
    let src_is_master_input = in_arcs
        .first()
        .and_then(|a| design.arc(*a))
        .map(|a| design.port(a.src_port).unwrap().owner)
        .and_then(|n| design.node(n))
        .map(|n| matches!(&n.kind, NodeKind::Master(m) if m.kind == MasterKind::MasterInput))
        .unwrap_or(false);

    let new_delay_id;
    if !src_is_master_input {
        // input side: take the tail `surplus` elements (nearest the FIFO).
        let split_at = cur_init.len() - surplus;
        let (remaining, moved) = cur_init.split_at(split_at);

        let delay_id = design.next_node_id();
        new_delay_id = delay_id;
        let mut common = NodeCommon::new(delay_id, format!("{fifo_name}_reshape_in"), fifo_parent);
        let d_in = design.add_port(delay_id, PortDirection::Input(0));
        let d_out = design.add_port(delay_id, PortDirection::Output(0));
        common.input_ports.push(d_in);
        common.output_ports.push(d_out);
        common.base_sub_blocking_length = block_size.max(1);
        let mut delay = Delay::new(moved.len(), moved.to_vec());
        delay.deferred_block_size = block_size;
        delay.deferred_sub_block_size = 1;
        delay.blocking_specialization_deferred = blocking_already_occurred;
        design.insert_node(Node { common, kind: NodeKind::Primitive(Primitive::Delay(delay)) });
        if let Some(p) = fifo_parent {
            design.attach_child(p, delay_id)?;
        }

        let bridging_type = in_arcs
            .first()
            .and_then(|a| design.arc(*a))
            .map(|a| a.data_type.clone())
            .unwrap_or_else(|| crate::datatype::DataType::scalar_float(64));
        if let Some(arc_id) = in_arcs.first().copied() {
            design.set_arc_dst_port(arc_id, d_in)?;
        }
        let oc_in = design.node(fifo_id).unwrap().common.order_constraint_input;
        if let Some(oc) = oc_in {
            let common_oc_in = design.add_port(delay_id, PortDirection::OrderConstraintInput);
            design.node_mut(delay_id).unwrap().common.order_constraint_input = Some(common_oc_in);
            let oc_arcs = design.port(oc).map(|p| p.arcs.clone()).unwrap_or_default();
            for a in &oc_arcs {
                design.set_arc_dst_port(*a, common_oc_in)?;
            }
        }
        design.connect(d_out, in_port_id, bridging_type, 1.0)?;

        set_fifo_init(design, fifo_id, port, remaining.to_vec());
    } else {
        // output side: take the head `surplus` elements.
        let (moved, remaining) = cur_init.split_at(surplus);

        let out_port_id = design.node(fifo_id).unwrap().common.output_ports[port];
        let out_arcs = design.port(out_port_id).map(|p| p.arcs.clone()).unwrap_or_default();

        let delay_id = design.next_node_id();
        new_delay_id = delay_id;
        let mut common = NodeCommon::new(delay_id, format!("{fifo_name}_reshape_out"), fifo_parent);
        let d_in = design.add_port(delay_id, PortDirection::Input(0));
        let d_out = design.add_port(delay_id, PortDirection::Output(0));
        common.input_ports.push(d_in);
        common.output_ports.push(d_out);
        common.base_sub_blocking_length = block_size.max(1);
        let mut delay = Delay::new(moved.len(), moved.to_vec());
        delay.deferred_block_size = block_size;
        delay.deferred_sub_block_size = 1;
        delay.blocking_specialization_deferred = blocking_already_occurred;
        design.insert_node(Node { common, kind: NodeKind::Primitive(Primitive::Delay(delay)) });
        if let Some(p) = fifo_parent {
            design.attach_child(p, delay_id)?;
        }

        let bridging_type = out_arcs
            .first()
            .and_then(|a| design.arc(*a))
            .map(|a| a.data_type.clone())
            .unwrap_or_else(|| crate::datatype::DataType::scalar_float(64));
        for a in &out_arcs {
            design.set_arc_src_port(*a, d_out)?;
        }
        design.connect(out_port_id, d_in, bridging_type, 1.0)?;

        set_fifo_init(design, fifo_id, port, remaining.to_vec());
    }
    edits.new_nodes.push(new_delay_id);
    Ok(())
}

fn set_fifo_init(design: &mut Design, fifo_id: NodeId, port: usize, values: Vec<crate::numeric::NumericValue>) {
    if let NodeKind::Fifo(f) = &mut design.node_mut(fifo_id).unwrap().kind {
        if let Some(state) = f.input_state.get_mut(&port) {
            state.init_conditions = values;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::ids::PortDirection;
    use crate::node::fifo::ThreadCrossingFifo;
    use crate::numeric::NumericValue;

    fn iv(v: i64) -> NumericValue {
        NumericValue::Integer { value: v, signed: false }
    }

    fn make_plain_source(design: &mut Design, parent: NodeId) -> NodeId {
        let id = design.next_node_id();
        let mut common = NodeCommon::new(id, "src", Some(parent));
        common.output_ports.push(design.add_port(id, PortDirection::Output(0)));
        design.insert_node(Node { common, kind: NodeKind::SubSystem(Default::default()) })
    }

    fn make_fifo(design: &mut Design, parent: NodeId, block_size: usize, init_len: usize) -> NodeId {
        let id = design.next_node_id();
        let mut common = NodeCommon::new(id, "fifo", Some(parent));
        common.input_ports.push(design.add_port(id, PortDirection::Input(0)));
        common.output_ports.push(design.add_port(id, PortDirection::Output(0)));
        let mut fifo = ThreadCrossingFifo::new(4);
        fifo.input_state.insert(
            0,
            FifoPortState {
                init_conditions: (0..init_len as i64).map(iv).collect(),
                block_size,
                sub_block_size: 1,
                clock_domain: None,
                index_exprs: vec![],
            },
        );
        fifo.output_state.insert(0, FifoPortState { init_conditions: vec![], block_size, sub_block_size: 1, clock_domain: None, index_exprs: vec![] });
        design.insert_node(Node { common, kind: NodeKind::Fifo(fifo) })
    }

    #[test]
    fn reshape_moves_surplus_into_new_input_side_delay() {
        let mut design = Design::new();
        let top = design.insert_node(Node {
            common: NodeCommon::new(NodeId::new(100), "top", None),
            kind: NodeKind::SubSystem(Default::default()),
        });
        let src = make_plain_source(&mut design, top);
        let fifo = make_fifo(&mut design, top, 4, 6);
        design.attach_child(top, src).unwrap();
        design.attach_child(top, fifo).unwrap();
        let src_out = design.node(src).unwrap().common.output_ports[0];
        let fifo_in = design.node(fifo).unwrap().common.input_ports[0];
        design.connect(src_out, fifo_in, DataType::scalar_float(64), 1.0).unwrap();

        let mut edits = PassEdits::new();
        reshape_fifo_initial_conditions_for_block_size(&mut design, fifo, false, &mut edits).unwrap();

        let NodeKind::Fifo(f) = &design.node(fifo).unwrap().kind else { panic!() };
        assert_eq!(f.input_state[&0].init_conditions.len(), 4);
    }
}
