//! Delay absorption: folding adjacent [`crate::node::primitive::Delay`] nodes
//! into a FIFO's own initial conditions.

use crate::context::contexts_equal;
use crate::design::Design;
use crate::error::{IrError, IrResult};
use crate::ids::NodeId;
use crate::node::fifo::{FifoPortState, ThreadCrossingFifo};
use crate::node::{NodeKind, Primitive};
use crate::passes::AbsorptionStatus;
use crate::PassEdits;

/// Run input-side then output-side absorption on a single FIFO, repeating
/// until neither makes further progress. Skips the FIFO entirely (and logs
/// at `debug` level) if its context stack contains a root that does not
/// allow absorption.
pub fn absorb_adjacent_delays_into_fifo(
    design: &mut Design,
    fifo_id: NodeId,
    edits: &mut PassEdits,
) -> IrResult<()> {
    let context = design
        .node(fifo_id)
        .ok_or_else(|| missing(fifo_id))?
        .common
        .context
        .clone();
    if !context.iter().all(|c| c.root_kind.allows_fifo_absorption()) {
        log::debug!("skipping absorption for fifo {fifo_id:?}: context does not allow it");
        return Ok(());
    }
    loop {
        let in_status = absorb_adjacent_input_delay(design, fifo_id, edits)?;
        if in_status == AbsorptionStatus::PartialAbsorptionFullFifo {
            break;
        }
        let out_status = absorb_adjacent_output_delay(design, fifo_id, edits)?;
        if out_status == AbsorptionStatus::PartialAbsorptionFullFifo {
            break;
        }
        if in_status == AbsorptionStatus::NoAbsorption && out_status == AbsorptionStatus::NoAbsorption {
            break;
        }
    }
    Ok(())
}

fn missing(id: NodeId) -> IrError {
    IrError::Invariant { node_id: id, node_name: String::new(), message: "node does not exist".to_string() }
}

fn as_fifo<'a>(design: &'a Design, fifo_id: NodeId) -> IrResult<(&'a ThreadCrossingFifo, String)> {
    let node = design.node(fifo_id).ok_or_else(|| missing(fifo_id))?;
    match &node.kind {
        NodeKind::Fifo(f) => Ok((f, node.common.name.clone())),
        _ => Err(IrError::Precondition {
            node_id: fifo_id,
            node_name: node.common.name.clone(),
            message: "expected a ThreadCrossingFIFO".to_string(),
        }),
    }
}

/// Absorb the single upstream [`crate::node::primitive::Delay`] feeding this
/// FIFO's only input port, if every precondition holds: single in/out port,
/// exactly one input arc, no order-constraint input, plain (non-tapped)
/// Delay source in the same partition and context with no state-update node
/// yet and exactly one output arc.
pub fn absorb_adjacent_input_delay(
    design: &mut Design,
    fifo_id: NodeId,
    edits: &mut PassEdits,
) -> IrResult<AbsorptionStatus> {
    let (fifo, _fifo_name) = as_fifo(design, fifo_id)?;
    if fifo.input_state.len() != 1 || fifo.output_state.len() != 1 {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    let fifo_node = design.node(fifo_id).unwrap();
    if fifo_node.common.order_constraint_input.is_some() {
        let has_oc_arc = fifo_node
            .common
            .order_constraint_input
            .and_then(|p| design.port(p))
            .map(|p| !p.arcs.is_empty())
            .unwrap_or(false);
        if has_oc_arc {
            return Ok(AbsorptionStatus::NoAbsorption);
        }
    }
    let in_port = fifo_node.common.input_ports[0];
    let in_arcs = design.port(in_port).map(|p| p.arcs.clone()).unwrap_or_default();
    if in_arcs.len() != 1 {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    let arc = design.arc(in_arcs[0]).unwrap();
    let src_port = arc.src_port;
    let src_node_id = design.port(src_port).unwrap().owner;
    let src_node = design.node(src_node_id).unwrap();

    let delay = match &src_node.kind {
        NodeKind::Primitive(Primitive::Delay(d)) => d.clone(),
        _ => return Ok(AbsorptionStatus::NoAbsorption),
    };
    if delay.has_state_update_node {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    if src_node.common.partition != fifo_node.common.partition {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    if !contexts_equal(&src_node.common.context, &fifo_node.common.context) {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    let src_out_port = src_node.common.output_ports[0];
    let src_out_arcs = design.port(src_out_port).map(|p| p.arcs.clone()).unwrap_or_default();
    if src_out_arcs.len() != 1 {
        return Ok(AbsorptionStatus::NoAbsorption);
    }

    let port_state = fifo_in_state(design, fifo_id, 0)?;
    let elements_per_item =
        ThreadCrossingFifo::elements_per_item(port_state.sub_block_size, arc.data_type.num_elements());
    let room = as_fifo(design, fifo_id)?.0.room_in_fifo(port_state, elements_per_item);
    if room <= 0 {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    if delay.delay_value != 0 && port_state.sub_block_size > 1 && !delay.blocking_specialization_deferred {
        return Err(IrError::Precondition {
            node_id: src_node_id,
            node_name: src_node.common.name.clone(),
            message: "cannot absorb a nonzero, non-deferred delay into a sub-blocked FIFO".to_string(),
        });
    }

    let delay_capacity = (delay.delay_value * elements_per_item) as i64;
    if delay_capacity <= room {
        // full absorption: append the delay's init conditions after the
        // FIFO's existing ones, rewire delay's inputs directly to the FIFO,
        // delete the delay.
        let mut new_init = fifo_in_state_mut(design, fifo_id, 0)?.init_conditions.clone();
        new_init.extend(delay.init_condition.clone());
        fifo_in_state_mut(design, fifo_id, 0)?.init_conditions = new_init;

        let delay_in_port = src_node.common.input_ports[0];
        let delay_in_arcs = design.port(delay_in_port).map(|p| p.arcs.clone()).unwrap_or_default();
        for a in &delay_in_arcs {
            design.set_arc_dst_port(*a, in_port)?;
        }
        let delay_oc_in = src_node.common.order_constraint_input;
        if let Some(oc_port) = delay_oc_in {
            let fifo_oc_in = design.node(fifo_id).unwrap().common.order_constraint_input;
            if let Some(fifo_oc) = fifo_oc_in {
                let oc_arcs = design.port(oc_port).map(|p| p.arcs.clone()).unwrap_or_default();
                for a in &oc_arcs {
                    design.set_arc_dst_port(*a, fifo_oc)?;
                }
            }
        }
        design.disconnect(in_arcs[0]);
        design.detach_child(src_node.common.parent.unwrap_or(fifo_node.common.parent.unwrap_or(src_node_id)), src_node_id).ok();
        edits.deleted_nodes.push(src_node_id);
        Ok(AbsorptionStatus::FullAbsorption)
    } else {
        // partial absorption: absorb `room` rounded down to a multiple of
        // elements_per_item worth of the delay's *oldest* history (the head,
        // farthest from the FIFO), shrinking the delay by that many samples
        // and keeping its tail.
        let absorb_elems = ((room as usize / elements_per_item) * elements_per_item).min(delay.init_condition.len());
        if absorb_elems == 0 {
            return Ok(AbsorptionStatus::NoAbsorption);
        }
        let absorb_samples = absorb_elems / elements_per_item;
        let (absorb, keep) = delay.init_condition.split_at(absorb_elems);
        let mut new_init = fifo_in_state_mut(design, fifo_id, 0)?.init_conditions.clone();
        new_init.extend(absorb.to_vec());
        fifo_in_state_mut(design, fifo_id, 0)?.init_conditions = new_init;

        if let NodeKind::Primitive(Primitive::Delay(d)) = &mut design.node_mut(src_node_id).unwrap().kind {
            d.init_condition = keep.to_vec();
            d.delay_value -= absorb_samples;
        }
        Ok(AbsorptionStatus::PartialAbsorptionFullFifo)
    }
}

/// Absorb the longest common initial-condition postfix shared by every
/// downstream [`crate::node::primitive::Delay`] directly fed by this FIFO's
/// only output port.
pub fn absorb_adjacent_output_delay(
    design: &mut Design,
    fifo_id: NodeId,
    _edits: &mut PassEdits,
) -> IrResult<AbsorptionStatus> {
    let (fifo, _name) = as_fifo(design, fifo_id)?;
    if fifo.input_state.len() != 1 || fifo.output_state.len() != 1 {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    let fifo_node = design.node(fifo_id).unwrap();
    let oc_out_has_arc = fifo_node
        .common
        .order_constraint_output
        .and_then(|p| design.port(p))
        .map(|p| !p.arcs.is_empty())
        .unwrap_or(false);
    if oc_out_has_arc {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    let out_port = fifo_node.common.output_ports[0];
    let out_arcs = design.port(out_port).map(|p| p.arcs.clone()).unwrap_or_default();
    if out_arcs.is_empty() {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    let mut downstream_delays = Vec::new();
    for a in &out_arcs {
        let arc = design.arc(*a).unwrap();
        let dst_node_id = design.port(arc.dst_port).unwrap().owner;
        let dst_node = design.node(dst_node_id).unwrap();
        match &dst_node.kind {
            NodeKind::Primitive(Primitive::Delay(d))
                if dst_node.common.partition == fifo_node.common.partition
                    && contexts_equal(&dst_node.common.context, &fifo_node.common.context) =>
            {
                downstream_delays.push((dst_node_id, d.clone()));
            }
            _ => return Ok(AbsorptionStatus::NoAbsorption),
        }
    }

    let postfix_len = longest_common_postfix_len(&downstream_delays);
    if postfix_len == 0 {
        return Ok(AbsorptionStatus::NoAbsorption);
    }
    let port_state = fifo_out_state(design, fifo_id, 0)?;
    let elements_per_item =
        ThreadCrossingFifo::elements_per_item(port_state.sub_block_size, postfix_len.max(1));
    let room = as_fifo(design, fifo_id)?.0.room_in_fifo(port_state, elements_per_item.max(1));
    let to_absorb = (room.max(0) as usize).min(postfix_len);
    let to_absorb = (to_absorb / elements_per_item.max(1)) * elements_per_item.max(1);
    if to_absorb == 0 {
        return Ok(AbsorptionStatus::NoAbsorption);
    }

    let postfix: Vec<_> = downstream_delays[0].1.init_condition[downstream_delays[0].1.init_condition.len() - to_absorb..]
        .to_vec();
    let mut new_init = postfix;
    let existing = fifo_out_state(design, fifo_id, 0)?.init_conditions.clone();
    new_init.extend(existing);
    fifo_out_state_mut(design, fifo_id, 0)?.init_conditions = new_init;

    let mut fully_absorbed_all = true;
    for (delay_id, delay) in &downstream_delays {
        let keep_len = delay.init_condition.len() - to_absorb;
        if let NodeKind::Primitive(Primitive::Delay(d)) = &mut design.node_mut(*delay_id).unwrap().kind {
            d.init_condition.truncate(keep_len);
            d.delay_value -= to_absorb;
        }
        if keep_len == 0 {
            let out_p = design.node(*delay_id).unwrap().common.output_ports[0];
            let downstream_arcs = design.port(out_p).map(|p| p.arcs.clone()).unwrap_or_default();
            for a in &downstream_arcs {
                design.set_arc_src_port(*a, out_port)?;
            }
        } else {
            fully_absorbed_all = false;
        }
    }

    if room < postfix_len as i64 {
        Ok(AbsorptionStatus::PartialAbsorptionFullFifo)
    } else if fully_absorbed_all {
        Ok(AbsorptionStatus::FullAbsorption)
    } else {
        Ok(AbsorptionStatus::PartialAbsorptionMergeInitCond)
    }
}

fn longest_common_postfix_len(delays: &[(NodeId, crate::node::primitive::Delay)]) -> usize {
    if delays.is_empty() {
        return 0;
    }
    let mut len = delays[0].1.init_condition.len();
    for (_, d) in &delays[1..] {
        len = len.min(d.init_condition.len());
    }
    while len > 0 {
        let mut all_match = true;
        let reference = &delays[0].1.init_condition[delays[0].1.init_condition.len() - len..];
        for (_, d) in &delays[1..] {
            let candidate = &d.init_condition[d.init_condition.len() - len..];
            if candidate != reference {
                all_match = false;
                break;
            }
        }
        if all_match {
            return len;
        }
        len -= 1;
    }
    0
}

fn fifo_in_state<'a>(design: &'a Design, fifo_id: NodeId, port: usize) -> IrResult<&'a FifoPortState> {
    match &design.node(fifo_id).ok_or_else(|| missing(fifo_id))?.kind {
        NodeKind::Fifo(f) => f.input_state.get(&port).ok_or_else(|| missing(fifo_id)),
        _ => Err(missing(fifo_id)),
    }
}

fn fifo_in_state_mut<'a>(design: &'a mut Design, fifo_id: NodeId, port: usize) -> IrResult<&'a mut FifoPortState> {
    match &mut design.node_mut(fifo_id).ok_or_else(|| missing(fifo_id))?.kind {
        NodeKind::Fifo(f) => f.input_state.get_mut(&port).ok_or_else(|| missing(fifo_id)),
        _ => Err(missing(fifo_id)),
    }
}

fn fifo_out_state<'a>(design: &'a Design, fifo_id: NodeId, port: usize) -> IrResult<&'a FifoPortState> {
    match &design.node(fifo_id).ok_or_else(|| missing(fifo_id))?.kind {
        NodeKind::Fifo(f) => f.output_state.get(&port).ok_or_else(|| missing(fifo_id)),
        _ => Err(missing(fifo_id)),
    }
}

fn fifo_out_state_mut<'a>(design: &'a mut Design, fifo_id: NodeId, port: usize) -> IrResult<&'a mut FifoPortState> {
    match &mut design.node_mut(fifo_id).ok_or_else(|| missing(fifo_id))?.kind {
        NodeKind::Fifo(f) => f.output_state.get_mut(&port).ok_or_else(|| missing(fifo_id)),
        _ => Err(missing(fifo_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::design::Design;
    use crate::ids::PortDirection;
    use crate::node::{Node, NodeCommon};
    use crate::numeric::NumericValue;

    fn iv(v: i64) -> NumericValue {
        NumericValue::Integer { value: v, signed: v < 0 }
    }

    fn make_delay(design: &mut Design, parent: Option<NodeId>, delay_value: usize, init: Vec<i64>) -> NodeId {
        let id = design.next_node_id();
        let mut common = NodeCommon::new(id, "delay", parent);
        common.input_ports.push(design.add_port(id, PortDirection::Input(0)));
        common.output_ports.push(design.add_port(id, PortDirection::Output(0)));
        let node = Node {
            common,
            kind: NodeKind::Primitive(Primitive::Delay(crate::node::primitive::Delay::new(
                delay_value,
                init.into_iter().map(iv).collect(),
            ))),
        };
        design.insert_node(node)
    }

    fn make_fifo(design: &mut Design, parent: Option<NodeId>, fifo_length: usize, block_size: usize, init: Vec<i64>) -> NodeId {
        let id = design.next_node_id();
        let mut common = NodeCommon::new(id, "fifo", parent);
        common.input_ports.push(design.add_port(id, PortDirection::Input(0)));
        common.output_ports.push(design.add_port(id, PortDirection::Output(0)));
        let mut fifo = ThreadCrossingFifo::new(fifo_length);
        fifo.input_state.insert(
            0,
            FifoPortState { init_conditions: init.into_iter().map(iv).collect(), block_size, sub_block_size: 1, clock_domain: None, index_exprs: vec![] },
        );
        fifo.output_state.insert(0, FifoPortState { init_conditions: vec![], block_size, sub_block_size: 1, clock_domain: None, index_exprs: vec![] });
        let node = Node { common, kind: NodeKind::Fifo(fifo) };
        design.insert_node(node)
    }

    #[test]
    fn full_absorption_when_room_covers_whole_delay() {
        let mut design = Design::new();
        let top = design.insert_node(Node {
            common: NodeCommon::new(NodeId::new(100), "top", None),
            kind: NodeKind::SubSystem(Default::default()),
        });
        let delay = make_delay(&mut design, Some(top), 3, vec![1, 2, 3]);
        let fifo = make_fifo(&mut design, Some(top), 2, 4, vec![]);
        design.attach_child(top, delay).unwrap();
        design.attach_child(top, fifo).unwrap();

        let delay_out = design.node(delay).unwrap().common.output_ports[0];
        let fifo_in = design.node(fifo).unwrap().common.input_ports[0];
        design.connect(delay_out, fifo_in, DataType::scalar_float(64), 1.0).unwrap();

        let mut edits = PassEdits::new();
        let status = absorb_adjacent_input_delay(&mut design, fifo, &mut edits).unwrap();
        assert_eq!(status, AbsorptionStatus::FullAbsorption);
        edits.commit(&mut design);
        assert!(design.node(delay).is_none());
        let NodeKind::Fifo(f) = &design.node(fifo).unwrap().kind else { panic!() };
        assert_eq!(f.input_state[&0].init_conditions, vec![iv(1), iv(2), iv(3)]);
    }

    #[test]
    fn partial_absorption_when_room_is_limited() {
        let mut design = Design::new();
        let top = design.insert_node(Node {
            common: NodeCommon::new(NodeId::new(100), "top", None),
            kind: NodeKind::SubSystem(Default::default()),
        });
        let delay = make_delay(&mut design, Some(top), 3, vec![1, 2, 3]);
        let fifo = make_fifo(&mut design, Some(top), 2, 4, vec![9, 9]);
        design.attach_child(top, delay).unwrap();
        design.attach_child(top, fifo).unwrap();

        let delay_out = design.node(delay).unwrap().common.output_ports[0];
        let fifo_in = design.node(fifo).unwrap().common.input_ports[0];
        design.connect(delay_out, fifo_in, DataType::scalar_float(64), 1.0).unwrap();

        let mut edits = PassEdits::new();
        let status = absorb_adjacent_input_delay(&mut design, fifo, &mut edits).unwrap();
        assert_eq!(status, AbsorptionStatus::PartialAbsorptionFullFifo);
        let NodeKind::Fifo(f) = &design.node(fifo).unwrap().kind else { panic!() };
        assert_eq!(f.input_state[&0].init_conditions, vec![iv(9), iv(9), iv(1), iv(2)]);
        let NodeKind::Primitive(Primitive::Delay(d)) = &design.node(delay).unwrap().kind else { panic!() };
        assert_eq!(d.delay_value, 1);
        assert_eq!(d.init_condition, vec![iv(3)]);
    }

    #[test]
    fn tapped_delay_is_never_absorbed() {
        let mut design = Design::new();
        let top = design.insert_node(Node {
            common: NodeCommon::new(NodeId::new(100), "top", None),
            kind: NodeKind::SubSystem(Default::default()),
        });
        let tap_id = design.next_node_id();
        let mut common = NodeCommon::new(tap_id, "tap", Some(top));
        common.input_ports.push(design.add_port(tap_id, PortDirection::Input(0)));
        common.output_ports.push(design.add_port(tap_id, PortDirection::Output(0)));
        design.insert_node(Node {
            common,
            kind: NodeKind::Primitive(Primitive::TappedDelay(crate::node::primitive::TappedDelay {
                delay_value: 2,
                init_condition: vec![],
                allocate_extra_space: true,
                earliest_first: true,
            })),
        });
        let fifo = make_fifo(&mut design, Some(top), 4, 4, vec![]);
        design.attach_child(top, tap_id).unwrap();
        design.attach_child(top, fifo).unwrap();
        let tap_out = design.node(tap_id).unwrap().common.output_ports[0];
        let fifo_in = design.node(fifo).unwrap().common.input_ports[0];
        design
            .connect(tap_out, fifo_in, DataType::scalar_float(64).with_dimensions(smallvec::SmallVec::from_slice(&[2])), 1.0)
            .unwrap();

        let mut edits = PassEdits::new();
        let status = absorb_adjacent_input_delay(&mut design, fifo, &mut edits).unwrap();
        assert_eq!(status, AbsorptionStatus::NoAbsorption);
    }
}
