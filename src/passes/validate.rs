//! Per-node structural and type validation.

use crate::design::Design;
use crate::error::{IrError, IrResult};
use crate::ids::NodeId;
use crate::node::{NodeKind, Primitive};

/// Validate every node reachable from the design's top level, in ascending
/// id order. Stops at the first failure, mirroring the original compiler's
/// fail-fast validation pass.
pub fn validate_design(design: &Design) -> IrResult<()> {
    let mut ids: Vec<NodeId> = design.iter_nodes().map(|n| n.id()).collect();
    ids.sort_by_key(|id| id.index());
    for id in ids {
        validate_node(design, id)?;
    }
    Ok(())
}

/// Validate a single node's structural and type preconditions.
pub fn validate_node(design: &Design, node_id: NodeId) -> IrResult<()> {
    let node = design.node(node_id).ok_or_else(|| IrError::Invariant {
        node_id,
        node_name: String::new(),
        message: "node does not exist".to_string(),
    })?;
    match &node.kind {
        NodeKind::EnabledSubSystem(sub) => validate_enabled_subsystem(design, node_id, &node.common.name, sub),
        NodeKind::Primitive(Primitive::InnerProduct(_)) => validate_inner_product(design, node_id),
        NodeKind::Fifo(fifo) => validate_fifo(design, node_id, &node.common.name, fifo),
        _ => Ok(()),
    }
}

/// All of an [`crate::node::EnabledSubSystem`]'s enable-input and
/// enable-output children must share exactly one enable-condition source
/// port, mirroring `EnabledSubSystem::validate` and `getEnableSrc`.
pub fn validate_enabled_subsystem(
    design: &Design,
    node_id: NodeId,
    node_name: &str,
    sub: &crate::node::EnabledSubSystem,
) -> IrResult<()> {
    let mut shared_src = None;
    for child_id in sub.enable_inputs.iter().chain(sub.enable_outputs.iter()) {
        let child = design.node(*child_id).ok_or_else(|| IrError::Structural {
            node_id,
            node_name: node_name.to_string(),
            message: format!("enable child {child_id:?} does not exist"),
        })?;
        let enable_port = child.common.enable_port.ok_or_else(|| IrError::Structural {
            node_id: *child_id,
            node_name: child.common.name.clone(),
            message: "enable child has no enable port".to_string(),
        })?;
        let port = design.port(enable_port).ok_or_else(|| IrError::Structural {
            node_id: *child_id,
            node_name: child.common.name.clone(),
            message: "enable port does not exist".to_string(),
        })?;
        if port.arcs.len() != 1 {
            return Err(IrError::Structural {
                node_id: *child_id,
                node_name: child.common.name.clone(),
                message: format!("enable port must have exactly one arc, found {}", port.arcs.len()),
            });
        }
        let arc = design.arc(port.arcs[0]).unwrap();
        match shared_src {
            None => shared_src = Some(arc.src_port),
            Some(prev) if prev == arc.src_port => {}
            Some(_) => {
                return Err(IrError::Structural {
                    node_id,
                    node_name: node_name.to_string(),
                    message: "enable inputs/outputs do not share a single enable source".to_string(),
                })
            }
        }
    }
    Ok(())
}

fn validate_inner_product(design: &Design, node_id: NodeId) -> IrResult<()> {
    let node = design.node(node_id).unwrap();
    if node.common.input_ports.len() != 2 {
        return Err(IrError::Structural {
            node_id,
            node_name: node.common.name.clone(),
            message: format!("InnerProduct requires exactly 2 inputs, found {}", node.common.input_ports.len()),
        });
    }
    Ok(())
}

/// FIFO invariant 4: every port's initial-condition length is a multiple of
/// that port's element granularity.
fn validate_fifo(
    design: &Design,
    node_id: NodeId,
    node_name: &str,
    fifo: &crate::node::ThreadCrossingFifo,
) -> IrResult<()> {
    let _ = design;
    for (idx, port) in fifo.input_state.iter().chain(fifo.output_state.iter()) {
        if port.sub_block_size != 0 && port.init_conditions.len() % port.sub_block_size.max(1) != 0 {
            return Err(IrError::Invariant {
                node_id,
                node_name: node_name.to_string(),
                message: format!(
                    "FIFO port {idx} initial-condition length {} is not a multiple of its element granularity",
                    port.init_conditions.len()
                ),
            });
        }
    }
    Ok(())
}
