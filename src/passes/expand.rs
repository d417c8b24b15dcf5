//! The expansion engine: rewrites high-level nodes into primitive subgraphs,
//! wrapped in an [`crate::node::ExpandedNode`].

use crate::datatype::DataType;
use crate::design::Design;
use crate::error::{IrError, IrResult};
use crate::ids::{ArcId, NodeId, PortDirection, PortId};
use crate::node::highlevel::CoefSource;
use crate::node::primitive::{ComplexConjBehavior, Constant, Gain, InnerProduct, Product, TappedDelay};
use crate::node::{DiscreteFir, ExpandedNode, Node, NodeCommon, NodeKind, Primitive};
use crate::numeric::NumericValue;
use crate::PassEdits;
use smallvec::SmallVec;

fn new_node(
    design: &mut Design,
    name: impl Into<String>,
    parent: NodeId,
    kind: NodeKind,
    n_inputs: usize,
    n_outputs: usize,
) -> (NodeId, Vec<PortId>, Vec<PortId>) {
    let id = design.next_node_id();
    let mut common = NodeCommon::new(id, name, Some(parent));
    let inputs: Vec<PortId> = (0..n_inputs).map(|i| design.add_port(id, PortDirection::Input(i))).collect();
    let outputs: Vec<PortId> = (0..n_outputs).map(|i| design.add_port(id, PortDirection::Output(i))).collect();
    common.input_ports = SmallVec::from_vec(inputs.clone());
    common.output_ports = SmallVec::from_vec(outputs.clone());
    design.insert_node(Node { common, kind });
    (id, inputs, outputs)
}

fn port_data_type(design: &Design, port: PortId) -> Option<DataType> {
    let p = design.port(port)?;
    for arc_id in &p.arcs {
        if let Some(arc) = design.arc(*arc_id) {
            return Some(arc.data_type.clone());
        }
    }
    None
}

/// Retarget every arc currently ending at `from` so it ends at `to` instead.
fn retarget_arcs_to(design: &mut Design, arcs: &[ArcId], to: PortId) -> IrResult<()> {
    for arc in arcs {
        design.set_arc_dst_port(*arc, to)?;
    }
    Ok(())
}

/// Retarget every arc currently starting at `from` so it starts at `to` instead.
fn retarget_arcs_from(design: &mut Design, arcs: &[ArcId], to: PortId) -> IrResult<()> {
    for arc in arcs {
        design.set_arc_src_port(*arc, to)?;
    }
    Ok(())
}

/// Expand a [`DiscreteFir`] node into its primitive subgraph.
///
/// - `N == 1`, fixed coefficient: a single [`Gain`].
/// - `N == 1`, port-sourced coefficient: a [`Product`] with the coefficient
///   input swapped to be first.
/// - `N > 1`: a [`TappedDelay`] of length `N - 1` feeding an [`InnerProduct`],
///   with the coefficient vector supplied either by a synthesised [`Constant`]
///   (fixed coefficients, using the smallest representable type for them) or
///   by rewiring the existing coefficient arc directly (port-sourced).
pub fn expand_discrete_fir(design: &mut Design, node_id: NodeId, edits: &mut PassEdits) -> IrResult<NodeId> {
    let node = design.node(node_id).ok_or_else(|| IrError::Structural {
        node_id,
        node_name: String::new(),
        message: "node does not exist".to_string(),
    })?;
    let NodeKind::DiscreteFir(fir) = node.kind.clone() else {
        return Err(IrError::Precondition {
            node_id,
            node_name: node.common.name.clone(),
            message: "expand_discrete_fir called on a non-DiscreteFIR node".to_string(),
        });
    };
    let name = node.common.name.clone();
    let parent = node.common.parent.ok_or_else(|| IrError::Structural {
        node_id,
        node_name: name.clone(),
        message: "DiscreteFIR has no parent to expand under".to_string(),
    })?;

    validate_discrete_fir(design, node_id, &name, &fir)?;

    let sig_input = node.common.input_ports[0];
    let coef_input = node.common.input_ports.get(1).copied();
    let output_port = node.common.output_ports[0];
    let sig_in_type = port_data_type(design, sig_input).unwrap_or_else(|| DataType::scalar_float(64));
    let out_type = port_data_type(design, output_port).unwrap_or_else(|| DataType::scalar_float(64));
    let in_arcs = design.input_arcs(node_id);
    let out_arcs = design.output_arcs(node_id);
    let sample_time = in_arcs
        .first()
        .and_then(|a| design.arc(*a))
        .map(|a| a.sample_time)
        .unwrap_or(1.0);

    let num_taps = match &fir.coef_source {
        CoefSource::Fixed(coefs) => coefs.len(),
        CoefSource::InputPort => coef_input
            .and_then(|p| port_data_type(design, p))
            .map(|dt| dt.first_dimension())
            .unwrap_or(1),
    };

    // Step 2-3: create the wrapper, detach the original from its parent.
    let wrapper_id = design.next_node_id();
    let wrapper_common = NodeCommon::new(wrapper_id, format!("{name}_expanded"), Some(parent));
    design.insert_node(Node {
        common: wrapper_common,
        kind: NodeKind::ExpandedNode(ExpandedNode { children: Vec::new(), original_node: node_id }),
    });
    design.detach_child(parent, node_id)?;
    design.attach_child(parent, wrapper_id)?;
    edits.deleted_nodes.push(node_id);

    let new_output_port;
    if num_taps == 1 {
        match &fir.coef_source {
            CoefSource::Fixed(coefs) => {
                let (gain_id, gain_in, gain_out) = new_node(
                    design,
                    format!("{name}_gain"),
                    wrapper_id,
                    NodeKind::Primitive(Primitive::Gain(Gain { gain: coefs.clone() })),
                    1,
                    1,
                );
                retarget_arcs_to(design, &in_arcs, gain_in[0])?;
                new_output_port = gain_out[0];
                attach_expanded_child(design, wrapper_id, gain_id)?;
            }
            CoefSource::InputPort => {
                let (prod_id, prod_in, prod_out) = new_node(
                    design,
                    format!("{name}_product"),
                    wrapper_id,
                    NodeKind::Primitive(Primitive::Product(Product { input_exponents: vec![1, 1] })),
                    2,
                    1,
                );
                // inputs swapped: coefficient first, signal second.
                let coef_arcs: Vec<ArcId> = coef_input
                    .map(|p| design.port(p).map(|port| port.arcs.to_vec()).unwrap_or_default())
                    .unwrap_or_default();
                retarget_arcs_to(design, &coef_arcs, prod_in[0])?;
                let sig_arcs: Vec<ArcId> = design.port(sig_input).map(|p| p.arcs.to_vec()).unwrap_or_default();
                retarget_arcs_to(design, &sig_arcs, prod_in[1])?;
                new_output_port = prod_out[0];
                attach_expanded_child(design, wrapper_id, prod_id)?;
            }
        }
    } else {
        let (tap_id, tap_in, tap_out) = new_node(
            design,
            format!("{name}_tapped_delay"),
            wrapper_id,
            NodeKind::Primitive(Primitive::TappedDelay(TappedDelay {
                delay_value: num_taps - 1,
                init_condition: fir.init_vals.clone(),
                allocate_extra_space: true,
                earliest_first: true,
            })),
            1,
            1,
        );
        retarget_arcs_to(design, &in_arcs, tap_in[0])?;
        attach_expanded_child(design, wrapper_id, tap_id)?;

        let (ip_id, ip_in, ip_out) = new_node(
            design,
            format!("{name}_inner_product"),
            wrapper_id,
            NodeKind::Primitive(Primitive::InnerProduct(InnerProduct {
                complex_conj_behavior: ComplexConjBehavior::None,
            })),
            2,
            1,
        );
        attach_expanded_child(design, wrapper_id, ip_id)?;

        let tap_vec_type = sig_in_type.clone().with_dimensions(SmallVec::from_slice(&[num_taps]));
        design.connect(tap_out[0], ip_in[1], tap_vec_type, sample_time)?;

        match &fir.coef_source {
            CoefSource::Fixed(coefs) => {
                let coef_type = smallest_representable_coef_type(&out_type, coefs, num_taps);
                let (const_id, _const_in, const_out) = new_node(
                    design,
                    format!("{name}_coefs"),
                    wrapper_id,
                    NodeKind::Primitive(Primitive::Constant(Constant { value: coefs.clone() })),
                    0,
                    1,
                );
                attach_expanded_child(design, wrapper_id, const_id)?;
                design.connect(const_out[0], ip_in[0], coef_type, sample_time)?;
            }
            CoefSource::InputPort => {
                let coef_arcs: Vec<ArcId> = coef_input
                    .map(|p| design.port(p).map(|port| port.arcs.to_vec()).unwrap_or_default())
                    .unwrap_or_default();
                retarget_arcs_to(design, &coef_arcs, ip_in[0])?;
            }
        }
        new_output_port = ip_out[0];
    }

    retarget_arcs_from(design, &out_arcs, new_output_port)?;

    if let NodeKind::ExpandedNode(exp) = &mut design.node_mut(wrapper_id).unwrap().kind {
        exp.children = children_of(design, wrapper_id);
    }

    Ok(wrapper_id)
}

fn attach_expanded_child(design: &mut Design, parent: NodeId, child: NodeId) -> IrResult<()> {
    if let NodeKind::ExpandedNode(exp) = &mut design.node_mut(parent).unwrap().kind {
        exp.children.push(child);
    }
    if let Some(node) = design.node_mut(child) {
        node.common.parent = Some(parent);
    }
    Ok(())
}

fn children_of(design: &Design, node_id: NodeId) -> Vec<NodeId> {
    design.node(node_id).map(|n| n.children().to_vec()).unwrap_or_default()
}

/// The "smallest representable" coefficient `Constant` type: adopts the
/// output port's floating-point type if any coefficient is fractional,
/// otherwise a signed or unsigned integer sized to the largest coefficient.
fn smallest_representable_coef_type(out_type: &DataType, coefs: &[NumericValue], num_taps: usize) -> DataType {
    let any_fractional = coefs.iter().any(|c| c.is_fractional());
    let any_complex = coefs.iter().any(|c| c.is_complex());
    if any_fractional {
        out_type
            .clone()
            .with_dimensions(SmallVec::from_slice(&[num_taps]))
            .with_complex(any_complex)
    } else {
        let any_signed = coefs.iter().any(|c| c.is_signed());
        let max_bits = coefs
            .iter()
            .map(|c| {
                let bits = c.integer_bits().unwrap_or(1);
                if any_signed && !c.is_signed() {
                    bits + 1
                } else {
                    bits
                }
            })
            .max()
            .unwrap_or(1);
        DataType::scalar_int(max_bits, any_signed)
            .with_dimensions(SmallVec::from_slice(&[num_taps]))
            .with_complex(any_complex)
    }
}

fn validate_discrete_fir(design: &Design, node_id: NodeId, name: &str, fir: &DiscreteFir) -> IrResult<()> {
    let node = design.node(node_id).unwrap();
    let expected_inputs = match fir.coef_source {
        CoefSource::Fixed(_) => 1,
        CoefSource::InputPort => 2,
    };
    if node.common.input_ports.len() != expected_inputs {
        return Err(IrError::Structural {
            node_id,
            node_name: name.to_string(),
            message: format!(
                "DiscreteFIR expects {expected_inputs} input port(s), found {}",
                node.common.input_ports.len()
            ),
        });
    }
    if node.common.output_ports.len() != 1 {
        return Err(IrError::Structural {
            node_id,
            node_name: name.to_string(),
            message: "DiscreteFIR expects exactly one output port".to_string(),
        });
    }
    let sig_type = port_data_type(design, node.common.input_ports[0]);
    if let Some(ref dt) = sig_type {
        if !dt.is_scalar() {
            return Err(IrError::Type {
                node_id,
                node_name: name.to_string(),
                message: "DiscreteFIR signal input must be scalar".to_string(),
            });
        }
    }
    let out_type = port_data_type(design, node.common.output_ports[0]);
    if let Some(ref dt) = out_type {
        if !dt.is_scalar() {
            return Err(IrError::Type {
                node_id,
                node_name: name.to_string(),
                message: "DiscreteFIR output must be scalar".to_string(),
            });
        }
        if let CoefSource::Fixed(coefs) = &fir.coef_source {
            if coefs.iter().any(|c| c.is_fractional()) && !dt.floating_point {
                return Err(IrError::Type {
                    node_id,
                    node_name: name.to_string(),
                    message: "fractional coefficients require a floating-point output".to_string(),
                });
            }
        }
    }
    let num_taps = match &fir.coef_source {
        CoefSource::Fixed(coefs) => coefs.len(),
        CoefSource::InputPort => node
            .common
            .input_ports
            .get(1)
            .and_then(|p| port_data_type(design, *p))
            .map(|dt| dt.first_dimension())
            .unwrap_or(1),
    };
    let allowed = if num_taps == 1 { [1, 1] } else { [1, num_taps - 1] };
    if !(fir.init_vals.len() == allowed[0] || fir.init_vals.len() == allowed[1]) {
        return Err(IrError::Structural {
            node_id,
            node_name: name.to_string(),
            message: format!(
                "DiscreteFIR initial values must have length 1 or {}, found {}",
                num_taps.saturating_sub(1).max(1),
                fir.init_vals.len()
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::node::{Node, NodeCommon};

    fn scalar_node(design: &mut Design, name: &str, kind: NodeKind, parent: Option<NodeId>, n_in: usize, n_out: usize) -> NodeId {
        let id = design.next_node_id();
        let mut common = NodeCommon::new(id, name, parent);
        for i in 0..n_in {
            common.input_ports.push(design.add_port(id, PortDirection::Input(i)));
        }
        for i in 0..n_out {
            common.output_ports.push(design.add_port(id, PortDirection::Output(i)));
        }
        design.insert_node(Node { common, kind })
    }

    fn make_subsystem(design: &mut Design) -> NodeId {
        let id = design.next_node_id();
        let common = NodeCommon::new(id, "top", None);
        design.insert_node(Node { common, kind: NodeKind::SubSystem(Default::default()) })
    }

    #[test]
    fn expand_fir1_fixed_produces_gain() {
        let mut design = Design::new();
        let parent = make_subsystem(&mut design);

        let fir = scalar_node(
            &mut design,
            "fir",
            NodeKind::DiscreteFir(DiscreteFir {
                coef_source: CoefSource::Fixed(vec![NumericValue::Integer { value: 3, signed: false }]),
                init_vals: vec![NumericValue::Integer { value: 0, signed: false }],
            }),
            Some(parent),
            1,
            1,
        );
        design.attach_child(parent, fir).unwrap();

        let src = scalar_node(&mut design, "src", NodeKind::SubSystem(Default::default()), Some(parent), 0, 1);
        design.attach_child(parent, src).unwrap();
        let sink = scalar_node(&mut design, "sink", NodeKind::SubSystem(Default::default()), Some(parent), 1, 0);
        design.attach_child(parent, sink).unwrap();

        let fir_in = design.node(fir).unwrap().common.input_ports[0];
        let fir_out = design.node(fir).unwrap().common.output_ports[0];
        let src_out = design.node(src).unwrap().common.output_ports[0];
        let sink_in = design.node(sink).unwrap().common.input_ports[0];
        design.connect(src_out, fir_in, DataType::scalar_float(64), 1.0).unwrap();
        design.connect(fir_out, sink_in, DataType::scalar_float(64), 1.0).unwrap();

        let mut edits = PassEdits::new();
        let wrapper = expand_discrete_fir(&mut design, fir, &mut edits).unwrap();
        edits.commit(&mut design);

        let wrapper_node = design.node(wrapper).unwrap();
        let NodeKind::ExpandedNode(exp) = &wrapper_node.kind else { panic!("expected ExpandedNode") };
        assert_eq!(exp.children.len(), 1);
        let gain_node = design.node(exp.children[0]).unwrap();
        assert!(matches!(gain_node.kind, NodeKind::Primitive(Primitive::Gain(_))));
        assert!(design.node(fir).is_none());
    }

    #[test]
    fn expand_fir3_fixed_produces_tapped_delay_and_inner_product() {
        let mut design = Design::new();
        let parent = make_subsystem(&mut design);
        let coefs = vec![
            NumericValue::Integer { value: 1, signed: true },
            NumericValue::Integer { value: -2, signed: true },
            NumericValue::Integer { value: 1, signed: true },
        ];
        let fir = scalar_node(
            &mut design,
            "fir",
            NodeKind::DiscreteFir(DiscreteFir {
                coef_source: CoefSource::Fixed(coefs),
                init_vals: vec![
                    NumericValue::Integer { value: 0, signed: false },
                    NumericValue::Integer { value: 0, signed: false },
                ],
            }),
            Some(parent),
            1,
            1,
        );
        design.attach_child(parent, fir).unwrap();
        let src = scalar_node(&mut design, "src", NodeKind::SubSystem(Default::default()), Some(parent), 0, 1);
        design.attach_child(parent, src).unwrap();
        let sink = scalar_node(&mut design, "sink", NodeKind::SubSystem(Default::default()), Some(parent), 1, 0);
        design.attach_child(parent, sink).unwrap();

        let fir_in = design.node(fir).unwrap().common.input_ports[0];
        let fir_out = design.node(fir).unwrap().common.output_ports[0];
        let src_out = design.node(src).unwrap().common.output_ports[0];
        let sink_in = design.node(sink).unwrap().common.input_ports[0];
        design.connect(src_out, fir_in, DataType::scalar_int(16, true), 1.0).unwrap();
        design.connect(fir_out, sink_in, DataType::scalar_int(16, true), 1.0).unwrap();

        let mut edits = PassEdits::new();
        let wrapper = expand_discrete_fir(&mut design, fir, &mut edits).unwrap();
        edits.commit(&mut design);

        let NodeKind::ExpandedNode(exp) = &design.node(wrapper).unwrap().kind else { panic!() };
        assert_eq!(exp.children.len(), 3);
        let kinds: Vec<&'static str> = exp.children.iter().map(|c| design.node(*c).unwrap().type_name()).collect();
        assert!(kinds.contains(&"TappedDelay"));
        assert!(kinds.contains(&"InnerProduct"));
        assert!(kinds.contains(&"Constant"));

        // coefs = [1, -2, 1]: -2 needs 2 bits as a minimal two's-complement
        // power of two, which also happens to be the widest of the three.
        let constant_id = exp
            .children
            .iter()
            .copied()
            .find(|c| design.node(*c).unwrap().type_name() == "Constant")
            .unwrap();
        let constant_out = design.node(constant_id).unwrap().common.output_ports[0];
        let constant_type = port_data_type(&design, constant_out).unwrap();
        assert_eq!(constant_type.total_bits, 2);
    }
}
