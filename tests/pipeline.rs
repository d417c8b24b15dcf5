//! Whole-design scenarios exercising several passes together, in the order
//! a driver would run them: expand, then propagate partitions, then insert
//! thread-crossing FIFOs, then absorb adjacent delays, then reshape, then
//! merge.

use dataflow_ir::context::{Context, ContextRootKind};
use dataflow_ir::datatype::DataType;
use dataflow_ir::design::Design;
use dataflow_ir::ids::PortDirection;
use dataflow_ir::node::fifo::{FifoPortState, ThreadCrossingFifo};
use dataflow_ir::node::highlevel::CoefSource;
use dataflow_ir::node::primitive::Delay;
use dataflow_ir::node::{DiscreteFir, Node, NodeCommon, NodeKind, Primitive};
use dataflow_ir::numeric::NumericValue;
use dataflow_ir::passes::absorption::absorb_adjacent_input_delay;
use dataflow_ir::passes::expand::expand_discrete_fir;
use dataflow_ir::passes::merge::{bucket_merge_groups, merge_fifo_group};
use dataflow_ir::passes::partition_fifo::{insert_partition_crossing_fifos, CrossingGroup};
use dataflow_ir::passes::propagate::propagate_partitions;
use dataflow_ir::passes::reshape::reshape_fifo_initial_conditions_for_block_size;
use dataflow_ir::passes::validate::validate_design;
use dataflow_ir::passes::AbsorptionStatus;
use dataflow_ir::PassEdits;
use std::collections::HashMap;

fn iv(v: i64) -> NumericValue {
    NumericValue::Integer { value: v, signed: v < 0 }
}

fn subsystem(design: &mut Design, name: &str, parent: Option<dataflow_ir::NodeId>, partition: Option<i32>) -> dataflow_ir::NodeId {
    let id = design.next_node_id();
    let mut common = NodeCommon::new(id, name, parent);
    common.partition = partition;
    design.insert_node(Node { common, kind: NodeKind::SubSystem(Default::default()) })
}

/// FIR-3 fixed coefficients expand into a tapped delay + inner product,
/// the expanded wrapper inherits its parent's partition rather than
/// picking one up from the original node, and validation of the resulting
/// design still passes.
#[test]
fn fir_expansion_then_partition_propagation() {
    let mut design = Design::new();
    let top = subsystem(&mut design, "top", None, Some(0));
    design.top_level_nodes.push(top);

    let src = subsystem(&mut design, "src", Some(top), None);
    design.node_mut(src).unwrap().common.output_ports.push(design.add_port(src, PortDirection::Output(0)));
    design.attach_child(top, src).unwrap();

    let sink = subsystem(&mut design, "sink", Some(top), None);
    design.node_mut(sink).unwrap().common.input_ports.push(design.add_port(sink, PortDirection::Input(0)));
    design.attach_child(top, sink).unwrap();

    let fir_id = design.next_node_id();
    let mut fir_common = NodeCommon::new(fir_id, "fir", Some(top));
    let fir_in = design.add_port(fir_id, PortDirection::Input(0));
    let fir_out = design.add_port(fir_id, PortDirection::Output(0));
    fir_common.input_ports.push(fir_in);
    fir_common.output_ports.push(fir_out);
    design.insert_node(Node {
        common: fir_common,
        kind: NodeKind::DiscreteFir(DiscreteFir {
            coef_source: CoefSource::Fixed(vec![iv(1), iv(-2), iv(1)]),
            init_vals: vec![iv(0), iv(0)],
        }),
    });
    design.attach_child(top, fir_id).unwrap();

    let src_out = design.node(src).unwrap().common.output_ports[0];
    let sink_in = design.node(sink).unwrap().common.input_ports[0];
    design.connect(src_out, fir_in, DataType::scalar_int(16, true), 1.0).unwrap();
    design.connect(fir_out, sink_in, DataType::scalar_int(16, true), 1.0).unwrap();

    let mut edits = PassEdits::new();
    let wrapper = expand_discrete_fir(&mut design, fir_id, &mut edits).unwrap();
    edits.commit(&mut design);

    propagate_partitions(&mut design);

    assert_eq!(design.node(wrapper).unwrap().common.partition, Some(0));
    let NodeKind::ExpandedNode(exp) = &design.node(wrapper).unwrap().kind else { panic!() };
    for child in &exp.children {
        assert_eq!(design.node(*child).unwrap().common.partition, Some(0));
    }

    validate_design(&design).unwrap();
}

/// A producer in partition 0 feeding a consumer in partition 1 gets a
/// thread-crossing FIFO inserted between them; a Delay directly upstream of
/// the FIFO is then fully absorbed into the FIFO's initial conditions.
#[test]
fn cross_partition_fifo_absorbs_adjacent_delay() {
    let mut design = Design::new();
    let top = subsystem(&mut design, "top", None, None);
    design.top_level_nodes.push(top);

    let src = subsystem(&mut design, "src", Some(top), Some(0));
    design.node_mut(src).unwrap().common.output_ports.push(design.add_port(src, PortDirection::Output(0)));
    design.attach_child(top, src).unwrap();

    let delay_id = design.next_node_id();
    let mut delay_common = NodeCommon::new(delay_id, "delay", Some(top));
    delay_common.partition = Some(0);
    let delay_in = design.add_port(delay_id, PortDirection::Input(0));
    let delay_out = design.add_port(delay_id, PortDirection::Output(0));
    delay_common.input_ports.push(delay_in);
    delay_common.output_ports.push(delay_out);
    design.insert_node(Node {
        common: delay_common,
        kind: NodeKind::Primitive(Primitive::Delay(Delay::new(3, vec![iv(7), iv(8), iv(9)]))),
    });
    design.attach_child(top, delay_id).unwrap();

    let dst = subsystem(&mut design, "dst", Some(top), Some(1));
    design.node_mut(dst).unwrap().common.input_ports.push(design.add_port(dst, PortDirection::Input(0)));
    design.attach_child(top, dst).unwrap();

    let src_out = design.node(src).unwrap().common.output_ports[0];
    let dst_in = design.node(dst).unwrap().common.input_ports[0];
    design.connect(src_out, delay_in, DataType::scalar_float(64), 1.0).unwrap();
    let crossing_arc = design.connect(delay_out, dst_in, DataType::scalar_float(64), 1.0).unwrap();

    let mut groups = HashMap::new();
    groups.insert((0, 1), vec![CrossingGroup { arcs: vec![crossing_arc] }]);
    let mut edits = PassEdits::new();
    let created = insert_partition_crossing_fifos(&mut design, &groups, 8, &mut edits).unwrap();
    edits.commit(&mut design);
    assert_eq!(created.len(), 1);
    let fifo_id = created[0];
    assert!(matches!(design.node(fifo_id).unwrap().kind, NodeKind::Fifo(_)));

    let mut absorb_edits = PassEdits::new();
    let status = absorb_adjacent_input_delay(&mut design, fifo_id, &mut absorb_edits).unwrap();
    assert_eq!(status, AbsorptionStatus::FullAbsorption);
    absorb_edits.commit(&mut design);

    assert!(design.node(delay_id).is_none());
    let NodeKind::Fifo(f) = &design.node(fifo_id).unwrap().kind else { panic!() };
    assert_eq!(f.input_state[&0].init_conditions, vec![iv(7), iv(8), iv(9)]);

    validate_design(&design).unwrap();
}

/// Two FIFOs sharing a partition pair and an identical reduced context
/// stack are bucketed together and merge into one multi-port FIFO; after
/// reshaping to the group's minimum block count, the merged survivor
/// carries both ports' state.
#[test]
fn fifos_sharing_a_context_merge_into_one() {
    let mut design = Design::new();
    let top = subsystem(&mut design, "top", None, None);
    design.top_level_nodes.push(top);

    let ctx = Context { root: dataflow_ir::NodeId::new(999), root_kind: ContextRootKind::EnabledSubSystem, sub_context: 0 };

    let make_fifo = |design: &mut Design, init_len: usize| -> dataflow_ir::NodeId {
        let id = design.next_node_id();
        let mut common = NodeCommon::new(id, "fifo", Some(top));
        common.context = vec![ctx].into_iter().collect();
        common.input_ports.push(design.add_port(id, PortDirection::Input(0)));
        common.output_ports.push(design.add_port(id, PortDirection::Output(0)));
        let mut fifo = ThreadCrossingFifo::new(8);
        fifo.input_state.insert(
            0,
            FifoPortState {
                init_conditions: (0..init_len as i64).map(iv).collect(),
                block_size: 2,
                sub_block_size: 1,
                clock_domain: None,
                index_exprs: vec![],
            },
        );
        fifo.output_state.insert(0, FifoPortState { init_conditions: vec![], block_size: 2, sub_block_size: 1, clock_domain: None, index_exprs: vec![] });
        design.insert_node(Node { common, kind: NodeKind::Fifo(fifo) })
    };

    let a = make_fifo(&mut design, 4);
    let b = make_fifo(&mut design, 6);
    design.attach_child(top, a).unwrap();
    design.attach_child(top, b).unwrap();

    let buckets = bucket_merge_groups(&design, &[a, b], false);
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].len(), 2);

    let mut edits = PassEdits::new();
    for fifo_id in [a, b] {
        reshape_fifo_initial_conditions_for_block_size(&mut design, fifo_id, false, &mut edits).unwrap();
    }
    edits.commit(&mut design);

    let mut merge_edits = PassEdits::new();
    let survivor = merge_fifo_group(&mut design, &buckets[0], false, &mut merge_edits).unwrap();
    merge_edits.commit(&mut design);

    assert_eq!(survivor, a);
    let NodeKind::Fifo(f) = &design.node(survivor).unwrap().kind else { panic!() };
    assert_eq!(f.input_state.len(), 2);
    // target_blocks = min(4/2, 6/2) = 2 blocks of size 2: a's 4 elements were
    // already at that size, b's 6 got reshaped down to 4.
    assert_eq!(f.input_state[&0].init_conditions, vec![iv(0), iv(1), iv(2), iv(3)]);
    assert_eq!(f.input_state[&1].init_conditions, vec![iv(0), iv(1), iv(2), iv(3)]);
    assert!(design.node(b).is_none());

    validate_design(&design).unwrap();
}
