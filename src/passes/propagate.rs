//! Partition propagation: an unassigned descendant inherits its nearest
//! partitioned ancestor's partition.

use crate::design::Design;
use crate::ids::NodeId;
use crate::node::NodeKind;

/// Walk the design top-down, assigning every node with partition `None` the
/// partition of its nearest assigned ancestor. [`crate::node::ExpandedNode`]
/// is a special case: it adopts its *parent's* partition (not its wrapped
/// original node's) and that same value propagates to its children, exactly
/// as for any other subsystem.
pub fn propagate_partitions(design: &mut Design) {
    let mut roots: Vec<NodeId> = design.top_level_nodes.clone();
    roots.sort_by_key(|id| id.index());
    for root in roots {
        propagate_from(design, root, None);
    }
}

fn propagate_from(design: &mut Design, node_id: NodeId, inherited: Option<i32>) {
    let Some(node) = design.node_mut(node_id) else { return };
    let effective = node.common.partition.or(inherited);
    node.common.partition = effective;
    let mut children = node.children().to_vec();
    children.sort_by_key(|id| id.index());
    // An ExpandedNode's own partition is left unset by expansion, so
    // `effective` above already carries the parent's value down into it and
    // on to its children, same as any other subsystem.
    for child in children {
        propagate_from(design, child, effective);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeCommon};

    fn sub(design: &mut Design, parent: Option<NodeId>, partition: Option<i32>) -> NodeId {
        let id = design.next_node_id();
        let mut common = NodeCommon::new(id, "s", parent);
        common.partition = partition;
        let node = Node { common, kind: NodeKind::SubSystem(Default::default()) };
        design.insert_node(node)
    }

    #[test]
    fn children_inherit_ancestor_partition() {
        let mut design = Design::new();
        let top = sub(&mut design, None, Some(2));
        let child = sub(&mut design, Some(top), None);
        design.attach_child(top, child).unwrap();
        design.top_level_nodes.push(top);

        propagate_partitions(&mut design);

        assert_eq!(design.node(child).unwrap().common.partition, Some(2));
    }

    #[test]
    fn own_partition_is_not_overridden() {
        let mut design = Design::new();
        let top = sub(&mut design, None, Some(2));
        let child = sub(&mut design, Some(top), Some(9));
        design.attach_child(top, child).unwrap();
        design.top_level_nodes.push(top);

        propagate_partitions(&mut design);

        assert_eq!(design.node(child).unwrap().common.partition, Some(9));
    }
}
