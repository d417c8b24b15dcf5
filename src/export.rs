//! The export boundary: data the IR exposes so an external GraphML writer
//! can emit `<node>`/`<graph>` elements, without this crate constructing any
//! XML itself.

use crate::node::{Node, NodeKind};

/// One `(key, type, is_string)` triple an exporter would write as a
/// GraphML `<data>` element for a node, mirroring the original
/// `graphMLParameters()` virtual method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphMlParameter {
    /// The `<data key="...">` attribute name.
    pub key: &'static str,
    /// A short type tag (`"int"`, `"string"`, `"numeric_list"`, ...).
    pub value_type: &'static str,
    /// Whether the value should be quoted as a GraphML string.
    pub is_string: bool,
}

/// The `block_node_type` tag an exporter would write for this node.
pub fn block_node_type(node: &Node) -> &'static str {
    node.type_name()
}

/// The GraphML parameter triples an exporter should write for this node's
/// kind-specific data, beyond the universal id/name/partition fields every
/// node carries.
pub fn graphml_parameters(node: &Node) -> Vec<GraphMlParameter> {
    match &node.kind {
        NodeKind::Primitive(crate::node::Primitive::Delay(_)) => vec![
            GraphMlParameter { key: "DelayLength", value_type: "int", is_string: false },
            GraphMlParameter { key: "InitialCondition", value_type: "numeric_list", is_string: true },
        ],
        NodeKind::Primitive(crate::node::Primitive::TappedDelay(_)) => vec![
            GraphMlParameter { key: "DelayLength", value_type: "int", is_string: false },
            GraphMlParameter { key: "InitialCondition", value_type: "numeric_list", is_string: true },
            GraphMlParameter { key: "AllocateExtraSpace", value_type: "bool", is_string: false },
            GraphMlParameter { key: "EarliestFirst", value_type: "bool", is_string: false },
        ],
        NodeKind::Primitive(crate::node::Primitive::Constant(_)) => {
            vec![GraphMlParameter { key: "Value", value_type: "numeric_list", is_string: true }]
        }
        NodeKind::Primitive(crate::node::Primitive::Gain(_)) => {
            vec![GraphMlParameter { key: "Gain", value_type: "numeric_list", is_string: true }]
        }
        NodeKind::Fifo(_) => vec![
            GraphMlParameter { key: "FIFOLength", value_type: "int", is_string: false },
            GraphMlParameter { key: "InitialConditionsPerPort", value_type: "numeric_list", is_string: true },
        ],
        NodeKind::DiscreteFir(_) => vec![
            GraphMlParameter { key: "Coefficients", value_type: "numeric_list", is_string: true },
            GraphMlParameter { key: "InitialStates", value_type: "numeric_list", is_string: true },
        ],
        _ => Vec::new(),
    }
}

/// The nested-subgraph id an exporter should use for a subsystem, per the
/// `<node-full-path>:` convention (e.g. `"Top/MySubsystem:"`).
pub fn subgraph_id(full_path: &str) -> String {
    format!("{full_path}:")
}

/// The partition-crossing `<data>` keys an exporter adds to arcs carrying
/// [`crate::arc::PartitionCrossingInfo`].
pub const PARTITION_CROSSING_KEYS: [&str; 3] = [
    "partition_crossing_init_state_count_blocks",
    "partition_crossing_bytes_per_sample",
    "partition_crossing_bytes_per_block",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;
    use crate::node::{Node, NodeCommon};

    #[test]
    fn subgraph_id_appends_colon() {
        assert_eq!(subgraph_id("Top/Sub"), "Top/Sub:");
    }

    #[test]
    fn delay_parameters_cover_length_and_init_condition() {
        let node = Node {
            common: NodeCommon::new(NodeId::new(0), "d", None),
            kind: NodeKind::Primitive(crate::node::Primitive::Delay(
                crate::node::primitive::Delay::new(1, vec![]),
            )),
        };
        let params = graphml_parameters(&node);
        assert_eq!(params.len(), 2);
        assert_eq!(block_node_type(&node), "Delay");
    }
}
