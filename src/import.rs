//! The import boundary: data the IR exposes so an external GraphML reader
//! can construct nodes, without this crate depending on any XML handling
//! itself.

use crate::error::{IrError, IrResult};
use crate::ids::NodeId;
use crate::node::highlevel::CoefSource;
use crate::node::highlevel::DiscreteFir;
use crate::numeric::parse_numeric_list;
use std::collections::BTreeMap;

/// Which GraphML export dialect an attribute map's keys follow. Dialects
/// disagree only on key spelling, never on semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphMlDialect {
    /// Keys as written by Simulink's GraphML exporter, e.g. `Numeric.Coefficients`.
    SimulinkExport,
    /// Keys as written by the Vitis front end, e.g. `Coefficients`.
    Vitis,
}

/// A dialect-agnostic bag of GraphML `<data>` key/value pairs for one node.
pub type NodeAttributes = BTreeMap<String, String>;

fn coef_key(dialect: GraphMlDialect) -> &'static str {
    match dialect {
        GraphMlDialect::SimulinkExport => "Numeric.Coefficients",
        GraphMlDialect::Vitis => "Coefficients",
    }
}

fn init_vals_key(dialect: GraphMlDialect) -> &'static str {
    match dialect {
        GraphMlDialect::SimulinkExport => "Numeric.InitialStates",
        GraphMlDialect::Vitis => "InitialStates",
    }
}

/// Build a [`DiscreteFir`] from a dialect-tagged attribute map, the way
/// `DiscreteFIR::createFromGraphML` reads `Numeric.Coefficients` /
/// `Coefficients` and `Numeric.InitialStates` / `InitialStates` depending on
/// dialect. A missing coefficients attribute is read as "coefficients arrive
/// on an input port" rather than an error.
pub fn build_discrete_fir(
    node_id: NodeId,
    node_name: &str,
    dialect: GraphMlDialect,
    attrs: &NodeAttributes,
) -> IrResult<DiscreteFir> {
    let coef_source = match attrs.get(coef_key(dialect)) {
        Some(text) => CoefSource::Fixed(parse_numeric_list(node_id, node_name, text)?),
        None => CoefSource::InputPort,
    };
    let init_vals = match attrs.get(init_vals_key(dialect)) {
        Some(text) => parse_numeric_list(node_id, node_name, text)?,
        None => {
            return Err(IrError::Structural {
                node_id,
                node_name: node_name.to_string(),
                message: "missing initial-states attribute".to_string(),
            })
        }
    };
    Ok(DiscreteFir { coef_source, init_vals })
}
