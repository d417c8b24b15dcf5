//! Master nodes: the design's external boundary.

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which boundary role a [`Master`] node plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterKind {
    /// The design's external inputs.
    MasterInput,
    /// The design's external outputs.
    MasterOutput,
    /// A sink for nodes with no downstream consumer but which must still be
    /// scheduled (e.g. for their side effects).
    MasterTerminator,
    /// A sink for ports left deliberately unconnected.
    MasterUnconnected,
}

impl MasterKind {
    /// The GraphML-exporter tag for this master role.
    pub fn type_name(self) -> &'static str {
        match self {
            MasterKind::MasterInput => "Master",
            MasterKind::MasterOutput => "Master",
            MasterKind::MasterTerminator => "Master",
            MasterKind::MasterUnconnected => "Master",
        }
    }
}

/// A design boundary node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Master {
    /// Which boundary role this node plays.
    pub kind: MasterKind,
    /// Samples processed per scheduler tick.
    pub block_size: usize,
    /// The name of the loop induction variable code generation should use
    /// for this master's ports.
    pub induction_variable_name: String,
    /// Per-port clock domain, keyed by port index within this master.
    pub port_clock_domains: BTreeMap<usize, NodeId>,
}

impl Master {
    /// A fresh master node of the given role with no ports registered yet.
    pub fn new(kind: MasterKind, block_size: usize, induction_variable_name: impl Into<String>) -> Self {
        Master {
            kind,
            block_size,
            induction_variable_name: induction_variable_name.into(),
            port_clock_domains: BTreeMap::new(),
        }
    }
}
