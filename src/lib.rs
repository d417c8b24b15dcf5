//! A graph intermediate representation and transformation-pass library for a
//! multi-threaded dataflow compiler.
//!
//! A design is ingested as a hierarchical tree of nodes connected by typed
//! arcs (see [`design::Design`]), built through the import boundary described
//! in [`import`]. A sequence of passes under [`passes`] then rewrites it in
//! place:
//!
//! ```text
//! expand high-level nodes -> propagate partitions -> insert thread-crossing
//! FIFOs -> absorb adjacent delays into FIFOs -> reshape FIFO initial
//! conditions to block boundaries -> merge FIFOs sharing a partition pair
//! ```
//!
//! The output is a partitioned, blocked graph of primitives separated by
//! [`node::ThreadCrossingFifo`] nodes, ready for the external code-generation
//! collaborator described in [`export`].
//!
//! ```
//! use dataflow_ir::design::Design;
//!
//! let design = Design::new();
//! assert!(design.check_structural_invariants().is_ok());
//! ```

#![forbid(unsafe_code)]

pub mod arc;
pub mod context;
pub mod datatype;
pub mod design;
pub mod error;
pub mod export;
pub mod ids;
pub mod import;
pub mod node;
pub mod numeric;
pub mod passes;
pub mod port;

pub use arc::Arc;
pub use design::Design;
pub use error::{IrError, IrResult};
pub use ids::{ArcId, NodeId, PortDirection, PortId};
pub use node::{Node, NodeCommon, NodeKind};

/// Configuration threaded through every pass entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassConfig {
    /// Whether a prior blocking pass has already run; controls whether
    /// delays injected by initial-condition reshaping are flagged
    /// `blocking_specialization_deferred`.
    pub blocking_already_occurred: bool,
    /// Emit a `log::debug!` line at each action a pass takes, mirroring the
    /// original driver's human-readable progress output.
    pub verbose: bool,
}

/// A batch of pending graph edits a pass accumulates before the driver
/// commits them, mirroring the original add/remove out-parameter convention.
#[derive(Debug, Default)]
pub struct PassEdits {
    /// Nodes created by this pass, not yet inserted into the design's
    /// top-level bookkeeping (they are already in the arena by the time they
    /// land here; this list is for the driver's own accounting/logging).
    pub new_nodes: Vec<NodeId>,
    /// Nodes this pass wants deleted once the batch commits.
    pub deleted_nodes: Vec<NodeId>,
    /// Arcs created by this pass.
    pub new_arcs: Vec<ArcId>,
    /// Arcs this pass wants deleted once the batch commits.
    pub deleted_arcs: Vec<ArcId>,
}

impl PassEdits {
    /// An empty batch.
    pub fn new() -> Self {
        PassEdits::default()
    }

    /// Apply a `deleted_nodes` entry by tombstoning it in the design. Arcs
    /// marked deleted are disconnected first so no port retains a dangling
    /// reference.
    pub fn commit(self, design: &mut design::Design) {
        for arc in self.deleted_arcs {
            design.disconnect(arc);
        }
        for node in self.deleted_nodes {
            design.remove_node(node);
        }
    }
}
