//! Stable arena indices used in place of reference-counted handles.
//!
//! Nodes, ports and arcs form a cyclic object graph: ports reference arcs,
//! arcs reference ports, subsystems reference children, children reference
//! parents. Rather than `Rc<RefCell<_>>` pairs on every edge of that graph,
//! every node/port/arc lives in an arena vector on [`crate::Design`] and is
//! addressed by one of the newtypes below. Deleting an entry tombstones its
//! arena slot instead of compacting the vector, so ids handed out earlier in
//! a pass stay valid for the rest of that pass's batch.

use serde::{Deserialize, Serialize};

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(usize);

        impl $name {
            /// Construct an id from its raw arena index. Only the arena
            /// owner should call this.
            pub fn new(index: usize) -> Self {
                $name(index)
            }

            /// The raw arena index backing this id.
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(NodeId);
arena_id!(PortId);
arena_id!(ArcId);

/// The direction and position of a port on its owning node, mirroring the
/// `Location`/`Port` addressing pattern used to identify dataflow endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// A data input, addressed by index within the node's input ports.
    Input(usize),
    /// A data output, addressed by index within the node's output ports.
    Output(usize),
    /// The single enable-condition input carried by enabled subsystem children.
    Enable,
    /// An ordering-only input with no associated data.
    OrderConstraintInput,
    /// An ordering-only output with no associated data.
    OrderConstraintOutput,
}
