//! Ports: typed, directional connection points owned by exactly one node.

use crate::ids::{ArcId, NodeId, PortDirection};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A connection point on a node.
///
/// A port holds the set of arcs currently attached to it. For data input and
/// order-constraint-input ports this set is conventionally of size one once
/// the design is fully wired; output ports may fan out to many arcs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// The node this port belongs to.
    pub owner: NodeId,
    /// This port's direction and index within that direction.
    pub direction: PortDirection,
    /// Arcs currently attached to this port. A back reference only; the arc
    /// itself owns the authoritative endpoint record.
    pub arcs: SmallVec<[ArcId; 2]>,
}

impl Port {
    /// Create an empty port with no attached arcs.
    pub fn new(owner: NodeId, direction: PortDirection) -> Self {
        Port { owner, direction, arcs: SmallVec::new() }
    }

    /// Register an arc as attached to this port.
    pub fn attach(&mut self, arc: ArcId) {
        if !self.arcs.contains(&arc) {
            self.arcs.push(arc);
        }
    }

    /// Remove an arc from this port's attached set, if present.
    pub fn detach(&mut self, arc: ArcId) {
        self.arcs.retain(|a| *a != arc);
    }

    /// `true` for [`PortDirection::Input`] and [`PortDirection::Enable`].
    pub fn is_input_like(&self) -> bool {
        matches!(self.direction, PortDirection::Input(_) | PortDirection::Enable)
    }

    /// `true` for [`PortDirection::Output`].
    pub fn is_output(&self) -> bool {
        matches!(self.direction, PortDirection::Output(_))
    }
}
