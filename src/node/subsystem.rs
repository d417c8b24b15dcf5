//! Subsystem-shaped node kinds: containers of children, optionally also
//! context roots.

use crate::ids::{NodeId, PortId};
use serde::{Deserialize, Serialize};

/// A plain container of children with no conditional-execution semantics of
/// its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubSystem {
    /// Direct children, in no particular order (iteration order for passes
    /// is imposed separately, by ascending node id).
    pub children: Vec<NodeId>,
}

/// A subsystem gated by a single shared enable condition.
///
/// All [`EnabledSubSystem::enable_inputs`] and [`EnabledSubSystem::enable_outputs`]
/// must be driven by the same source port; see
/// [`crate::passes::validate::validate_enabled_subsystem`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnabledSubSystem {
    /// Direct children, including the enable-input and enable-output nodes.
    pub children: Vec<NodeId>,
    /// Children that gate an external input into the subsystem.
    pub enable_inputs: Vec<NodeId>,
    /// Children that gate an internal output out of the subsystem.
    pub enable_outputs: Vec<NodeId>,
}

/// The wrapper left in place of a high-level node after [`crate::passes::expand`]
/// rewrites it into primitives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandedNode {
    /// The primitive (or medium-level) children synthesised during expansion.
    pub children: Vec<NodeId>,
    /// The node that was expanded; retained so the wrapper can still answer
    /// questions about where this subgraph came from, but no longer part of
    /// the design's active node list.
    pub original_node: NodeId,
}

/// A subsystem whose children run at a re-rated clock relative to their
/// parent context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClockDomain {
    /// Direct children.
    pub children: Vec<NodeId>,
    /// Upsample/downsample rate relative to the base rate, expressed as a
    /// ratio (numerator over denominator) to keep rates exact.
    pub rate_numerator: u32,
    /// See `rate_numerator`.
    pub rate_denominator: u32,
}

/// A subsystem whose children share a base sub-blocking length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockingDomain {
    /// Direct children.
    pub children: Vec<NodeId>,
    /// The base sub-blocking length shared by this domain's children.
    pub base_sub_blocking_length: usize,
}

/// A child of an [`EnabledSubSystem`] that gates one external input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnableInput {
    /// The shared enable-condition source, same across all siblings.
    pub enable_src: Option<PortId>,
}

/// A child of an [`EnabledSubSystem`] that gates one internal output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnableOutput {
    /// The shared enable-condition source, same across all siblings.
    pub enable_src: Option<PortId>,
}
