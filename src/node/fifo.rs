//! The thread-crossing FIFO: the only node kind that spans a partition
//! boundary.

use crate::numeric::NumericValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-port bookkeeping a FIFO carries independently for each of its ports,
/// since a merged FIFO may serve several unrelated arcs with different
/// blocking parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FifoPortState {
    /// Flattened initial values held in the queue at time zero, oldest first.
    pub init_conditions: Vec<NumericValue>,
    /// Samples per block on this port.
    pub block_size: usize,
    /// Sub-block grouping on this port; `elements_per_item = type_elements / sub_block_size`.
    pub sub_block_size: usize,
    /// The clock domain this port's samples are rated at, if any.
    pub clock_domain: Option<crate::ids::NodeId>,
    /// Per-dimension index expressions code generation should use when
    /// reading/writing this port, as free-form text (expression synthesis
    /// itself is a code-generation concern, out of scope here).
    pub index_exprs: Vec<String>,
}

/// A multi-port queue connecting nodes in different scheduling partitions.
///
/// Capacity and per-port state are independent: a FIFO produced by merging
/// several single-purpose FIFOs together has as many input/output port pairs
/// as were merged into it, each with its own [`FifoPortState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadCrossingFifo {
    /// Queue capacity, in blocks.
    pub fifo_length: usize,
    /// Per-input-port state, keyed by input port index on this node.
    pub input_state: BTreeMap<usize, FifoPortState>,
    /// Per-output-port state, keyed by output port index on this node.
    /// Mirrors `input_state` one-to-one: FIFOs are not fan-out queues.
    pub output_state: BTreeMap<usize, FifoPortState>,
}

impl ThreadCrossingFifo {
    /// A FIFO of the given capacity with no ports registered yet.
    pub fn new(fifo_length: usize) -> Self {
        ThreadCrossingFifo { fifo_length, input_state: BTreeMap::new(), output_state: BTreeMap::new() }
    }

    /// `typeElements(port) / subBlockSize(port)`, the primitive-element
    /// granularity initial conditions are counted in.
    pub fn elements_per_item(sub_block_size: usize, type_elements: usize) -> usize {
        if sub_block_size == 0 {
            type_elements
        } else {
            type_elements / sub_block_size
        }
    }

    /// `blockSize · elementsPerItem · (fifoLength − 1) − initConditions.len`,
    /// i.e. how many more primitive elements of history this FIFO's given
    /// port could still absorb without overflowing its capacity.
    pub fn room_in_fifo(&self, port: &FifoPortState, elements_per_item: usize) -> i64 {
        let capacity = (port.block_size * elements_per_item * self.fifo_length.saturating_sub(1)) as i64;
        capacity - port.init_conditions.len() as i64
    }
}
