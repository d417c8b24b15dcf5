//! The placeholder edge between nodes scheduled at different base blocking
//! lengths, resolved into a [`crate::node::ThreadCrossingFifo`] during
//! partition-crossing insertion.

use serde::{Deserialize, Serialize};

/// A bridge between a producer and consumer in different base blocking
/// domains. Never survives to code generation: [`crate::passes::partition_fifo`]
/// replaces every bridge with a FIFO, taking the bridge's parent and rewiring
/// its input arcs onto the FIFO's inputs port-for-port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingDomainBridge {
    /// Samples per block on the consumer side.
    pub block_size: usize,
    /// Sub-block size on the producer side.
    pub sub_block_size_in: usize,
    /// Sub-block size on the consumer side.
    pub sub_block_size_out: usize,
    /// Base sub-blocking length on the producer side.
    pub base_sub_block_size_in: usize,
    /// Base sub-blocking length on the consumer side.
    pub base_sub_block_size_out: usize,
}
