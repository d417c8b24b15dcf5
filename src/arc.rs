//! Arcs: directed, typed edges between a source output port and a destination
//! input port.

use crate::datatype::DataType;
use crate::ids::PortId;
use serde::{Deserialize, Serialize};

/// A directed edge carrying samples of a fixed [`DataType`] at a fixed sample
/// time between two ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arc {
    /// The upstream port this arc is attached to.
    pub src_port: PortId,
    /// The downstream port this arc is attached to.
    pub dst_port: PortId,
    /// The type of value carried by this arc.
    pub data_type: DataType,
    /// Sample period, in whatever unit the design's top-level clock uses.
    pub sample_time: f64,
    /// Set when this arc crosses a partition boundary; carries the extra
    /// bookkeeping an emitted FIFO transfer needs.
    pub partition_crossing: Option<PartitionCrossingInfo>,
}

/// Extra metadata carried only by arcs that cross a partition boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionCrossingInfo {
    /// Initial-state count, in whole blocks.
    pub init_state_count_blocks: usize,
    /// Bytes occupied by one sample of this arc's type.
    pub bytes_per_sample: usize,
    /// Bytes occupied by one block of this arc's type.
    pub bytes_per_block: usize,
}

impl Arc {
    /// Construct a new arc between the given ports. Callers are responsible
    /// for registering the arc's id on both ports' attached sets; use
    /// [`crate::design::Design::connect`] to do both atomically.
    pub fn new(src_port: PortId, dst_port: PortId, data_type: DataType, sample_time: f64) -> Self {
        Arc { src_port, dst_port, data_type, sample_time, partition_crossing: None }
    }
}
