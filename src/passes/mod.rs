//! The transformation passes that turn an imported design into a partitioned,
//! blocked, thread-aware graph.
//!
//! Passes run single-threaded, in the fixed order documented on
//! [`crate::Design`]: [`expand`], then [`propagate`], then
//! [`partition_fifo`], then [`absorption`] and [`reshape`] together, then
//! [`merge`]. Each pass accumulates its edits in a [`crate::PassEdits`] batch
//! and returns it uncommitted; the driver (or a test) calls
//! [`crate::PassEdits::commit`] once it is satisfied with the batch, and
//! should run [`validate`] before moving on to the next pass.
//!
//! Whenever a pass must choose an iteration order over a node's children, it
//! iterates in ascending [`crate::NodeId`] order so results are deterministic
//! across runs of the same input.

pub mod absorption;
pub mod expand;
pub mod merge;
pub mod partition_fifo;
pub mod propagate;
pub mod reshape;
pub mod validate;

/// The outcome of attempting to absorb an adjacent delay into a FIFO, or to
/// absorb a FIFO's surplus initial conditions into an adjacent delay during
/// reshaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsorptionStatus {
    /// Nothing could be absorbed (context mismatch, no room, wrong node
    /// shape, etc).
    NoAbsorption,
    /// The adjacent delay was fully absorbed and deleted.
    FullAbsorption,
    /// Only part of the delay fit; the FIFO is now completely full and the
    /// delay remains, shrunk.
    PartialAbsorptionFullFifo,
    /// Only part of the common output-side initial-condition postfix fit;
    /// the remainder was merged back into the downstream delays' own
    /// initial conditions.
    PartialAbsorptionMergeInitCond,
}
