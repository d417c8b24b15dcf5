//! The error taxonomy raised by IR construction and by the transformation passes.
//!
//! Errors are split along the same lines the passes reason about: a `Structural`
//! error means the graph is wired in a way a node's `validate` does not accept;
//! a `Type` error means two connected ports disagree on shape or numeric kind;
//! a `Precondition` error means a pass was invoked on a node that does not meet
//! its documented entry conditions; an `Invariant` error means the compiler
//! itself produced an inconsistent graph and should be treated as a bug.

use crate::NodeId;

/// The result type returned by fallible IR operations.
pub type IrResult<T> = Result<T, IrError>;

/// Errors produced while building, validating, or transforming a design.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A node's wiring does not satisfy its structural preconditions.
    #[error("structural error in node {node_id:?} ({node_name}): {message}")]
    Structural {
        /// The offending node.
        node_id: NodeId,
        /// The offending node's name, captured for error messages that outlive the design.
        node_name: String,
        /// Human-readable detail.
        message: String,
    },

    /// Two connected ports, or a node's declared numeric properties, disagree.
    #[error("type error in node {node_id:?} ({node_name}): {message}")]
    Type {
        /// The offending node.
        node_id: NodeId,
        /// The offending node's name.
        node_name: String,
        /// Human-readable detail.
        message: String,
    },

    /// A pass was invoked on a node that does not meet its entry conditions.
    #[error("precondition violated for node {node_id:?} ({node_name}): {message}")]
    Precondition {
        /// The offending node.
        node_id: NodeId,
        /// The offending node's name.
        node_name: String,
        /// Human-readable detail.
        message: String,
    },

    /// The IR is internally inconsistent; this indicates a compiler bug rather
    /// than a malformed input design.
    #[error("invariant violated around node {node_id:?} ({node_name}): {message}")]
    Invariant {
        /// The offending node.
        node_id: NodeId,
        /// The offending node's name.
        node_name: String,
        /// Human-readable detail.
        message: String,
    },

    /// The operation is not supported by this node kind (preserved from the
    /// source design: some expansions and emissions are deliberately unimplemented).
    #[error("unsupported operation on node {node_id:?} ({node_name}): {message}")]
    Unsupported {
        /// The offending node.
        node_id: NodeId,
        /// The offending node's name.
        node_name: String,
        /// Human-readable detail.
        message: String,
    },
}
