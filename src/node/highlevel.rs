//! High-level nodes: blocks synthesisable into primitive subgraphs by
//! [`crate::passes::expand`].

use crate::numeric::NumericValue;
use serde::{Deserialize, Serialize};

/// Where a [`DiscreteFir`]'s tap coefficients come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoefSource {
    /// Coefficients are a compile-time constant, attached directly.
    Fixed(Vec<NumericValue>),
    /// Coefficients arrive on a second input port at runtime.
    InputPort,
}

/// A discrete FIR filter: `y[n] = sum_k coefs[k] * x[n-k]`.
///
/// See [`crate::passes::expand::expand_discrete_fir`] for the primitive
/// subgraph this is rewritten into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscreteFir {
    /// Where the tap coefficients come from.
    pub coef_source: CoefSource,
    /// Initial values for the internal tapped-delay state; either one value
    /// (broadcast to every tap) or one per tap (`num_taps - 1` entries).
    pub init_vals: Vec<NumericValue>,
}

impl DiscreteFir {
    /// The tap count `N`: `coefs.len()` when fixed, otherwise the coefficient
    /// port's first dimension (supplied by the caller, since that requires
    /// looking at the port's [`crate::datatype::DataType`]).
    pub fn num_taps(&self, input_port_first_dim: Option<usize>) -> usize {
        match &self.coef_source {
            CoefSource::Fixed(coefs) => coefs.len(),
            CoefSource::InputPort => input_port_first_dim.unwrap_or(1),
        }
    }
}
