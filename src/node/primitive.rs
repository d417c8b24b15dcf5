//! Leaf primitive operators: the nodes that survive to code generation
//! unchanged.

use crate::numeric::NumericValue;
use serde::{Deserialize, Serialize};

/// A leaf operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Primitive {
    /// A pure delay line: holds `delay_value` samples of history per element.
    Delay(Delay),
    /// A tapped delay line: exposes its entire history window as a vector
    /// output rather than only the oldest sample.
    TappedDelay(TappedDelay),
    /// Element-wise product of its inputs.
    Product(Product),
    /// A compile-time constant value.
    Constant(Constant),
    /// Dot product of two equal-length vector inputs.
    InnerProduct(InnerProduct),
    /// Scalar multiply by a fixed gain.
    Gain(Gain),
    /// Selects one of several data inputs by an integer selector input.
    Mux(Mux),
}

impl Primitive {
    /// The GraphML-exporter tag for this primitive kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Delay(_) => "Delay",
            Primitive::TappedDelay(_) => "TappedDelay",
            Primitive::Product(_) => "Product",
            Primitive::Constant(_) => "Constant",
            Primitive::InnerProduct(_) => "InnerProduct",
            Primitive::Gain(_) => "Gain",
            Primitive::Mux(_) => "Mux",
        }
    }
}

/// How an [`InnerProduct`] should treat complex conjugation of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexConjBehavior {
    /// Neither input is conjugated.
    None,
    /// The first input is conjugated before multiplying.
    ConjugateFirst,
    /// The second input is conjugated before multiplying.
    ConjugateSecond,
}

/// A pure delay line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delay {
    /// Number of samples of history held per element.
    pub delay_value: usize,
    /// Initial values, flattened, oldest first: length is a multiple of the
    /// port's element count.
    pub init_condition: Vec<NumericValue>,
    /// Set once blocking has assigned this delay a deferred specialization;
    /// required before absorbing a nonzero delay into a FIFO whose sub-block
    /// size is greater than one.
    pub blocking_specialization_deferred: bool,
    /// The block size this delay will be specialized at once blocking completes.
    pub deferred_block_size: usize,
    /// The sub-block size this delay will be specialized at; always `1` for
    /// delays created by reshaping.
    pub deferred_sub_block_size: usize,
    /// `true` once a state-update node has been attached to this delay,
    /// which forecloses further absorption.
    pub has_state_update_node: bool,
}

impl Delay {
    /// A delay with no history and no initial conditions.
    pub fn new(delay_value: usize, init_condition: Vec<NumericValue>) -> Self {
        Delay {
            delay_value,
            init_condition,
            blocking_specialization_deferred: false,
            deferred_block_size: 1,
            deferred_sub_block_size: 1,
            has_state_update_node: false,
        }
    }
}

/// A tapped delay line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TappedDelay {
    /// Number of delay taps, i.e. history length minus the pass-through tap.
    pub delay_value: usize,
    /// Initial values for the delay line, oldest first.
    pub init_condition: Vec<NumericValue>,
    /// When set, the current (undelayed) sample is included as tap 0 in
    /// addition to the `delay_value` historical taps.
    pub allocate_extra_space: bool,
    /// When set, the oldest sample occupies the lowest-index tap of the
    /// output vector; otherwise the newest sample does.
    pub earliest_first: bool,
}

/// Element-wise product of its inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Per-input exponent: `1` for multiply, `-1` for divide.
    pub input_exponents: Vec<i32>,
}

/// A compile-time constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constant {
    /// The constant's value(s), flattened in row-major order.
    pub value: Vec<NumericValue>,
}

/// Dot product of two equal-length vector inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerProduct {
    /// Complex-conjugation policy applied before multiplying.
    pub complex_conj_behavior: ComplexConjBehavior,
}

/// Scalar multiply by a fixed gain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gain {
    /// The multiplier, one element per output element (broadcast if length 1).
    pub gain: Vec<NumericValue>,
}

/// Selects one of several data inputs by an integer selector input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mux {
    /// Number of selectable data inputs (selector input is separate).
    pub num_inputs: usize,
}
