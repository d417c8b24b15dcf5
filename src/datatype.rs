//! The shape descriptor carried by every port and arc.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A scalar/vector/matrix shape, numeric kind, and bit width.
///
/// An empty dimension vector, or a single dimension of `1`, is a scalar; a
/// single dimension greater than `1` is a vector; more than one dimension is
/// a matrix. Complex values are represented as a pair of real/imaginary
/// scalars of this same type (`complex` does not double the dimension count).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    /// Floating-point (`true`) vs integer (`false`) representation.
    pub floating_point: bool,
    /// Signed vs unsigned, meaningful only for integer types.
    pub signed: bool,
    /// Complex (two components) vs real.
    pub complex: bool,
    /// Total bits in the integer or fractional part.
    pub total_bits: u32,
    /// Bits to the right of the binary point; `0` for pure integers.
    pub fractional_bits: u32,
    /// Shape, outermost dimension first. Empty means scalar.
    pub dimensions: SmallVec<[usize; 2]>,
}

impl DataType {
    /// A real scalar double.
    pub fn scalar_float(total_bits: u32) -> Self {
        DataType {
            floating_point: true,
            signed: true,
            complex: false,
            total_bits,
            fractional_bits: 0,
            dimensions: SmallVec::new(),
        }
    }

    /// A real scalar integer.
    pub fn scalar_int(total_bits: u32, signed: bool) -> Self {
        DataType {
            floating_point: false,
            signed,
            complex: false,
            total_bits,
            fractional_bits: 0,
            dimensions: SmallVec::new(),
        }
    }

    /// This type with its dimensions replaced.
    pub fn with_dimensions(mut self, dims: impl Into<SmallVec<[usize; 2]>>) -> Self {
        self.dimensions = dims.into();
        self
    }

    /// This type with `complex` forced to the given value.
    pub fn with_complex(mut self, complex: bool) -> Self {
        self.complex = complex;
        self
    }

    /// `true` if `dimensions` describes a scalar (empty, or a single `1`).
    pub fn is_scalar(&self) -> bool {
        self.dimensions.is_empty() || (self.dimensions.len() == 1 && self.dimensions[0] == 1)
    }

    /// `true` if `dimensions` describes a vector (exactly one dimension > 1).
    pub fn is_vector(&self) -> bool {
        self.dimensions.len() == 1 && self.dimensions[0] > 1
    }

    /// Total element count: product of dimensions, `1` for a scalar.
    pub fn num_elements(&self) -> usize {
        if self.dimensions.is_empty() {
            1
        } else {
            self.dimensions.iter().product()
        }
    }

    /// The leading dimension, or `1` for a scalar. Used when a coefficient
    /// port's element count determines a tap count.
    pub fn first_dimension(&self) -> usize {
        self.dimensions.first().copied().unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_has_one_element() {
        let dt = DataType::scalar_float(64);
        assert!(dt.is_scalar());
        assert_eq!(dt.num_elements(), 1);
    }

    #[test]
    fn vector_counts_elements() {
        let dt = DataType::scalar_int(16, true).with_dimensions(SmallVec::from_slice(&[5]));
        assert!(dt.is_vector());
        assert_eq!(dt.num_elements(), 5);
        assert_eq!(dt.first_dimension(), 5);
    }
}
