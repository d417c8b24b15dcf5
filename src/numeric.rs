//! Numeric literal representation and the attribute-string parser that backs
//! the import boundary (coefficients, initial conditions, constant values).

use crate::error::{IrError, IrResult};
use crate::NodeId;
use serde::{Deserialize, Serialize};

/// A single scalar (or complex-paired) numeric literal, as found in GraphML
/// `Coefficients` / `InitialStates` attributes or `Constant` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NumericValue {
    /// A signed or unsigned integer literal.
    Integer {
        /// The literal's value, stored widened.
        value: i64,
        /// Whether the literal is signed.
        signed: bool,
    },
    /// A floating-point literal.
    Real(f64),
    /// A complex literal, one real and one imaginary component, each of the
    /// same integer-or-real kind.
    Complex(Box<NumericValue>, Box<NumericValue>),
}

impl NumericValue {
    /// The number of bits required to represent an integer literal in true
    /// minimal two's-complement width (including the sign bit if signed).
    /// Returns `None` for non-integer values.
    ///
    /// A negative value that is exactly a power of two (`-2`, `-4`, `-8`, ...)
    /// needs one fewer bit than its magnitude's bit length would suggest,
    /// since two's complement's most negative representable value per width
    /// has no positive counterpart to reserve room for.
    pub fn integer_bits(&self) -> Option<u32> {
        match self {
            NumericValue::Integer { value, signed } => {
                if *signed && *value < 0 {
                    let mag = value.unsigned_abs();
                    let bits = 64 - (mag - 1).leading_zeros() + 1;
                    Some(bits.max(1))
                } else {
                    let mag_bits = 64 - (*value as u64).leading_zeros();
                    let bits = mag_bits + if *signed { 1 } else { 0 };
                    Some(bits.max(1))
                }
            }
            _ => None,
        }
    }

    /// True if this value (or either component of a complex pair) is fractional.
    pub fn is_fractional(&self) -> bool {
        match self {
            NumericValue::Integer { .. } => false,
            NumericValue::Real(_) => true,
            NumericValue::Complex(re, im) => re.is_fractional() || im.is_fractional(),
        }
    }

    /// True if this value is a complex pair.
    pub fn is_complex(&self) -> bool {
        matches!(self, NumericValue::Complex(..))
    }

    /// True if an integer value (or either component of a complex integer
    /// pair) is signed. Non-integer values are treated as signed.
    pub fn is_signed(&self) -> bool {
        match self {
            NumericValue::Integer { signed, .. } => *signed,
            NumericValue::Real(_) => true,
            NumericValue::Complex(re, im) => re.is_signed() || im.is_signed(),
        }
    }
}

/// Parse a dialect-agnostic, comma- or whitespace-separated list of numeric
/// literals, such as `"1, -2, 1"` or `"1+2i, 3-4i"`, into `NumericValue`s.
///
/// This is the parser the Data Model requires the IR to expose at its import
/// boundary; it has no dependency on any XML handling.
pub fn parse_numeric_list(node_id: NodeId, node_name: &str, text: &str) -> IrResult<Vec<NumericValue>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|tok| parse_one(node_id, node_name, tok))
        .collect()
}

fn parse_one(node_id: NodeId, node_name: &str, tok: &str) -> IrResult<NumericValue> {
    if let Some(idx) = find_imaginary_split(tok) {
        let (re_str, im_str) = tok.split_at(idx);
        let im_str = im_str.trim_end_matches(['i', 'I']);
        let re = parse_scalar(node_id, node_name, re_str)?;
        let im = parse_scalar(node_id, node_name, im_str)?;
        return Ok(NumericValue::Complex(Box::new(re), Box::new(im)));
    }
    parse_scalar(node_id, node_name, tok)
}

fn find_imaginary_split(tok: &str) -> Option<usize> {
    if !(tok.ends_with('i') || tok.ends_with('I')) {
        return None;
    }
    let bytes = tok.as_bytes();
    for i in (1..bytes.len()).rev() {
        let c = bytes[i] as char;
        if (c == '+' || c == '-') && !matches!(bytes[i - 1] as char, 'e' | 'E') {
            return Some(i);
        }
    }
    None
}

fn parse_scalar(node_id: NodeId, node_name: &str, tok: &str) -> IrResult<NumericValue> {
    let tok = tok.trim();
    if tok.contains('.') || tok.contains('e') || tok.contains('E') {
        tok.parse::<f64>().map(NumericValue::Real).map_err(|_| parse_err(node_id, node_name, tok))
    } else if let Ok(v) = tok.parse::<i64>() {
        Ok(NumericValue::Integer { value: v, signed: v < 0 })
    } else {
        tok.parse::<f64>().map(NumericValue::Real).map_err(|_| parse_err(node_id, node_name, tok))
    }
}

fn parse_err(node_id: NodeId, node_name: &str, tok: &str) -> IrError {
    IrError::Type {
        node_id,
        node_name: node_name.to_string(),
        message: format!("could not parse numeric literal '{tok}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeId;

    fn nid() -> NodeId {
        NodeId::new(0)
    }

    #[test]
    fn parses_plain_integers() {
        let vals = parse_numeric_list(nid(), "n", "1, -2, 1").unwrap();
        assert_eq!(vals.len(), 3);
        assert!(matches!(vals[1], NumericValue::Integer { value: -2, signed: true }));
    }

    #[test]
    fn parses_reals() {
        let vals = parse_numeric_list(nid(), "n", "0.5 -1.25").unwrap();
        assert_eq!(vals, vec![NumericValue::Real(0.5), NumericValue::Real(-1.25)]);
    }

    #[test]
    fn parses_complex_pair() {
        let vals = parse_numeric_list(nid(), "n", "1+2i").unwrap();
        match &vals[0] {
            NumericValue::Complex(re, im) => {
                assert!(matches!(**re, NumericValue::Integer { value: 1, .. }));
                assert!(matches!(**im, NumericValue::Integer { value: 2, .. }));
            }
            other => panic!("expected complex, got {other:?}"),
        }
    }

    #[test]
    fn integer_bits_accounts_for_sign() {
        let v = NumericValue::Integer { value: -2, signed: true };
        assert_eq!(v.integer_bits(), Some(2));
    }

    #[test]
    fn integer_bits_minimal_width_for_non_power_of_two_negative() {
        let v = NumericValue::Integer { value: -3, signed: true };
        assert_eq!(v.integer_bits(), Some(3));
    }

    #[test]
    fn integer_bits_for_positive_signed() {
        let v = NumericValue::Integer { value: 1, signed: true };
        assert_eq!(v.integer_bits(), Some(2));
    }
}
