//! Runtime values for the interpreter

use crate::error::{BooseError, Result};
use std::fmt;

/// Fixed-size row-major 2D array
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Zero-initialized matrix
    pub fn new(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        if row < self.rows && col < self.cols {
            Some(&mut self.data[row * self.cols + col])
        } else {
            None
        }
    }
}

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit integer
    Int(i64),
    /// 64-bit floating point
    Real(f64),
    /// Boolean
    Bool(bool),
    /// String (only produced by concatenation expressions)
    Str(String),
    IntArray(Vec<i64>),
    IntMatrix(Matrix<i64>),
    RealArray(Vec<f64>),
    RealMatrix(Matrix<f64>),
}

impl Value {
    /// Boolean coercion: non-zero numbers are true
    pub fn is_truthy(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::Real(x) => Ok(*x != 0.0),
            other => Err(BooseError::type_mismatch("boolean", other.type_name())),
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::IntArray(_) => "int array",
            Value::IntMatrix(_) => "int matrix",
            Value::RealArray(_) => "real array",
            Value::RealMatrix(_) => "real matrix",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Real(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Value::IntArray(_) | Value::IntMatrix(_) | Value::RealArray(_) | Value::RealMatrix(_)
        )
    }

    /// Try to convert to i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to convert to f64, widening integers
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Numeric value as an integer, truncating reals toward zero
    pub fn to_int(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Real(x) if x.is_finite() => Ok(x.trunc() as i64),
            other => Err(BooseError::type_mismatch("number", other.type_name())),
        }
    }

    pub fn to_real(&self) -> Result<f64> {
        self.as_real()
            .ok_or_else(|| BooseError::type_mismatch("number", self.type_name()))
    }

    /// Text used by `write`: reals with two decimals
    pub fn to_display_text(&self) -> String {
        match self {
            Value::Real(x) => format!("{x:.2}"),
            other => other.to_string(),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            // Keep a decimal point so the text reads back as a real
            Value::Real(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 => {
                write!(f, "{x:.1}")
            }
            Value::Real(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::IntArray(items) => write_list(f, items),
            Value::RealArray(items) => write_list(f, &items.iter().map(|x| Value::Real(*x)).collect::<Vec<_>>()),
            Value::IntMatrix(m) => write!(f, "int[{}, {}]", m.rows(), m.cols()),
            Value::RealMatrix(m) => write!(f, "real[{}, {}]", m.rows(), m.cols()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Int(a), Value::Real(b)) | (Value::Real(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::IntArray(a), Value::IntArray(b)) => a == b,
            (Value::IntMatrix(a), Value::IntMatrix(b)) => a == b,
            (Value::RealArray(a), Value::RealArray(b)) => a == b,
            (Value::RealMatrix(a), Value::RealMatrix(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Int(42)), "42");
        assert_eq!(format!("{}", Value::Real(3.25)), "3.25");
        assert_eq!(format!("{}", Value::Real(6.0)), "6.0");
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Str("hi".to_string())), "hi");
        assert_eq!(format!("{}", Value::IntArray(vec![1, 2])), "[1, 2]");
    }

    #[test]
    fn test_write_text_uses_two_decimals_for_reals() {
        assert_eq!(Value::Real(6.0).to_display_text(), "6.00");
        assert_eq!(Value::Int(6).to_display_text(), "6");
    }

    #[test]
    fn test_value_truthy() {
        assert!(Value::Bool(true).is_truthy().unwrap());
        assert!(!Value::Bool(false).is_truthy().unwrap());
        assert!(Value::Int(1).is_truthy().unwrap());
        assert!(!Value::Int(0).is_truthy().unwrap());
        assert!(Value::Real(0.5).is_truthy().unwrap());
        assert!(Value::Str("x".to_string()).is_truthy().is_err());
    }

    #[test]
    fn test_mixed_numeric_equality() {
        assert_eq!(Value::Int(6), Value::Real(6.0));
        assert_ne!(Value::Int(6), Value::Bool(true));
    }

    #[test]
    fn test_to_int_truncates() {
        assert_eq!(Value::Real(9.99).to_int().unwrap(), 9);
        assert_eq!(Value::Real(-2.5).to_int().unwrap(), -2);
        assert!(Value::Bool(true).to_int().is_err());
    }

    #[test]
    fn test_matrix_bounds() {
        let mut m: Matrix<i64> = Matrix::new(2, 3);
        assert_eq!(m.get(1, 2), Some(0));
        assert_eq!(m.get(2, 0), None);
        *m.get_mut(1, 1).unwrap() = 7;
        assert_eq!(m.get(1, 1), Some(7));
    }
}
