//! Named status entries for parameter and state exchange
//!
//! Parameters and state are read and written through a flat dictionary of
//! named values, the way a host engine exposes model properties to scripts.

use crate::error::*;
use std::collections::BTreeMap;

/// A single named status value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum StatusValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Double(f64),
    /// Array of floating point values
    Array(Vec<f64>),
}

impl From<bool> for StatusValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for StatusValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for StatusValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Vec<f64>> for StatusValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Array(v)
    }
}

/// Dictionary of named status values
pub type StatusDict = BTreeMap<String, StatusValue>;

/// Overwrite `target` with the double stored under `name`, if present.
///
/// Integers are accepted and widened.
pub(crate) fn update_f64(dict: &StatusDict, name: &str, target: &mut f64) -> Result<()> {
    match dict.get(name) {
        None => Ok(()),
        Some(StatusValue::Double(v)) => {
            *target = *v;
            Ok(())
        }
        Some(StatusValue::Int(v)) => {
            *target = *v as f64;
            Ok(())
        }
        Some(_) => Err(RuntimeError::type_mismatch(name, "double")),
    }
}

pub(crate) fn update_i64(dict: &StatusDict, name: &str, target: &mut i64) -> Result<()> {
    match dict.get(name) {
        None => Ok(()),
        Some(StatusValue::Int(v)) => {
            *target = *v;
            Ok(())
        }
        Some(_) => Err(RuntimeError::type_mismatch(name, "integer")),
    }
}

pub(crate) fn update_bool(dict: &StatusDict, name: &str, target: &mut bool) -> Result<()> {
    match dict.get(name) {
        None => Ok(()),
        Some(StatusValue::Bool(v)) => {
            *target = *v;
            Ok(())
        }
        Some(_) => Err(RuntimeError::type_mismatch(name, "bool")),
    }
}

pub(crate) fn update_array(dict: &StatusDict, name: &str, target: &mut Vec<f64>) -> Result<()> {
    match dict.get(name) {
        None => Ok(()),
        Some(StatusValue::Array(v)) => {
            target.clone_from(v);
            Ok(())
        }
        // a lone scalar is read as a one-element array
        Some(StatusValue::Double(v)) => {
            *target = vec![*v];
            Ok(())
        }
        Some(_) => Err(RuntimeError::type_mismatch(name, "array of doubles")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_helpers() {
        let mut dict = StatusDict::new();
        dict.insert("a".into(), 2.5.into());
        dict.insert("b".into(), 7i64.into());
        dict.insert("c".into(), true.into());
        dict.insert("d".into(), vec![1.0, 2.0].into());

        let mut a = 0.0;
        let mut b = 0i64;
        let mut c = false;
        let mut d = Vec::new();
        update_f64(&dict, "a", &mut a).unwrap();
        update_i64(&dict, "b", &mut b).unwrap();
        update_bool(&dict, "c", &mut c).unwrap();
        update_array(&dict, "d", &mut d).unwrap();
        assert_eq!((a, b, c), (2.5, 7, true));
        assert_eq!(d, vec![1.0, 2.0]);

        // widening int -> double
        let mut widened = 0.0;
        update_f64(&dict, "b", &mut widened).unwrap();
        assert_eq!(widened, 7.0);

        // missing keys leave the target untouched
        let mut untouched = 3.0;
        update_f64(&dict, "missing", &mut untouched).unwrap();
        assert_eq!(untouched, 3.0);
    }

    #[test]
    fn test_type_mismatch() {
        let mut dict = StatusDict::new();
        dict.insert("N".into(), 1.5.into());
        let mut n = 0i64;
        let err = update_i64(&dict, "N", &mut n).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
        assert_eq!(n, 0);
    }
}
