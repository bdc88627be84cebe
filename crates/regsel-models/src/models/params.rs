use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A single hyperparameter value as it appears in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_f64(&self, name: &str) -> Result<f64, ModelError> {
        match self {
            ParamValue::Int(v) => Ok(*v as f64),
            ParamValue::Float(v) => Ok(*v),
            other => Err(ModelError::invalid_param(
                name,
                format!("expected a number, got {}", other),
            )),
        }
    }

    pub fn as_usize(&self, name: &str) -> Result<usize, ModelError> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(ModelError::invalid_param(
                name,
                format!("expected a non-negative integer, got {}", other),
            )),
        }
    }

    pub fn as_str(&self, name: &str) -> Result<&str, ModelError> {
        match self {
            ParamValue::Str(s) => Ok(s.as_str()),
            other => Err(ModelError::invalid_param(
                name,
                format!("expected a string, got {}", other),
            )),
        }
    }

    pub fn as_bool(&self, name: &str) -> Result<bool, ModelError> {
        match self {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(ModelError::invalid_param(
                name,
                format!("expected a boolean, got {}", other),
            )),
        }
    }

    /// `None` for null, otherwise a non-negative integer.
    pub fn as_optional_usize(&self, name: &str) -> Result<Option<usize>, ModelError> {
        match self {
            ParamValue::Null => Ok(None),
            other => other.as_usize(name).map(Some),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "null"),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// One concrete hyperparameter assignment.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Search space: parameter name to the ordered values to try.
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Enumerate every combination of `grid`.
///
/// Keys are visited in sorted order and the last key varies fastest. An empty
/// grid yields exactly one (empty) combination.
pub fn expand_grid(grid: &ParamGrid) -> Vec<ParamSet> {
    let mut combos: Vec<ParamSet> = vec![ParamSet::new()];
    for (name, values) in grid {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for value in values {
                let mut extended = combo.clone();
                extended.insert(name.clone(), value.clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

/// Render a parameter set as `{a=1, b=x}` for log lines.
pub fn format_params(params: &ParamSet) -> String {
    let body = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grid_is_one_combination() {
        let combos = expand_grid(&ParamGrid::new());
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn last_key_varies_fastest() {
        let mut grid = ParamGrid::new();
        grid.insert("b".to_string(), vec![1i64.into(), 2i64.into()]);
        grid.insert("a".to_string(), vec!["x".into(), "y".into()]);

        let combos = expand_grid(&grid);
        assert_eq!(combos.len(), 4);
        assert_eq!(combos[0]["a"], ParamValue::from("x"));
        assert_eq!(combos[0]["b"], ParamValue::Int(1));
        assert_eq!(combos[1]["a"], ParamValue::from("x"));
        assert_eq!(combos[1]["b"], ParamValue::Int(2));
        assert_eq!(combos[2]["a"], ParamValue::from("y"));
    }

    #[test]
    fn untagged_json_values() {
        let grid: ParamGrid = serde_json::from_str(
            r#"{"learning_rate": [0.001, 0.1], "n_estimators": [8, 16], "max_depth": [null], "fit_intercept": [true]}"#,
        )
        .unwrap();
        assert_eq!(grid["learning_rate"][0], ParamValue::Float(0.001));
        assert_eq!(grid["n_estimators"][1], ParamValue::Int(16));
        assert_eq!(grid["max_depth"][0], ParamValue::Null);
        assert_eq!(grid["fit_intercept"][0], ParamValue::Bool(true));
    }

    #[test]
    fn numeric_accessors() {
        assert_eq!(ParamValue::Int(3).as_f64("x").unwrap(), 3.0);
        assert!(ParamValue::Int(-1).as_usize("x").is_err());
        assert_eq!(ParamValue::Null.as_optional_usize("x").unwrap(), None);
        assert!(ParamValue::from("sqrt").as_f64("x").is_err());
    }
}
