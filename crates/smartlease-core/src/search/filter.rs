//! Keyword filter compilation
//!
//! Turns [`QueryMetadata`] into a [`Predicate`]: a conjunction of clauses that
//! renders to a parameterized SQL fragment. Values are always bound; column
//! names only ever come from [`MetadataField::column`].

use super::metadata::{MetadataField, QueryMetadata};
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use std::fmt;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"[0-9.]+").unwrap();
}

/// Numeric comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessThan,
    GreaterThan,
    Equal,
}

impl Comparison {
    pub fn as_sql(self) -> &'static str {
        match self {
            Comparison::LessThan => "<",
            Comparison::GreaterThan => ">",
            Comparison::Equal => "=",
        }
    }
}

/// A single filter clause
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Compare the numeric reading of a column against a number
    Numeric {
        field: MetadataField,
        op: Comparison,
        value: f64,
    },
    /// Case-insensitive substring match on the raw column text
    Contains { field: MetadataField, needle: String },
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Numeric { field, op, value } => {
                write!(f, "numeric({}) {} {}", field, op.as_sql(), value)
            }
            Clause::Contains { field, needle } => write!(f, "{} ILIKE '%{}%'", field, needle),
        }
    }
}

/// SQL text plus the values bound to its `?N` placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Conjunction of filter clauses. Empty means "match everything".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render as SQL with placeholders numbered from `first_param`.
    ///
    /// An empty predicate renders as an empty fragment with no parameters.
    pub fn to_sql(&self, first_param: usize) -> SqlFragment {
        let mut parts = Vec::with_capacity(self.clauses.len());
        let mut params = Vec::with_capacity(self.clauses.len());

        for (offset, clause) in self.clauses.iter().enumerate() {
            let idx = first_param + offset;
            match clause {
                Clause::Numeric { field, op, value } => {
                    parts.push(format!(
                        "numeric_value({}) {} ?{}",
                        field.column(),
                        op.as_sql(),
                        idx
                    ));
                    params.push(SqlValue::Real(*value));
                }
                Clause::Contains { field, needle } => {
                    parts.push(format!("contains_ci({}, ?{})", field.column(), idx));
                    params.push(SqlValue::Text(needle.clone()));
                }
            }
        }

        SqlFragment {
            sql: parts.join(" AND "),
            params,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

/// Compile extracted metadata into a predicate.
///
/// Per field, in precedence order:
/// 1. a string starting with `<` or `>` that holds a number becomes an
///    inequality on the column's numeric reading
/// 2. any value holding a number becomes numeric equality
/// 3. anything else becomes a case-insensitive substring match
///
/// Falsy values produce no clause.
pub fn compile(metadata: &QueryMetadata) -> Predicate {
    let clauses = metadata
        .iter()
        .filter(|(_, value)| !is_falsy(value))
        .map(|(field, value)| compile_value(field, value))
        .collect();
    Predicate::new(clauses)
}

fn compile_value(field: MetadataField, value: &Value) -> Clause {
    let text = value_text(value);
    let trimmed = text.trim();
    let number = extract_number(trimmed);

    if value.is_string() {
        let op = if trimmed.starts_with('<') {
            Some(Comparison::LessThan)
        } else if trimmed.starts_with('>') {
            Some(Comparison::GreaterThan)
        } else {
            None
        };
        if let (Some(op), Some(value)) = (op, number) {
            return Clause::Numeric { field, op, value };
        }
    }

    match number {
        Some(value) => Clause::Numeric {
            field,
            op: Comparison::Equal,
            value,
        },
        None => Clause::Contains {
            field,
            needle: trimmed.to_string(),
        },
    }
}

/// `null`, `false`, zero, blank strings and empty containers
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// First run of digits and dots in `text`, if it parses as a number
pub fn extract_number(text: &str) -> Option<f64> {
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
