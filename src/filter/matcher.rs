//! In-process evaluation of filters, mirroring the JSONB predicates.

use serde_json::Value;
use std::cmp::Ordering;

use super::types::{Condition, Filter, FilterOp};
use crate::database::schema::Document;

impl Filter {
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

impl Condition {
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };

        match actual {
            Value::Array(items) if self.is_array_field() => items.iter().any(|item| self.test(item)),
            _ => self.test(actual),
        }
    }

    fn test(&self, actual: &Value) -> bool {
        match self.op {
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::In => match &self.value {
                Value::Array(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
                other => values_equal(actual, other),
            },
            op => match compare_values(actual, &self.value) {
                Some(ordering) => match op {
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Gte => ordering != Ordering::Less,
                    FilterOp::Lt => ordering == Ordering::Less,
                    FilterOp::Lte => ordering != Ordering::Greater,
                    FilterOp::Eq | FilterOp::In => false,
                },
                None => false,
            },
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Order two scalars of the same JSON type; `None` across types.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total order used for sorting: a missing value sorts first, then JSON
/// types in `null < string < number < boolean < array < object` order.
pub fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => type_rank(x)
            .cmp(&type_rank(y))
            .then_with(|| compare_values(x, y).unwrap_or(Ordering::Equal)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
