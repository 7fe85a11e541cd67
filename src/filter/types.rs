use serde::Serialize;
use serde_json::Value;

use crate::database::schema::{Document, FieldKind, ID_FIELD};

/// Comparison operators understood by every store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    /// Map a rewritten operator key (`$gte`) to an operator.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "$gt" => Some(FilterOp::Gt),
            "$gte" => Some(FilterOp::Gte),
            "$lt" => Some(FilterOp::Lt),
            "$lte" => Some(FilterOp::Lte),
            "$in" => Some(FilterOp::In),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "IN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub kind: FieldKind,
    pub op: FilterOp,
    /// Already cast to the field kind; an array of candidates for `In`
    pub value: Value,
}

impl Condition {
    pub fn eq(field: impl Into<String>, kind: FieldKind, value: Value) -> Self {
        Self { field: field.into(), kind, op: FilterOp::Eq, value }
    }

    pub fn one_of(field: impl Into<String>, kind: FieldKind, values: Vec<Value>) -> Self {
        Self { field: field.into(), kind, op: FilterOp::In, value: Value::Array(values) }
    }

    pub fn is_array_field(&self) -> bool {
        self.kind == FieldKind::StringArray
    }
}

/// Conjunction of conditions; empty matches every document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

/// A compiled read against one collection
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filter: Filter,
    pub projection: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn filtered(filter: Filter) -> Self {
        Self { filter, ..Default::default() }
    }

    /// Restrict a document to the projected fields; `id` is always kept.
    pub fn project(&self, doc: Document) -> Document {
        match &self.projection {
            None => doc,
            Some(fields) => doc
                .into_iter()
                .filter(|(k, _)| k == ID_FIELD || fields.iter().any(|f| f == k))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

/// Links to neighbouring pages; serializes as `{}` when neither exists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}
