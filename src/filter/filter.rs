//! Advanced results: compile a request query string into a paged read.

use serde_json::{Map, Value};
use tracing::debug;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::query_string::{parse_query_string, rewrite_operators};
use super::types::{FindQuery, Filter, PageRef, Pagination, SortKey};
use crate::config::QueryConfig;
use crate::database::schema::{ResourceSchema, CREATED_AT_FIELD};

/// Keys consumed by projection, sorting and paging; never part of the filter.
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

const DEFAULT_PAGE: u64 = 1;

/// Largest offset a store can be asked to skip (Postgres `OFFSET` is a bigint).
const MAX_INDEX: u64 = i64::MAX as u64;

#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedQuery {
    pub filter: Filter,
    pub projection: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub page: u64,
    pub limit: u64,
}

impl AdvancedQuery {
    pub fn parse(
        raw: Option<&str>,
        schema: &ResourceSchema,
        config: &QueryConfig,
    ) -> Result<Self, FilterError> {
        Self::from_params(parse_query_string(raw.unwrap_or_default()), schema, config)
    }

    pub fn from_params(
        mut params: Map<String, Value>,
        schema: &ResourceSchema,
        config: &QueryConfig,
    ) -> Result<Self, FilterError> {
        let [select, sort, page, limit] = RESERVED_KEYS.map(|key| params.remove(key));

        // Operators are rewritten on the serialized form so that only whole
        // words gain the `$` prefix.
        let serialized = serde_json::to_string(&Value::Object(params))?;
        let rewritten = rewrite_operators(&serialized);
        let where_data: Value = serde_json::from_str(&rewritten)?;
        let filter = FilterWhere::parse(&where_data, schema)?;

        let projection = select.as_ref().and_then(as_text).and_then(|s| {
            let fields: Vec<String> = s
                .split(',')
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect();
            (!fields.is_empty()).then_some(fields)
        });

        let mut sort_keys = match sort.as_ref().and_then(as_text) {
            Some(s) => FilterOrder::parse(&s, schema)?,
            None => vec![],
        };
        if sort_keys.is_empty() {
            sort_keys.push(SortKey::desc(CREATED_AT_FIELD));
        }

        let page = positive_int(page.as_ref()).unwrap_or(DEFAULT_PAGE);
        let mut limit = positive_int(limit.as_ref()).unwrap_or(config.default_limit);
        if let Some(max) = config.max_limit {
            if limit > max {
                debug!("Capping page limit {} to {}", limit, max);
                limit = max;
            }
        }

        debug!(
            collection = schema.collection,
            conditions = filter.conditions.len(),
            page,
            limit,
            "Translated advanced query"
        );

        Ok(Self { filter, projection, sort: sort_keys, page, limit })
    }

    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit).min(MAX_INDEX)
    }

    pub fn end_index(&self) -> u64 {
        self.page.saturating_mul(self.limit).min(MAX_INDEX)
    }

    /// Neighbouring page links for a collection of `total` documents.
    pub fn pagination(&self, total: u64) -> Pagination {
        let mut pagination = Pagination::default();
        if self.end_index() < total {
            pagination.next = Some(PageRef { page: self.page + 1, limit: self.limit });
        }
        if self.start_index() > 0 {
            pagination.prev = Some(PageRef { page: self.page - 1, limit: self.limit });
        }
        pagination
    }

    pub fn to_find_query(&self) -> FindQuery {
        FindQuery {
            filter: self.filter.clone(),
            projection: self.projection.clone(),
            sort: self.sort.clone(),
            skip: self.start_index(),
            limit: Some(self.limit),
        }
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

/// Leading-integer parse in the manner of `parseInt(s, 10)`: optional
/// whitespace and sign, then digits; trailing text is ignored.
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let n: i64 = digits[..end].parse().ok()?;
    Some(if negative { -n } else { n })
}

fn positive_int(value: Option<&Value>) -> Option<u64> {
    let n = parse_leading_int(&as_text(value?)?)?;
    (n >= 1).then_some(n as u64)
}
