use std::cmp::Ordering;

use super::error::FilterError;
use super::filter_where::quote_literal;
use super::matcher::sort_order;
use super::types::{SortDirection, SortKey};
use crate::database::schema::{Document, ResourceSchema};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `a,-b`: comma-separated fields, a leading dash sorts descending.
    pub fn parse(sort: &str, schema: &ResourceSchema) -> Result<Vec<SortKey>, FilterError> {
        let mut out = Vec::new();
        for part in sort.split(',') {
            if part.is_empty() {
                continue;
            }
            let (field, direction) = match part.strip_prefix('-') {
                Some(rest) => (rest, SortDirection::Desc),
                None => (part, SortDirection::Asc),
            };
            if schema.queryable_field(field).is_none() {
                return Err(FilterError::UnknownField(field.to_string()));
            }
            out.push(SortKey { field: field.to_string(), direction });
        }
        Ok(out)
    }

    pub fn generate(keys: &[SortKey]) -> String {
        if keys.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = keys
            .iter()
            .map(|k| {
                let nulls = match k.direction {
                    SortDirection::Asc => "NULLS FIRST",
                    SortDirection::Desc => "NULLS LAST",
                };
                format!("data->{} {} {}", quote_literal(&k.field), k.direction.to_sql(), nulls)
            })
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// Compare two documents by the sort keys, in order.
    pub fn compare(keys: &[SortKey], a: &Document, b: &Document) -> Ordering {
        for key in keys {
            let ordering = sort_order(a.get(&key.field), b.get(&key.field));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::BOOTCAMPS;
    use serde_json::json;

    #[test]
    fn parses_mixed_directions() {
        let keys = FilterOrder::parse("name,-averageCost", &BOOTCAMPS).unwrap();
        assert_eq!(keys, vec![SortKey::asc("name"), SortKey::desc("averageCost")]);
    }

    #[test]
    fn rejects_unknown_sort_fields() {
        assert!(matches!(
            FilterOrder::parse("-nope", &BOOTCAMPS),
            Err(FilterError::UnknownField(f)) if f == "nope"
        ));
    }

    #[test]
    fn generates_jsonb_order_by() {
        let sql = FilterOrder::generate(&[SortKey::desc("createdAt"), SortKey::asc("name")]);
        assert_eq!(
            sql,
            "ORDER BY data->'createdAt' DESC NULLS LAST, data->'name' ASC NULLS FIRST"
        );
        assert_eq!(FilterOrder::generate(&[]), "");
    }

    #[test]
    fn compares_by_successive_keys() {
        let a = json!({ "housing": true, "name": "a" }).as_object().cloned().unwrap();
        let b = json!({ "housing": true, "name": "b" }).as_object().cloned().unwrap();
        let keys = vec![SortKey::desc("housing"), SortKey::desc("name")];
        assert_eq!(FilterOrder::compare(&keys, &a, &b), Ordering::Greater);
    }
}
