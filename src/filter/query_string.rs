//! Query-string decoding with bracket nesting and the operator rewrite.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

static OPERATOR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(gt|gte|lt|lte|in)\b").expect("operator pattern is valid"));

/// Decode `a=1&price[gte]=10&tags[]=x` into a nested JSON object.
///
/// Bracket segments become nested objects, empty brackets append to an array,
/// and a repeated key collects its values into an array.
pub fn parse_query_string(raw: &str) -> Map<String, Value> {
    let mut root = Map::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let path = split_key(&key);
        if path.is_empty() || path[0].is_empty() {
            continue;
        }
        insert_path(&mut root, &path, Value::String(value.into_owned()));
    }
    root
}

/// Prefix every whole-word operator token in serialized JSON with `$`.
///
/// Word boundaries matter: `"rating"` is left alone while `"gte"` becomes `"$gte"`.
pub fn rewrite_operators(json: &str) -> String {
    OPERATOR_TOKEN
        .replace_all(json, |caps: &Captures| format!("${}", &caps[1]))
        .into_owned()
}

fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if !key.ends_with(']') {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    for part in key[open + 1..key.len() - 1].split("][") {
        segments.push(part.to_string());
    }
    segments
}

fn insert_path(map: &mut Map<String, Value>, path: &[String], value: Value) {
    let key = &path[0];

    if path.len() == 1 {
        append(map, key, value);
        return;
    }

    if path.len() == 2 && path[1].is_empty() {
        let slot = map.entry(key.clone()).or_insert_with(|| Value::Array(vec![]));
        match slot {
            Value::Array(items) => items.push(value),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, value]);
            }
        }
        return;
    }

    let child = map.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(child_map) = child {
        insert_path(child_map, &path[1..], value);
    }
}

fn append(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get_mut(key) {
        None => {
            map.insert(key.to_string(), value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
    }
}
