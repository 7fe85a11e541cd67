use serde_json::Value;

use super::error::FilterError;
use super::types::{Condition, Filter, FilterOp};
use crate::database::schema::{FieldSpec, ResourceSchema};

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Turn an operator-rewritten filter object into typed conditions.
    ///
    /// Top-level keys must be queryable schema fields; nested keys must be
    /// operators. Every operand is cast to the field kind.
    pub fn parse(where_data: &Value, schema: &ResourceSchema) -> Result<Filter, FilterError> {
        let obj = match where_data {
            Value::Object(obj) => obj,
            Value::Null => return Ok(Filter::default()),
            _ => return Err(FilterError::InvalidWhereClause("filter must be an object".to_string())),
        };

        let mut filter = Filter::default();
        for (key, value) in obj {
            let spec = schema
                .queryable_field(key)
                .ok_or_else(|| FilterError::UnknownField(key.clone()))?;

            match value {
                Value::Object(ops) => {
                    for (op_key, op_val) in ops {
                        let op = FilterOp::from_token(op_key)
                            .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                        filter.conditions.push(Self::condition(spec, op, op_val)?);
                    }
                }
                Value::Array(_) => filter.conditions.push(Self::condition(spec, FilterOp::In, value)?),
                _ => filter.conditions.push(Self::condition(spec, FilterOp::Eq, value)?),
            }
        }
        Ok(filter)
    }

    fn condition(spec: &FieldSpec, op: FilterOp, raw: &Value) -> Result<Condition, FilterError> {
        let value = if op == FilterOp::In {
            let candidates: Vec<Value> = match raw {
                Value::String(s) => s.split(',').map(|part| Value::String(part.to_string())).collect(),
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            Value::Array(
                candidates
                    .iter()
                    .map(|c| Self::cast_operand(spec, c))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        } else {
            Self::cast_operand(spec, raw)?
        };

        Ok(Condition {
            field: spec.name.to_string(),
            kind: spec.kind,
            op,
            value,
        })
    }

    /// Operands are scalars even for array fields, which compare element-wise.
    fn cast_operand(spec: &FieldSpec, raw: &Value) -> Result<Value, FilterError> {
        let invalid = |message: String| FilterError::InvalidValue {
            field: spec.name.to_string(),
            message,
        };
        if spec.is_array() {
            return match raw {
                Value::String(_) => Ok(raw.clone()),
                other => Err(invalid(format!("Invalid value {} for field '{}'", other, spec.name))),
            };
        }
        spec.cast(raw).map_err(invalid)
    }

    /// Compile a filter to a SQL predicate over a JSONB `data` column.
    ///
    /// Placeholders continue from `starting_param_index`; every operand is
    /// bound as JSONB.
    pub fn generate(filter: &Filter, starting_param_index: usize) -> (String, Vec<Value>) {
        let mut filter_where = Self::new(starting_param_index);
        let clause = filter_where.build(filter);
        (clause, filter_where.param_values)
    }

    fn build(&mut self, filter: &Filter) -> String {
        if filter.is_empty() {
            return "TRUE".to_string();
        }
        filter
            .conditions
            .iter()
            .map(|c| self.build_sql_condition(c))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn build_sql_condition(&mut self, condition: &Condition) -> String {
        let path = format!("data->{}", quote_literal(&condition.field));
        let array = condition.is_array_field();

        match condition.op {
            FilterOp::Eq if array => {
                let p = self.param(Value::Array(vec![condition.value.clone()]));
                format!("{} @> {}", path, p)
            }
            FilterOp::Eq => {
                let p = self.param(condition.value.clone());
                format!("{} = {}", path, p)
            }
            FilterOp::In if array => {
                let p = self.param(condition.value.clone());
                format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements({}) AS elem WHERE {} @> jsonb_build_array(elem))",
                    path, p
                )
            }
            FilterOp::In => {
                let p = self.param(condition.value.clone());
                format!("{} @> jsonb_build_array({})", p, path)
            }
            op if array => {
                let p = self.param(condition.value.clone());
                format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements({}) AS elem WHERE jsonb_typeof(elem) = jsonb_typeof({}) AND elem {} {})",
                    path, p, op.to_sql(), p
                )
            }
            op => {
                let p = self.param(condition.value.clone());
                format!(
                    "(jsonb_typeof({}) = jsonb_typeof({}) AND {} {} {})",
                    path, p, path, op.to_sql(), p
                )
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}::jsonb", self.param_index)
    }
}

/// Quote a field name as a SQL string literal for the `->` operator.
pub fn quote_literal(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}
