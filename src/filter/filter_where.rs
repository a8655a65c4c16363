use serde_json::Value;

use super::error::FilterError;
use super::types::{valid_identifier, FilterOp, ForcedFilter, SqlParam};

/// Compiles a JSON `where` tree into a parameterized SQL clause.
///
/// Forced conditions come first: each `ForcedFilter` pair becomes a
/// `"column" = $n` term ANDed at the top level of the clause, ahead of
/// anything the caller supplied. Whatever operator tree the caller nests
/// below it (including `$or`/`$not`), the forced terms stay outside of it
/// and cannot be relaxed.
pub struct FilterWhere {
    params: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn generate(
        where_data: Option<&Value>,
        forced: &ForcedFilter,
    ) -> Result<(String, Vec<SqlParam>), FilterError> {
        let mut builder = FilterWhere {
            params: Vec::new(),
            param_index: 0,
        };

        let mut conditions: Vec<String> = Vec::new();
        for (column, value) in forced.pairs() {
            if !valid_identifier(column) {
                return Err(FilterError::InvalidColumn(column.clone()));
            }
            let placeholder = builder.push_param(value.clone());
            conditions.push(format!("\"{}\" = {}", column, placeholder));
        }

        if let Some(data) = where_data {
            Self::validate(data)?;
            if let Some(sql) = builder.compile_node(data)? {
                conditions.push(sql);
            }
        }

        let clause = if conditions.is_empty() {
            "1=1".to_string()
        } else {
            conditions.join(" AND ")
        };
        Ok((clause, builder.params))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Object(_) | Value::Null => Ok(()),
            _ => Err(FilterError::InvalidWhereClause(
                "WHERE must be a JSON object".to_string(),
            )),
        }
    }

    fn compile_node(&mut self, node: &Value) -> Result<Option<String>, FilterError> {
        let obj = match node {
            Value::Null => return Ok(None),
            Value::Object(obj) => obj,
            _ => {
                return Err(FilterError::InvalidWhereClause(
                    "WHERE must be a JSON object".to_string(),
                ))
            }
        };

        let mut parts: Vec<String> = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                parts.push(self.compile_logical(key, value)?);
            } else {
                parts.extend(self.compile_field(key, value)?);
            }
        }

        if parts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(parts.join(" AND ")))
        }
    }

    fn compile_logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("{} requires an array", op))
                })?;
                if arr.is_empty() {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "{} requires a non-empty array",
                        op
                    )));
                }
                let mut branches = Vec::new();
                for node in arr {
                    let sql = self
                        .compile_node(node)?
                        .unwrap_or_else(|| "1=1".to_string());
                    branches.push(format!("({})", sql));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", branches.join(joiner)))
            }
            "$not" => {
                let sql = self
                    .compile_node(value)?
                    .unwrap_or_else(|| "1=1".to_string());
                Ok(format!("NOT ({})", sql))
            }
            other => Err(FilterError::UnsupportedOperator(other.to_string())),
        }
    }

    fn compile_field(&mut self, field: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        if !valid_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }

        if let Value::Object(ops) = value {
            let mut out = Vec::with_capacity(ops.len());
            for (op_key, op_val) in ops {
                let operator = Self::map_operator(op_key)?;
                out.push(self.compile_condition(field, operator, op_val)?);
            }
            Ok(out)
        } else {
            // Implicit equality: { field: value }
            Ok(vec![self.compile_condition(field, FilterOp::Eq, value)?])
        }
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$any" => FilterOp::Any,
            "$all" => FilterOp::All,
            "$between" => FilterOp::Between,
            "$null" => FilterOp::Null,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn compile_condition(
        &mut self,
        column: &str,
        operator: FilterOp,
        data: &Value,
    ) -> Result<String, FilterError> {
        let quoted = format!("\"{}\"", column);
        match operator {
            FilterOp::Eq => {
                if data.is_null() {
                    Ok(format!("{} IS NULL", quoted))
                } else {
                    let p = self.typed_param(column, data)?;
                    Ok(format!("{} = {}", quoted, p))
                }
            }
            FilterOp::Ne => {
                if data.is_null() {
                    Ok(format!("{} IS NOT NULL", quoted))
                } else {
                    let p = self.typed_param(column, data)?;
                    Ok(format!("{} <> {}", quoted, p))
                }
            }
            FilterOp::Gt => {
                let p = self.typed_param(column, data)?;
                Ok(format!("{} > {}", quoted, p))
            }
            FilterOp::Gte => {
                let p = self.typed_param(column, data)?;
                Ok(format!("{} >= {}", quoted, p))
            }
            FilterOp::Lt => {
                let p = self.typed_param(column, data)?;
                Ok(format!("{} < {}", quoted, p))
            }
            FilterOp::Lte => {
                let p = self.typed_param(column, data)?;
                Ok(format!("{} <= {}", quoted, p))
            }
            FilterOp::Like | FilterOp::ILike => {
                // Patterns always bind as text, whatever the column type
                let s = data.as_str().ok_or_else(|| {
                    FilterError::InvalidOperatorData(
                        "$like/$ilike expect a string pattern".to_string(),
                    )
                })?;
                let p = self.push_param(SqlParam::Text(s.to_string()));
                let keyword = if matches!(operator, FilterOp::Like) {
                    "LIKE"
                } else {
                    "ILIKE"
                };
                Ok(format!("{} {} {}", quoted, keyword, p))
            }
            FilterOp::In => {
                let values = data.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData("$in requires an array".to_string())
                })?;
                if values.is_empty() {
                    // Empty membership matches nothing
                    return Ok("1=0".to_string());
                }
                let placeholders = self.typed_params(column, values)?;
                Ok(format!("{} IN ({})", quoted, placeholders.join(", ")))
            }
            FilterOp::NIn => {
                let values = data.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData("$nin requires an array".to_string())
                })?;
                if values.is_empty() {
                    return Ok("1=1".to_string());
                }
                let placeholders = self.typed_params(column, values)?;
                Ok(format!("{} NOT IN ({})", quoted, placeholders.join(", ")))
            }
            FilterOp::Any => {
                let placeholders = self.array_params(column, data)?;
                Ok(format!("{} && ARRAY[{}]", quoted, placeholders.join(", ")))
            }
            FilterOp::All => {
                let placeholders = self.array_params(column, data)?;
                Ok(format!("{} @> ARRAY[{}]", quoted, placeholders.join(", ")))
            }
            FilterOp::Between => {
                let values = data.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData(
                        "$between requires an array of 2 values".to_string(),
                    )
                })?;
                if values.len() != 2 {
                    return Err(FilterError::InvalidOperatorData(
                        "$between requires exactly 2 values".to_string(),
                    ));
                }
                let low = self.typed_param(column, &values[0])?;
                let high = self.typed_param(column, &values[1])?;
                Ok(format!("{} BETWEEN {} AND {}", quoted, low, high))
            }
            FilterOp::Null => match data.as_bool() {
                Some(true) => Ok(format!("{} IS NULL", quoted)),
                Some(false) => Ok(format!("{} IS NOT NULL", quoted)),
                None => Err(FilterError::InvalidOperatorData(
                    "$null requires a boolean".to_string(),
                )),
            },
        }
    }

    fn typed_param(&mut self, column: &str, value: &Value) -> Result<String, FilterError> {
        let param = SqlParam::from_value(column, value)?;
        Ok(self.push_param(param))
    }

    fn typed_params(&mut self, column: &str, values: &[Value]) -> Result<Vec<String>, FilterError> {
        values.iter().map(|v| self.typed_param(column, v)).collect()
    }

    fn array_params(&mut self, column: &str, data: &Value) -> Result<Vec<String>, FilterError> {
        match data {
            Value::Array(values) if values.is_empty() => Err(FilterError::InvalidOperatorData(
                "$any/$all require at least one value".to_string(),
            )),
            Value::Array(values) => self.typed_params(column, values),
            scalar => Ok(vec![self.typed_param(column, scalar)?]),
        }
    }

    fn push_param(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}
