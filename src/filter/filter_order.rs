use serde_json::Value;

use super::error::FilterError;
use super::types::{valid_identifier, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Array of strings like ["created_at desc", "title asc"]
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s)?),
                        other => {
                            return Err(FilterError::InvalidOperatorData(format!(
                                "order entries must be strings, got {}",
                                other
                            )))
                        }
                    }
                }
                Ok(out)
            }
            Value::Object(obj) => {
                // { "created_at": "desc", "title": "asc" }
                let mut out = Vec::new();
                for (column, v) in obj {
                    if !valid_identifier(column) {
                        return Err(FilterError::InvalidColumn(column.clone()));
                    }
                    let sort = match v.as_str().unwrap_or("asc").to_ascii_lowercase().as_str() {
                        "desc" => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    };
                    out.push(FilterOrderInfo {
                        column: column.clone(),
                        sort,
                    });
                }
                Ok(out)
            }
            Value::Null => Ok(vec![]),
            _ => Err(FilterError::InvalidOperatorData(
                "order must be a string, array, or object".to_string(),
            )),
        }
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        // Comma-separated tokens, each "column [asc|desc]"
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(column) = it.next() {
                if !valid_identifier(column) {
                    return Err(FilterError::InvalidColumn(column.to_string()));
                }
                let dir = it.next().unwrap_or("asc");
                let sort = if dir.eq_ignore_ascii_case("desc") {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                out.push(FilterOrderInfo {
                    column: column.to_string(),
                    sort,
                });
            }
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
