use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::FilterError;

/// Comparison and logical operators accepted in a `where` tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    NIn,
    Any,
    All,
    Between,
    Null,
}

/// Caller-supplied query: `where` tree, ordering, and paging.
///
/// The `where` value is the JSON operator language compiled by
/// [`FilterWhere`](super::filter_where::FilterWhere). Scoping conditions are
/// never part of this structure; they are forced in by the data layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    #[serde(rename = "where")]
    pub where_clause: Option<Value>,
    pub order: Option<Value>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl FilterData {
    pub fn with_where(where_clause: Value) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Default::default()
        }
    }
}

/// A typed SQL bind parameter.
///
/// JSON scalars are re-typed from the column naming convention of the schema
/// (see [`ColumnKind::of`]) so that parameters arrive at Postgres with the
/// type the column expects.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Uuid(Uuid),
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl SqlParam {
    /// Convert a JSON scalar into the parameter type the named column expects.
    pub fn from_value(column: &str, value: &Value) -> Result<SqlParam, FilterError> {
        match ColumnKind::of(column) {
            ColumnKind::Uuid | ColumnKind::UuidArray => {
                let s = value.as_str().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("column {} expects a UUID string", column))
                })?;
                let id = Uuid::parse_str(s).map_err(|_| {
                    FilterError::InvalidOperatorData(format!("column {} expects a UUID string", column))
                })?;
                Ok(SqlParam::Uuid(id))
            }
            ColumnKind::Timestamp => {
                let s = value.as_str().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("column {} expects an RFC 3339 timestamp", column))
                })?;
                let ts = DateTime::parse_from_rfc3339(s).map_err(|_| {
                    FilterError::InvalidOperatorData(format!("column {} expects an RFC 3339 timestamp", column))
                })?;
                Ok(SqlParam::Timestamp(ts.with_timezone(&Utc)))
            }
            ColumnKind::Date => {
                let s = value.as_str().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("column {} expects a YYYY-MM-DD date", column))
                })?;
                let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                    FilterError::InvalidOperatorData(format!("column {} expects a YYYY-MM-DD date", column))
                })?;
                Ok(SqlParam::Date(date))
            }
            ColumnKind::Plain => match value {
                Value::String(s) => Ok(SqlParam::Text(s.clone())),
                Value::Bool(b) => Ok(SqlParam::Bool(*b)),
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Ok(SqlParam::Int(i))
                    } else if let Some(f) = n.as_f64() {
                        Ok(SqlParam::Float(f))
                    } else {
                        Err(FilterError::InvalidOperatorData(format!(
                            "unrepresentable number for column {}",
                            column
                        )))
                    }
                }
                other => Err(FilterError::InvalidOperatorData(format!(
                    "unsupported value {} for column {}",
                    other, column
                ))),
            },
        }
    }
}

/// Parameter typing derived from the schema naming convention:
/// `id` and `*_id` are UUID, `*_ids` are UUID arrays, `*_at` are
/// timestamptz, `*_date` are DATE, everything else binds as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    UuidArray,
    Timestamp,
    Date,
    Plain,
}

impl ColumnKind {
    pub fn of(column: &str) -> ColumnKind {
        if column == "id" || column.ends_with("_id") {
            ColumnKind::Uuid
        } else if column.ends_with("_ids") {
            ColumnKind::UuidArray
        } else if column.ends_with("_at") {
            ColumnKind::Timestamp
        } else if column.ends_with("_date") {
            ColumnKind::Date
        } else {
            ColumnKind::Plain
        }
    }
}

/// Conditions the data layer prepends to every WHERE clause, ahead of
/// anything the caller supplied. Each pair compiles to `"column" = $n` and
/// is ANDed at the top level, so no caller-supplied operator tree can
/// relax it.
#[derive(Debug, Clone, Default)]
pub struct ForcedFilter {
    pairs: Vec<(String, SqlParam)>,
}

impl ForcedFilter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn equals(mut self, column: impl Into<String>, value: SqlParam) -> Self {
        self.pairs.push((column.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, SqlParam)] {
        &self.pairs
    }
}

#[derive(Debug, Clone, PartialEq)]
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

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Letters, digits and underscores, starting with a letter or underscore.
/// Everything that ends up quoted into SQL must pass this first.
pub(crate) fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
