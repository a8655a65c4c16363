use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{valid_identifier, FilterData, FilterOrderInfo, ForcedFilter, SqlResult};

/// Builds one `SELECT` statement for a table: caller-supplied `where`,
/// ordering and paging, plus the forced conditions the data layer injects.
pub struct Filter {
    table_name: String,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
    forced: ForcedFilter,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !valid_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(table_name));
        }
        Ok(Self {
            table_name,
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
            forced: ForcedFilter::none(),
        })
    }

    /// Conditions prepended to the WHERE clause ahead of any caller input.
    pub fn force(mut self, forced: ForcedFilter) -> Self {
        self.forced = forced;
        self
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if let Some(limit) = data.limit {
            self.limit(limit, data.offset)?;
        } else if let Some(offset) = data.offset {
            self.limit(crate::config::config().filter.max_limit, Some(offset))?;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit(
                "limit must be non-negative".to_string(),
            ));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset(
                    "offset must be non-negative".to_string(),
                ));
            }
        }

        let max_limit = crate::config::config().filter.max_limit;
        let applied = if limit > max_limit {
            tracing::debug!("limit {} exceeds max {}, capping", limit, max_limit);
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) =
            FilterWhere::generate(self.where_data.as_ref(), &self.forced)?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT * FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::SqlParam;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn builds_full_select_with_forced_scope() {
        let tenant = Uuid::new_v4();
        let mut filter = Filter::new("grievances")
            .unwrap()
            .force(ForcedFilter::none().equals("tenant_id", SqlParam::Uuid(tenant)));
        filter
            .assign(FilterData {
                where_clause: Some(json!({"status": "open"})),
                order: Some(json!("received_at desc")),
                limit: Some(25),
                offset: Some(50),
            })
            .unwrap();

        let result = filter.to_sql().unwrap();
        assert_eq!(
            result.query,
            "SELECT * FROM \"grievances\" WHERE \"tenant_id\" = $1 AND \"status\" = $2 \
             ORDER BY \"received_at\" DESC LIMIT 25 OFFSET 50"
        );
        assert_eq!(result.params.len(), 2);
    }

    #[test]
    fn empty_filter_selects_everything_in_scope() {
        let tenant = Uuid::new_v4();
        let filter = Filter::new("projects")
            .unwrap()
            .force(ForcedFilter::none().equals("tenant_id", SqlParam::Uuid(tenant)));
        let result = filter.to_sql().unwrap();
        assert_eq!(
            result.query,
            "SELECT * FROM \"projects\" WHERE \"tenant_id\" = $1"
        );
    }

    #[test]
    fn unscoped_empty_filter_is_plain_select() {
        let filter = Filter::new("tenants").unwrap();
        let result = filter.to_sql().unwrap();
        assert_eq!(result.query, "SELECT * FROM \"tenants\" WHERE 1=1");
        assert!(result.params.is_empty());
    }

    #[test]
    fn rejects_bad_table_names() {
        assert!(Filter::new("").is_err());
        assert!(Filter::new("bad-table").is_err());
        assert!(Filter::new("tenants; DROP TABLE tenants").is_err());
    }

    #[test]
    fn caps_limit_at_configured_max() {
        let max = crate::config::config().filter.max_limit;
        let mut filter = Filter::new("grievances").unwrap();
        filter.limit(max + 500, None).unwrap();
        let result = filter.to_sql().unwrap();
        assert!(
            result.query.ends_with(&format!("LIMIT {}", max)),
            "query: {}",
            result.query
        );
    }

    #[test]
    fn rejects_negative_limit_and_offset() {
        let mut filter = Filter::new("grievances").unwrap();
        assert!(matches!(
            filter.limit(-1, None),
            Err(FilterError::InvalidLimit(_))
        ));
        let mut filter = Filter::new("grievances").unwrap();
        assert!(matches!(
            filter.limit(10, Some(-5)),
            Err(FilterError::InvalidOffset(_))
        ));
    }
}
