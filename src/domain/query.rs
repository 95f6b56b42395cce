//! ExecuteBillQuery 的查詢描述與過濾條件。
//!
//! 過濾條件由具型別的述詞組成，值一律以單引號字面值輸出並跳脫內嵌引號，
//! 欄位鍵必須是合法識別字，不接受任意字串拼接。

use crate::utils::error::{QueryError, Result};
use crate::utils::validation::validate_field_key;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Date(NaiveDate),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            FilterValue::Date(date) => write!(f, "'{}'", date.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Eq(String, FilterValue),
    Ge(String, FilterValue),
    Le(String, FilterValue),
    LikePrefix(String, String),
    In(String, Vec<FilterValue>),
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq(field, value) => write!(f, "{}={}", field, value),
            Predicate::Ge(field, value) => write!(f, "{}>={}", field, value),
            Predicate::Le(field, value) => write!(f, "{}<={}", field, value),
            Predicate::LikePrefix(field, prefix) => {
                let escaped = prefix
                    .replace('\'', "''")
                    .replace('[', "[[]")
                    .replace('%', "[%]")
                    .replace('_', "[_]");
                write!(f, "{} like '{}%'", field, escaped)
            }
            Predicate::In(field, values) => {
                let list = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{} in ({})", field, list)
            }
        }
    }
}

/// 以 `and` 串接的過濾條件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: &str, value: impl Into<FilterValue>) -> Result<Self> {
        self.with(field, |field| Predicate::Eq(field, value.into()))
    }

    pub fn ge(self, field: &str, value: impl Into<FilterValue>) -> Result<Self> {
        self.with(field, |field| Predicate::Ge(field, value.into()))
    }

    pub fn le(self, field: &str, value: impl Into<FilterValue>) -> Result<Self> {
        self.with(field, |field| Predicate::Le(field, value.into()))
    }

    pub fn like_prefix(self, field: &str, prefix: &str) -> Result<Self> {
        self.with(field, |field| Predicate::LikePrefix(field, prefix.to_string()))
    }

    pub fn in_list<I, V>(self, field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        let values: Vec<FilterValue> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(QueryError::ValidationError {
                message: format!("'in' filter on {} needs at least one value", field),
            });
        }
        self.with(field, |field| Predicate::In(field, values))
    }

    fn with(mut self, field: &str, build: impl FnOnce(String) -> Predicate) -> Result<Self> {
        validate_field_key(field)?;
        self.predicates.push(build(field.to_string()));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses = self
            .predicates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        write!(f, "{}", clauses.join(" and "))
    }
}

/// 單次 ExecuteBillQuery 的查詢描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillQuery {
    pub form_id: String,
    pub field_keys: Vec<String>,
    pub filter: Filter,
    pub order_string: Option<String>,
    pub top_row_count: u32,
    pub start_row: u32,
    pub limit: u32,
}

impl BillQuery {
    pub fn new<I, S>(form_id: &str, field_keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let field_keys = field_keys
            .into_iter()
            .map(|key| {
                let key = key.as_ref().trim();
                validate_field_key(key).map(|_| key.to_string())
            })
            .collect::<Result<Vec<_>>>()?;

        if field_keys.is_empty() {
            return Err(QueryError::ValidationError {
                message: format!("query on {} requests no field keys", form_id),
            });
        }
        validate_field_key(form_id)?;

        Ok(Self {
            form_id: form_id.to_string(),
            field_keys,
            filter: Filter::new(),
            order_string: None,
            top_row_count: 0,
            start_row: 0,
            limit: 0,
        })
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// 排序子句，例如 `FDate DESC`
    pub fn order_by(mut self, field: &str, descending: bool) -> Result<Self> {
        validate_field_key(field)?;
        let direction = if descending { "DESC" } else { "ASC" };
        self.order_string = Some(format!("{} {}", field, direction));
        Ok(self)
    }

    pub fn with_paging(mut self, start_row: u32, limit: u32) -> Self {
        self.start_row = start_row;
        self.limit = limit;
        self
    }

    pub fn column_count(&self) -> usize {
        self.field_keys.len()
    }

    /// 轉成廠商 API 使用的欄位名稱
    pub fn to_wire(&self) -> WireBillQuery<'_> {
        WireBillQuery {
            form_id: &self.form_id,
            field_keys: self.field_keys.join(","),
            filter_string: self.filter.to_string(),
            order_string: self.order_string.as_deref().unwrap_or(""),
            top_row_count: self.top_row_count,
            start_row: self.start_row,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireBillQuery<'a> {
    pub form_id: &'a str,
    pub field_keys: String,
    pub filter_string: String,
    pub order_string: &'a str,
    pub top_row_count: u32,
    pub start_row: u32,
    pub limit: u32,
}
