use crate::utils::error::{QueryError, Result};
use indexmap::IndexMap;
use serde::Serialize;

/// 單筆查詢結果：依位置存取的欄位值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row(pub Vec<String>);

impl Row {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(cells.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// 取欄位值，欄位不足時回報 `MalformedRow`
    pub fn column(&self, row: usize, index: usize) -> Result<&str> {
        self.get(index).ok_or(QueryError::MalformedRow {
            row,
            index,
            width: self.len(),
        })
    }

    /// 將 ERP 回傳的 JSON 儲存格轉成字串列
    pub fn from_json_cells(row: usize, cells: Vec<serde_json::Value>) -> Result<Self> {
        cells
            .into_iter()
            .enumerate()
            .map(|(column, cell)| match cell {
                serde_json::Value::String(s) => Ok(s),
                serde_json::Value::Null => Ok(String::new()),
                serde_json::Value::Number(n) => Ok(n.to_string()),
                serde_json::Value::Bool(b) => Ok(b.to_string()),
                other => Err(QueryError::MalformedResponse {
                    message: format!(
                        "row {} column {} is not a scalar value: {}",
                        row, column, other
                    ),
                }),
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

pub type QueryResult = Vec<Row>;

/// 依群組鍵分組的結果，鍵維持首次出現的順序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupedResult(IndexMap<String, Vec<String>>);

impl GroupedResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 將值附加到群組，第一次出現時建立群組
    pub fn push(&mut self, key: &str, value: String) {
        self.0.entry(key.to_string()).or_default().push(value);
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Vec<String>> {
        self.0.values_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 以欄位名稱呈現的一筆資料，欄位順序與名稱清單一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyedRecord {
    pub fields: IndexMap<String, String>,
}

impl KeyedRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// 報表輸出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportOutput {
    Rows(QueryResult),
    Values(Vec<String>),
    Grouped(GroupedResult),
    Records(Vec<KeyedRecord>),
}

impl ReportOutput {
    /// 用於日誌的項目數
    pub fn item_count(&self) -> usize {
        match self {
            ReportOutput::Rows(rows) => rows.len(),
            ReportOutput::Values(values) => values.len(),
            ReportOutput::Grouped(grouped) => grouped.len(),
            ReportOutput::Records(records) => records.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_from_json_cells() {
        let row = Row::from_json_cells(0, vec![json!("A"), json!(12.5), json!(null), json!(true)])
            .unwrap();
        assert_eq!(row, Row::new(["A", "12.5", "", "true"]));
    }

    #[test]
    fn test_row_from_json_cells_rejects_nested() {
        let err = Row::from_json_cells(3, vec![json!("A"), json!({"k": 1})]).unwrap_err();
        assert!(matches!(err, QueryError::MalformedResponse { .. }));
    }

    #[test]
    fn test_row_column_out_of_range() {
        let row = Row::new(["A"]);
        assert_eq!(row.column(0, 0).unwrap(), "A");
        match row.column(4, 1) {
            Err(QueryError::MalformedRow { row, index, width }) => {
                assert_eq!((row, index, width), (4, 1, 1));
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_grouped_result_serializes_in_insertion_order() {
        let mut grouped = GroupedResult::new();
        grouped.push("鏡頭", "L2".to_string());
        grouped.push("B", "x".to_string());
        grouped.push("鏡頭", "L1".to_string());

        let text = serde_json::to_string(&grouped).unwrap();
        assert_eq!(text, r#"{"鏡頭":["L2","L1"],"B":["x"]}"#);
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["鏡頭", "B"]);
    }

    #[test]
    fn test_keyed_record_serializes_in_field_order() {
        let record = KeyedRecord {
            fields: IndexMap::from([
                ("material_code".to_string(), "2.01".to_string()),
                ("material_name".to_string(), "主板".to_string()),
            ]),
        };
        assert_eq!(record.get("material_name"), Some("主板"));
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"material_code":"2.01","material_name":"主板"}"#
        );
    }
}
