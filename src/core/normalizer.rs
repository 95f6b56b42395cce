//! 查詢結果正規化：分組、截斷、去重、排序。
//!
//! 全部是純函式，不做 I/O。欄位不足的資料列視為上游違約，回報
//! `MalformedRow` 並中止整次正規化，不會略過。

use crate::domain::model::{GroupedResult, KeyedRecord, QueryResult};
use crate::utils::error::{QueryError, Result};
use indexmap::{IndexMap, IndexSet};

pub const DEFAULT_MAX_PER_GROUP: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationPolicy {
    pub group_key_index: usize,
    pub value_index: usize,
    pub max_per_group: usize,
    pub dedupe: bool,
    pub sort_descending: bool,
}

impl NormalizationPolicy {
    pub fn new(group_key_index: usize, value_index: usize) -> Self {
        Self {
            group_key_index,
            value_index,
            max_per_group: DEFAULT_MAX_PER_GROUP,
            dedupe: true,
            sort_descending: true,
        }
    }

    pub fn with_max_per_group(mut self, max_per_group: usize) -> Self {
        self.max_per_group = max_per_group;
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn with_sort_descending(mut self, sort_descending: bool) -> Self {
        self.sort_descending = sort_descending;
        self
    }
}

/// 依群組鍵分組後，每組先截斷、再去重、最後排序
pub fn normalize(rows: &QueryResult, policy: &NormalizationPolicy) -> Result<GroupedResult> {
    let mut grouped = GroupedResult::new();

    for (position, row) in rows.iter().enumerate() {
        let key = row.column(position, policy.group_key_index)?;
        let value = row.column(position, policy.value_index)?;
        grouped.push(key, value.to_string());
    }

    for values in grouped.values_mut() {
        finalize_group(values, policy);
    }

    tracing::debug!(
        "Normalized {} rows into {} groups",
        rows.len(),
        grouped.len()
    );
    Ok(grouped)
}

fn finalize_group(values: &mut Vec<String>, policy: &NormalizationPolicy) {
    values.truncate(policy.max_per_group);
    if policy.dedupe {
        dedupe_in_place(values);
    }
    if policy.sort_descending {
        values.sort_unstable_by(|a, b| b.cmp(a));
    }
}

fn dedupe_in_place(values: &mut Vec<String>) {
    let unique: IndexSet<String> = values.drain(..).collect();
    values.extend(unique);
}

/// 取單一欄位的相異值，依首次出現順序
pub fn flatten_unique(rows: &QueryResult, value_index: usize) -> Result<Vec<String>> {
    let mut values = IndexSet::new();

    for (position, row) in rows.iter().enumerate() {
        values.insert(row.column(position, value_index)?);
    }

    Ok(values.into_iter().map(str::to_string).collect())
}

/// 以欄位名稱轉成物件，並依 `key_index` 欄位去重（保留第一筆）
pub fn dedupe_by_key(
    rows: &QueryResult,
    field_names: &[&str],
    key_index: usize,
) -> Result<Vec<KeyedRecord>> {
    if key_index >= field_names.len() {
        return Err(QueryError::ValidationError {
            message: format!(
                "key index {} is outside the {} named fields",
                key_index,
                field_names.len()
            ),
        });
    }

    let mut records: IndexMap<&str, KeyedRecord> = IndexMap::new();

    for (position, row) in rows.iter().enumerate() {
        // 重複的資料列也要有完整欄位
        row.column(position, field_names.len() - 1)?;

        let key = row.column(position, key_index)?;
        if records.contains_key(key) {
            continue;
        }

        let fields = field_names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                row.column(position, index)
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect::<Result<IndexMap<_, _>>>()?;
        records.insert(key, KeyedRecord { fields });
    }

    Ok(records.into_values().collect())
}
