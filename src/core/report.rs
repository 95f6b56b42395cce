//! 報表目錄：每種報表固定一組查詢描述與輸出形狀。

use crate::core::normalizer::{
    dedupe_by_key, flatten_unique, normalize, NormalizationPolicy, DEFAULT_MAX_PER_GROUP,
};
use crate::domain::model::{QueryResult, ReportOutput};
use crate::domain::query::{BillQuery, Filter};
use crate::utils::error::Result;
use chrono::NaiveDate;

const MATERIAL_FIELDS: &[&str] = &["material_code", "material_name"];

/// 分組報表的政策覆寫（來自命令列或設定檔）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyOverrides {
    pub max_per_group: usize,
    pub dedupe: bool,
    pub sort_descending: bool,
}

impl Default for PolicyOverrides {
    fn default() -> Self {
        Self {
            max_per_group: DEFAULT_MAX_PER_GROUP,
            dedupe: true,
            sort_descending: true,
        }
    }
}

impl PolicyOverrides {
    fn policy(&self, group_key_index: usize, value_index: usize) -> NormalizationPolicy {
        NormalizationPolicy::new(group_key_index, value_index)
            .with_max_per_group(self.max_per_group)
            .with_dedupe(self.dedupe)
            .with_sort_descending(self.sort_descending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// 生產領料單的物料與批號
    PickLots { mo_number: String },
    /// BOM 子項物料編碼
    BomItems { material_number: String },
    /// 各物料最近的批號
    Lots { material_numbers: Vec<String> },
    /// 先查 BOM 子項，再查子項的批號
    BomLots { material_number: String },
    /// 生產訂單涉及的物料
    Materials,
    /// 依編碼前綴查物料主檔
    ProductMaterials { prefix: String },
    /// 銷售出庫單，依客戶分組
    Outstock {
        status: String,
        from: NaiveDate,
        to: NaiveDate,
    },
    /// 任意表單的原始查詢
    Custom {
        form_id: String,
        field_keys: Vec<String>,
        equals: Vec<(String, String)>,
        order_by: Option<(String, bool)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Rows,
    FlattenUnique { value_index: usize },
    Grouped(NormalizationPolicy),
    KeyedUnique {
        field_names: &'static [&'static str],
        key_index: usize,
    },
}

impl Shape {
    pub fn apply(&self, rows: QueryResult) -> Result<ReportOutput> {
        match self {
            Shape::Rows => Ok(ReportOutput::Rows(rows)),
            Shape::FlattenUnique { value_index } => {
                flatten_unique(&rows, *value_index).map(ReportOutput::Values)
            }
            Shape::Grouped(policy) => normalize(&rows, policy).map(ReportOutput::Grouped),
            Shape::KeyedUnique {
                field_names,
                key_index,
            } => dedupe_by_key(&rows, field_names, *key_index).map(ReportOutput::Records),
        }
    }
}

impl Report {
    pub fn name(&self) -> &'static str {
        match self {
            Report::PickLots { .. } => "pick-lots",
            Report::BomItems { .. } => "bom-items",
            Report::Lots { .. } => "lots",
            Report::BomLots { .. } => "bom-lots",
            Report::Materials => "materials",
            Report::ProductMaterials { .. } => "product-materials",
            Report::Outstock { .. } => "outstock",
            Report::Custom { .. } => "query",
        }
    }

    /// 單次查詢的描述；`BomLots` 由引擎拆成兩步，這裡回傳第一步
    pub fn query(&self) -> Result<BillQuery> {
        match self {
            Report::PickLots { mo_number } => {
                BillQuery::new("PRD_PickMtrl", ["FMaterialId.FName", "FLot"])?
                    .with_filter(Filter::new().eq("FMoBillNo", mo_number.as_str())?)
                    .order_by("FDate", true)
            }
            Report::BomItems { material_number } | Report::BomLots { material_number } => {
                Ok(BillQuery::new(
                    "ENG_BOM",
                    ["FMATERIALIDCHILD.FName", "FMATERIALIDCHILD.FNumber"],
                )?
                .with_filter(Filter::new().eq("FMaterialId.FNumber", material_number.as_str())?))
            }
            Report::Lots { material_numbers } => Ok(BillQuery::new(
                "BD_BatchMainFile",
                [
                    "FNumber",
                    "FLotId",
                    "FMaterialId.FNumber",
                    "FMaterialId.FName",
                ],
            )?
            .with_filter(Filter::new().in_list(
                "FMaterialId.FNumber",
                material_numbers.iter().map(String::as_str),
            )?)),
            Report::Materials => {
                BillQuery::new("PRD_MO", ["FMaterialID.FNumber", "FMaterialID.FName"])
            }
            Report::ProductMaterials { prefix } => Ok(BillQuery::new(
                "BD_MATERIAL",
                ["FNumber", "FName"],
            )?
            .with_filter(Filter::new().like_prefix("FNumber", prefix)?)),
            Report::Outstock { status, from, to } => BillQuery::new(
                "SAL_OUTSTOCK",
                ["FBillNo", "FDate", "FDocumentStatus", "FCustomerID.FName"],
            )?
            .with_filter(
                Filter::new()
                    .eq("FDocumentStatus", status.as_str())?
                    .ge("FDate", *from)?
                    .le("FDate", *to)?,
            )
            .order_by("FDate", true),
            Report::Custom {
                form_id,
                field_keys,
                equals,
                order_by,
            } => {
                let mut filter = Filter::new();
                for (field, value) in equals {
                    filter = filter.eq(field, value.as_str())?;
                }
                let query = BillQuery::new(form_id, field_keys)?.with_filter(filter);
                match order_by {
                    Some((field, descending)) => query.order_by(field, *descending),
                    None => Ok(query),
                }
            }
        }
    }

    /// 回傳資料的輸出形狀；`BomLots` 為第一步（子項編碼）的形狀
    pub fn shape(&self, overrides: &PolicyOverrides) -> Shape {
        match self {
            Report::PickLots { .. } | Report::Custom { .. } => Shape::Rows,
            Report::BomItems { .. } | Report::BomLots { .. } => {
                Shape::FlattenUnique { value_index: 1 }
            }
            Report::Lots { .. } => Shape::Grouped(overrides.policy(3, 0)),
            Report::Materials | Report::ProductMaterials { .. } => Shape::KeyedUnique {
                field_names: MATERIAL_FIELDS,
                key_index: 0,
            },
            Report::Outstock { .. } => Shape::Grouped(overrides.policy(3, 0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Row;

    #[test]
    fn test_lots_query_uses_in_filter() {
        let report = Report::Lots {
            material_numbers: vec!["1.01.001".to_string(), "1.01.002".to_string()],
        };
        let query = report.query().unwrap();
        assert_eq!(query.form_id, "BD_BatchMainFile");
        assert_eq!(
            query.filter.to_string(),
            "FMaterialId.FNumber in ('1.01.001', '1.01.002')"
        );
        assert_eq!(query.column_count(), 4);
    }

    #[test]
    fn test_lots_without_materials_is_rejected() {
        let report = Report::Lots {
            material_numbers: Vec::new(),
        };
        assert!(report.query().is_err());
    }

    #[test]
    fn test_pick_lots_query() {
        let query = Report::PickLots {
            mo_number: "MO000748".to_string(),
        }
        .query()
        .unwrap();
        assert_eq!(query.filter.to_string(), "FMoBillNo='MO000748'");
        assert_eq!(query.order_string.as_deref(), Some("FDate DESC"));
    }

    #[test]
    fn test_outstock_query_and_shape() {
        let report = Report::Outstock {
            status: "C".to_string(),
            from: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 10, 26).unwrap(),
        };
        let query = report.query().unwrap();
        assert_eq!(
            query.filter.to_string(),
            "FDocumentStatus='C' and FDate>='2025-10-01' and FDate<='2025-10-26'"
        );

        let overrides = PolicyOverrides {
            max_per_group: 2,
            ..PolicyOverrides::default()
        };
        let rows = vec![
            Row::new(["XS001", "2025-10-02", "C", "客戶甲"]),
            Row::new(["XS003", "2025-10-05", "C", "客戶甲"]),
            Row::new(["XS004", "2025-10-06", "C", "客戶甲"]),
            Row::new(["XS002", "2025-10-03", "C", "客戶乙"]),
        ];
        let output = report.shape(&overrides).apply(rows).unwrap();
        assert_eq!(
            serde_json::to_string(&output).unwrap(),
            r#"{"客戶甲":["XS003","XS001"],"客戶乙":["XS002"]}"#
        );
    }

    #[test]
    fn test_custom_query_with_filters() {
        let report = Report::Custom {
            form_id: "BD_MATERIAL".to_string(),
            field_keys: vec!["FNumber".to_string(), "FName".to_string()],
            equals: vec![("FUseOrgId.FNumber".to_string(), "100".to_string())],
            order_by: Some(("FNumber".to_string(), false)),
        };
        let query = report.query().unwrap();
        assert_eq!(query.filter.to_string(), "FUseOrgId.FNumber='100'");
        assert_eq!(query.order_string.as_deref(), Some("FNumber ASC"));
        assert_eq!(report.shape(&PolicyOverrides::default()), Shape::Rows);
    }

    #[test]
    fn test_materials_shape_dedupes_by_code() {
        let rows = vec![
            Row::new(["2.01", "主板"]),
            Row::new(["2.01", "主板"]),
            Row::new(["2.02", "外殼"]),
        ];
        let output = Report::Materials
            .shape(&PolicyOverrides::default())
            .apply(rows)
            .unwrap();
        assert_eq!(
            serde_json::to_string(&output).unwrap(),
            r#"[{"material_code":"2.01","material_name":"主板"},{"material_code":"2.02","material_name":"外殼"}]"#
        );
    }
}
