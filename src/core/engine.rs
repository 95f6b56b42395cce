use crate::core::report::{PolicyOverrides, Report};
use crate::domain::model::{GroupedResult, QueryResult, ReportOutput};
use crate::domain::ports::BillQueryClient;
use crate::domain::query::BillQuery;
use crate::utils::error::{report_failure, QueryError, Result};
use std::io::Write;

pub struct QueryEngine<C: BillQueryClient> {
    client: C,
    overrides: PolicyOverrides,
}

impl<C: BillQueryClient> QueryEngine<C> {
    pub fn new(client: C) -> Self {
        Self::with_overrides(client, PolicyOverrides::default())
    }

    pub fn with_overrides(client: C, overrides: PolicyOverrides) -> Self {
        Self { client, overrides }
    }

    /// 執行報表：查詢 → 正規化
    pub async fn run(&self, report: &Report) -> Result<ReportOutput> {
        tracing::info!("Running report '{}'", report.name());

        let output = match report {
            Report::BomLots { .. } => self.run_bom_lots(report).await?,
            _ => self.run_single(report).await?,
        };

        tracing::info!(
            "Report '{}' produced {} items",
            report.name(),
            output.item_count()
        );
        Ok(output)
    }

    /// 執行報表並輸出，回傳退出碼
    ///
    /// 成功時才寫 JSON 到 `out`；失敗時 `out` 保持空白，只在 `diagnostics` 寫出錯誤。
    pub async fn run_to_writer<W: Write, E: Write>(
        &self,
        report: &Report,
        pretty: bool,
        out: &mut W,
        diagnostics: &mut E,
    ) -> i32 {
        let result = match self.run(report).await {
            Ok(output) => write_output(out, &output, pretty),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => 0,
            Err(e) => report_failure(&e, diagnostics),
        }
    }

    async fn run_single(&self, report: &Report) -> Result<ReportOutput> {
        let query = report.query()?;
        let rows = self.extract(&query).await?;
        report.shape(&self.overrides).apply(rows)
    }

    async fn run_bom_lots(&self, report: &Report) -> Result<ReportOutput> {
        let material_numbers = match self.run_single(report).await? {
            ReportOutput::Values(values) => values,
            other => {
                return Err(QueryError::MalformedResponse {
                    message: format!("BOM step produced {} non-code items", other.item_count()),
                })
            }
        };

        if material_numbers.is_empty() {
            tracing::info!("BOM has no child items, skipping lot lookup");
            return Ok(ReportOutput::Grouped(GroupedResult::new()));
        }

        tracing::debug!("Looking up lots for {} BOM items", material_numbers.len());
        self.run_single(&Report::Lots { material_numbers }).await
    }

    async fn extract(&self, query: &BillQuery) -> Result<QueryResult> {
        tracing::debug!(
            "Querying form {} fields [{}] filter \"{}\"",
            query.form_id,
            query.field_keys.join(","),
            query.filter
        );
        let rows = self.client.execute_bill_query(query).await?;
        tracing::debug!("Form {} returned {} rows", query.form_id, rows.len());
        Ok(rows)
    }
}

/// 將結果序列化為 JSON 寫出，保留非 ASCII 字元
pub fn write_output<W: Write>(writer: &mut W, output: &ReportOutput, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, output)?;
    } else {
        serde_json::to_writer(&mut *writer, output)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
