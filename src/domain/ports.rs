use crate::domain::model::QueryResult;
use crate::domain::query::BillQuery;
use crate::utils::error::Result;
use async_trait::async_trait;

/// ERP 單據查詢的外部協作者
#[async_trait]
pub trait BillQueryClient: Send + Sync {
    async fn execute_bill_query(&self, query: &BillQuery) -> Result<QueryResult>;
}

#[async_trait]
impl<C: BillQueryClient + ?Sized> BillQueryClient for &C {
    async fn execute_bill_query(&self, query: &BillQuery) -> Result<QueryResult> {
        (**self).execute_bill_query(query).await
    }
}

pub trait ConfigProvider: Send + Sync {
    fn server_url(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
    /// 每次請求附帶的靜態標頭
    fn headers(&self) -> Vec<(String, String)>;
}
