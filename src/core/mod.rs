pub mod engine;
pub mod normalizer;
pub mod report;

pub use crate::domain::model::{GroupedResult, QueryResult, ReportOutput, Row};
pub use crate::domain::ports::{BillQueryClient, ConfigProvider};
pub use crate::utils::error::Result;
