use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// A row of the monthly EPF/ETF ledger.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct ContributionRow {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub month: NaiveDate,
    pub basic_salary: f64,
    pub epf_employee: f64,
    pub epf_employer: f64,
    pub etf: f64,
}
