use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::calc::salary::SalaryComponents;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Salary {
    pub id: u64,
    pub employee_id: u64,
    pub basic_salary: f64,
    pub allowances: f64,
    pub ot_pay: f64,
    pub increment_pay: f64,
    pub bonus_pay: f64,
    pub total_salary: f64,
    #[schema(value_type = String, format = "date")]
    pub effective_date: NaiveDate,
}

impl Salary {
    pub fn components(&self) -> SalaryComponents {
        SalaryComponents {
            basic_salary: self.basic_salary,
            allowances: self.allowances,
            ot_pay: self.ot_pay,
            increment_pay: self.increment_pay,
            bonus_pay: self.bonus_pay,
        }
    }
}
