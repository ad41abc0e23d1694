use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::{
    employee::CreateEmployee,
    increment::CreateIncrement,
    leave::CreateLeave,
    md::{CreateMeeting, ExportFormat},
    payroll::{AwardBonus, ContributionBatch},
    promotion::CreatePromotion,
    records::{CreateKpi, CreateTraining},
    tasks::{CreateTask, UpdateTaskStatus},
};
use crate::auth::handlers::{LoginReq, RegisterReq, TokenPair};
use crate::calc::{
    contribution::Contribution,
    increment::{IncrementInput, IncrementSuggestion, IncrementType, PerformanceRating},
    payslip::{Allowances, Deductions, MonthlyPayslip, Payslip, YearToDate},
    salary::SalaryComponents,
};
use crate::model::{
    approval::{ApprovalStatus, ReviewRequest},
    bonus::Bonus,
    contribution::ContributionRow,
    employee::Employee,
    increment::Increment,
    kpi::Kpi,
    leave::{LeaveRequest, LeaveType},
    meeting::Meeting,
    promotion::Promotion,
    report::Report,
    role::Role,
    salary::Salary,
    task::Task,
    training::Training,
};
use crate::query::filter::QueryRequest;
use crate::report::{ReportParams, ReportType};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR & Payroll API",
        version = "1.0.0",
        description = r#"
## HR & Payroll service

Back end for the accountant, HR, manager and managing-director portals and
for employee self service.

### Key features
- **Employees**: hire (with opening salary), list, update, deactivate
- **Leave**: submit, approve/reject, history
- **Attendance**: daily check-in/check-out with automatic overtime
- **Increments & promotions**: calculator, requests, approvals that write salary history
- **Payroll**: payslips, year-to-date summaries, EPF/ETF batches, bonuses
- **Records**: filtered queries over KPI, leave, salary and training
- **Managing director**: dashboard, meetings, performance, reports with CSV export

### Security
Everything under `/api` requires a JWT access token (`Authorization: Bearer ...`).
Role checks are noted per endpoint.

### Response format
`{"success": true, "data": ...}` on success, `{"success": false, "error": "..."}` otherwise.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::deactivate_employee,

        crate::api::leave::create_leave,
        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,

        crate::api::increment::calculate,
        crate::api::increment::create_increment,
        crate::api::increment::list_increments,
        crate::api::increment::approve_increment,
        crate::api::increment::reject_increment,

        crate::api::promotion::create_promotion,
        crate::api::promotion::list_promotions,
        crate::api::promotion::approve_promotion,
        crate::api::promotion::reject_promotion,

        crate::api::payroll::payslip,
        crate::api::payroll::summary,
        crate::api::payroll::salary_history,
        crate::api::payroll::run_contributions,
        crate::api::payroll::list_contributions,
        crate::api::payroll::award_bonus,

        crate::api::records::query_records,
        crate::api::records::create_kpi,
        crate::api::records::create_training,

        crate::api::tasks::create_task,
        crate::api::tasks::list_tasks,
        crate::api::tasks::update_task_status,

        crate::api::md::dashboard,
        crate::api::md::create_meeting,
        crate::api::md::upcoming_meetings,
        crate::api::md::performance,
        crate::api::md::generate_report,
        crate::api::md::get_report
    ),
    components(
        schemas(
            RegisterReq,
            LoginReq,
            TokenPair,
            Role,
            CreateEmployee,
            Employee,
            CreateLeave,
            LeaveRequest,
            LeaveType,
            ApprovalStatus,
            ReviewRequest,
            IncrementInput,
            IncrementSuggestion,
            IncrementType,
            PerformanceRating,
            CreateIncrement,
            Increment,
            CreatePromotion,
            Promotion,
            Salary,
            SalaryComponents,
            Payslip,
            Allowances,
            Deductions,
            MonthlyPayslip,
            YearToDate,
            Contribution,
            ContributionRow,
            ContributionBatch,
            AwardBonus,
            Bonus,
            QueryRequest,
            CreateKpi,
            Kpi,
            CreateTraining,
            Training,
            CreateTask,
            UpdateTaskStatus,
            Task,
            CreateMeeting,
            Meeting,
            ReportParams,
            ReportType,
            Report,
            ExportFormat
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Accounts and tokens"),
        (name = "Employee", description = "Employee records"),
        (name = "Leave", description = "Leave requests and approvals"),
        (name = "Attendance", description = "Check-in, check-out and overtime"),
        (name = "Increments", description = "Increment calculator and approvals"),
        (name = "Promotions", description = "Promotion proposals and approvals"),
        (name = "Payroll", description = "Payslips, summaries, EPF/ETF and bonuses"),
        (name = "Records", description = "KPI, leave, salary and training records"),
        (name = "Tasks", description = "Task assignment"),
        (name = "Managing Director", description = "Dashboard, meetings, performance and reports"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_path_is_documented_with_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/increments/calculate"));
        assert!(doc.paths.paths.contains_key("/api/md/reports/{report_id}"));
        assert!(doc.paths.paths.contains_key("/auth/login"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
