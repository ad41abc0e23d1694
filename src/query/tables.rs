use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::filter::{Comparison::*, FilterDef, TableSpec};
use super::value::ValueKind::*;
use crate::model::{
    approval::APPROVAL_STATUSES, leave::LEAVE_TYPES, training::TRAINING_STATUSES,
};

pub static KPI: TableSpec = TableSpec {
    table: "kpi",
    columns: &[
        "id", "employee_id", "period_start", "period_end", "score", "rating", "comments",
        "reviewer_id", "created_at",
    ],
    filters: &[
        FilterDef::new("employee_id", "employee_id", Eq, Id),
        FilterDef::new("reviewer_id", "reviewer_id", Eq, Id),
        FilterDef::new("min_score", "score", Gte, Number),
        FilterDef::new("max_score", "score", Lte, Number),
        FilterDef::new("from_date", "period_start", Gte, Date),
        FilterDef::new("to_date", "period_end", Lte, Date),
    ],
    default_sort: "created_at",
};

pub static LEAVE: TableSpec = TableSpec {
    table: "leave_requests",
    columns: &[
        "id", "employee_id", "leave_type", "start_date", "end_date", "reason", "status",
        "reviewer_id", "reviewed_at", "comments", "created_at",
    ],
    filters: &[
        FilterDef::new("employee_id", "employee_id", Eq, Id),
        FilterDef::new("status", "status", Eq, OneOf(APPROVAL_STATUSES)),
        FilterDef::new("leave_type", "leave_type", Eq, OneOf(LEAVE_TYPES)),
        FilterDef::new("from_date", "start_date", Gte, Date),
        FilterDef::new("to_date", "end_date", Lte, Date),
    ],
    default_sort: "created_at",
};

pub static SALARY: TableSpec = TableSpec {
    table: "salary",
    columns: &[
        "id", "employee_id", "basic_salary", "allowances", "ot_pay", "increment_pay",
        "bonus_pay", "total_salary", "effective_date", "created_at",
    ],
    filters: &[
        FilterDef::new("employee_id", "employee_id", Eq, Id),
        FilterDef::new("min_basic", "basic_salary", Gte, Number),
        FilterDef::new("max_basic", "basic_salary", Lte, Number),
        FilterDef::new("min_total", "total_salary", Gte, Number),
        FilterDef::new("max_total", "total_salary", Lte, Number),
        FilterDef::new("from_date", "effective_date", Gte, Date),
        FilterDef::new("to_date", "effective_date", Lte, Date),
    ],
    default_sort: "effective_date",
};

pub static TRAINING: TableSpec = TableSpec {
    table: "training",
    columns: &[
        "id", "employee_id", "title", "provider", "start_date", "end_date", "status",
        "created_at",
    ],
    filters: &[
        FilterDef::new("employee_id", "employee_id", Eq, Id),
        FilterDef::new("status", "status", Eq, OneOf(TRAINING_STATUSES)),
        FilterDef::new("title", "title", Like, Text),
        FilterDef::new("provider", "provider", Like, Text),
        FilterDef::new("from_date", "start_date", Gte, Date),
        FilterDef::new("to_date", "end_date", Lte, Date),
    ],
    default_sort: "start_date",
};

static REGISTRY: Lazy<HashMap<&'static str, &'static TableSpec>> = Lazy::new(|| {
    HashMap::from([
        ("kpi", &KPI),
        ("leave", &LEAVE),
        ("salary", &SALARY),
        ("training", &TRAINING),
    ])
});

/// Looks up a queryable table by its public name.
pub fn lookup(name: &str) -> Option<&'static TableSpec> {
    REGISTRY.get(name).copied()
}

pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::QueryRequest;
    use serde_json::json;

    #[test]
    fn every_table_is_registered() {
        assert_eq!(names(), vec!["kpi", "leave", "salary", "training"]);
        assert_eq!(lookup("leave").map(|s| s.table), Some("leave_requests"));
        assert!(lookup("employees").is_none());
    }

    #[test]
    fn filters_and_sort_target_real_columns() {
        for name in names() {
            let spec = lookup(name).unwrap();
            assert!(spec.columns.contains(&spec.default_sort), "{name}");
            for f in spec.filters {
                assert!(spec.columns.contains(&f.column), "{name}.{}", f.column);
            }
        }
    }

    #[test]
    fn leave_status_filter_rejects_unknown_status() {
        let req: QueryRequest = serde_json::from_value(json!({
            "columns": ["id"],
            "filters": {"status": "maybe"}
        }))
        .unwrap();
        assert!(LEAVE.build(&req).is_err());
    }

    #[test]
    fn salary_sorts_by_effective_date() {
        let req: QueryRequest = serde_json::from_value(json!({
            "columns": ["id", "total_salary"],
            "filters": {"min_total": 1000}
        }))
        .unwrap();
        let built = SALARY.build(&req).unwrap();
        assert!(built.sql.contains("ORDER BY effective_date DESC"));
        assert!(built.sql.contains("total_salary >= ?"));
    }
}
