use sqlx::MySqlConnection;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    model::approval::{ApprovalStatus, Decision},
};

/// Tables that carry a `pending -> approved | rejected` workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalTable {
    Leave,
    Increment,
    Promotion,
}

impl ApprovalTable {
    fn table(self) -> &'static str {
        match self {
            ApprovalTable::Leave => "leave_requests",
            ApprovalTable::Increment => "increments",
            ApprovalTable::Promotion => "promotions",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ApprovalTable::Leave => "Leave request",
            ApprovalTable::Increment => "Increment",
            ApprovalTable::Promotion => "Promotion",
        }
    }
}

/// Moves a pending record to the decision's status.
///
/// The update only matches `status = 'pending'`, so of two concurrent
/// reviewers exactly one wins; the other gets a conflict.
pub async fn transition(
    conn: &mut MySqlConnection,
    target: ApprovalTable,
    id: u64,
    decision: Decision,
    reviewer_id: u64,
    comments: Option<&str>,
) -> AppResult<()> {
    let sql = transition_sql(target);

    let result = sqlx::query(&sql)
        .bind(decision.target().as_ref())
        .bind(reviewer_id)
        .bind(comments)
        .bind(id)
        .bind(ApprovalStatus::Pending.as_ref())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        let status: Option<String> =
            sqlx::query_scalar(&format!("SELECT status FROM {} WHERE id = ?", target.table()))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        return Err(unmatched(target, status.as_deref()));
    }

    info!(table = target.table(), id, reviewer_id, status = %decision.target(), "Review recorded");
    Ok(())
}

fn transition_sql(target: ApprovalTable) -> String {
    format!(
        "UPDATE {} SET status = ?, reviewer_id = ?, reviewed_at = NOW(), comments = ? \
         WHERE id = ? AND status = ?",
        target.table()
    )
}

/// Error for a guarded update that matched nothing, given the stored status.
fn unmatched(target: ApprovalTable, stored_status: Option<&str>) -> AppError {
    match stored_status {
        None => AppError::not_found(format!("{} not found", target.label())),
        Some(s) => AppError::conflict(format!("{} already {}", target.label(), s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_only_matches_pending_rows() {
        for target in [ApprovalTable::Leave, ApprovalTable::Increment, ApprovalTable::Promotion] {
            let sql = transition_sql(target);
            assert!(sql.starts_with(&format!("UPDATE {} SET", target.table())));
            assert!(sql.ends_with("WHERE id = ? AND status = ?"), "{sql}");
        }
    }

    #[test]
    fn missing_record_is_not_found() {
        let err = unmatched(ApprovalTable::Increment, None);
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Increment not found"));
    }

    #[test]
    fn processed_record_is_a_conflict() {
        let err = unmatched(ApprovalTable::Promotion, Some("approved"));
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Promotion already approved"));

        let err = unmatched(ApprovalTable::Leave, Some("rejected"));
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Leave request already rejected"));
    }
}
