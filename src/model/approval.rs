use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

pub const APPROVAL_STATUSES: &[&str] = &["pending", "approved", "rejected"];

/// Status shared by leave requests, increments and promotions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target(self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewRequest {
    #[schema(example = "Approved for Q3")]
    pub comments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_their_strings() {
        for s in APPROVAL_STATUSES {
            assert_eq!(s.parse::<ApprovalStatus>().unwrap().as_ref(), *s);
        }
        assert_eq!(Decision::Reject.target(), ApprovalStatus::Rejected);
    }
}
