use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    ManagingDirector = 1,
    Hr = 2,
    Manager = 3,
    Accountant = 4,
    Employee = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::ManagingDirector),
            2 => Some(Role::Hr),
            3 => Some(Role::Manager),
            4 => Some(Role::Accountant),
            5 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for id in 1..=5u8 {
            assert_eq!(Role::from_id(id).map(Role::id), Some(id));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(6), None);
        assert_eq!(Role::ManagingDirector.to_string(), "managing_director");
    }
}
