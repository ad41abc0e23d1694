use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::round2;

/// The pay components stored on a salary row.
///
/// `total` is the one place the total is derived; every insert of a salary
/// row goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct SalaryComponents {
    pub basic_salary: f64,
    pub allowances: f64,
    pub ot_pay: f64,
    pub increment_pay: f64,
    pub bonus_pay: f64,
}

impl SalaryComponents {
    /// Fixed monthly pay: basic plus approved increments.
    pub fn base_pay(&self) -> f64 {
        round2(self.basic_salary + self.increment_pay)
    }

    pub fn total(&self) -> f64 {
        round2(self.basic_salary + self.allowances + self.ot_pay + self.increment_pay + self.bonus_pay)
    }

    /// Components after an approved increment of `amount`.
    pub fn with_increment(&self, amount: f64) -> Self {
        Self {
            increment_pay: round2(self.increment_pay + amount),
            ..*self
        }
    }

    /// Components after a promotion raising basic pay by `amount`.
    pub fn with_basic_raise(&self, amount: f64) -> Self {
        Self {
            basic_salary: round2(self.basic_salary + amount),
            ..*self
        }
    }

    pub fn with_bonus(&self, amount: f64) -> Self {
        Self {
            bonus_pay: round2(self.bonus_pay + amount),
            ..*self
        }
    }
}

/// An approved change to one pay component.
///
/// Changes are additive, so the same delta applies to the row in effect on the
/// change date and to every row dated after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SalaryChange {
    Increment(f64),
    BasicRaise(f64),
    Bonus(f64),
}

impl SalaryChange {
    pub fn amount(self) -> f64 {
        match self {
            SalaryChange::Increment(a) | SalaryChange::BasicRaise(a) | SalaryChange::Bonus(a) => a,
        }
    }

    /// Salary column the delta lands in.
    pub fn column(self) -> &'static str {
        match self {
            SalaryChange::Increment(_) => "increment_pay",
            SalaryChange::BasicRaise(_) => "basic_salary",
            SalaryChange::Bonus(_) => "bonus_pay",
        }
    }

    pub fn apply(self, components: &SalaryComponents) -> SalaryComponents {
        match self {
            SalaryChange::Increment(a) => components.with_increment(a),
            SalaryChange::BasicRaise(a) => components.with_basic_raise(a),
            SalaryChange::Bonus(a) => components.with_bonus(a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SalaryComponents {
        SalaryComponents {
            basic_salary: 50_000.0,
            allowances: 2_500.0,
            ot_pay: 1_200.5,
            increment_pay: 3_000.0,
            bonus_pay: 500.0,
        }
    }

    #[test]
    fn total_includes_every_component() {
        assert_eq!(sample().total(), 57_200.5);
        assert_eq!(sample().base_pay(), 53_000.0);
    }

    #[test]
    fn increment_accumulates_into_increment_pay() {
        let next = sample().with_increment(4_500.0);
        assert_eq!(next.increment_pay, 7_500.0);
        assert_eq!(next.basic_salary, 50_000.0);
        assert_eq!(next.total(), sample().total() + 4_500.0);
    }

    #[test]
    fn promotion_raises_basic() {
        let next = sample().with_basic_raise(10_000.0);
        assert_eq!(next.basic_salary, 60_000.0);
        assert_eq!(next.increment_pay, 3_000.0);
    }

    #[test]
    fn bonus_leaves_base_pay_alone() {
        let next = sample().with_bonus(1_000.0);
        assert_eq!(next.bonus_pay, 1_500.0);
        assert_eq!(next.base_pay(), sample().base_pay());
    }

    #[test]
    fn backdated_increment_also_raises_later_rows() {
        // April increment approved after a May bonus row already exists
        let april = sample();
        let may = april.with_bonus(500.0);
        let change = SalaryChange::Increment(4_500.0);

        let inserted = change.apply(&april);
        let may_after = change.apply(&may);

        assert_eq!(inserted.increment_pay, 7_500.0);
        assert_eq!(may_after.increment_pay, 7_500.0);
        assert_eq!(may_after.bonus_pay, 1_000.0);
        assert_eq!(may_after.total(), may.total() + 4_500.0);
    }

    #[test]
    fn every_change_moves_total_by_its_amount() {
        for change in [
            SalaryChange::Increment(1_250.25),
            SalaryChange::BasicRaise(7_500.0),
            SalaryChange::Bonus(333.33),
        ] {
            let next = change.apply(&sample());
            assert_eq!(next.total(), round2(sample().total() + change.amount()), "{change:?}");
        }
        assert_eq!(SalaryChange::BasicRaise(1.0).column(), "basic_salary");
    }
}
