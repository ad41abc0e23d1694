use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::{round1, round2};
use crate::error::{AppError, AppResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncrementType {
    Annual,
    Performance,
    Promotion,
    Market,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PerformanceRating {
    #[serde(alias = "Excellent")]
    Excellent,
    #[serde(alias = "Good")]
    Good,
    #[serde(alias = "Average")]
    Average,
    #[serde(alias = "Below Average")]
    BelowAverage,
}

/// Rates are fractions (0.05 == 5%).
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementPolicy {
    pub annual_base: f64,
    pub performance_base: f64,
    pub promotion_base: f64,
    pub market_base: f64,

    pub excellent_multiplier: f64,
    pub good_multiplier: f64,
    pub average_multiplier: f64,
    pub below_average_multiplier: f64,

    /// Added per full year of tenure for annual increments.
    pub tenure_rate_per_year: f64,
    pub tenure_cap: f64,
    /// Flat adjustment for every type except promotion.
    pub market_adjustment: f64,
    pub max_percentage: f64,
}

impl Default for IncrementPolicy {
    fn default() -> Self {
        Self {
            annual_base: 0.05,
            performance_base: 0.07,
            promotion_base: 0.15,
            market_base: 0.08,
            excellent_multiplier: 1.4,
            good_multiplier: 1.2,
            average_multiplier: 1.0,
            below_average_multiplier: 0.8,
            tenure_rate_per_year: 0.01,
            tenure_cap: 0.05,
            market_adjustment: 0.02,
            max_percentage: 0.25,
        }
    }
}

impl IncrementPolicy {
    pub fn base_rate(&self, kind: IncrementType) -> f64 {
        match kind {
            IncrementType::Annual => self.annual_base,
            IncrementType::Performance => self.performance_base,
            IncrementType::Promotion => self.promotion_base,
            IncrementType::Market => self.market_base,
        }
    }

    pub fn multiplier(&self, rating: PerformanceRating) -> f64 {
        match rating {
            PerformanceRating::Excellent => self.excellent_multiplier,
            PerformanceRating::Good => self.good_multiplier,
            PerformanceRating::Average => self.average_multiplier,
            PerformanceRating::BelowAverage => self.below_average_multiplier,
        }
    }

    pub fn tenure_factor(&self, tenure_months: u32) -> f64 {
        (tenure_months as f64 / 12.0 * self.tenure_rate_per_year).min(self.tenure_cap)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IncrementInput {
    #[schema(example = 50000.0)]
    pub current_salary: f64,
    #[schema(example = "annual")]
    pub increment_type: IncrementType,
    #[schema(example = "good")]
    pub performance: PerformanceRating,
    #[schema(example = 24)]
    pub tenure_months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct IncrementSuggestion {
    #[schema(example = 4500.0)]
    pub amount: f64,
    /// Percentage of the current salary, 0-100.
    #[schema(example = 9.0)]
    pub percentage: f64,
    #[schema(example = 54500.0)]
    pub new_salary: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_adjustment: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenure_factor: Option<f64>,
}

/// Suggests a raise for `input` under `policy`.
///
/// The rate starts from the per-type base, is scaled by the rating multiplier
/// for performance increments, gains the tenure factor for annual increments
/// and the market adjustment for everything but promotions, then is capped.
pub fn calculate_increment(
    policy: &IncrementPolicy,
    input: &IncrementInput,
) -> AppResult<IncrementSuggestion> {
    let salary = input.current_salary;
    if !salary.is_finite() || salary <= 0.0 {
        return Err(AppError::validation("current_salary must be greater than zero"));
    }

    let mut rate = policy.base_rate(input.increment_type);
    let mut performance_factor = None;
    let mut tenure_factor = None;
    let mut market_adjustment = None;

    if input.increment_type == IncrementType::Performance {
        let factor = policy.multiplier(input.performance);
        rate *= factor;
        performance_factor = Some(factor);
    }

    if input.increment_type == IncrementType::Annual {
        let factor = policy.tenure_factor(input.tenure_months);
        rate += factor;
        tenure_factor = Some(factor);
    }

    if input.increment_type != IncrementType::Promotion {
        rate += policy.market_adjustment;
        market_adjustment = Some(policy.market_adjustment);
    }

    let rate = rate.min(policy.max_percentage);
    let amount = round2(salary * rate);

    Ok(IncrementSuggestion {
        amount,
        percentage: round1(rate * 100.0),
        new_salary: round2(salary + amount),
        performance_factor,
        market_adjustment,
        tenure_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(kind: IncrementType, rating: PerformanceRating, salary: f64, tenure: u32) -> IncrementInput {
        IncrementInput {
            current_salary: salary,
            increment_type: kind,
            performance: rating,
            tenure_months: tenure,
        }
    }

    #[test]
    fn annual_with_two_years_tenure() {
        let policy = IncrementPolicy::default();
        let s = calculate_increment(
            &policy,
            &input(IncrementType::Annual, PerformanceRating::Good, 50_000.0, 24),
        )
        .unwrap();

        assert_eq!(s.percentage, 9.0);
        assert_eq!(s.amount, 4500.0);
        assert_eq!(s.new_salary, 54_500.0);
        assert!((s.tenure_factor.unwrap() - 0.02).abs() < 1e-12);
        assert_eq!(s.market_adjustment, Some(0.02));
        assert_eq!(s.performance_factor, None);
    }

    #[test]
    fn annual_percentage_stays_within_bounds() {
        let policy = IncrementPolicy::default();
        for tenure in [0, 1, 11, 12, 59, 60, 61, 240, u32::MAX] {
            for salary in [0.01, 1.0, 12_345.67, 1_000_000.0] {
                let s = calculate_increment(
                    &policy,
                    &input(IncrementType::Annual, PerformanceRating::Average, salary, tenure),
                )
                .unwrap();
                assert!(s.percentage >= 5.0, "tenure {tenure}: {}", s.percentage);
                assert!(s.percentage <= 25.0, "tenure {tenure}: {}", s.percentage);
            }
        }
    }

    #[test]
    fn tenure_factor_is_capped() {
        let policy = IncrementPolicy::default();
        assert!((policy.tenure_factor(600) - 0.05).abs() < 1e-12);
        let s = calculate_increment(
            &policy,
            &input(IncrementType::Annual, PerformanceRating::Good, 10_000.0, 600),
        )
        .unwrap();
        assert_eq!(s.percentage, 12.0);
    }

    #[test]
    fn promotion_is_flat_fifteen_percent() {
        let policy = IncrementPolicy::default();
        for rating in [
            PerformanceRating::Excellent,
            PerformanceRating::Good,
            PerformanceRating::Average,
            PerformanceRating::BelowAverage,
        ] {
            let s = calculate_increment(
                &policy,
                &input(IncrementType::Promotion, rating, 80_000.0, 100),
            )
            .unwrap();
            assert_eq!(s.percentage, 15.0);
            assert_eq!(s.amount, 12_000.0);
            assert_eq!(s.market_adjustment, None);
            assert_eq!(s.tenure_factor, None);
        }
    }

    #[test]
    fn excellent_performance() {
        let policy = IncrementPolicy::default();
        let s = calculate_increment(
            &policy,
            &input(IncrementType::Performance, PerformanceRating::Excellent, 10_000.0, 6),
        )
        .unwrap();
        assert_eq!(s.percentage, 11.8);
        assert_eq!(s.amount, 1180.0);
        assert_eq!(s.performance_factor, Some(1.4));
    }

    #[test]
    fn market_increment_gets_adjustment() {
        let policy = IncrementPolicy::default();
        let s = calculate_increment(
            &policy,
            &input(IncrementType::Market, PerformanceRating::Good, 20_000.0, 0),
        )
        .unwrap();
        assert_eq!(s.percentage, 10.0);
        assert_eq!(s.new_salary, 22_000.0);
    }

    #[test]
    fn cap_applies() {
        let policy = IncrementPolicy {
            promotion_base: 0.40,
            ..IncrementPolicy::default()
        };
        let s = calculate_increment(
            &policy,
            &input(IncrementType::Promotion, PerformanceRating::Good, 1000.0, 0),
        )
        .unwrap();
        assert_eq!(s.percentage, 25.0);
        assert_eq!(s.amount, 250.0);
    }

    #[test]
    fn same_input_same_output() {
        let policy = IncrementPolicy::default();
        let i = input(IncrementType::Performance, PerformanceRating::BelowAverage, 33_333.33, 7);
        assert_eq!(
            calculate_increment(&policy, &i).unwrap(),
            calculate_increment(&policy, &i).unwrap()
        );
    }

    #[test]
    fn rejects_non_positive_salary() {
        let policy = IncrementPolicy::default();
        for salary in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let err = calculate_increment(
                &policy,
                &input(IncrementType::Annual, PerformanceRating::Good, salary, 12),
            )
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn unknown_labels_are_rejected_at_the_boundary() {
        let bad_type = serde_json::json!({
            "current_salary": 1000.0,
            "increment_type": "bonus",
            "performance": "good",
            "tenure_months": 1
        });
        assert!(serde_json::from_value::<IncrementInput>(bad_type).is_err());

        let legacy_label = serde_json::json!({
            "current_salary": 1000.0,
            "increment_type": "performance",
            "performance": "Below Average",
            "tenure_months": 1
        });
        let parsed: IncrementInput = serde_json::from_value(legacy_label).unwrap();
        assert_eq!(parsed.performance, PerformanceRating::BelowAverage);
    }

    #[test]
    fn types_round_trip_through_strum() {
        assert_eq!(IncrementType::Annual.as_ref(), "annual");
        assert_eq!("below_average".parse::<PerformanceRating>().unwrap(), PerformanceRating::BelowAverage);
    }
}
