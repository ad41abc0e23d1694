use serde::Serialize;
use utoipa::ToSchema;

use super::round2;

/// Statutory EPF/ETF rates as fractions of basic pay.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionPolicy {
    pub epf_employee: f64,
    pub epf_employer: f64,
    pub etf: f64,
}

impl Default for ContributionPolicy {
    fn default() -> Self {
        Self {
            epf_employee: 0.08,
            epf_employer: 0.12,
            etf: 0.03,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Contribution {
    pub basic_salary: f64,
    pub epf_employee: f64,
    pub epf_employer: f64,
    pub etf: f64,
}

impl ContributionPolicy {
    pub fn contributions(&self, basic_salary: f64) -> Contribution {
        Contribution {
            basic_salary: round2(basic_salary),
            epf_employee: round2(basic_salary * self.epf_employee),
            epf_employer: round2(basic_salary * self.epf_employer),
            etf: round2(basic_salary * self.etf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rates() {
        let c = ContributionPolicy::default().contributions(50_000.0);
        assert_eq!(c.epf_employee, 4_000.0);
        assert_eq!(c.epf_employer, 6_000.0);
        assert_eq!(c.etf, 1_500.0);
    }

    #[test]
    fn rounds_to_cents() {
        let c = ContributionPolicy::default().contributions(33_333.33);
        assert_eq!(c.epf_employee, 2_666.67);
        assert_eq!(c.etf, 1_000.0);
    }
}
