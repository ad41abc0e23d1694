use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use super::round2;

#[derive(Debug, Clone, PartialEq)]
pub struct PayslipPolicy {
    pub transport_allowance: f64,
    pub meal_allowance: f64,
    pub medical_allowance: f64,
    /// Fraction of basic withheld as tax.
    pub tax_rate: f64,
    /// EPF fraction used when the month has no stored contribution.
    pub epf_rate: f64,
    pub insurance: f64,
}

impl Default for PayslipPolicy {
    fn default() -> Self {
        Self {
            transport_allowance: 150.0,
            meal_allowance: 100.0,
            medical_allowance: 75.0,
            tax_rate: 0.10,
            epf_rate: 0.08,
            insurance: 75.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayslipInput {
    pub basic_salary: f64,
    /// Sum of the month's overtime amounts.
    pub overtime: f64,
    pub stored_epf: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Allowances {
    pub transport: f64,
    pub meal: f64,
    pub medical: f64,
    pub overtime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Deductions {
    pub epf: f64,
    pub tax: f64,
    pub insurance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Payslip {
    pub basic_salary: f64,
    pub allowances: Allowances,
    pub deductions: Deductions,
    pub gross_salary: f64,
    pub total_deductions: f64,
    pub net_salary: f64,
}

impl PayslipPolicy {
    pub fn payslip(&self, input: PayslipInput) -> Payslip {
        let basic = round2(input.basic_salary);
        let allowances = Allowances {
            transport: round2(self.transport_allowance),
            meal: round2(self.meal_allowance),
            medical: round2(self.medical_allowance),
            overtime: round2(input.overtime),
        };
        let deductions = Deductions {
            epf: round2(input.stored_epf.unwrap_or(basic * self.epf_rate)),
            tax: round2(basic * self.tax_rate),
            insurance: round2(self.insurance),
        };

        let gross_salary = round2(
            basic + allowances.transport + allowances.meal + allowances.medical + allowances.overtime,
        );
        let total_deductions = round2(deductions.epf + deductions.tax + deductions.insurance);

        Payslip {
            basic_salary: basic,
            allowances,
            deductions,
            gross_salary,
            total_deductions,
            net_salary: round2(gross_salary - total_deductions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyPayslip {
    #[schema(value_type = String, format = "date")]
    pub month: NaiveDate,
    pub payslip: Payslip,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct YearToDate {
    pub year: i32,
    pub months: usize,
    pub total_gross: f64,
    pub total_deductions: f64,
    pub total_net: f64,
    pub average_gross: f64,
    pub average_net: f64,
}

pub fn year_to_date(year: i32, slips: &[MonthlyPayslip]) -> YearToDate {
    let total_gross = round2(slips.iter().map(|s| s.payslip.gross_salary).sum());
    let total_deductions = round2(slips.iter().map(|s| s.payslip.total_deductions).sum());
    let total_net = round2(slips.iter().map(|s| s.payslip.net_salary).sum());
    let months = slips.len();

    let average = |total: f64| {
        if months == 0 {
            0.0
        } else {
            round2(total / months as f64)
        }
    };

    YearToDate {
        year,
        months,
        total_gross,
        total_deductions,
        total_net,
        average_gross: average(total_gross),
        average_net: average(total_net),
    }
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let first = month_start(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

/// First days of January through the month of `through` (or December for
/// past years). Empty for years after `through`.
pub fn months_of_year(year: i32, through: NaiveDate) -> Vec<NaiveDate> {
    let last_month = match year.cmp(&through.year()) {
        std::cmp::Ordering::Less => 12,
        std::cmp::Ordering::Equal => through.month(),
        std::cmp::Ordering::Greater => return Vec::new(),
    };

    (1..=last_month)
        .filter_map(|m| NaiveDate::from_ymd_opt(year, m, 1))
        .collect()
}

/// Builds one payslip per month using the salary in effect at each month end.
///
/// `salary_history` holds `(effective_date, base_pay)` pairs in any order;
/// `overtime` and `epf` are keyed by the first day of the month. Months before
/// the first salary row are skipped.
pub fn monthly_payslips(
    policy: &PayslipPolicy,
    salary_history: &[(NaiveDate, f64)],
    overtime: &HashMap<NaiveDate, f64>,
    epf: &HashMap<NaiveDate, f64>,
    months: &[NaiveDate],
) -> Vec<MonthlyPayslip> {
    let mut history = salary_history.to_vec();
    history.sort_by_key(|(effective, _)| *effective);

    months
        .iter()
        .filter_map(|month| {
            let end = month_end(*month);
            let (_, base_pay) = history.iter().rev().find(|(effective, _)| *effective <= end)?;

            let payslip = policy.payslip(PayslipInput {
                basic_salary: *base_pay,
                overtime: overtime.get(month).copied().unwrap_or(0.0),
                stored_epf: epf.get(month).copied(),
            });

            Some(MonthlyPayslip {
                month: *month,
                payslip,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn payslip_with_default_policy() {
        let slip = PayslipPolicy::default().payslip(PayslipInput {
            basic_salary: 50_000.0,
            overtime: 1_250.0,
            stored_epf: None,
        });

        assert_eq!(slip.gross_salary, 51_575.0);
        assert_eq!(slip.deductions.epf, 4_000.0);
        assert_eq!(slip.deductions.tax, 5_000.0);
        assert_eq!(slip.deductions.insurance, 75.0);
        assert_eq!(slip.total_deductions, 9_075.0);
        assert_eq!(slip.net_salary, 42_500.0);
    }

    #[test]
    fn stored_epf_wins_over_rate() {
        let slip = PayslipPolicy::default().payslip(PayslipInput {
            basic_salary: 50_000.0,
            overtime: 0.0,
            stored_epf: Some(3_900.0),
        });
        assert_eq!(slip.deductions.epf, 3_900.0);
    }

    #[test]
    fn gross_and_net_identities_hold() {
        let policy = PayslipPolicy::default();
        for (basic, ot, epf) in [
            (0.0, 0.0, None),
            (12_345.67, 89.1, None),
            (99_999.99, 0.01, Some(7_000.0)),
            (31_415.92, 2_718.28, Some(0.0)),
        ] {
            let s = policy.payslip(PayslipInput {
                basic_salary: basic,
                overtime: ot,
                stored_epf: epf,
            });
            let a = &s.allowances;
            let dd = &s.deductions;
            assert_close(
                s.gross_salary,
                s.basic_salary + a.transport + a.meal + a.medical + a.overtime,
            );
            assert_close(s.net_salary, s.gross_salary - (dd.epf + dd.tax + dd.insurance));
        }
    }

    #[test]
    fn month_bounds() {
        assert_eq!(month_end(d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(month_end(d(2025, 12, 1)), d(2025, 12, 31));
        assert_eq!(month_start(d(2025, 7, 19)), d(2025, 7, 1));
    }

    #[test]
    fn months_of_year_stops_at_today() {
        assert_eq!(months_of_year(2026, d(2026, 3, 15)).len(), 3);
        assert_eq!(months_of_year(2025, d(2026, 3, 15)).len(), 12);
        assert!(months_of_year(2027, d(2026, 3, 15)).is_empty());
    }

    #[test]
    fn monthly_payslips_follow_salary_changes() {
        let policy = PayslipPolicy::default();
        let history = vec![(d(2026, 3, 1), 60_000.0), (d(2025, 6, 1), 50_000.0)];
        let mut overtime = HashMap::new();
        overtime.insert(d(2026, 2, 1), 500.0);
        let epf = HashMap::new();
        let months = months_of_year(2026, d(2026, 3, 31));

        let slips = monthly_payslips(&policy, &history, &overtime, &epf, &months);
        assert_eq!(slips.len(), 3);
        assert_eq!(slips[0].payslip.basic_salary, 50_000.0);
        assert_eq!(slips[1].payslip.allowances.overtime, 500.0);
        assert_eq!(slips[2].payslip.basic_salary, 60_000.0);
    }

    #[test]
    fn months_before_first_salary_are_skipped() {
        let policy = PayslipPolicy::default();
        let history = vec![(d(2026, 2, 15), 40_000.0)];
        let months = months_of_year(2026, d(2026, 4, 1));
        let slips = monthly_payslips(&policy, &history, &HashMap::new(), &HashMap::new(), &months);
        assert_eq!(slips.first().map(|s| s.month), Some(d(2026, 2, 1)));
        assert_eq!(slips.len(), 3);
    }

    #[test]
    fn year_to_date_sums_and_averages() {
        let policy = PayslipPolicy::default();
        let history = vec![(d(2026, 1, 1), 50_000.0)];
        let months = months_of_year(2026, d(2026, 2, 28));
        let slips = monthly_payslips(&policy, &history, &HashMap::new(), &HashMap::new(), &months);

        let ytd = year_to_date(2026, &slips);
        assert_eq!(ytd.months, 2);
        assert_eq!(ytd.total_gross, 2.0 * 50_325.0);
        assert_eq!(ytd.average_net, slips[0].payslip.net_salary);
    }

    #[test]
    fn empty_year_has_zero_average() {
        let ytd = year_to_date(2026, &[]);
        assert_eq!(ytd.months, 0);
        assert_eq!(ytd.average_net, 0.0);
    }
}
