//! Pure payroll arithmetic. Nothing in here touches the database.

pub mod contribution;
pub mod increment;
pub mod overtime;
pub mod payslip;
pub mod salary;

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(4500.000_000_000_1), 4500.0);
        assert_eq!(round1(11.799_999_999), 11.8);
    }
}
