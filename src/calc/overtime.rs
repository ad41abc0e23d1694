use super::round2;

#[derive(Debug, Clone, PartialEq)]
pub struct OvertimePolicy {
    /// Minutes in a standard working day; anything beyond is overtime.
    pub standard_day_minutes: u32,
    /// Working hours per month used to derive the hourly rate.
    pub monthly_hours: f64,
    pub multiplier: f64,
}

impl Default for OvertimePolicy {
    fn default() -> Self {
        Self {
            standard_day_minutes: 480,
            monthly_hours: 240.0,
            multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OvertimeEntry {
    pub hours: f64,
    pub rate: f64,
    pub amount: f64,
}

impl OvertimePolicy {
    pub fn hourly_rate(&self, base_pay: f64) -> f64 {
        if self.monthly_hours <= 0.0 {
            return 0.0;
        }
        round2(base_pay / self.monthly_hours * self.multiplier)
    }

    /// Overtime earned for a day with `worked_minutes`, if any.
    pub fn overtime_for(&self, worked_minutes: u32, base_pay: f64) -> Option<OvertimeEntry> {
        let extra = worked_minutes.checked_sub(self.standard_day_minutes)?;
        if extra == 0 {
            return None;
        }

        let hours = round2(extra as f64 / 60.0);
        let rate = self.hourly_rate(base_pay);
        Some(OvertimeEntry {
            hours,
            rate,
            amount: round2(hours * rate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_overtime_within_standard_day() {
        let policy = OvertimePolicy::default();
        assert_eq!(policy.overtime_for(0, 48_000.0), None);
        assert_eq!(policy.overtime_for(480, 48_000.0), None);
    }

    #[test]
    fn extra_minutes_are_paid_at_time_and_a_half() {
        let policy = OvertimePolicy::default();
        let entry = policy.overtime_for(570, 48_000.0).unwrap();
        assert_eq!(entry.hours, 1.5);
        assert_eq!(entry.rate, 300.0);
        assert_eq!(entry.amount, 450.0);
    }
}
