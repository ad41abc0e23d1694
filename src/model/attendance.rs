use chrono::NaiveTime;

/// Minutes between check-in and check-out; zero if the clock went backwards.
pub fn worked_minutes(check_in: NaiveTime, check_out: NaiveTime) -> u32 {
    let minutes = (check_out - check_in).num_minutes();
    u32::try_from(minutes).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn counts_whole_minutes() {
        assert_eq!(worked_minutes(t(8, 30), t(17, 45)), 555);
        assert_eq!(worked_minutes(t(9, 0), t(8, 0)), 0);
    }
}
