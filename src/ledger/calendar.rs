use chrono::{Datelike, NaiveDate};

/// Inclusive count of Monday–Friday days in `[start, end]`; 0 when `end < start`.
///
/// Constant time: whole weeks contribute five days each, the remainder is
/// counted from `start`'s weekday.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }

    let days = (end - start).num_days() + 1;
    let (weeks, rest) = (days / 7, days % 7);
    let first = i64::from(start.weekday().num_days_from_monday());
    let partial = (0..rest).filter(|offset| (first + offset) % 7 < 5).count() as i64;

    u32::try_from(weeks * 5 + partial).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Weekday};
    use rstest::rstest;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[rstest]
    #[case::monday_to_friday("2030-01-07", "2030-01-11", 5)]
    #[case::weekend_only("2030-01-12", "2030-01-13", 0)]
    #[case::friday_to_monday("2030-01-11", "2030-01-14", 2)]
    #[case::single_weekday("2030-01-09", "2030-01-09", 1)]
    #[case::single_saturday("2030-01-12", "2030-01-12", 0)]
    #[case::two_full_weeks("2030-01-07", "2030-01-20", 10)]
    #[case::across_new_year("2030-12-30", "2031-01-02", 4)]
    #[case::inverted("2030-01-11", "2030-01-07", 0)]
    #[case::whole_year("2030-01-01", "2030-12-31", 261)]
    fn counts_weekdays_inclusively(#[case] start: &str, #[case] end: &str, #[case] expected: u32) {
        assert_eq!(business_days_between(date(start), date(end)), expected);
    }

    #[test]
    fn far_future_end_dates_are_counted_without_walking() {
        assert_eq!(business_days_between(date("2030-01-07"), NaiveDate::MAX), 67_860_225);
    }

    #[test]
    fn agrees_with_a_day_by_day_count() {
        let monday = date("2030-01-07");
        for start_offset in 0..7 {
            let start = monday + Duration::days(start_offset);
            for len in 0..40 {
                let end = start + Duration::days(len);
                let walked = start
                    .iter_days()
                    .take_while(|day| *day <= end)
                    .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
                    .count() as u32;
                assert_eq!(business_days_between(start, end), walked, "{start}..={end}");
            }
        }
    }
}
