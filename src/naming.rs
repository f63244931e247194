use crate::composer::FilenameSuffix;
use chrono::{Days, NaiveDate};

/// Plan day name patterns, `{i}` is the day number
const PLAN_DAY_NAMES: [(&str, &str); 2] = [
    ("chronological-1year", "历史读经第{i}天"),
    ("chronological-90days", "90天历史读经第{i}天"),
];
const DEFAULT_DAY_NAME: &str = "读经第{i}天";

/// Display name of `day` in plan `plan_id`
pub fn day_name(plan_id: &str, day: u32) -> String {
    let pattern = PLAN_DAY_NAMES
        .iter()
        .find(|(id, _)| *id == plan_id)
        .map(|(_, pattern)| *pattern)
        .unwrap_or(DEFAULT_DAY_NAME);

    pattern.replace("{i}", &day.to_string())
}

/// Calendar date of `day`, where day 1 falls on `plan_start`
pub fn day_date(plan_start: NaiveDate, day: u32) -> Option<NaiveDate> {
    plan_start.checked_add_days(Days::new(u64::from(day.saturating_sub(1))))
}

/// File stem for a composed day, e.g. `20260217_历史读经第1天-bgm`
pub fn day_file_stem(
    plan_id: &str,
    day: u32,
    plan_start: NaiveDate,
    suffix: FilenameSuffix,
) -> String {
    let date = day_date(plan_start, day).unwrap_or(plan_start);

    format!(
        "{}_{}{}",
        date.format("%Y%m%d"),
        day_name(plan_id, day),
        suffix
    )
}
