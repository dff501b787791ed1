//! Blob key layout (§6).

use uuid::Uuid;

/// `show-daily/<uuid>/<uuid>-<period>`, the raw per-day input key.
pub fn show_daily_key(show_uuid: Uuid, period: &str) -> String {
    format!("show-daily/{show_uuid}/{show_uuid}-{period}")
}

/// `show-daily/<uuid>/<month>`, the listing prefix for a month's daily inputs.
pub fn show_daily_month_prefix(show_uuid: Uuid, month: &str) -> String {
    format!("show-daily/{show_uuid}/{show_uuid}-{month}")
}

/// `summaries/show/<uuid>/<uuid>-<period>.summary.json`.
pub fn summary_key(show_uuid: Uuid, period: &str) -> String {
    format!("summaries/show/{show_uuid}/{show_uuid}-{period}.summary.json")
}

/// The `overall` summary key.
pub fn overall_summary_key(show_uuid: Uuid) -> String {
    summary_key(show_uuid, "overall")
}

/// `audiences/show/<uuid>/<uuid>-<date>.all.audience.txt`, written by the
/// daily computer.
pub fn daily_audience_key(show_uuid: Uuid, date: &str) -> String {
    format!("audiences/show/{show_uuid}/{show_uuid}-{date}.all.audience.txt")
}

/// `audiences/show/<uuid>/<uuid>-<month>-`, the listing prefix the
/// audience reducer scans for daily audience files within a month.
pub fn daily_audience_month_prefix(show_uuid: Uuid, month: &str) -> String {
    format!("audiences/show/{show_uuid}/{show_uuid}-{month}-")
}

/// `audiences/show/<uuid>/<uuid>-<month>.<part|all>.audience.txt`, written
/// by the audience reducer.
pub fn monthly_audience_key(show_uuid: Uuid, month: &str, part_label: Option<&str>) -> String {
    let suffix = part_label.unwrap_or("all");
    format!("audiences/show/{show_uuid}/{show_uuid}-{month}.{suffix}.audience.txt")
}

/// `audience-summaries/show/<uuid>/<uuid>-<month>.<part|all>.audience-summary.json`.
pub fn audience_summary_key(show_uuid: Uuid, month: &str, part_label: Option<&str>) -> String {
    let suffix = part_label.unwrap_or("all");
    format!("audience-summaries/show/{show_uuid}/{show_uuid}-{month}.{suffix}.audience-summary.json")
}

/// Extract the `YYYY-MM-DD` date part from a daily audience key of the
/// form `audiences/show/<uuid>/<uuid>-<date>.all.audience.txt`. Used by
/// the audience reducer to recover the day a line was read from (§4.F.4).
///
/// The UUID is known by the caller (it's the show being reduced), so we
/// strip the literal `<uuid>-` prefix from the file name rather than
/// splitting on `-`, since both the UUID and the date contain dashes.
pub fn date_part_of_key(show_uuid: Uuid, key: &str) -> Option<String> {
    let file_name = key.rsplit('/').next()?;
    let prefix = format!("{show_uuid}-");
    let rest = file_name.strip_prefix(&prefix)?;
    Some(rest.split('.').next().unwrap_or(rest).to_string())
}
