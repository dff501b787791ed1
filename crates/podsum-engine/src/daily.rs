//! The daily computer (§4.D): read one show-daily blob, accumulate it,
//! and emit a `ShowSummary` plus the audience timestamps observed that
//! day.

use std::collections::{BTreeMap, HashSet};

use futures::StreamExt;
use podsum_core::error::{EngineError, Result};
use podsum_core::types::EpisodeSummary;
use podsum_core::ShowSummary;
use podsum_store::{BlobStore, GetBody, GetMode, PutBody};
use tracing::debug;
use uuid::Uuid;

use crate::accumulator::{increment, min_hour};
use crate::keys;
use crate::tsv::{read_show_daily_rows, ShowDailyRow};

const DEFAULT_COUNTRY_CODE: &str = "XX";
const DEFAULT_CONTINENT_CODE: &str = "XX";
const DEFAULT_REGION_NAME: &str = "Unknown";
const DEFAULT_AGENT_TYPE: &str = "unknown";
const DEFAULT_AGENT_NAME: &str = "Unknown";
const DEFAULT_DEVICE_TYPE: &str = "unknown";
const DEFAULT_DEVICE_NAME: &str = "Unknown";
const DEFAULT_REFERRER_NAME: &str = "Unknown";

/// Audience ids first seen within one daily computation, preserving
/// first-insertion order (the order the audience TXT blob is written in,
/// §4.D "Persistence").
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AudienceTimestamps {
    order: Vec<(String, String)>,
    seen: HashSet<String>,
}

impl AudienceTimestamps {
    fn record(&mut self, audience_id: &str, compact_timestamp: String) {
        if self.seen.insert(audience_id.to_string()) {
            self.order.push((audience_id.to_string(), compact_timestamp));
        }
    }

    /// Lines in first-insertion order, ready to be newline-joined.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.order
            .iter()
            .map(|(id, ts)| format!("{id}\t{ts}"))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The result of computing one `(show, date)` summary: the summary
/// itself, plus the audience timestamps observed that day.
pub struct DailyOutcome {
    pub summary: ShowSummary,
    pub audience_timestamps: AudienceTimestamps,
}

/// Truncate an ISO-8601 timestamp to its 13-character hour bucket.
fn hour_bucket(time: &str) -> String {
    time.chars().take(13).collect()
}

/// Drop non-digit characters and truncate to 15 characters.
fn compact_timestamp(time: &str) -> String {
    time.chars().filter(char::is_ascii_digit).take(15).collect()
}

fn dimension_bucket(map: &mut BTreeMap<String, BTreeMap<String, u64>>, dimension: &str, label: &str) {
    increment(map.entry(dimension.to_string()).or_default(), label);
}

fn apply_dimensions(
    dims: &mut BTreeMap<String, BTreeMap<String, u64>>,
    row: &ShowDailyRow,
) {
    let country_code = row.country_code.as_deref().unwrap_or(DEFAULT_COUNTRY_CODE);
    let continent_code = row
        .continent_code
        .as_deref()
        .unwrap_or(DEFAULT_CONTINENT_CODE);
    let region_name = row.region_name.as_deref().unwrap_or(DEFAULT_REGION_NAME);
    let agent_type = row.agent_type.as_deref().unwrap_or(DEFAULT_AGENT_TYPE);
    let agent_name = row.agent_name.as_deref().unwrap_or(DEFAULT_AGENT_NAME);
    let device_type = row.device_type.as_deref().unwrap_or(DEFAULT_DEVICE_TYPE);
    let device_name = row.device_name.as_deref().unwrap_or(DEFAULT_DEVICE_NAME);
    let referrer_name = row
        .referrer_name
        .as_deref()
        .unwrap_or(DEFAULT_REFERRER_NAME);

    dimension_bucket(dims, "countryCode", country_code);

    if let Some(metro) = row.metro_code.as_deref() {
        dimension_bucket(dims, "metroCode", metro);
    }

    if continent_code == "EU" {
        dimension_bucket(dims, "euRegion", &format!("{region_name}, {country_code}"));
    }
    if continent_code == "AS" {
        dimension_bucket(dims, "asRegion", &format!("{region_name}, {country_code}"));
    }
    if matches!(country_code, "AU" | "NZ") {
        dimension_bucket(dims, "auRegion", &format!("{region_name}, {country_code}"));
    }
    if country_code == "CA" {
        dimension_bucket(dims, "caRegion", region_name);
    }
    if matches!(continent_code, "NA" | "SA") && !matches!(country_code, "US" | "CA") {
        dimension_bucket(
            dims,
            "latamRegion",
            &format!("{region_name}, {country_code}"),
        );
    }
    if continent_code == "AF" {
        dimension_bucket(dims, "afRegion", &format!("{region_name}, {country_code}"));
    }

    match agent_type {
        "app" => dimension_bucket(dims, "appName", agent_name),
        "browser" => {
            dimension_bucket(dims, "browserName", agent_name);
            if let Some(referrer_type) = row.referrer_type.as_deref() {
                dimension_bucket(
                    dims,
                    "referrer",
                    &format!("{referrer_type}.{referrer_name}"),
                );
            }
        }
        "library" => dimension_bucket(dims, "libraryName", agent_name),
        _ => {}
    }

    dimension_bucket(dims, "deviceType", device_type);
    dimension_bucket(dims, "deviceName", device_name);

    if let Some(tags) = row.tags.as_deref() {
        for tag in tags.split(',') {
            let tag = tag.trim();
            if !tag.is_empty() {
                dimension_bucket(dims, "tag", tag);
            }
        }
    }
}

/// Read `show-daily/<showUuid>/<date>`, accumulate every non-bot row,
/// and produce its `ShowSummary` plus audience timestamps.
pub async fn compute_show_summary_for_date(
    store: &dyn BlobStore,
    show_uuid: Uuid,
    date: &str,
) -> Result<DailyOutcome> {
    let key = keys::show_daily_key(show_uuid, date);
    let Some(fetched) = store.get(&key, GetMode::StreamAndMeta).await? else {
        return Err(EngineError::MissingInput { key });
    };
    let GetBody::Stream(reader) = fetched.body else {
        return Err(EngineError::CorruptInput(format!(
            "{key}: adapter returned a non-stream body for a streamed get"
        )));
    };
    let etag = fetched.etag.unwrap_or_default();

    let mut hourly_downloads: BTreeMap<String, u64> = BTreeMap::new();
    let mut episodes: BTreeMap<String, EpisodeSummary> = BTreeMap::new();
    let mut dimension_downloads: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    let mut audience_timestamps = AudienceTimestamps::default();

    let mut rows = read_show_daily_rows(reader);
    let mut row_count = 0usize;
    while let Some(row) = rows.next().await {
        let row = row?;
        row_count += 1;

        if row.bot_type.is_some() {
            continue;
        }

        let Some(time) = row.time.as_deref() else {
            return Err(EngineError::CorruptInput(format!(
                "{key}: row {row_count} is missing time"
            )));
        };
        let hour = hour_bucket(time);

        increment(&mut hourly_downloads, &hour);

        if let Some(audience_id) = row.audience_id.as_deref() {
            audience_timestamps.record(audience_id, compact_timestamp(time));
        }

        if let Some(episode_id) = row.episode_id.as_deref() {
            let episode = episodes.entry(episode_id.to_string()).or_default();
            episode.first_hour = min_hour(
                if episode.first_hour.is_empty() {
                    None
                } else {
                    Some(episode.first_hour.as_str())
                },
                &hour,
            );
            increment(&mut episode.hourly_downloads, &hour);
        }

        apply_dimensions(&mut dimension_downloads, &row);
    }

    debug!(
        %key,
        rows = row_count,
        downloads = hourly_downloads.values().sum::<u64>(),
        "computed daily summary"
    );

    let summary = ShowSummary {
        show_uuid,
        period: date.to_string(),
        hourly_downloads,
        episodes,
        dimension_downloads: if dimension_downloads.is_empty() {
            None
        } else {
            Some(dimension_downloads)
        },
        sources: BTreeMap::from([(key, etag)]),
    };

    Ok(DailyOutcome {
        summary,
        audience_timestamps,
    })
}

/// Persist a `ShowSummary` to `summaries/show/<uuid>/<uuid>-<period>.summary.json`.
pub async fn save_show_summary(store: &dyn BlobStore, summary: &ShowSummary) -> Result<()> {
    let key = keys::summary_key(summary.show_uuid, &summary.period);
    let body = serde_json::to_string_pretty(summary)?;
    store.put(&key, PutBody::text(body)).await?;
    Ok(())
}

/// Persist a day's audience timestamps to
/// `audiences/show/<uuid>/<uuid>-<date>.all.audience.txt`.
pub async fn save_audience(
    store: &dyn BlobStore,
    show_uuid: Uuid,
    date: &str,
    audience_timestamps: &AudienceTimestamps,
) -> Result<()> {
    let key = keys::daily_audience_key(show_uuid, date);
    let mut body = String::new();
    for line in audience_timestamps.lines() {
        body.push_str(&line);
        body.push('\n');
    }
    store.put(&key, PutBody::text(body)).await?;
    Ok(())
}
