//! The phase coordinator (§4.G): the engine's single entry point, tying
//! the daily computer, monthly aggregator, and audience reducer together
//! under one job request.

use std::collections::BTreeMap;
use std::time::Instant;

use futures::future::try_join_all;
use podsum_core::error::{EngineError, Result};
use podsum_core::request::JobRequest;
use podsum_core::ShowSummary;
use podsum_store::BlobStore;
use tracing::info;
use uuid::Uuid;

use crate::audience::{self, AudienceOutcome};
use crate::daily;
use crate::keys;
use crate::monthly;

/// Everything a job run produced, for observability and for callers that
/// want the computed summaries without re-reading them from the store.
#[derive(Debug)]
pub struct JobOutcome {
    pub times: BTreeMap<String, u64>,
    pub dailies_processed: usize,
    pub month_summary: Option<ShowSummary>,
    pub overall_changed: Option<bool>,
    pub audience: Option<AudienceOutcome>,
}

fn day_of_month(date: &str) -> Option<u32> {
    date.rsplit('-').next()?.parse().ok()
}

/// Filter listed show-daily keys by the `startDay`/`maxDays` window
/// (§4.G.2). `maxDays == 0` means none regardless of `startDay`.
fn filter_by_day_range(
    show_uuid: Uuid,
    daily_keys: &[String],
    start_day: Option<u32>,
    max_days: Option<u32>,
) -> Vec<String> {
    if max_days == Some(0) {
        return Vec::new();
    }
    let Some(start) = start_day else {
        return daily_keys.to_vec();
    };
    let upper = max_days.map(|m| start + m - 1);
    daily_keys
        .iter()
        .filter(|key| {
            keys::date_part_of_key(show_uuid, key)
                .and_then(|date| day_of_month(&date))
                .map(|day| day >= start && upper.map_or(true, |u| day <= u))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

async fn process_daily_key(store: &dyn BlobStore, show_uuid: Uuid, key: &str) -> Result<()> {
    let date = keys::date_part_of_key(show_uuid, key)
        .ok_or_else(|| EngineError::CorruptInput(format!("{key}: cannot derive date")))?;
    let outcome = daily::compute_show_summary_for_date(store, show_uuid, &date).await?;
    let (summary_result, audience_result) = tokio::join!(
        daily::save_show_summary(store, &outcome.summary),
        daily::save_audience(store, show_uuid, &date, &outcome.audience_timestamps),
    );
    summary_result?;
    audience_result?;
    Ok(())
}

/// Run a validated job request to completion.
pub async fn run_job(store: &dyn BlobStore, request: &JobRequest) -> Result<JobOutcome> {
    let mut times = BTreeMap::new();
    let show_uuid = request.show_uuid;
    let month = request.month.as_string();

    let mut daily_keys: Vec<String> = Vec::new();
    if request.wants_dailies() || request.wants_aggregates() {
        let t0 = Instant::now();
        let prefix = keys::show_daily_month_prefix(show_uuid, &month);
        daily_keys = store.list(&prefix).await?;
        daily_keys.sort();
        times.insert("list".to_string(), t0.elapsed().as_millis() as u64);
    }

    let mut dailies_processed = 0usize;
    if request.wants_dailies() {
        let t0 = Instant::now();
        let filtered = filter_by_day_range(show_uuid, &daily_keys, request.start_day, request.max_days);
        dailies_processed = filtered.len();
        if request.sequential {
            for key in &filtered {
                process_daily_key(store, show_uuid, key).await?;
            }
        } else {
            try_join_all(
                filtered
                    .iter()
                    .map(|key| process_daily_key(store, show_uuid, key)),
            )
            .await?;
        }
        if request.log {
            info!(show = %show_uuid, %month, count = dailies_processed, "dailies phase complete");
        }
        times.insert("dailies".to_string(), t0.elapsed().as_millis() as u64);
    }

    let mut month_summary = None;
    let mut overall_changed = None;
    if request.wants_aggregates() {
        let t0 = Instant::now();
        let input_keys: Vec<String> = daily_keys
            .iter()
            .filter_map(|key| {
                keys::date_part_of_key(show_uuid, key)
                    .map(|date| keys::summary_key(show_uuid, &date))
            })
            .collect();
        let summary =
            monthly::compute_show_summary_aggregate(store, show_uuid, &input_keys, &month).await?;
        let changed = monthly::merge_overall(store, show_uuid, &summary).await?;
        if request.log {
            info!(show = %show_uuid, %month, total = summary.total(), changed, "aggregates phase complete");
        }
        month_summary = Some(summary);
        overall_changed = Some(changed);
        times.insert("aggregates".to_string(), t0.elapsed().as_millis() as u64);
    }

    let mut audience_outcome = None;
    if let Some(part) = request.audience_phase() {
        let t0 = Instant::now();
        let outcome = audience::recompute_audience_for_month(store, show_uuid, &month, part).await?;
        if request.log {
            info!(show = %show_uuid, %month, audience = outcome.audience, "audience phase complete");
        }
        audience_outcome = Some(outcome);
        times.insert("audience".to_string(), t0.elapsed().as_millis() as u64);
    }

    Ok(JobOutcome {
        times,
        dailies_processed,
        month_summary,
        overall_changed,
        audience: audience_outcome,
    })
}
