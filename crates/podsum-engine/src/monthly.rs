//! The monthly aggregator (§4.E): sum a set of daily summaries into a
//! month summary, then refine the `overall` summary monotonically.

use std::collections::BTreeMap;

use podsum_core::error::{EngineError, Result};
use podsum_core::types::{EpisodeSummary, OverallEpisode, OverallSummary};
use podsum_core::ShowSummary;
use podsum_store::{BlobStore, GetBody, GetMode, PutBody};
use tracing::debug;
use uuid::Uuid;

use crate::accumulator::{increment_all, increment_all_dimensions, min_hour};
use crate::keys;

/// Read every `input_keys` summary (missing keys are silently skipped --
/// a partial month is a valid state), sum them into a new summary at
/// `output_period`, and save it.
pub async fn compute_show_summary_aggregate(
    store: &dyn BlobStore,
    show_uuid: Uuid,
    input_keys: &[String],
    output_period: &str,
) -> Result<ShowSummary> {
    let mut hourly_downloads: BTreeMap<String, u64> = BTreeMap::new();
    let mut episodes: BTreeMap<String, EpisodeSummary> = BTreeMap::new();
    let mut dimension_downloads: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    let mut sources: BTreeMap<String, String> = BTreeMap::new();

    for input_key in input_keys {
        let Some(fetched) = store.get(input_key, GetMode::TextAndMeta).await? else {
            debug!(key = %input_key, "skipping missing daily summary");
            continue;
        };
        let GetBody::Text(text) = fetched.body else {
            return Err(EngineError::CorruptInput(format!(
                "{input_key}: adapter returned a stream for a text get"
            )));
        };
        let daily: ShowSummary = serde_json::from_str(&text)
            .map_err(|e| EngineError::CorruptInput(format!("{input_key}: {e}")))?;

        increment_all(&mut hourly_downloads, &daily.hourly_downloads);
        if let Some(dims) = &daily.dimension_downloads {
            increment_all_dimensions(&mut dimension_downloads, dims);
        }
        for (episode_id, ep) in &daily.episodes {
            let entry = episodes.entry(episode_id.clone()).or_default();
            increment_all(&mut entry.hourly_downloads, &ep.hourly_downloads);
            entry.first_hour = min_hour(
                if entry.first_hour.is_empty() {
                    None
                } else {
                    Some(entry.first_hour.as_str())
                },
                &ep.first_hour,
            );
        }

        let etag = fetched.etag.unwrap_or_default();
        sources.insert(input_key.clone(), etag);
    }

    let summary = ShowSummary {
        show_uuid,
        period: output_period.to_string(),
        hourly_downloads,
        episodes,
        dimension_downloads: if dimension_downloads.is_empty() {
            None
        } else {
            Some(dimension_downloads)
        },
        sources,
    };

    let key = keys::summary_key(show_uuid, output_period);
    let body = serde_json::to_string_pretty(&summary)?;
    store.put(&key, PutBody::text(body)).await?;

    Ok(summary)
}

/// Read the existing `overall` summary (if any), fold in every episode's
/// `firstHour` from `month_summary`, and write back only if something
/// changed. Returns whether the write happened.
pub async fn merge_overall(
    store: &dyn BlobStore,
    show_uuid: Uuid,
    month_summary: &ShowSummary,
) -> Result<bool> {
    let key = keys::overall_summary_key(show_uuid);

    let existing = match store.get(&key, GetMode::Text).await? {
        Some(fetched) => {
            let GetBody::Text(text) = fetched.body else {
                return Err(EngineError::CorruptInput(format!(
                    "{key}: adapter returned a stream for a text get"
                )));
            };
            Some(
                serde_json::from_str::<OverallSummary>(&text)
                    .map_err(|e| EngineError::CorruptInput(format!("{key}: {e}")))?,
            )
        }
        None => None,
    };

    let mut changed = existing.is_none();
    let mut overall = existing.unwrap_or_else(|| OverallSummary {
        show_uuid,
        period: "overall".to_string(),
        episodes: BTreeMap::new(),
        sources: BTreeMap::new(),
    });

    for (episode_id, ep) in &month_summary.episodes {
        let should_update = match overall.episodes.get(episode_id) {
            Some(existing_ep) => ep.first_hour < existing_ep.first_hour,
            None => true,
        };
        if should_update {
            overall.episodes.insert(
                episode_id.clone(),
                OverallEpisode {
                    first_hour: ep.first_hour.clone(),
                },
            );
            changed = true;
        }
    }

    if changed {
        let body = serde_json::to_string_pretty(&overall)?;
        store.put(&key, PutBody::text(body)).await?;
        debug!(show = %show_uuid, "overall summary updated");
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podsum_store::MemoryStore;

    fn show() -> Uuid {
        Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap()
    }

    fn daily_summary(show_uuid: Uuid, period: &str, hour: &str, count: u64, episode: &str) -> ShowSummary {
        let mut hourly = BTreeMap::new();
        hourly.insert(hour.to_string(), count);
        let mut episodes = BTreeMap::new();
        let mut ep_hourly = BTreeMap::new();
        ep_hourly.insert(hour.to_string(), count);
        episodes.insert(
            episode.to_string(),
            EpisodeSummary {
                hourly_downloads: ep_hourly,
                first_hour: hour.to_string(),
            },
        );
        ShowSummary {
            show_uuid,
            period: period.to_string(),
            hourly_downloads: hourly,
            episodes,
            dimension_downloads: None,
            sources: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn s3_month_aggregate_sums_and_records_sources() {
        let store = MemoryStore::new();
        let show_uuid = show();
        let d1 = daily_summary(show_uuid, "2024-03-01", "2024-03-01T10", 3, "E1");
        let d2 = daily_summary(show_uuid, "2024-03-02", "2024-03-02T11", 5, "E1");
        let k1 = keys::summary_key(show_uuid, "2024-03-01");
        let k2 = keys::summary_key(show_uuid, "2024-03-02");
        store.seed(k1.clone(), serde_json::to_vec(&d1).unwrap());
        store.seed(k2.clone(), serde_json::to_vec(&d2).unwrap());

        let month = compute_show_summary_aggregate(
            &store,
            show_uuid,
            &[k1.clone(), k2.clone()],
            "2024-03",
        )
        .await
        .unwrap();

        assert_eq!(month.total(), 8);
        assert_eq!(month.sources.len(), 2);
        assert!(month.sources.contains_key(&k1));
        assert!(month.sources.contains_key(&k2));
    }

    #[tokio::test]
    async fn missing_daily_inputs_are_skipped_silently() {
        let store = MemoryStore::new();
        let show_uuid = show();
        let d1 = daily_summary(show_uuid, "2024-03-01", "2024-03-01T10", 3, "E1");
        let k1 = keys::summary_key(show_uuid, "2024-03-01");
        let k2 = keys::summary_key(show_uuid, "2024-03-02");
        store.seed(k1.clone(), serde_json::to_vec(&d1).unwrap());

        let month = compute_show_summary_aggregate(&store, show_uuid, &[k1, k2], "2024-03")
            .await
            .unwrap();
        assert_eq!(month.total(), 3);
        assert_eq!(month.sources.len(), 1);
    }

    #[tokio::test]
    async fn s4_overall_merge_is_monotone_and_idempotent() {
        let store = MemoryStore::new();
        let show_uuid = show();
        let overall_key = keys::overall_summary_key(show_uuid);
        let existing = OverallSummary {
            show_uuid,
            period: "overall".to_string(),
            episodes: BTreeMap::from([(
                "E2".to_string(),
                OverallEpisode {
                    first_hour: "2024-02-10T00".to_string(),
                },
            )]),
            sources: BTreeMap::new(),
        };
        store.seed(overall_key.clone(), serde_json::to_vec(&existing).unwrap());

        let mut month = daily_summary(show_uuid, "2024-03", "2024-03-01T00", 1, "E3");
        month.episodes.insert(
            "E2".to_string(),
            EpisodeSummary {
                hourly_downloads: BTreeMap::new(),
                first_hour: "2024-01-15T12".to_string(),
            },
        );

        let changed = merge_overall(&store, show_uuid, &month).await.unwrap();
        assert!(changed);

        let fetched = store.get(&overall_key, GetMode::Text).await.unwrap().unwrap();
        let GetBody::Text(text) = fetched.body else {
            panic!("expected text")
        };
        let overall: OverallSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(overall.episodes["E2"].first_hour, "2024-01-15T12");
        assert_eq!(overall.episodes["E3"].first_hour, "2024-03-01T00");

        // Re-running with the same inputs writes nothing further.
        let changed_again = merge_overall(&store, show_uuid, &month).await.unwrap();
        assert!(!changed_again);
    }

    #[tokio::test]
    async fn overall_merge_seeds_when_absent() {
        let store = MemoryStore::new();
        let show_uuid = show();
        let month = daily_summary(show_uuid, "2024-03", "2024-03-01T00", 1, "E1");
        let changed = merge_overall(&store, show_uuid, &month).await.unwrap();
        assert!(changed);
    }
}
