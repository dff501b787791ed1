//! The audience reducer (§4.F): fold a month's daily audience blobs into
//! one monthly audience blob and its summary, optionally restricted to a
//! hex-prefix shard.

use std::collections::{BTreeMap, HashSet};

use podsum_core::error::{EngineError, Result};
use podsum_core::types::{AudiencePart, AudienceSummary};
use podsum_store::{put_with_retry, BlobStore, GetBody, GetMode, PutBody};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::accumulator::increment;
use crate::keys;

/// Line length of a daily audience record: 64-hex id + tab + 15-digit
/// timestamp, not counting the trailing newline `lines()` strips.
const LINE_LEN: usize = 64 + 1 + 15;

/// The result of one `recomputeAudienceForMonth` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceOutcome {
    /// Distinct audienceId count for this shard.
    pub audience: u64,
    pub content_length: u64,
    pub part: Option<String>,
}

pub async fn recompute_audience_for_month(
    store: &dyn BlobStore,
    show_uuid: Uuid,
    month: &str,
    part: Option<AudiencePart>,
) -> Result<AudienceOutcome> {
    let prefix = keys::daily_audience_month_prefix(show_uuid, month);
    let mut daily_keys = store.list(&prefix).await?;
    daily_keys.sort();

    let mut daily_found_audience: BTreeMap<String, u64> = BTreeMap::new();
    let mut order: Vec<(String, String)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for key in &daily_keys {
        let Some(date) = keys::date_part_of_key(show_uuid, key) else {
            continue;
        };
        let Some(fetched) = store.get(key, GetMode::Stream).await? else {
            continue;
        };
        let GetBody::Stream(reader) = fetched.body else {
            return Err(EngineError::CorruptInput(format!(
                "{key}: adapter returned a non-stream body for a streamed get"
            )));
        };

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }
            if line.len() != LINE_LEN {
                return Err(EngineError::CorruptInput(format!(
                    "{key}: malformed audience line (expected {LINE_LEN} chars, got {})",
                    line.len()
                )));
            }

            if let Some(p) = part {
                let first_char = line.chars().next().unwrap();
                let line_part = AudiencePart::part_num_for_hex_digit(p.num_parts, first_char)?;
                if line_part != p.part_num {
                    continue;
                }
            }

            let audience_id = &line[0..64];
            let timestamp = &line[65..80];

            increment(&mut daily_found_audience, &date);

            if seen.insert(audience_id.to_string()) {
                order.push((audience_id.to_string(), timestamp.to_string()));
            }
        }
    }

    let count = order.len() as u64;
    let body: Vec<u8> = order
        .iter()
        .flat_map(|(id, ts)| format!("{id}\t{ts}\n").into_bytes())
        .collect();
    let content_length = body.len() as u64;

    let part_label = part.map(|p| p.label());
    let blob_key = keys::monthly_audience_key(show_uuid, month, part_label.as_deref());
    let summary_key = keys::audience_summary_key(show_uuid, month, part_label.as_deref());

    let summary = AudienceSummary {
        show_uuid,
        period: month.to_string(),
        part: part_label.clone(),
        daily_found_audience,
    };

    let (blob_result, summary_result) = tokio::join!(
        put_with_retry(
            store,
            &blob_key,
            || PutBody::Stream {
                reader: Box::pin(std::io::Cursor::new(body.clone())),
                content_length,
            },
            2,
        ),
        async {
            let json = serde_json::to_string_pretty(&summary)?;
            store.put(&summary_key, PutBody::text(json)).await
        },
    );
    blob_result?;
    summary_result?;

    Ok(AudienceOutcome {
        audience: count,
        content_length,
        part: part_label,
    })
}
