//! Streaming TSV line iterator for show-daily blobs (§4.B).
//!
//! Recognized columns are modeled as a fixed set of optional fields
//! (§9 Design Notes) rather than a generic map: defaulting happens in
//! the daily computer (§4.D), this module only decodes rows.

use std::pin::Pin;

use futures::Stream;
use podsum_core::Result;
use podsum_store::BoxAsyncRead;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One decoded row of a show-daily TSV file. Columns absent from the row
/// (either because the header didn't carry them, or the row had fewer
/// tab-separated fields than the header) are `None`, never `Some("")`
/// unless the source field was truly an empty string between two tabs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowDailyRow {
    pub time: Option<String>,
    pub episode_id: Option<String>,
    pub audience_id: Option<String>,
    pub bot_type: Option<String>,
    pub country_code: Option<String>,
    pub continent_code: Option<String>,
    pub region_name: Option<String>,
    pub agent_type: Option<String>,
    pub agent_name: Option<String>,
    pub device_type: Option<String>,
    pub device_name: Option<String>,
    pub referrer_type: Option<String>,
    pub referrer_name: Option<String>,
    pub metro_code: Option<String>,
    pub tags: Option<String>,
}

const COLUMNS: &[&str] = &[
    "time",
    "episodeId",
    "audienceId",
    "botType",
    "countryCode",
    "continentCode",
    "regionName",
    "agentType",
    "agentName",
    "deviceType",
    "deviceName",
    "referrerType",
    "referrerName",
    "metroCode",
    "tags",
];

fn assign(row: &mut ShowDailyRow, column: &str, value: String) {
    let value = if value.is_empty() { None } else { Some(value) };
    match column {
        "time" => row.time = value,
        "episodeId" => row.episode_id = value,
        "audienceId" => row.audience_id = value,
        "botType" => row.bot_type = value,
        "countryCode" => row.country_code = value,
        "continentCode" => row.continent_code = value,
        "regionName" => row.region_name = value,
        "agentType" => row.agent_type = value,
        "agentName" => row.agent_name = value,
        "deviceType" => row.device_type = value,
        "deviceName" => row.device_name = value,
        "referrerType" => row.referrer_type = value,
        "referrerName" => row.referrer_name = value,
        "metroCode" => row.metro_code = value,
        "tags" => row.tags = value,
        _ => {}
    }
}

/// Decode a show-daily TSV byte stream into a lazy sequence of rows.
///
/// The header row is read once to build a column-name-to-index map, so
/// producers may emit columns in any order or omit unrecognized ones
/// (the remaining, unrecognized columns besides [`COLUMNS`] are ignored).
pub fn read_show_daily_rows(
    reader: BoxAsyncRead,
) -> Pin<Box<dyn Stream<Item = Result<ShowDailyRow>> + Send>> {
    Box::pin(async_stream::try_stream! {
        let mut lines = BufReader::new(reader).lines();

        let Some(header_line) = lines.next_line().await? else {
            return;
        };
        let header: Vec<&str> = header_line.split('\t').collect();

        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }
            let mut row = ShowDailyRow::default();
            for (idx, field) in line.split('\t').enumerate() {
                let Some(column) = header.get(idx) else {
                    break;
                };
                if COLUMNS.contains(column) {
                    assign(&mut row, column, field.to_string());
                }
            }
            yield row;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn stream_of(text: &str) -> BoxAsyncRead {
        Box::pin(std::io::Cursor::new(text.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn decodes_known_columns() {
        let text = "time\tepisodeId\taudienceId\n2024-03-05T10:01:00.000Z\tE1\ta01\n";
        let mut rows = read_show_daily_rows(stream_of(text));
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.time.as_deref(), Some("2024-03-05T10:01:00.000Z"));
        assert_eq!(row.episode_id.as_deref(), Some("E1"));
        assert_eq!(row.audience_id.as_deref(), Some("a01"));
        assert!(rows.next().await.is_none());
    }

    #[tokio::test]
    async fn missing_trailing_columns_are_absent_not_empty() {
        let text = "time\tepisodeId\taudienceId\n2024-03-05T10:01:00.000Z\n";
        let mut rows = read_show_daily_rows(stream_of(text));
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.time.as_deref(), Some("2024-03-05T10:01:00.000Z"));
        assert_eq!(row.episode_id, None);
        assert_eq!(row.audience_id, None);
    }

    #[tokio::test]
    async fn empty_string_field_is_absent() {
        let text = "time\tepisodeId\n2024-03-05T10:01:00.000Z\t\n";
        let mut rows = read_show_daily_rows(stream_of(text));
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.episode_id, None);
    }

    #[tokio::test]
    async fn skips_trailing_empty_lines() {
        let text = "time\n2024-03-05T10:01:00.000Z\n\n\n";
        let mut rows = read_show_daily_rows(stream_of(text));
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.time.as_deref(), Some("2024-03-05T10:01:00.000Z"));
        assert!(rows.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_file_yields_no_rows() {
        let mut rows = read_show_daily_rows(stream_of(""));
        assert!(rows.next().await.is_none());
    }
}
