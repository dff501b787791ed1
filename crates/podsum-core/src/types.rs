//! Core domain types for podsum
//!
//! These types model the summaries produced by the recomputation engine:
//! [`ShowSummary`] (daily/monthly roll-ups), [`OverallSummary`] (the
//! monotone per-episode first-download roll-up), and [`AudienceSummary`]
//! (the month-scoped distinct-audience roll-up). All mapping fields use
//! `BTreeMap` so that serialization is always in ascending key order,
//! recursively, without a separate sort pass.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// A period identifying one summary: a calendar date, a calendar month,
/// or the literal `overall`.
///
/// # Examples
/// ```
/// use podsum_core::types::Period;
///
/// let date = Period::parse_date("2024-03-05").unwrap();
/// assert_eq!(date.as_string(), "2024-03-05");
///
/// let month = Period::parse_month("2024-03").unwrap();
/// assert_eq!(month.as_string(), "2024-03");
/// assert_eq!(month.month_prefix().unwrap(), "2024-03");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// A single calendar day.
    Date(NaiveDate),
    /// A calendar month (year, month).
    Month(i32, u32),
    /// The `overall` literal period.
    Overall,
}

impl Period {
    /// Parse a `YYYY-MM-DD` date period.
    pub fn parse_date(s: &str) -> Result<Self> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Period::Date)
            .map_err(|_| EngineError::InvalidInput(format!("invalid date: {s}")))
    }

    /// Parse a `YYYY-MM` month period.
    pub fn parse_month(s: &str) -> Result<Self> {
        let with_day = format!("{s}-01");
        NaiveDate::parse_from_str(&with_day, "%Y-%m-%d")
            .map_err(|_| EngineError::InvalidInput(format!("invalid month: {s}")))?;
        let (year_str, month_str) = s
            .split_once('-')
            .ok_or_else(|| EngineError::InvalidInput(format!("invalid month: {s}")))?;
        let year: i32 = year_str
            .parse()
            .map_err(|_| EngineError::InvalidInput(format!("invalid month: {s}")))?;
        let month: u32 = month_str
            .parse()
            .map_err(|_| EngineError::InvalidInput(format!("invalid month: {s}")))?;
        Ok(Period::Month(year, month))
    }

    /// Render the period as its canonical string form.
    pub fn as_string(&self) -> String {
        match self {
            Period::Date(d) => d.format("%Y-%m-%d").to_string(),
            Period::Month(y, m) => format!("{y:04}-{m:02}"),
            Period::Overall => "overall".to_string(),
        }
    }

    /// The `YYYY-MM` prefix that every hour-bucket key must start with,
    /// for a month period. `None` for date/overall periods.
    pub fn month_prefix(&self) -> Option<String> {
        match self {
            Period::Month(y, m) => Some(format!("{y:04}-{m:02}")),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

/// A per-episode roll-up within a date or month [`ShowSummary`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSummary {
    /// Hour-bucket (`YYYY-MM-DDTHH`) to download count.
    pub hourly_downloads: BTreeMap<String, u64>,
    /// Earliest hour ever observed for this episode in the encompassing period.
    pub first_hour: String,
}

impl EpisodeSummary {
    /// Total downloads recorded for this episode.
    pub fn total(&self) -> u64 {
        self.hourly_downloads.values().sum()
    }
}

/// A roll-up for one `(show, period)`: a date, a month, or the literal `overall`
/// is represented by [`OverallSummary`] instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowSummary {
    /// The show this summary belongs to.
    pub show_uuid: Uuid,
    /// `YYYY-MM-DD` or `YYYY-MM`.
    pub period: String,
    /// Hour-bucket to total-download count.
    pub hourly_downloads: BTreeMap<String, u64>,
    /// Per-episode roll-ups, keyed by `episodeId`.
    pub episodes: BTreeMap<String, EpisodeSummary>,
    /// Dimension name to (bucket label to count), when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_downloads: Option<BTreeMap<String, BTreeMap<String, u64>>>,
    /// Source blob key to the ETag observed when it was read.
    pub sources: BTreeMap<String, String>,
}

impl ShowSummary {
    /// Total downloads recorded in `hourly_downloads`.
    pub fn total(&self) -> u64 {
        self.hourly_downloads.values().sum()
    }
}

/// One episode's entry in the `overall` summary: only the monotone
/// `firstHour`, never hourly downloads or dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallEpisode {
    /// Lexicographic minimum `firstHour` across every contributing summary.
    pub first_hour: String,
}

/// The `overall` summary for a show: the union of every episode ever
/// aggregated, with its earliest-ever `firstHour`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallSummary {
    pub show_uuid: Uuid,
    /// Always the literal `"overall"`.
    pub period: String,
    pub episodes: BTreeMap<String, OverallEpisode>,
    pub sources: BTreeMap<String, String>,
}

/// Month-scoped distinct-audience roll-up, optionally restricted to one
/// hex-prefix shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceSummary {
    pub show_uuid: Uuid,
    /// `YYYY-MM`.
    pub period: String,
    /// e.g. `"1of4"`, absent when unsharded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    /// `YYYY-MM-DD` to count of accepted audience lines for that day
    /// (lines counted, not distinct ids - see [`crate::types::AudienceSummary`] docs).
    pub daily_found_audience: BTreeMap<String, u64>,
}

/// A shard over the audience-id hex-prefix space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudiencePart {
    pub part_num: u8,
    pub num_parts: u8,
}

impl AudiencePart {
    /// Parse the `NofM` suffix of an `audience-NofM` phase token.
    pub fn parse(s: &str) -> Result<Self> {
        let (n, m) = s
            .split_once("of")
            .ok_or_else(|| EngineError::InvalidInput(format!("invalid audience part: {s}")))?;
        let part_num: u8 = n
            .parse()
            .map_err(|_| EngineError::InvalidInput(format!("invalid audience part: {s}")))?;
        let num_parts: u8 = m
            .parse()
            .map_err(|_| EngineError::InvalidInput(format!("invalid audience part: {s}")))?;
        let part = AudiencePart {
            part_num,
            num_parts,
        };
        part.validate()?;
        Ok(part)
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.num_parts, 4 | 8) {
            return Err(EngineError::InvalidInput(format!(
                "unsupported numParts: {}",
                self.num_parts
            )));
        }
        if self.part_num == 0 || self.part_num > self.num_parts {
            return Err(EngineError::InvalidInput(format!(
                "invalid partNum {} for numParts {}",
                self.part_num, self.num_parts
            )));
        }
        Ok(())
    }

    /// The suffix used in blob keys and the `part` field, e.g. `"2of4"`.
    pub fn label(&self) -> String {
        format!("{}of{}", self.part_num, self.num_parts)
    }

    /// Classify a line by the first hex digit of its audience-id, per the
    /// shard thresholds in §4.F.3.
    pub fn part_num_for_hex_digit(num_parts: u8, c: char) -> Result<u8> {
        let c = c.to_ascii_lowercase();
        match num_parts {
            4 => Ok(match c {
                '0'..='3' => 1,
                '4'..='7' => 2,
                '8'..='b' => 3,
                _ => 4,
            }),
            8 => Ok(match c {
                '0' | '1' => 1,
                '2' | '3' => 2,
                '4' | '5' => 3,
                '6' | '7' => 4,
                '8' | '9' => 5,
                'a' | 'b' => 6,
                'c' | 'd' => 7,
                _ => 8,
            }),
            other => Err(EngineError::InvalidInput(format!(
                "unsupported numParts: {other}"
            ))),
        }
    }
}

/// Parse a show UUID from a job request's `show` parameter.
pub fn parse_show_uuid(s: &str) -> Result<Uuid> {
    Uuid::from_str(s).map_err(|_| EngineError::InvalidInput(format!("invalid show uuid: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_date_period() {
        let p = Period::parse_date("2024-03-05").unwrap();
        assert_eq!(p.as_string(), "2024-03-05");
        assert!(p.month_prefix().is_none());
    }

    #[test]
    fn parses_month_period() {
        let p = Period::parse_month("2024-03").unwrap();
        assert_eq!(p.as_string(), "2024-03");
        assert_eq!(p.month_prefix().unwrap(), "2024-03");
    }

    #[test]
    fn rejects_bad_month() {
        assert!(Period::parse_month("2024-13").is_err());
        assert!(Period::parse_month("abcd").is_err());
    }

    #[test]
    fn overall_period_has_no_prefix() {
        assert_eq!(Period::Overall.as_string(), "overall");
        assert!(Period::Overall.month_prefix().is_none());
    }

    #[test]
    fn audience_part_label_and_validate() {
        let part = AudiencePart::parse("2of4").unwrap();
        assert_eq!(part.label(), "2of4");
        assert!(AudiencePart::parse("1of3").is_err());
        assert!(AudiencePart::parse("5of4").is_err());
    }

    #[test]
    fn shard_thresholds_4way() {
        assert_eq!(AudiencePart::part_num_for_hex_digit(4, '0').unwrap(), 1);
        assert_eq!(AudiencePart::part_num_for_hex_digit(4, '3').unwrap(), 1);
        assert_eq!(AudiencePart::part_num_for_hex_digit(4, '4').unwrap(), 2);
        assert_eq!(AudiencePart::part_num_for_hex_digit(4, '7').unwrap(), 2);
        assert_eq!(AudiencePart::part_num_for_hex_digit(4, '8').unwrap(), 3);
        assert_eq!(AudiencePart::part_num_for_hex_digit(4, 'b').unwrap(), 3);
        assert_eq!(AudiencePart::part_num_for_hex_digit(4, 'c').unwrap(), 4);
        assert_eq!(AudiencePart::part_num_for_hex_digit(4, 'f').unwrap(), 4);
    }

    #[test]
    fn shard_thresholds_8way() {
        assert_eq!(AudiencePart::part_num_for_hex_digit(8, '0').unwrap(), 1);
        assert_eq!(AudiencePart::part_num_for_hex_digit(8, '2').unwrap(), 2);
        assert_eq!(AudiencePart::part_num_for_hex_digit(8, '4').unwrap(), 3);
        assert_eq!(AudiencePart::part_num_for_hex_digit(8, '6').unwrap(), 4);
        assert_eq!(AudiencePart::part_num_for_hex_digit(8, '8').unwrap(), 5);
        assert_eq!(AudiencePart::part_num_for_hex_digit(8, 'a').unwrap(), 6);
        assert_eq!(AudiencePart::part_num_for_hex_digit(8, 'c').unwrap(), 7);
        assert_eq!(AudiencePart::part_num_for_hex_digit(8, 'e').unwrap(), 8);
    }

    #[test]
    fn unsupported_num_parts_rejected() {
        assert!(AudiencePart::part_num_for_hex_digit(3, '0').is_err());
    }
}
