//! Job request parsing and validation (§4.G, §6).
//!
//! The phase coordinator's only configuration surface is a job request:
//! an `operationKind` + `targetPath` envelope carrying a flat string
//! parameter map. Validation happens here, before any I/O, so that
//! `InvalidInput` never reaches the coordinator mid-run.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::types::{parse_show_uuid, AudiencePart, Period};

/// The fixed envelope values the coordinator accepts.
pub const OPERATION_KIND: &str = "update";
/// The fixed envelope values the coordinator accepts.
pub const TARGET_PATH: &str = "/work/recompute-show-summaries";

/// One recognized phase token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Dailies,
    Aggregates,
    /// Unpartitioned, or sharded when `Some`.
    Audience(Option<AudiencePart>),
}

impl Phase {
    /// Parse one comma-separated phase token.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "dailies" => Ok(Phase::Dailies),
            "aggregates" => Ok(Phase::Aggregates),
            "audience" => Ok(Phase::Audience(None)),
            other => {
                if let Some(rest) = other.strip_prefix("audience-") {
                    Ok(Phase::Audience(Some(AudiencePart::parse(rest)?)))
                } else {
                    Err(EngineError::InvalidInput(format!(
                        "unrecognized phase token: {other}"
                    )))
                }
            }
        }
    }
}

/// A parsed and validated job request.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub show_uuid: Uuid,
    pub month: Period,
    pub phases: Vec<Phase>,
    pub start_day: Option<u32>,
    pub max_days: Option<u32>,
    pub sequential: bool,
    pub log: bool,
}

impl JobRequest {
    /// Default phase list when `phases` is omitted: all three stages,
    /// audience unpartitioned.
    fn default_phases() -> Vec<Phase> {
        vec![Phase::Dailies, Phase::Aggregates, Phase::Audience(None)]
    }

    /// Build and validate a request from the job surface's flat parameter
    /// map (§6), after checking the fixed `operationKind`/`targetPath`
    /// envelope.
    pub fn from_envelope(
        operation_kind: &str,
        target_path: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Self> {
        if operation_kind != OPERATION_KIND {
            return Err(EngineError::InvalidInput(format!(
                "unsupported operationKind: {operation_kind}"
            )));
        }
        if target_path != TARGET_PATH {
            return Err(EngineError::InvalidInput(format!(
                "unsupported targetPath: {target_path}"
            )));
        }

        let show = parameters
            .get("show")
            .ok_or_else(|| EngineError::InvalidInput("missing parameter: show".to_string()))?;
        let show_uuid = parse_show_uuid(show)?;

        let month_str = parameters
            .get("month")
            .ok_or_else(|| EngineError::InvalidInput("missing parameter: month".to_string()))?;
        let month = Period::parse_month(month_str)?;

        let phases = match parameters.get("phases") {
            Some(s) if !s.trim().is_empty() => s
                .split(',')
                .map(str::trim)
                .map(Phase::parse)
                .collect::<Result<Vec<_>>>()?,
            _ => Self::default_phases(),
        };

        let start_day = parameters
            .get("startDay")
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| EngineError::InvalidInput(format!("invalid startDay: {s}")))
            })
            .transpose()?;

        let max_days = parameters
            .get("maxDays")
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| EngineError::InvalidInput(format!("invalid maxDays: {s}")))
            })
            .transpose()?;

        let flags: Vec<&str> = parameters
            .get("flags")
            .map(|s| s.split(',').map(str::trim).collect())
            .unwrap_or_default();
        let sequential = flags.contains(&"sequential");
        let log = flags.contains(&"log");

        Ok(JobRequest {
            show_uuid,
            month,
            phases,
            start_day,
            max_days,
            sequential,
            log,
        })
    }

    pub fn wants_dailies(&self) -> bool {
        self.phases.iter().any(|p| matches!(p, Phase::Dailies))
    }

    pub fn wants_aggregates(&self) -> bool {
        self.phases.iter().any(|p| matches!(p, Phase::Aggregates))
    }

    /// The audience phase, if requested. `Some(None)` means unpartitioned,
    /// `Some(Some(part))` means sharded.
    pub fn audience_phase(&self) -> Option<Option<AudiencePart>> {
        self.phases.iter().find_map(|p| match p {
            Phase::Audience(part) => Some(*part),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_minimal_request() {
        let req = JobRequest::from_envelope(
            OPERATION_KIND,
            TARGET_PATH,
            &params(&[
                ("show", "123e4567-e89b-12d3-a456-426614174000"),
                ("month", "2024-03"),
            ]),
        )
        .unwrap();
        assert_eq!(req.month.as_string(), "2024-03");
        assert!(req.wants_dailies());
        assert!(req.wants_aggregates());
        assert_eq!(req.audience_phase(), Some(None));
        assert!(!req.sequential);
        assert!(!req.log);
    }

    #[test]
    fn parses_explicit_phases_and_flags() {
        let req = JobRequest::from_envelope(
            OPERATION_KIND,
            TARGET_PATH,
            &params(&[
                ("show", "123e4567-e89b-12d3-a456-426614174000"),
                ("month", "2024-03"),
                ("phases", "dailies,audience-2of4"),
                ("flags", "sequential,log"),
                ("startDay", "5"),
                ("maxDays", "3"),
            ]),
        )
        .unwrap();
        assert!(req.wants_dailies());
        assert!(!req.wants_aggregates());
        assert_eq!(
            req.audience_phase(),
            Some(Some(AudiencePart {
                part_num: 2,
                num_parts: 4
            }))
        );
        assert!(req.sequential);
        assert!(req.log);
        assert_eq!(req.start_day, Some(5));
        assert_eq!(req.max_days, Some(3));
    }

    #[test]
    fn rejects_bad_envelope() {
        let err = JobRequest::from_envelope("delete", TARGET_PATH, &params(&[])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn rejects_unknown_phase_token() {
        let err = JobRequest::from_envelope(
            OPERATION_KIND,
            TARGET_PATH,
            &params(&[
                ("show", "123e4567-e89b-12d3-a456-426614174000"),
                ("month", "2024-03"),
                ("phases", "nonsense"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
