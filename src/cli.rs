//! CLI interface for podsum.
//!
//! The engine's only configuration surface is a job request (§6); this
//! module is a thin clap wrapper that builds one and nothing else.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use podsum_core::error::Result;
use podsum_core::request::{JobRequest, OPERATION_KIND, TARGET_PATH};

/// Recompute podcast show-download summaries.
#[derive(Parser, Debug, Clone)]
#[command(name = "podsum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Root directory backing the blob store.
    #[arg(long, env = "PODSUM_STORE_ROOT")]
    pub store: PathBuf,

    /// Show UUID to recompute.
    #[arg(long)]
    pub show: String,

    /// Month to recompute, `YYYY-MM`.
    #[arg(long)]
    pub month: String,

    /// Comma-separated phase tokens (`dailies`, `aggregates`, `audience`,
    /// `audience-NofM`). Defaults to all three, audience unpartitioned.
    #[arg(long)]
    pub phases: Option<String>,

    /// First day of the month to process (dailies phase only).
    #[arg(long)]
    pub start_day: Option<u32>,

    /// Maximum number of days to process, starting at `--start-day`.
    #[arg(long)]
    pub max_days: Option<u32>,

    /// Process days one at a time instead of concurrently.
    #[arg(long)]
    pub sequential: bool,

    /// Emit an info-level log line per completed phase.
    #[arg(long)]
    pub log: bool,

    /// Show informational output (default is quiet mode with only warnings and errors).
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Build and validate a [`JobRequest`] from the parsed arguments, going
    /// through the same envelope+parameter-map surface a remote caller
    /// would use (§6).
    pub fn job_request(&self) -> Result<JobRequest> {
        let mut parameters = BTreeMap::new();
        parameters.insert("show".to_string(), self.show.clone());
        parameters.insert("month".to_string(), self.month.clone());
        if let Some(phases) = &self.phases {
            parameters.insert("phases".to_string(), phases.clone());
        }
        if let Some(start_day) = self.start_day {
            parameters.insert("startDay".to_string(), start_day.to_string());
        }
        if let Some(max_days) = self.max_days {
            parameters.insert("maxDays".to_string(), max_days.to_string());
        }
        let mut flags = Vec::new();
        if self.sequential {
            flags.push("sequential");
        }
        if self.log {
            flags.push("log");
        }
        if !flags.is_empty() {
            parameters.insert("flags".to_string(), flags.join(","));
        }

        JobRequest::from_envelope(OPERATION_KIND, TARGET_PATH, &parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_job_request_from_minimal_args() {
        let cli = Cli {
            store: PathBuf::from("/tmp/podsum"),
            show: "123e4567-e89b-12d3-a456-426614174000".to_string(),
            month: "2024-03".to_string(),
            phases: None,
            start_day: None,
            max_days: None,
            sequential: false,
            log: false,
            verbose: false,
        };
        let req = cli.job_request().unwrap();
        assert_eq!(req.month.as_string(), "2024-03");
    }

    #[test]
    fn threads_flags_and_window_through() {
        let cli = Cli {
            store: PathBuf::from("/tmp/podsum"),
            show: "123e4567-e89b-12d3-a456-426614174000".to_string(),
            month: "2024-03".to_string(),
            phases: Some("dailies,audience-2of4".to_string()),
            start_day: Some(5),
            max_days: Some(3),
            sequential: true,
            log: true,
            verbose: false,
        };
        let req = cli.job_request().unwrap();
        assert!(req.sequential);
        assert!(req.log);
        assert_eq!(req.start_day, Some(5));
        assert_eq!(req.max_days, Some(3));
    }
}
