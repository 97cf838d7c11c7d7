//! Output JSON schema definitions for profile data.
//!
//! This module defines the structure of JSON files we write to disk.
//! Schema is versioned to allow future evolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Top-level profile structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Schema version for compatibility checking
    pub version: String,

    /// What was measured and how
    pub header: ProfileHeader,

    /// Which collector produced the resources
    pub collector_info: CollectorInfo,

    /// Timestamp when profile was generated
    pub generated_at: String,

    /// One measurement per completed call
    pub resources: Vec<Resource>,
}

impl Profile {
    /// Sum of all resource amounts (total exclusive time)
    pub fn total_amount(&self) -> f64 {
        self.resources.iter().map(|r| r.amount).sum()
    }

    /// Unit of the profile's resource type, "s" if not recorded
    pub fn unit(&self) -> &str {
        self.header
            .units
            .get(&self.header.kind)
            .map(String::as_str)
            .unwrap_or(crate::utils::config::TIME_UNIT)
    }

    /// Command line the profile was measured for
    pub fn command(&self) -> String {
        format!("{} {}", self.header.cmd, self.header.workload)
            .trim()
            .to_string()
    }
}

/// Profile header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileHeader {
    /// Resource type, always "time" for event traces
    #[serde(rename = "type")]
    pub kind: String,

    /// Unit per resource type (e.g. "time" -> "s")
    pub units: BTreeMap<String, String>,

    /// Profiled command
    #[serde(default)]
    pub cmd: String,

    /// Workload passed to the command
    #[serde(default)]
    pub workload: String,
}

/// Collector description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorInfo {
    pub name: String,

    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Source location of a function, the thread-independent part of an event key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid {
    pub source: String,
    pub function: String,
    pub line: u32,
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.function, self.line)
    }
}

impl FromStr for Uid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let (Some(line), Some(function), Some(source)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("uid '{}' must have the form source:function:line", s));
        };

        let line = line
            .parse::<u32>()
            .map_err(|e| format!("invalid line number '{}': {}", line, e))?;

        Ok(Self {
            source: source.to_string(),
            function: function.to_string(),
            line,
        })
    }
}

/// Flattened measurement of one completed call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Exclusive time of the call
    pub amount: f64,

    /// Called function
    pub uid: Uid,

    /// Thread the call ran on
    #[serde(rename = "tid")]
    pub thread_id: String,

    /// Resource type ("time")
    #[serde(rename = "type")]
    pub kind: String,

    /// Calls of this function name observed across the whole log
    #[serde(rename = "ncalls")]
    pub call_count: u64,

    /// Callers present on the stack at entry, oldest first
    #[serde(default)]
    pub trace: Vec<Uid>,

    /// Exceptions raised or unwound through the call
    #[serde(default)]
    pub exceptions: Vec<String>,
}
