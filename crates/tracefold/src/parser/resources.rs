//! Flatten reconstructed calls into resource records.
//!
//! One resource is produced per completed call. The thread id is dropped
//! from the trace so identical call paths on different threads line up in
//! the aggregated flame graph.

use super::call_stack::Reconstruction;
use super::schema::{CollectorInfo, Profile, ProfileHeader, Resource};
use crate::utils::config::{COLLECTOR_NAME, RESOURCE_TYPE, SCHEMA_VERSION, TIME_UNIT};
use log::debug;
use std::collections::BTreeMap;

/// Convert every completed call into a [`Resource`]
///
/// **Public** - main entry point of resource extraction
///
/// # Arguments
/// * `reconstruction` - Result of a reconstruction pass
///
/// # Returns
/// One resource per completed call. No particular order is guaranteed.
pub fn extract(reconstruction: &Reconstruction) -> Vec<Resource> {
    let resources: Vec<Resource> = reconstruction
        .iter()
        .map(|(key, record)| Resource {
            amount: record.exclusive_time,
            uid: key.uid(),
            thread_id: key.thread_id.clone(),
            kind: RESOURCE_TYPE.to_string(),
            call_count: reconstruction.call_count(&key.function),
            trace: record.trace.iter().map(|k| k.uid()).collect(),
            exceptions: record.exceptions.clone(),
        })
        .collect();

    debug!("Extracted {} resources", resources.len());
    resources
}

/// Wrap resources into a profile document
///
/// # Arguments
/// * `resources` - Extracted resources
/// * `cmd` - Profiled command, informational
/// * `workload` - Workload passed to the command, informational
pub fn to_profile(resources: Vec<Resource>, cmd: &str, workload: &str) -> Profile {
    let mut units = BTreeMap::new();
    units.insert(RESOURCE_TYPE.to_string(), TIME_UNIT.to_string());

    Profile {
        version: SCHEMA_VERSION.to_string(),
        header: ProfileHeader {
            kind: RESOURCE_TYPE.to_string(),
            units,
            cmd: cmd.to_string(),
            workload: workload.to_string(),
        },
        collector_info: CollectorInfo {
            name: COLLECTOR_NAME.to_string(),
            params: BTreeMap::new(),
        },
        generated_at: chrono::Utc::now().to_rfc3339(),
        resources,
    }
}
