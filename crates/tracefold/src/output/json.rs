//! JSON profile reader and writer.
//!
//! Profiles are written pretty printed so they diff well under version control.

use crate::parser::schema::Profile;
use crate::utils::error::OutputError;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a profile to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `profile` - Profile data to write
/// * `output_path` - Path to output JSON file, parent directories are created
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_profile(profile: &Profile, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing profile to: {}", output_path.display());

    super::prepare_output(output_path)?;

    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, profile)?;
    writer.flush()?;

    info!(
        "Profile written successfully ({} resources, {} bytes)",
        profile.resources.len(),
        std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0)
    );
    Ok(())
}

/// Serialize a profile to a pretty printed JSON string
pub fn profile_to_string(profile: &Profile) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(profile)?)
}

/// Read a profile from a JSON file
///
/// **Public** - used by flamegraph, diff and validate
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_profile(input_path: impl AsRef<Path>) -> Result<Profile, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading profile from: {}", input_path.display());

    let reader = BufReader::new(File::open(input_path)?);
    let profile: Profile = serde_json::from_reader(reader)?;

    if profile.version != crate::utils::config::SCHEMA_VERSION {
        warn!(
            "Profile {} has schema version {}, expected {}",
            input_path.display(),
            profile.version,
            crate::utils::config::SCHEMA_VERSION
        );
    }

    debug!(
        "Profile loaded: version {}, {} resources",
        profile.version,
        profile.resources.len()
    );
    Ok(profile)
}
