//! SVG flamegraph output writer.

use crate::utils::error::OutputError;
use log::info;
use std::path::Path;

/// Write SVG content to a file
///
/// **Public** - main entry point for SVG output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::InvalidPath` - Path is a directory or cannot be created
///
/// # Example
/// ```ignore
/// let svg = generate_flamegraph(&tree, None)?;
/// write_svg(&svg, "flamegraph.svg")?;
/// ```
pub fn write_svg(svg_content: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing SVG to: {}", output_path.display());

    super::prepare_output(output_path)?;
    std::fs::write(output_path, svg_content)?;

    info!(
        "SVG written successfully ({:.2} KB)",
        svg_content.len() as f64 / 1024.0
    );
    Ok(())
}
