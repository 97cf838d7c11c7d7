//! SVG flamegraph generation from a laid out flame tree.
//!
//! Frames are drawn from the geometry computed by [`layout`]:
//! - Red frames saw an exception, green frames did not
//! - Labels are truncated to the frame width with a ".." suffix
//! - Each frame carries its tooltip in a `<title>` element

use super::layout::{layout, Layout, LayoutConfig, Orientation};
use crate::aggregator::flow::FlameTree;
use crate::aggregator::metrics::HotPath;
use crate::utils::config::{
    DEFAULT_FRAME_HEIGHT, DEFAULT_IMAGE_WIDTH, DEFAULT_MIN_WIDTH, FONT_SIZE, FONT_WIDTH,
    TIME_UNIT, X_PADDING,
};
use crate::utils::error::{ConfigError, FlamegraphError};
use colored::Colorize;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

const EXCEPTION_COLOR: &str = "rgb(220, 20, 60)";
const NORMAL_COLOR: &str = "rgb(34, 139, 34)";

/// Flamegraph configuration
///
/// Can be loaded from a TOML file; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlamegraphConfig {
    pub title: String,
    pub subtitle: String,
    pub width: f64,
    pub frame_height: f64,
    /// Minimum visible frame width in pixels
    pub min_width: f64,
    pub orientation: Orientation,
    /// Unit shown in tooltips
    pub unit: String,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Flame Graph".to_string(),
            subtitle: String::new(),
            width: DEFAULT_IMAGE_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            min_width: DEFAULT_MIN_WIDTH,
            orientation: Orientation::Flame,
            unit: TIME_UNIT.to_string(),
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML render configuration
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML render configuration from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading render config: {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width.is_nan() || self.width <= 2.0 * X_PADDING {
            return Err(ConfigError::Invalid(format!(
                "width must exceed {} pixels, got {}",
                2.0 * X_PADDING,
                self.width
            )));
        }
        if self.frame_height.is_nan() || self.frame_height <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "frame_height must be positive, got {}",
                self.frame_height
            )));
        }
        if self.min_width.is_nan() || self.min_width < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_width must not be negative, got {}",
                self.min_width
            )));
        }
        Ok(())
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_frame_height(mut self, frame_height: f64) -> Self {
        self.frame_height = frame_height;
        self
    }

    pub fn with_min_width(mut self, min_width: f64) -> Self {
        self.min_width = min_width;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Canvas parameters for the layout pass
    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            image_width: self.width,
            frame_height: self.frame_height,
            min_width: self.min_width,
            orientation: self.orientation,
            unit: self.unit.clone(),
            ..LayoutConfig::default()
        }
    }
}

/// Generate SVG flamegraph from a flame tree
///
/// **Public** - main entry point for single-profile rendering
///
/// # Arguments
/// * `tree` - Aggregated flame tree
/// * `config` - Render configuration, defaults if None
///
/// # Returns
/// Complete SVG document
pub fn generate_flamegraph(
    tree: &FlameTree,
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    let config = config.cloned().unwrap_or_default();
    let geometry = layout(tree, tree.total_weight(), &config.layout_config())?;

    info!(
        "Generating flamegraph with {} frames (max depth {})",
        geometry.frames.len(),
        geometry.max_depth
    );

    let svg = render_svg(&geometry, &config, |frame| {
        if frame.has_exception {
            EXCEPTION_COLOR.to_string()
        } else {
            NORMAL_COLOR.to_string()
        }
    });

    info!("Flamegraph generated successfully ({} bytes)", svg.len());
    Ok(svg)
}

/// Render laid out frames, the fill color chosen per frame
pub(crate) fn render_svg(
    geometry: &Layout,
    config: &FlamegraphConfig,
    fill: impl Fn(&super::layout::FrameRect) -> String,
) -> String {
    let width = geometry.image_width;
    let height = geometry.image_height;
    let mut svg = String::new();

    // Header
    svg.push_str(&format!(
        r#"<?xml version="1.0" standalone="no"?><svg version="1.1" xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        width, height, width, height
    ));

    // Styles
    svg.push_str(&format!(
        r#"<style type="text/css">text {{ font-family:Verdana; font-size:{}px; fill:#000000; }} #title {{ text-anchor:middle; font-size:{}px; }} #subtitle {{ text-anchor:middle; }} #frames > *:hover {{ stroke:black; stroke-width:0.5; cursor:pointer; }}</style>"#,
        FONT_SIZE,
        FONT_SIZE + 5.0
    ));

    // Background and title
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{}" height="{}" fill="white"/>"#,
        width, height
    ));
    svg.push_str(&format!(
        r#"<text id="title" x="{:.2}" y="{:.2}">{}</text>"#,
        width / 2.0,
        FONT_SIZE * 2.0,
        escape_xml(&config.title)
    ));
    svg.push_str(&format!(
        r#"<text id="subtitle" x="{:.2}" y="{:.2}">{}</text>"#,
        width / 2.0,
        FONT_SIZE * 4.0,
        escape_xml(&config.subtitle)
    ));

    svg.push_str(r#"<g id="frames">"#);
    for frame in &geometry.frames {
        svg.push_str(&format!(
            r#"<g><title>{}</title><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" rx="2" ry="2"/>"#,
            escape_xml(&frame.info),
            frame.x1,
            frame.y1,
            frame.width(),
            frame.y2 - frame.y1,
            fill(frame)
        ));

        if let Some(text) = truncate_label(&frame.label, frame.width()) {
            svg.push_str(&format!(
                r#"<text x="{:.2}" y="{:.2}">{}</text>"#,
                frame.x1 + 3.0,
                3.0 + (frame.y1 + frame.y2) / 2.0,
                escape_xml(&text)
            ));
        }
        svg.push_str("</g>");
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

/// Fit a label into a frame of `width` pixels
///
/// Returns `None` when fewer than 3 characters fit.
pub fn truncate_label(label: &str, width: f64) -> Option<String> {
    let chars = (width / (FONT_SIZE * FONT_WIDTH)) as usize;
    if chars < 3 || label.is_empty() {
        return None;
    }

    let length = label.chars().count();
    if chars < length {
        let kept: String = label.chars().take(chars - 2).collect();
        Some(format!("{}..", kept))
    } else {
        Some(label.to_string())
    }
}

/// Escape text for SVG element content and attributes
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Create a text summary of the hottest paths for the terminal
pub fn generate_text_summary(hot_paths: &[HotPath], max_lines: usize, unit: &str) -> String {
    let mut lines = Vec::new();

    lines.push(format!("  {}", "HOT PATHS (exclusive time)".bold()));
    lines.push(format!("  {}", "━".repeat(78)));
    lines.push(format!(
        "  {:<48} {:>14} {:>7} {:>6}",
        "Call Path (Hottest First)", "TIME", "%", "CALLS"
    ));
    lines.push(format!("  {}", "━".repeat(78)));

    for path in hot_paths.iter().take(max_lines) {
        let stack = truncate_stack(&path.display_stack(), 48);
        let stack = if path.has_exception {
            format!("{:<48}", stack).red().to_string()
        } else {
            format!("{:<48}", stack).cyan().to_string()
        };

        lines.push(format!(
            "  {} {:>12.6}{:<2} {:>6.1}% {:>6}",
            stack, path.weight, unit, path.percentage, path.call_count
        ));
    }

    lines.push(format!("  {}", "━".repeat(78)));

    if hot_paths.len() > max_lines {
        lines.push(format!(
            "   (Showing top {} of {} paths)",
            max_lines,
            hot_paths.len()
        ));
    }

    lines.join("\n")
}

/// Keep the tail of a long stack, the innermost frames matter most
fn truncate_stack(s: &str, max_len: usize) -> String {
    let length = s.chars().count();
    if length > max_len {
        let tail: String = s.chars().skip(length - (max_len - 3)).collect();
        format!("...{}", tail)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_label() {
        // 12 * 0.59 = 7.08 px per character
        assert_eq!(truncate_label("handle_request", 200.0).as_deref(), Some("handle_request"));
        assert_eq!(truncate_label("handle_request", 50.0).as_deref(), Some("handl.."));
        assert_eq!(truncate_label("handle_request", 20.0), None);
        assert_eq!(truncate_label("", 500.0), None);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<lambda> & "x""#), "&lt;lambda&gt; &amp; &quot;x&quot;");
    }

    #[test]
    fn test_config_from_toml() {
        let config = FlamegraphConfig::from_toml_str(
            "title = \"Run\"\nwidth = 800.0\norientation = \"icicle\"\n",
        )
        .unwrap();
        assert_eq!(config.title, "Run");
        assert_eq!(config.width, 800.0);
        assert_eq!(config.orientation, Orientation::Icicle);
        assert_eq!(config.frame_height, DEFAULT_FRAME_HEIGHT);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(FlamegraphConfig::from_toml_str("width = 5.0").is_err());
        assert!(FlamegraphConfig::from_toml_str("frame_height = 0.0").is_err());
        assert!(FlamegraphConfig::from_toml_str("width = \"wide\"").is_err());
    }

    #[test]
    fn test_truncate_stack_keeps_tail() {
        assert_eq!(truncate_stack("abcdefghij", 6), "...hij");
        assert_eq!(truncate_stack("abc", 6), "abc");
    }
}
