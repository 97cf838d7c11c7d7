//! Pixel geometry of a flame tree.
//!
//! Offsets in weight units are scaled by
//! `width_per_unit = (image_width - 2 * x_padding) / total_weight`.
//! Frames narrower than `min_width` pixels are dropped before drawing.

use crate::aggregator::flow::FlameTree;
use crate::utils::config::{
    DEFAULT_FRAME_HEIGHT, DEFAULT_IMAGE_WIDTH, DEFAULT_MIN_WIDTH, TIME_UNIT, X_PADDING,
    Y_PADDING_SUBTITLE, Y_PADDING_TITLE,
};
use crate::utils::error::FlamegraphError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gap between stacked frames
const FRAME_PADDING: f64 = 1.0;

/// Direction the stack grows in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Root at the bottom
    #[default]
    Flame,
    /// Root at the top
    Icicle,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flame" => Ok(Self::Flame),
            "icicle" => Ok(Self::Icicle),
            other => Err(format!("unknown orientation '{}'", other)),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flame => f.write_str("flame"),
            Self::Icicle => f.write_str("icicle"),
        }
    }
}

/// Canvas parameters for [`layout`]
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub image_width: f64,
    pub frame_height: f64,
    /// Minimum visible frame width in pixels
    pub min_width: f64,
    pub x_padding: f64,
    pub y_padding_title: f64,
    pub y_padding_subtitle: f64,
    pub orientation: Orientation,
    /// Unit shown in tooltips
    pub unit: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            image_width: DEFAULT_IMAGE_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            min_width: DEFAULT_MIN_WIDTH,
            x_padding: X_PADDING,
            y_padding_title: Y_PADDING_TITLE,
            y_padding_subtitle: Y_PADDING_SUBTITLE,
            orientation: Orientation::Flame,
            unit: TIME_UNIT.to_string(),
        }
    }
}

/// One positioned frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub label: String,
    pub depth: usize,
    /// Weight covered by the frame
    pub weight: f64,
    /// Tooltip text, unescaped
    pub info: String,
    pub has_exception: bool,
    pub delta: Option<f64>,
}

impl FrameRect {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }
}

/// Result of a layout pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    /// Frames ordered by depth, then left to right
    pub frames: Vec<FrameRect>,
    pub max_depth: usize,
    pub width_per_unit: f64,
    pub image_width: f64,
    pub image_height: f64,
    pub total_weight: f64,
}

/// Compute frame geometry for a flame tree
///
/// **Public** - used by both SVG renderers
///
/// # Arguments
/// * `tree` - Aggregated flame tree
/// * `total_weight` - Weight mapped to the full drawable width
/// * `config` - Canvas parameters
///
/// # Errors
/// * `EmptyLog` - `total_weight` is not positive
/// * `MissingStartTime` - a node was closed without ever being opened
pub fn layout(
    tree: &FlameTree,
    total_weight: f64,
    config: &LayoutConfig,
) -> Result<Layout, FlamegraphError> {
    if total_weight <= 0.0 || !total_weight.is_finite() {
        return Err(FlamegraphError::EmptyLog);
    }

    let width_per_unit = (config.image_width - 2.0 * config.x_padding) / total_weight;
    let min_units = config.min_width / width_per_unit;

    let mut visible = Vec::new();
    let mut max_depth = 0;

    for node in tree.nodes() {
        let Some(start) = node.start_offset else {
            return Err(FlamegraphError::MissingStartTime {
                label: node.label.clone(),
                depth: node.depth,
                end_offset: node.end_offset,
            });
        };

        let end = if node.is_root() {
            total_weight
        } else {
            node.end_offset
        };

        if end - start < min_units {
            continue;
        }

        max_depth = max_depth.max(node.depth);
        visible.push((node, start, end));
    }

    debug!(
        "Layout keeps {} of {} nodes (max depth {}, {:.4} px per unit)",
        visible.len(),
        tree.len(),
        max_depth,
        width_per_unit
    );

    let image_height = (max_depth + 1) as f64 * config.frame_height
        + config.y_padding_title
        + config.y_padding_subtitle;

    let mut frames: Vec<FrameRect> = visible
        .into_iter()
        .map(|(node, start, end)| {
            let depth = node.depth as f64;
            let (y1, y2) = match config.orientation {
                Orientation::Icicle => (
                    config.y_padding_title + depth * config.frame_height,
                    config.y_padding_title + (depth + 1.0) * config.frame_height - FRAME_PADDING,
                ),
                Orientation::Flame => (
                    image_height
                        - config.y_padding_subtitle
                        - (depth + 1.0) * config.frame_height
                        + FRAME_PADDING,
                    image_height - config.y_padding_subtitle - depth * config.frame_height,
                ),
            };

            let weight = end - start;
            FrameRect {
                x1: config.x_padding + start * width_per_unit,
                y1,
                x2: config.x_padding + end * width_per_unit,
                y2,
                label: node.label.clone(),
                depth: node.depth,
                weight,
                info: frame_info(
                    &node.label,
                    node.is_root(),
                    weight,
                    total_weight,
                    node.delta,
                    &config.unit,
                ),
                has_exception: node.has_exception,
                delta: node.delta,
            }
        })
        .collect();

    frames.sort_by(|a, b| a.depth.cmp(&b.depth).then(a.x1.total_cmp(&b.x1)));

    Ok(Layout {
        frames,
        max_depth,
        width_per_unit,
        image_width: config.image_width,
        image_height,
        total_weight,
    })
}

/// Tooltip text of a frame
///
/// Root: `all (1.500000 s, 100%)`, other frames: `f (0.750000 s, 50.00%)`,
/// with `, +12.50%` appended when a delta is present.
pub fn frame_info(
    label: &str,
    is_root: bool,
    weight: f64,
    total_weight: f64,
    delta: Option<f64>,
    unit: &str,
) -> String {
    if is_root {
        return format!("all ({:.6} {}, 100%)", weight, unit);
    }

    let pct = 100.0 * weight / total_weight;
    let mut info = format!("{} ({:.6} {}, {:.2}%)", label, weight, unit, pct);
    if let Some(delta) = delta {
        info.push_str(&format!(", {:+.2}%", 100.0 * delta / total_weight));
    }
    info
}
