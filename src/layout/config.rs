//! Layout constants, loadable from a YAML file.

use crate::models::Size;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Geometry settings for the layout engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LayoutConfig {
    /// Inner padding of a container on every side
    pub padding: f64,
    /// Space reserved for the container title above its content
    pub header_height: f64,
    /// Exclusive margin kept around every child (half on each side)
    pub exclusive_margin: f64,
    /// Horizontal gap between sibling containers in a row
    pub container_gap: f64,
    /// Vertical gap between container rows
    pub row_gap: f64,
    /// Gap between the enclosure and external nodes, and between external nodes
    pub external_gap: f64,
    pub min_container_width: f64,
    pub min_container_height: f64,
    pub default_resource_width: f64,
    pub default_resource_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 20.0,
            header_height: 32.0,
            exclusive_margin: 24.0,
            container_gap: 40.0,
            row_gap: 40.0,
            external_gap: 60.0,
            min_container_width: 240.0,
            min_container_height: 160.0,
            default_resource_width: 80.0,
            default_resource_height: 80.0,
        }
    }
}

impl LayoutConfig {
    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: LayoutConfig =
            serde_yaml::from_str(content).context("Failed to parse layout config YAML")?;
        Ok(config.normalized())
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        info!("Loading layout config from {:?}", path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout config: {:?}", path))?;
        Self::from_yaml_str(&content)
    }

    /// Sanitized copy the engine can rely on.
    ///
    /// Invalid values fall back to defaults, gaps are at least the exclusive
    /// margin, and the minimum container fits its own padding and header.
    pub fn normalized(&self) -> Self {
        let defaults = LayoutConfig::default();
        let non_negative = |value: f64, fallback: f64| {
            if value.is_finite() && value >= 0.0 {
                value
            } else {
                fallback
            }
        };
        let positive = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };

        let padding = non_negative(self.padding, defaults.padding);
        let header_height = non_negative(self.header_height, defaults.header_height);
        let margin = non_negative(self.exclusive_margin, defaults.exclusive_margin);

        Self {
            padding,
            header_height,
            exclusive_margin: margin,
            container_gap: non_negative(self.container_gap, defaults.container_gap).max(margin),
            row_gap: non_negative(self.row_gap, defaults.row_gap).max(margin),
            external_gap: non_negative(self.external_gap, defaults.external_gap).max(margin),
            min_container_width: positive(self.min_container_width, defaults.min_container_width)
                .max(2.0 * padding),
            min_container_height: positive(
                self.min_container_height,
                defaults.min_container_height,
            )
            .max(header_height + 2.0 * padding),
            default_resource_width: positive(
                self.default_resource_width,
                defaults.default_resource_width,
            ),
            default_resource_height: positive(
                self.default_resource_height,
                defaults.default_resource_height,
            ),
        }
    }

    pub fn min_container_size(&self) -> Size {
        Size::new(self.min_container_width, self.min_container_height)
    }

    pub fn default_resource_size(&self) -> Size {
        Size::new(self.default_resource_width, self.default_resource_height)
    }
}
