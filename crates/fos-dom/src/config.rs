//! Window Configuration

use serde::Deserialize;

use crate::Size;

/// How the host's ResizeObserver reports `borderBoxSize`
///
/// Conforming hosts report a sequence (one entry per fragment), older ones
/// a single record, and the oldest nothing at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoxSizeReporting {
    #[default]
    Sequence,
    Single,
    Unsupported,
}

/// Window configuration options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Document URL
    pub url: String,

    /// Initial viewport size
    pub viewport: Size,

    /// Shape of `borderBoxSize` in resize observer entries
    pub border_box_reporting: BoxSizeReporting,

    /// Tab past the last element wraps to the first instead of leaving
    /// the document
    pub wrap_sequential_navigation: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            viewport: Size::new(1024.0, 768.0),
            border_box_reporting: BoxSizeReporting::Sequence,
            wrap_sequential_navigation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial() {
        let config: WindowConfig =
            serde_json::from_str(r#"{"border_box_reporting": "single"}"#).unwrap();
        assert_eq!(config.border_box_reporting, BoxSizeReporting::Single);
        assert_eq!(config.viewport, Size::new(1024.0, 768.0));
        assert!(!config.wrap_sequential_navigation);
    }
}
