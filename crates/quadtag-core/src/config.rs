//! Configuration types for detection post-processing.
//!
//! This module provides two configuration types:
//! - [`DedupConfig`]: How duplicate candidates are collapsed
//! - [`PostprocessConfig`]: The full filter / rescale / dedup pass

// ============================================================================
// DedupConfig
// ============================================================================

/// Settings for collapsing overlapping candidates.
///
/// The overlap test itself has fixed thresholds (see [`crate::overlap`]); this
/// only decides which pairs are eligible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DedupConfig {
    /// Only merge overlapping candidates that decoded to the same ID (default: true).
    /// Disable to also suppress a smaller tag nested inside a larger one.
    pub require_matching_id: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            require_matching_id: true,
        }
    }
}

// ============================================================================
// PostprocessConfig
// ============================================================================

/// Configuration for [`crate::pipeline::postprocess`].
///
/// # Example
/// ```
/// use quadtag_core::config::PostprocessConfig;
///
/// // Detection ran on a half-resolution image.
/// let config = PostprocessConfig::builder()
///     .scale(2.0)
///     .max_hamming(1)
///     .build();
/// assert_eq!(config.scale, 2.0);
/// assert!(config.good_only);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PostprocessConfig {
    /// Factor applied with `scale_tag` before deduplication (default: 1.0).
    /// Use the decimation factor to return to full-resolution pixels.
    pub scale: f64,
    /// Drop detections whose decode was not `good` (default: true).
    pub good_only: bool,
    /// Drop detections with a larger hamming distance (default: no limit).
    pub max_hamming: Option<u32>,
    /// Run the overlap deduplication pass (default: true).
    pub deduplicate: bool,
    /// Deduplication settings.
    pub dedup: DedupConfig,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            good_only: true,
            max_hamming: None,
            deduplicate: true,
            dedup: DedupConfig::default(),
        }
    }
}

impl PostprocessConfig {
    /// Create a new builder for `PostprocessConfig`.
    #[must_use]
    pub fn builder() -> PostprocessConfigBuilder {
        PostprocessConfigBuilder::default()
    }
}

/// Builder for [`PostprocessConfig`].
#[derive(Default)]
pub struct PostprocessConfigBuilder {
    scale: Option<f64>,
    good_only: Option<bool>,
    max_hamming: Option<u32>,
    deduplicate: Option<bool>,
    require_matching_id: Option<bool>,
}

impl PostprocessConfigBuilder {
    /// Set the rescale factor.
    #[must_use]
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Keep or drop detections that failed decoding.
    #[must_use]
    pub fn good_only(mut self, good_only: bool) -> Self {
        self.good_only = Some(good_only);
        self
    }

    /// Set the largest accepted hamming distance.
    #[must_use]
    pub fn max_hamming(mut self, max_hamming: u32) -> Self {
        self.max_hamming = Some(max_hamming);
        self
    }

    /// Enable or disable deduplication.
    #[must_use]
    pub fn deduplicate(mut self, enable: bool) -> Self {
        self.deduplicate = Some(enable);
        self
    }

    /// Require matching IDs before merging overlapping candidates.
    #[must_use]
    pub fn require_matching_id(mut self, require: bool) -> Self {
        self.require_matching_id = Some(require);
        self
    }

    /// Build the configuration, using defaults for unset fields.
    #[must_use]
    pub fn build(self) -> PostprocessConfig {
        let d = PostprocessConfig::default();
        PostprocessConfig {
            scale: self.scale.unwrap_or(d.scale),
            good_only: self.good_only.unwrap_or(d.good_only),
            max_hamming: self.max_hamming.or(d.max_hamming),
            deduplicate: self.deduplicate.unwrap_or(d.deduplicate),
            dedup: DedupConfig {
                require_matching_id: self
                    .require_matching_id
                    .unwrap_or(d.dedup.require_matching_id),
            },
        }
    }
}
