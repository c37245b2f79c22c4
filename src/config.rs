//! Internal configuration, kept apart from CLI argument parsing.
//!
//! `main.rs` owns the clap surface and converts it into a [`PipelineConfig`];
//! the library only ever sees these structs.

/// Styling of one blurred silhouette layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    /// Visual blur radius, in pixels.
    pub radius: f32,
    /// 8-bit paint alpha applied to the whole layer.
    pub opacity: u8,
}

impl LayerStyle {
    /// Gaussian sigma equivalent to the visual blur radius.
    pub fn sigma(&self) -> f32 {
        if self.radius <= 0.0 {
            0.0
        } else {
            self.radius * 0.57735 + 0.5
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositorConfig {
    /// Foreground fractions strictly below this are rejected.
    pub coverage_threshold: f64,
    /// Alpha values at or below this are not counted as foreground.
    pub noise_floor: u8,
    pub glow: LayerStyle,
    pub outline: LayerStyle,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: 0.05,
            noise_floor: 32,
            glow: LayerStyle {
                radius: 24.0,
                opacity: 180,
            },
            outline: LayerStyle {
                radius: 6.0,
                opacity: 230,
            },
        }
    }
}

/// Resampling used when upscaling a category mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskFilter {
    Nearest,
    #[default]
    Bilinear,
}

impl std::str::FromStr for MaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(MaskFilter::Nearest),
            "bilinear" => Ok(MaskFilter::Bilinear),
            _ => Err(format!("Unknown mask filter: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    /// Labels below this confidence are dropped before the session sees them.
    pub min_confidence: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.65,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub compositor: CompositorConfig,
    pub mask_filter: MaskFilter,
    pub recognition: RecognitionConfig,
}
