//! Pipeline configuration.
//!
//! A single serde-able configuration struct threaded explicitly through the
//! pipeline (never global/process-wide state, per the concurrency model).

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Pseudocode rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PseudocodeStyle {
    /// `if (cond) { ... }`, `while (cond) { ... }`
    CLike,
    /// `if cond:` / `while cond:`
    PythonLike,
}

impl Default for PseudocodeStyle {
    fn default() -> Self {
        PseudocodeStyle::CLike
    }
}

/// Master configuration for the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Size in bytes of the sliding window used by the region classifier.
    pub decode_window_size: usize,
    /// Minimum decode rate for a window to be classified CODE.
    pub code_threshold: f64,
    /// Maximum decode rate for a window to be classified DATA.
    pub data_threshold: f64,
    /// Whether the assembler renderer emits raw hex bytes alongside mnemonics.
    pub emit_hex: bool,
    /// Pseudocode rendering style.
    pub pseudocode_style: PseudocodeStyle,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            decode_window_size: 64,
            code_threshold: 0.70,
            data_threshold: 0.30,
            emit_hex: true,
            pseudocode_style: PseudocodeStyle::CLike,
        }
    }
}

impl Configuration {
    /// Validate thresholds and window size before they reach the pipeline.
    ///
    /// The classification thresholds (`0.70`/`0.30`) are distinct from the
    /// fixed status thresholds (`0.80`/`0.20`, see [`crate::core::result::Status`]);
    /// this struct only ever governs classification.
    pub fn validate(&self) -> Result<()> {
        if self.decode_window_size == 0 {
            return Err(AnalysisError::InvalidConfiguration(
                "decode_window_size must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.code_threshold) || !(0.0..=1.0).contains(&self.data_threshold)
        {
            return Err(AnalysisError::InvalidConfiguration(
                "thresholds must be within [0.0, 1.0]".to_string(),
            ));
        }
        if self.data_threshold >= self.code_threshold {
            return Err(AnalysisError::InvalidConfiguration(
                "data_threshold must be strictly less than code_threshold".to_string(),
            ));
        }
        Ok(())
    }
}
