use super::BandPass;
use crate::{event, warn};
use std::{collections::BTreeSet, fmt};

/// Sample positions, ascending.
pub type IndexSet = BTreeSet<usize>;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A comma-separated entry is not a decimal number.
    InvalidSample { index: usize, raw: String },
    /// A sample parsed to NaN or an infinity.
    NonFinite { index: usize },
    InvalidFilter { low_cut: f64, high_cut: f64, sample_rate: f64 },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSample { index, raw } => write!(f, "sample {index} ({raw:?}) is not a number"),
            Self::NonFinite { index } => write!(f, "sample {index} is not finite"),
            Self::InvalidFilter { low_cut, high_cut, sample_rate } => write!(
                f,
                "band {low_cut}-{high_cut} Hz is not valid at a sample rate of {sample_rate} Hz"
            ),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Feature extraction for one sensor: raw line in, flagged sample positions out.
///
/// Implementations run on the blocking pool and may be swapped per engine.
pub trait SignalPipeline: Send + Sync {
    fn name(&self) -> &'static str;

    /// Turns a raw line into samples.
    ///
    /// # Errors
    /// Any [`PipelineError`]; the cycle then treats this sensor as having no detections.
    fn process(&self, raw: &str) -> Result<Vec<f64>, PipelineError>;

    /// Finds the samples that cross `threshold`.
    ///
    /// # Errors
    /// Any [`PipelineError`]; treated like a `process` failure.
    fn detect(&self, samples: &[f64], threshold: f64) -> Result<IndexSet, PipelineError> {
        Ok(threshold_crossings(samples, threshold))
    }

    /// Runs `process` and `detect`, degrading every error to an empty set.
    fn extract(&self, raw: &str, threshold: f64) -> IndexSet {
        let found = self.process(raw).and_then(|samples| self.detect(&samples, threshold));
        match found {
            Ok(indices) => indices,
            Err(e) => {
                warn!("{} pipeline failed: {e}.", self.name());
                IndexSet::new()
            }
        }
    }
}

/// Parses a comma-separated line into samples. Blank entries are skipped.
///
/// # Errors
/// On the first entry that is not a finite decimal number.
pub fn parse_samples(raw: &str) -> Result<Vec<f64>, PipelineError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(index, entry)| {
            let value: f64 = entry
                .parse()
                .map_err(|_| PipelineError::InvalidSample { index, raw: entry.to_string() })?;
            if value.is_finite() { Ok(value) } else { Err(PipelineError::NonFinite { index }) }
        })
        .collect()
}

/// Indices of the samples strictly greater than `threshold`.
pub fn threshold_crossings(samples: &[f64], threshold: f64) -> IndexSet {
    samples
        .iter()
        .enumerate()
        .filter(|(_, value)| **value > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Distance samples, thresholded as they come.
#[derive(Debug, Clone, Copy, Default)]
pub struct LidarPipeline;

impl SignalPipeline for LidarPipeline {
    fn name(&self) -> &'static str { "LiDAR" }

    fn process(&self, raw: &str) -> Result<Vec<f64>, PipelineError> {
        let samples = parse_samples(raw)?;
        event!("LiDAR samples: {samples:?}");
        Ok(samples)
    }
}

/// Ranging samples, band-pass filtered before thresholding.
#[derive(Debug, Clone)]
pub struct GprPipeline {
    filter: BandPass,
}

impl GprPipeline {
    pub fn with_filter(filter: BandPass) -> Self { Self { filter } }
}

impl Default for GprPipeline {
    fn default() -> Self { Self::with_filter(BandPass::gpr()) }
}

impl SignalPipeline for GprPipeline {
    fn name(&self) -> &'static str { "GPR" }

    fn process(&self, raw: &str) -> Result<Vec<f64>, PipelineError> {
        let filtered = self.filter.apply(&parse_samples(raw)?);
        event!("Filtered GPR samples: {filtered:?}");
        Ok(filtered)
    }
}
