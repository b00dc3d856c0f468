//! The forecasting capability shared by every learned model.

use tradyx_core::Result;

use crate::frame::FeatureFrame;

/// A model trained fresh on the frame and evaluated at its latest row.
///
/// Implementors hold only hyper-parameters; no fitted state outlives a call.
pub trait Forecaster: Send + Sync {
    type Output;

    /// Model name for logging.
    fn name(&self) -> &'static str;

    /// Training samples required before the model is attempted.
    fn min_samples(&self) -> usize;

    /// Train on the frame and forecast from its latest row.
    ///
    /// # Errors
    /// `InsufficientHistory` below [`Forecaster::min_samples`], `DegenerateInput`
    /// when the fit is ill-posed, `CapabilityUnavailable` when the model is
    /// not compiled into this build.
    fn forecast(&self, frame: &FeatureFrame) -> Result<Self::Output>;
}

/// Pairs of (features at row `i`, target from a later row) for every `i` whose
/// target exists.
pub(crate) fn supervised<T>(
    frame: &FeatureFrame,
    features: &[crate::frame::Feature],
    horizon: usize,
    target: impl Fn(&FeatureFrame, usize) -> T,
) -> (Vec<Vec<f64>>, Vec<T>) {
    let samples = frame.len().saturating_sub(horizon);
    let x = frame.matrix(features, samples);
    let y = (0..samples).map(|i| target(frame, i)).collect();
    (x, y)
}
