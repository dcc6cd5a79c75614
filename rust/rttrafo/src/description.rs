use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

use crate::errors::{
    FitError,
    TransformationError,
};
use crate::models::{
    CoordinatePair,
    ModelKind,
    ModelParams,
    TransformationModel,
};

/// Paired `(observed, reference)` retention times and the model fitted to
/// them, if any.
///
/// The model is only ever replaced wholesale, by [`Self::fit_model`] or
/// [`Self::invert`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationDescription {
    samples: Vec<CoordinatePair>,
    #[serde(default)]
    model: Option<TransformationModel>,
}

impl TransformationDescription {
    pub fn new(samples: Vec<CoordinatePair>) -> Self {
        Self {
            samples,
            model: None,
        }
    }

    pub fn with_model(mut self, model: TransformationModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn samples(&self) -> &[CoordinatePair] {
        &self.samples
    }

    pub fn model(&self) -> Option<&TransformationModel> {
        self.model.as_ref()
    }

    /// Kind of the fitted model, `None` if nothing has been fitted yet.
    pub fn model_kind(&self) -> Option<ModelKind> {
        self.model.as_ref().map(|m| m.kind())
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn observed_range(&self) -> Option<(f64, f64)> {
        min_max(self.samples.iter().map(|p| p.observed))
    }

    pub fn reference_range(&self) -> Option<(f64, f64)> {
        min_max(self.samples.iter().map(|p| p.reference))
    }

    /// Replaces the model with one of `kind` fitted to the samples.
    ///
    /// On error the previous model is kept.
    pub fn fit_model(&mut self, kind: ModelKind, params: &ModelParams) -> Result<(), FitError> {
        let model = TransformationModel::fit(kind, &self.samples, params)?;
        debug!(
            "Fitted {} model on {} samples",
            kind,
            self.samples.len()
        );
        self.model = Some(model);
        Ok(())
    }

    /// Replaces the model with its inverse and swaps every sample pair.
    pub fn invert(&mut self) -> Result<(), TransformationError> {
        let inverse = self
            .model
            .as_ref()
            .ok_or(TransformationError::NoModel)?
            .invert()?;
        self.samples = self.samples.iter().map(|p| p.swapped()).collect();
        self.model = Some(inverse);
        Ok(())
    }

    pub fn apply(&self, x: f64) -> Result<f64, TransformationError> {
        self.model
            .as_ref()
            .ok_or(TransformationError::NoModel)?
            .evaluate(x)
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description() -> TransformationDescription {
        TransformationDescription::new(vec![
            CoordinatePair::new(1.0, 2.0),
            CoordinatePair::new(2.0, 4.0),
            CoordinatePair::new(5.0, 10.0),
        ])
    }

    #[test]
    fn apply_without_model_fails() {
        let d = description();
        assert_eq!(d.apply(1.0), Err(TransformationError::NoModel));
        assert_eq!(d.model_kind(), None);
    }

    #[test]
    fn invert_without_model_fails_and_keeps_samples() {
        let mut d = description();
        let before = d.clone();
        assert_eq!(d.invert(), Err(TransformationError::NoModel));
        assert_eq!(d, before);
    }

    #[test]
    fn fit_none_sets_identity_and_keeps_samples() {
        let mut d = description();
        d.fit_model(ModelKind::None, &ModelParams::default())
            .unwrap();
        assert_eq!(d.model(), Some(&TransformationModel::Identity));
        assert_eq!(d.sample_count(), 3);
        assert_eq!(d.apply(7.25).unwrap(), 7.25);
    }

    #[test]
    fn invert_swaps_samples_and_model() {
        let mut d = description();
        d.fit_model(ModelKind::Linear, &ModelParams::default())
            .unwrap();
        assert!((d.apply(3.0).unwrap() - 6.0).abs() < 1e-12);

        d.invert().unwrap();
        assert_eq!(d.samples()[0], CoordinatePair::new(2.0, 1.0));
        assert!((d.apply(6.0).unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(d.observed_range(), Some((2.0, 10.0)));
        assert_eq!(d.reference_range(), Some((1.0, 5.0)));
    }

    #[test]
    fn failed_refit_keeps_previous_model() {
        let mut d = description();
        d.fit_model(ModelKind::Linear, &ModelParams::default())
            .unwrap();
        let err = d
            .fit_model(ModelKind::BSpline, &ModelParams::default())
            .unwrap_err();
        assert!(matches!(err, FitError::InvalidParams { .. }));
        assert_eq!(d.model_kind(), Some(ModelKind::Linear));
    }

    #[test]
    fn failed_inversion_keeps_samples() {
        let mut d = TransformationDescription::new(vec![
            CoordinatePair::new(0.0, 0.0),
            CoordinatePair::new(1.0, 2.0),
            CoordinatePair::new(2.0, 1.0),
        ]);
        d.fit_model(ModelKind::Interpolated, &ModelParams::default())
            .unwrap();
        let before = d.clone();
        assert!(d.invert().is_err());
        assert_eq!(d, before);
    }

    #[test]
    fn empty_description_has_no_ranges() {
        let d = TransformationDescription::default();
        assert_eq!(d.observed_range(), None);
        assert_eq!(d.sample_count(), 0);
    }
}
