//! Prediction invoker: one `CustomerRecord` in, one `PredictionResult` out.

use std::fmt;
use std::sync::Arc;

use crate::models::{CustomerForm, CustomerRecord, PredictionResult, ValidationError};
use crate::pipeline::{Cell, Classifier, FeatureFrame, InferenceError};

/// Probability at or above which a customer counts as a likely buyer.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Why a prediction could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictError {
    /// The record was rejected before the pipeline was called.
    Validation(ValidationError),
    /// The pipeline was called and failed.
    Inference(InferenceError),
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictError::Validation(e) => write!(f, "{}", e),
            PredictError::Inference(e) => write!(f, "inference failed: {}", e),
        }
    }
}

impl std::error::Error for PredictError {}

impl From<ValidationError> for PredictError {
    fn from(err: ValidationError) -> Self {
        PredictError::Validation(err)
    }
}

impl From<InferenceError> for PredictError {
    fn from(err: InferenceError) -> Self {
        PredictError::Inference(err)
    }
}

/// Maps a positive-class probability to the binary decision.
pub fn decide(probability: f64) -> u8 {
    u8::from(probability >= DECISION_THRESHOLD)
}

/// Single-row frame holding the record's columns in training order.
pub fn record_frame(record: &CustomerRecord) -> FeatureFrame {
    let text = record
        .categorical_values()
        .into_iter()
        .map(|(column, label)| (column, Cell::Text(label.to_string())));
    let numbers = record
        .integer_values()
        .into_iter()
        .map(|(spec, value)| (spec.name, Cell::Number(value as f64)));

    FeatureFrame::single_row(text.chain(numbers))
}

/// Scores records against a shared, read-only classifier.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn Classifier>,
}

impl Predictor {
    pub fn new(model: Arc<dyn Classifier>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<dyn Classifier> {
        &self.model
    }

    /// Validates `record`, runs the pipeline once, and applies the threshold.
    pub fn predict(&self, record: &CustomerRecord) -> Result<PredictionResult, PredictError> {
        record.validate()?;

        let frame = record_frame(record);
        let scores = self.model.predict_proba(&frame)?;
        let [_, probability] = scores.first().copied().ok_or_else(|| {
            InferenceError::InvalidOutput("pipeline returned no rows".to_string())
        })?;

        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidOutput(format!(
                "probability {} outside [0, 1]",
                probability
            ))
            .into());
        }

        let result = PredictionResult {
            probability,
            predicted_class: decide(probability),
        };
        tracing::debug!(
            "Scored record: probability={:.3} class={}",
            result.probability,
            result.predicted_class
        );
        Ok(result)
    }

    /// Converts a raw submission and predicts; validation errors list every bad field.
    pub fn predict_form(&self, form: CustomerForm) -> Result<PredictionResult, PredictError> {
        let record = CustomerRecord::try_from(form)?;
        self.predict(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed probability and counts calls.
    struct FixedClassifier {
        columns: Vec<String>,
        probability: f64,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn new(probability: f64) -> Self {
            Self {
                columns: CustomerRecord::COLUMNS.iter().map(|c| c.to_string()).collect(),
                probability,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn columns(&self) -> &[String] {
            &self.columns
        }

        fn predict_proba(
            &self,
            frame: &FeatureFrame,
        ) -> Result<Vec<[f64; 2]>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(frame.columns, self.columns);
            Ok(vec![[1.0 - self.probability, self.probability]])
        }
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        assert_eq!(decide(0.5), 1);
        assert_eq!(decide(0.4999999), 0);
        assert_eq!(decide(1.0), 1);
        assert_eq!(decide(0.0), 0);
    }

    #[test]
    fn test_exact_half_predicts_buyer() {
        let predictor = Predictor::new(Arc::new(FixedClassifier::new(0.5)));
        let result = predictor.predict(&CustomerRecord::default()).unwrap();
        assert_eq!(result.probability, 0.5);
        assert_eq!(result.predicted_class, 1);
        assert_eq!(result.guidance(), "likely buyer");
    }

    #[test]
    fn test_invalid_record_never_reaches_pipeline() {
        let model = Arc::new(FixedClassifier::new(0.9));
        let predictor = Predictor::new(model.clone());
        let record = CustomerRecord {
            city_tier: 4,
            ..CustomerRecord::default()
        };

        let err = predictor.predict(&record).unwrap_err();
        assert!(matches!(err, PredictError::Validation(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_out_of_range_probability_is_inference_error() {
        let predictor = Predictor::new(Arc::new(FixedClassifier::new(1.5)));
        let err = predictor.predict(&CustomerRecord::default()).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }

    #[test]
    fn test_frame_columns_in_training_order() {
        let frame = record_frame(&CustomerRecord::default());
        assert_eq!(frame.columns, CustomerRecord::COLUMNS.to_vec());
        assert_eq!(frame.rows.len(), 1);
        assert_eq!(frame.rows[0][0], Cell::Text("Self Enquiry".to_string()));
        assert_eq!(frame.rows[0][17], Cell::Number(40000.0));
    }

    #[test]
    fn test_predict_form_validates_first() {
        let model = Arc::new(FixedClassifier::new(0.2));
        let predictor = Predictor::new(model.clone());

        let err = predictor.predict_form(CustomerForm::default()).unwrap_err();
        let PredictError::Validation(validation) = err else {
            panic!("expected validation error");
        };
        assert_eq!(validation.violations.len(), 18);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);

        let ok = predictor
            .predict_form(CustomerForm::from(&CustomerRecord::default()))
            .unwrap();
        assert_eq!(ok.predicted_class, 0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }
}
