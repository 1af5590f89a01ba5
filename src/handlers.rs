use crate::errors::{AppError, ResultExt};
use crate::model_loader::ModelSource;
use crate::models::*;
use crate::predictor::{PredictError, Predictor};
use crate::views::FormPage;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Scores records against the pipeline loaded at startup.
    pub predictor: Predictor,
    /// Where the loaded pipeline came from, for `/health`.
    pub model_source: ModelSource,
}

/// Health check endpoint.
///
/// Returns the service status, version, and the loaded model artifact.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up and a model is loaded"))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "model": state.model_source.to_string(),
            "columns": state.predictor.model().columns().len(),
        })),
    )
}

/// GET /
///
/// The prediction form with default values.
pub async fn index() -> Html<String> {
    Html(FormPage::default().render())
}

/// POST /predict
///
/// Handles the HTML form. Validation failures re-render the form with the
/// submitted values and per-field messages; inference failures show a
/// generic error.
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let request_id = Uuid::new_v4();
    tracing::info!("POST /predict - request {}", request_id);

    let outcome = CustomerRecord::from_form_fields(&fields)
        .map_err(PredictError::from)
        .and_then(|record| state.predictor.predict(&record));

    match outcome {
        Ok(result) => {
            tracing::info!(
                "Request {}: probability {:.3}, class {}",
                request_id,
                result.probability,
                result.predicted_class
            );
            let page = FormPage {
                values: Some(&fields),
                result: Some(&result),
                ..FormPage::default()
            };
            Html(page.render()).into_response()
        }
        Err(PredictError::Validation(errors)) => {
            tracing::info!(
                "Request {}: rejected {} field(s)",
                request_id,
                errors.violations.len()
            );
            let page = FormPage {
                values: Some(&fields),
                errors: Some(&errors),
                ..FormPage::default()
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Html(page.render())).into_response()
        }
        Err(PredictError::Inference(e)) => {
            tracing::error!("Request {}: inference failed: {}", request_id, e);
            let page = FormPage {
                values: Some(&fields),
                failure: Some("Prediction failed. Please try again later."),
                ..FormPage::default()
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Html(page.render())).into_response()
        }
    }
}

/// POST /api/v1/predict
///
/// Scores one customer submitted as JSON.
#[utoipa::path(
    post,
    path = "/api/v1/predict",
    request_body = CustomerForm,
    responses(
        (status = 200, description = "Prediction computed", body = PredictionResponse),
        (status = 400, description = "Body is not valid JSON"),
        (status = 422, description = "One or more fields missing or out of range", body = ValidationErrorResponse),
        (status = 500, description = "The model failed to score the record")
    )
)]
pub async fn predict_json(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CustomerForm>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let Json(form) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request_id = Uuid::new_v4().to_string();
    tracing::info!("POST /api/v1/predict - request {}", request_id);

    let result = state
        .predictor
        .predict_form(form)
        .with_context(|| format!("request {}", request_id))?;

    tracing::info!(
        "Request {}: probability {:.3}, class {}",
        request_id,
        result.probability,
        result.predicted_class
    );
    Ok(Json(PredictionResponse::new(request_id, &result)))
}

/// GET /api/v1/schema
///
/// Field names, kinds, domains and form defaults.
#[utoipa::path(
    get,
    path = "/api/v1/schema",
    responses((status = 200, description = "Input schema", body = [FieldDescriptor]))
)]
pub async fn schema() -> Json<Vec<FieldDescriptor>> {
    Json(FIELDS.iter().map(FieldDescriptor::from).collect())
}
