/// HTTP tests against the router, driven with `tower::ServiceExt::oneshot`
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use utoipa::OpenApi;
use tourism_predict::handlers::AppState;
use tourism_predict::model_loader::{pipeline_from_bytes, ModelSource};
use tourism_predict::models::{CustomerForm, CustomerRecord};
use tourism_predict::predictor::Predictor;

fn test_state() -> Arc<AppState> {
    let pipeline = pipeline_from_bytes(include_bytes!("fixtures/model.json"), None).unwrap();
    Arc::new(AppState {
        predictor: Predictor::new(Arc::new(pipeline)),
        model_source: ModelSource::File(PathBuf::from("tests/fixtures/model.json")),
    })
}

fn test_app() -> Router {
    tourism_predict::routes(test_state())
}

async fn send(request: Request<Body>) -> (StatusCode, String) {
    let response = test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn post_form(pairs: &[(&str, String)]) -> Request<Body> {
    let body = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v.replace(' ', "+")))
        .collect::<Vec<_>>()
        .join("&");
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn default_pairs() -> Vec<(&'static str, String)> {
    tourism_predict::api::views::default_values()
        .into_iter()
        .filter_map(|(k, v)| {
            CustomerRecord::COLUMNS
                .iter()
                .find(|c| **c == k)
                .map(|c| (*c, v))
        })
        .collect()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["columns"], 18);
}

#[tokio::test]
async fn test_index_renders_form() {
    let (status, body) = send(get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Tourism Package Prediction App"));
    assert!(body.contains("action=\"/predict\""));
    assert!(!body.contains("Probability of Purchase"));
}

#[tokio::test]
async fn test_form_submission_with_defaults() {
    let (status, body) = send(post_form(&default_pairs())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Probability of Purchase (ProdTaken=1): 0.206"));
    assert!(body.contains("data-guidance=\"unlikely to buy\""));
}

#[tokio::test]
async fn test_form_submission_likely_buyer() {
    let mut pairs = default_pairs();
    for (name, value) in pairs.iter_mut() {
        match *name {
            "Passport" => *value = "1".to_string(),
            "MonthlyIncome" => *value = "15000".to_string(),
            "NumberOfFollowups" => *value = "5".to_string(),
            _ => {}
        }
    }

    let (status, body) = send(post_form(&pairs)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("data-guidance=\"likely buyer\""));
    assert!(body.contains("Predicted Class: 1"));
}

#[tokio::test]
async fn test_form_submission_out_of_range() {
    let mut pairs = default_pairs();
    for (name, value) in pairs.iter_mut() {
        if *name == "CityTier" {
            *value = "4".to_string();
        }
    }

    let (status, body) = send(post_form(&pairs)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("must be between 1 and 3"));
    assert!(!body.contains("Probability of Purchase"));
}

#[tokio::test]
async fn test_json_prediction() {
    let form = CustomerForm::from(&CustomerRecord::default());
    let (status, body) = send(post_json(
        "/api/v1/predict",
        serde_json::to_string(&form).unwrap(),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_str(&body).unwrap();
    let probability = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
    assert_eq!(body["predicted_class"], 0);
    assert_eq!(body["guidance"], "unlikely to buy");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_json_prediction_reports_every_violation() {
    let mut form = serde_json::to_value(CustomerForm::from(&CustomerRecord::default())).unwrap();
    form["Age"] = json!(-1);
    form["Passport"] = json!(2);
    form.as_object_mut().unwrap().remove("Gender");

    let (status, body) = send(post_json("/api/v1/predict", form.to_string())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = serde_json::from_str(&body).unwrap();
    let fields: Vec<&str> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["field"].as_str())
        .collect();
    assert!(fields.contains(&"Age"));
    assert!(fields.contains(&"Passport"));
    assert!(fields.contains(&"Gender"));
}

#[tokio::test]
async fn test_json_non_integer_numbers_are_violations() {
    let mut form = serde_json::to_value(CustomerForm::from(&CustomerRecord::default())).unwrap();
    form["Age"] = json!(30.5);
    form["Passport"] = json!(true);

    let (status, body) = send(post_json("/api/v1/predict", form.to_string())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = serde_json::from_str(&body).unwrap();
    let violations = body["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 2);
    assert_eq!(violations[0]["field"], "Age");
    assert_eq!(violations[0]["message"], "must be a whole number");
    assert_eq!(violations[1]["field"], "Passport");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, _) = send(post_json("/api/v1/predict", "{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schema_lists_all_fields() {
    let (status, body) = send(get("/api/v1/schema")).await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_str(&body).unwrap();
    let fields = body.as_array().unwrap();
    assert_eq!(fields.len(), 18);
    assert_eq!(fields[0]["name"], "TypeofContact");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (status, body) = send(get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/api/v1/predict"));

    let document = serde_json::to_value(tourism_predict::api::docs::ApiDoc::openapi()).unwrap();
    let served: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(served, document);

    let (status, body) = send(get("/docs")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("swagger-ui"));
}

#[cfg(test)]
mod middleware_tests {
    use super::*;

    fn from_client(mut request: Request<Body>) -> Request<Body> {
        request
            .headers_mut()
            .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
        request
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let app = tourism_predict::app(test_state()).unwrap();
        let body = vec![b' '; tourism_predict::MAX_BODY_BYTES + 1];
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(from_client(request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_health_is_not_rate_limited() {
        let app = tourism_predict::app(test_state()).unwrap();

        let mut throttled = 0;
        for _ in 0..120 {
            let response = app
                .clone()
                .oneshot(from_client(get("/api/v1/schema")))
                .await
                .unwrap();
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                throttled += 1;
            }
        }
        assert!(throttled > 0);

        for _ in 0..120 {
            let response = app.clone().oneshot(from_client(get("/health"))).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
