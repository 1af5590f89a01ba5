use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use utoipa::OpenApi;

use crate::handlers;
use crate::models::{
    CustomerForm, Designation, FieldDescriptor, FieldViolation, Gender, MaritalStatus, Occupation,
    PredictionResponse, ProductPitched, TypeOfContact, ValidationErrorResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tourism Package Prediction API",
        description = "Scores a customer's likelihood of buying a tourism package."
    ),
    paths(handlers::health, handlers::predict_json, handlers::schema),
    components(schemas(
        CustomerForm,
        PredictionResponse,
        ValidationErrorResponse,
        FieldViolation,
        FieldDescriptor,
        TypeOfContact,
        Occupation,
        Gender,
        ProductPitched,
        MaritalStatus,
        Designation
    ))
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document.
pub async fn serve_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Serves the Swagger UI HTML page.
///
/// This endpoint returns an HTML page that embeds the Swagger UI, configured to
/// load the OpenAPI document served by `serve_openapi_spec`.
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Tourism Package Prediction - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_prediction_path() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(doc["paths"]["/api/v1/predict"]["post"].is_object());
        assert!(doc["components"]["schemas"]["CustomerForm"].is_object());
    }
}
