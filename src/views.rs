//! Server-rendered pages for the prediction form.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::collections::HashMap;

use crate::models::{FieldKind, FieldSpec, PredictionResult, ValidationError, FIELDS};

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; color: #222; }
    form { display: grid; grid-template-columns: 1fr 1fr; gap: 0.75rem 1.5rem; }
    label { display: flex; flex-direction: column; font-size: 0.9rem; gap: 0.25rem; }
    select, input { padding: 0.35rem; font-size: 1rem; }
    .invalid select, .invalid input { border: 2px solid #c0392b; }
    .hint { color: #c0392b; font-size: 0.8rem; }
    button { grid-column: 1 / -1; padding: 0.6rem; font-size: 1rem; cursor: pointer; }
    .success { background: #e6f4ea; border-left: 4px solid #2e7d32; padding: 0.75rem; }
    .info { background: #e8f0fe; border-left: 4px solid #1a73e8; padding: 0.75rem; }
    .error { background: #fdecea; border-left: 4px solid #c0392b; padding: 0.75rem; }
"#;

/// Form values as text, keyed by column name, pre-filled with each field's default.
pub fn default_values() -> HashMap<String, String> {
    FIELDS
        .iter()
        .map(|spec| {
            let value = match spec.kind {
                FieldKind::Choice(labels) => labels.first().copied().unwrap_or_default().to_string(),
                FieldKind::Integer { .. } | FieldKind::Flag => spec.default.to_string(),
            };
            (spec.name.to_string(), value)
        })
        .collect()
}

/// Everything that can appear on the single page.
#[derive(Debug, Default)]
pub struct FormPage<'a> {
    pub values: Option<&'a HashMap<String, String>>,
    pub errors: Option<&'a ValidationError>,
    pub result: Option<&'a PredictionResult>,
    /// Generic failure text shown instead of a result.
    pub failure: Option<&'a str>,
}

impl FormPage<'_> {
    pub fn render(&self) -> String {
        let defaults = default_values();
        let values = self.values.unwrap_or(&defaults);

        let mut html = String::with_capacity(8 * 1024);
        html.push_str(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>Tourism Package Prediction</title>\n<style>",
        );
        html.push_str(STYLE);
        html.push_str("</style>\n</head>\n<body>\n");
        html.push_str("<h1>🧳 Tourism Package Prediction App</h1>\n");
        html.push_str(
            "<p>Fill the form with customer details and check if they are likely to buy the package.</p>\n",
        );

        if let Some(errors) = self.errors {
            html.push_str("<div class=\"error\"><strong>Please correct the highlighted fields.</strong><ul>");
            for violation in &errors.violations {
                html.push_str(&format!(
                    "<li>{} {}</li>",
                    text(&violation.field),
                    text(&violation.message)
                ));
            }
            html.push_str("</ul></div>\n");
        }

        html.push_str("<form method=\"post\" action=\"/predict\">\n");
        for spec in FIELDS.iter() {
            let value = values.get(spec.name).map(String::as_str).unwrap_or("");
            let message = self.errors.and_then(|errors| {
                errors
                    .violations
                    .iter()
                    .find(|v| v.field == spec.name)
                    .map(|v| v.message.as_str())
            });
            render_field(&mut html, spec, value, message);
        }
        html.push_str("<button type=\"submit\">Predict</button>\n</form>\n");

        if let Some(result) = self.result {
            render_result(&mut html, result);
        }
        if let Some(failure) = self.failure {
            html.push_str(&format!("<div class=\"error\">{}</div>\n", text(failure)));
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

fn render_field(html: &mut String, spec: &FieldSpec, value: &str, message: Option<&str>) {
    let class = if message.is_some() { " class=\"invalid\"" } else { "" };
    html.push_str(&format!("<label{}>{}", class, text(spec.label)));

    match spec.kind {
        FieldKind::Choice(labels) => {
            html.push_str(&format!("<select name=\"{}\">", attr(spec.name)));
            for label in labels {
                let selected = if *label == value { " selected" } else { "" };
                html.push_str(&format!(
                    "<option value=\"{}\"{}>{}</option>",
                    attr(label),
                    selected,
                    text(label)
                ));
            }
            html.push_str("</select>");
        }
        FieldKind::Flag => {
            html.push_str(&format!("<select name=\"{}\">", attr(spec.name)));
            for option in ["0", "1"] {
                let selected = if option == value { " selected" } else { "" };
                html.push_str(&format!("<option value=\"{0}\"{1}>{0}</option>", option, selected));
            }
            html.push_str("</select>");
        }
        FieldKind::Integer { min, max, step } => {
            html.push_str(&format!(
                "<input type=\"number\" name=\"{}\" min=\"{}\" max=\"{}\" step=\"{}\" value=\"{}\" required>",
                attr(spec.name),
                min,
                max,
                step,
                attr(value)
            ));
        }
    }

    if let Some(message) = message {
        html.push_str(&format!("<span class=\"hint\">{}</span>", text(message)));
    }
    html.push_str("</label>\n");
}

fn render_result(html: &mut String, result: &PredictionResult) {
    html.push_str("<h2>Prediction</h2>\n");
    html.push_str(&format!(
        "<p>Probability of Purchase (ProdTaken=1): {:.3}</p>\n\
         <p>Predicted Class: {}  (1 = will purchase, 0 = will not)</p>\n",
        result.probability, result.predicted_class
    ));
    let class = if result.is_likely_buyer() { "success" } else { "info" };
    html.push_str(&format!(
        "<div class=\"{}\" data-guidance=\"{}\">{}</div>\n",
        class,
        result.guidance(),
        text(&result.message())
    ));
}
