//! Trained pipeline artifact: preprocessing plus classifier in one JSON document.
//!
//! The artifact is produced outside this service. Preprocessing turns a
//! named single-row frame into a dense feature vector (numeric columns
//! first, then one-hot blocks), and the classifier maps that vector to the
//! positive-class probability.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::models::CustomerRecord;

/// Only artifact layout this build understands.
pub const FORMAT_VERSION: u32 = 1;

// ============ Frame ============

/// One cell of a tabular input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

/// Named columns with one or more rows, in the order the caller built them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl FeatureFrame {
    /// Builds a single-row frame from `(column, cell)` pairs.
    pub fn single_row<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = (S, Cell)>,
        S: Into<String>,
    {
        let (columns, row): (Vec<String>, Vec<Cell>) =
            cells.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self {
            columns,
            rows: vec![row],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self) -> HashMap<&str, usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect()
    }
}

// ============ Errors ============

/// Failure while evaluating a loaded pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// A column the pipeline needs is absent from the frame.
    MissingColumn(String),
    /// A row has a different width than the header.
    RowShape { row: usize, expected: usize, found: usize },
    /// A numeric column holds text, or the reverse.
    CellType { column: String, expected: &'static str },
    /// The frame has no rows.
    EmptyFrame,
    /// The model produced something other than a probability.
    InvalidOutput(String),
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::MissingColumn(c) => write!(f, "input is missing column '{}'", c),
            InferenceError::RowShape {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {} has {} cells but the frame has {} columns",
                row, found, expected
            ),
            InferenceError::CellType { column, expected } => {
                write!(f, "column '{}' must hold {} values", column, expected)
            }
            InferenceError::EmptyFrame => write!(f, "input frame has no rows"),
            InferenceError::InvalidOutput(msg) => write!(f, "invalid model output: {}", msg),
        }
    }
}

impl std::error::Error for InferenceError {}

/// The artifact parsed but does not fit this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError(pub String);

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SchemaError {}

// ============ Classifier Seam ============

/// `[P(class 0), P(class 1)]` for one row.
pub type ClassProbabilities = [f64; 2];

/// Anything that can score a frame. Implemented by `Pipeline`; tests plug in stubs.
pub trait Classifier: Send + Sync {
    /// Columns the classifier was trained on, in training order.
    fn columns(&self) -> &[String];

    fn predict_proba(&self, frame: &FeatureFrame)
        -> Result<Vec<ClassProbabilities>, InferenceError>;
}

// ============ Artifact ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericStep {
    pub column: String,
    /// Substitute for a missing value.
    #[serde(default)]
    pub impute: Option<f64>,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub scale: Option<f64>,
}

impl NumericStep {
    fn transform(&self, value: Option<f64>) -> f64 {
        let x = value.or(self.impute).unwrap_or(f64::NAN);
        match (self.mean, self.scale) {
            (Some(mean), Some(scale)) => (x - mean) / scale,
            (Some(mean), None) => x - mean,
            (None, Some(scale)) => x / scale,
            (None, None) => x,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalStep {
    pub column: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preprocessor {
    #[serde(default)]
    pub numeric: Vec<NumericStep>,
    #[serde(default)]
    pub categorical: Vec<CategoricalStep>,
}

impl Preprocessor {
    /// Width of the encoded feature vector.
    pub fn feature_count(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    fn transform_row(
        &self,
        index: &HashMap<&str, usize>,
        row: &[Cell],
    ) -> Result<Vec<f64>, InferenceError> {
        let mut features = Vec::with_capacity(self.feature_count());

        for step in &self.numeric {
            let cell = index
                .get(step.column.as_str())
                .and_then(|&i| row.get(i))
                .ok_or_else(|| InferenceError::MissingColumn(step.column.clone()))?;
            let value = match cell {
                Cell::Number(n) if n.is_nan() => None,
                Cell::Number(n) => Some(*n),
                Cell::Text(_) => {
                    return Err(InferenceError::CellType {
                        column: step.column.clone(),
                        expected: "numeric",
                    })
                }
            };
            features.push(step.transform(value));
        }

        for step in &self.categorical {
            let cell = index
                .get(step.column.as_str())
                .and_then(|&i| row.get(i))
                .ok_or_else(|| InferenceError::MissingColumn(step.column.clone()))?;
            let Cell::Text(label) = cell else {
                return Err(InferenceError::CellType {
                    column: step.column.clone(),
                    expected: "text",
                });
            };
            // Unknown categories encode as all zeros.
            features.extend(
                step.categories
                    .iter()
                    .map(|c| if c == label { 1.0 } else { 0.0 }),
            );
        }

        Ok(features)
    }
}

/// A node of a regression tree, XGBoost layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        /// Branch for NaN features; defaults to `yes`.
        #[serde(default)]
        missing: Option<usize>,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn score(&self, features: &[f64]) -> Result<f64, InferenceError> {
        let mut i = 0;
        loop {
            let node = self.nodes.get(i).ok_or_else(|| {
                InferenceError::InvalidOutput(format!("tree walked to missing node {}", i))
            })?;
            match node {
                Node::Leaf { leaf } => return Ok(*leaf),
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    let x = features.get(*feature).copied().ok_or_else(|| {
                        InferenceError::InvalidOutput(format!("feature {} out of range", feature))
                    })?;
                    let next = if x.is_nan() {
                        missing.unwrap_or(*yes)
                    } else if x < *threshold {
                        *yes
                    } else {
                        *no
                    };
                    if next <= i {
                        return Err(InferenceError::InvalidOutput(format!(
                            "tree node {} loops back to {}",
                            i, next
                        )));
                    }
                    i = next;
                }
            }
        }
    }

    fn check(&self, tree_index: usize, feature_count: usize) -> Result<(), SchemaError> {
        if self.nodes.is_empty() {
            return Err(SchemaError(format!("tree {} has no nodes", tree_index)));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                yes,
                no,
                missing,
                ..
            } = node
            {
                if *feature >= feature_count {
                    return Err(SchemaError(format!(
                        "tree {} node {} splits on feature {} but only {} features exist",
                        tree_index, i, feature, feature_count
                    )));
                }
                // Children must point forward so evaluation always terminates.
                for child in [Some(*yes), Some(*no), *missing].into_iter().flatten() {
                    if child <= i || child >= self.nodes.len() {
                        return Err(SchemaError(format!(
                            "tree {} node {} has invalid child {}",
                            tree_index, i, child
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    GradientBoostedTrees {
        #[serde(default)]
        base_margin: f64,
        trees: Vec<Tree>,
    },
    LogisticRegression {
        intercept: f64,
        coefficients: Vec<f64>,
    },
}

impl Estimator {
    fn margin(&self, features: &[f64]) -> Result<f64, InferenceError> {
        match self {
            Estimator::GradientBoostedTrees { base_margin, trees } => {
                let mut margin = *base_margin;
                for tree in trees {
                    margin += tree.score(features)?;
                }
                Ok(margin)
            }
            Estimator::LogisticRegression {
                intercept,
                coefficients,
            } => {
                if coefficients.len() != features.len() {
                    return Err(InferenceError::InvalidOutput(format!(
                        "{} coefficients for {} features",
                        coefficients.len(),
                        features.len()
                    )));
                }
                Ok(intercept
                    + coefficients
                        .iter()
                        .zip(features)
                        .map(|(w, x)| w * x)
                        .sum::<f64>())
            }
        }
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// A loaded, validated pipeline. Immutable after `from_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub format_version: u32,
    #[serde(default)]
    pub target: Option<String>,
    pub columns: Vec<String>,
    pub preprocessor: Preprocessor,
    pub classifier: Estimator,
}

impl Pipeline {
    /// Parses an artifact without checking it against the record schema.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Verifies the artifact can score a `CustomerRecord`.
    pub fn check_schema(&self) -> Result<(), SchemaError> {
        if self.format_version != FORMAT_VERSION {
            return Err(SchemaError(format!(
                "unsupported format_version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }

        let expected: HashSet<&str> = CustomerRecord::COLUMNS.iter().copied().collect();
        let actual: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        if actual.len() != self.columns.len() {
            return Err(SchemaError("artifact lists a column twice".to_string()));
        }
        if let Some(extra) = actual.difference(&expected).next() {
            return Err(SchemaError(format!("artifact expects unknown column '{}'", extra)));
        }
        if let Some(missing) = expected.difference(&actual).next() {
            return Err(SchemaError(format!("artifact does not use column '{}'", missing)));
        }

        let step_columns = self
            .preprocessor
            .numeric
            .iter()
            .map(|s| &s.column)
            .chain(self.preprocessor.categorical.iter().map(|s| &s.column));
        for column in step_columns {
            if !actual.contains(column.as_str()) {
                return Err(SchemaError(format!(
                    "preprocessor references column '{}' outside the artifact columns",
                    column
                )));
            }
        }
        if let Some(step) = self.preprocessor.numeric.iter().find(|s| s.scale == Some(0.0)) {
            return Err(SchemaError(format!("column '{}' has zero scale", step.column)));
        }

        let feature_count = self.preprocessor.feature_count();
        match &self.classifier {
            Estimator::GradientBoostedTrees { trees, .. } => {
                for (i, tree) in trees.iter().enumerate() {
                    tree.check(i, feature_count)?;
                }
            }
            Estimator::LogisticRegression { coefficients, .. } => {
                if coefficients.len() != feature_count {
                    return Err(SchemaError(format!(
                        "{} coefficients for {} features",
                        coefficients.len(),
                        feature_count
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Classifier for Pipeline {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn predict_proba(
        &self,
        frame: &FeatureFrame,
    ) -> Result<Vec<ClassProbabilities>, InferenceError> {
        if frame.is_empty() {
            return Err(InferenceError::EmptyFrame);
        }
        let index = frame.column_index();

        frame
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != frame.columns.len() {
                    return Err(InferenceError::RowShape {
                        row: i,
                        expected: frame.columns.len(),
                        found: row.len(),
                    });
                }
                let features = self.preprocessor.transform_row(&index, row)?;
                let p = sigmoid(self.classifier.margin(&features)?);
                if !p.is_finite() {
                    return Err(InferenceError::InvalidOutput(format!(
                        "row {} scored {}",
                        i, p
                    )));
                }
                Ok([1.0 - p, p])
            })
            .collect()
    }
}
