use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::AppError;

/// Single-input regression model.
#[async_trait]
pub trait Regressor: Send + Sync {
    async fn predict(&self, input: f64) -> Result<f64, AppError>;
}

/// A fitted linear model serialized as JSON:
/// `{"coefficients": [slope], "intercept": b}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegressionArtifact {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl RegressionArtifact {
    /// Build a single-feature model; any other coefficient count is rejected.
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        if coefficients.len() != 1 {
            anyhow::bail!(
                "model has {} coefficients, expected a single-feature model",
                coefficients.len()
            );
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw: RegressionArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Self::new(raw.coefficients, raw.intercept)
            .with_context(|| format!("Invalid regression artifact {}", path.display()))
    }

    pub fn predict(&self, input: f64) -> f64 {
        self.intercept + self.coefficients[0] * input
    }
}

/// Regressor backed by an artifact on disk. The artifact is read on first
/// use and kept; failed loads are retried on the next call.
pub struct ArtifactRegressor {
    path: PathBuf,
    artifact: OnceCell<RegressionArtifact>,
}

impl ArtifactRegressor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            artifact: OnceCell::new(),
        }
    }
}

#[async_trait]
impl Regressor for ArtifactRegressor {
    async fn predict(&self, input: f64) -> Result<f64, AppError> {
        let artifact = self
            .artifact
            .get_or_try_init(|| async {
                let artifact = RegressionArtifact::load(&self.path).await?;
                info!("Loaded regression artifact from {}", self.path.display());
                Ok::<_, anyhow::Error>(artifact)
            })
            .await
            .map_err(AppError::Load)?;
        Ok(artifact.predict(input))
    }
}

/// Parse a form value the way Python's `float()` does: surrounding
/// whitespace is ignored, `inf`/`nan` and exponents are accepted, and single
/// underscores between digits (`1_000`) are allowed.
pub fn parse_input(raw: &str) -> Result<f64, AppError> {
    let invalid = || AppError::Parse(raw.to_string());
    let trimmed = raw.trim();

    let bytes = trimmed.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'_' {
            let before = i.checked_sub(1).map(|j| bytes[j]);
            let after = bytes.get(i + 1).copied();
            if !before.is_some_and(|c| c.is_ascii_digit())
                || !after.is_some_and(|c| c.is_ascii_digit())
            {
                return Err(invalid());
            }
        }
    }

    trimmed
        .replace('_', "")
        .parse::<f64>()
        .map_err(|_| invalid())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Regressor fake: records inputs, returns `input * 10`.
    #[derive(Default)]
    pub struct FakeRegressor {
        pub inputs: Mutex<Vec<f64>>,
    }

    #[async_trait]
    impl Regressor for FakeRegressor {
        async fn predict(&self, input: f64) -> Result<f64, AppError> {
            self.inputs.lock().unwrap().push(input);
            Ok(input * 10.0)
        }
    }

    fn write_artifact(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("2.5").unwrap(), 2.5);
        assert_eq!(parse_input(" 1.34\n").unwrap(), 1.34);
        assert_eq!(parse_input("1e2").unwrap(), 100.0);
        assert_eq!(parse_input("-3").unwrap(), -3.0);
        assert!(parse_input("inf").unwrap().is_infinite());
    }

    #[test]
    fn test_parse_input_digit_underscores() {
        assert_eq!(parse_input("1_000").unwrap(), 1000.0);
        assert_eq!(parse_input("1_234.5_6").unwrap(), 1234.56);
        assert_eq!(parse_input("1e1_0").unwrap(), 1e10);
        for bad in ["_1", "1_", "1__0", "1_.5", "1._5", "_"] {
            assert!(parse_input(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_artifact_requires_one_coefficient() {
        assert!(RegressionArtifact::new(vec![], 1.0).is_err());
        assert!(RegressionArtifact::new(vec![1.0, 2.0], 1.0).is_err());
        assert_eq!(RegressionArtifact::new(vec![2.0], 1.0).unwrap().predict(3.0), 7.0);
    }

    #[test]
    fn test_parse_input_rejects_non_numeric() {
        let err = parse_input("abc").unwrap_err();
        assert!(matches!(err, AppError::Parse(ref s) if s == "abc"));
        assert!(parse_input("").is_err());
        assert!(parse_input("1,5").is_err());
    }

    #[test]
    fn test_artifact_predict() {
        let artifact = RegressionArtifact::new(vec![-50.6], 90.2).unwrap();
        assert!((artifact.predict(1.3) - (90.2 - 50.6 * 1.3)).abs() < 1e-9);
        assert_eq!(artifact.predict(0.0), 90.2);
    }

    #[tokio::test]
    async fn test_regressor_loads_artifact() {
        let file = write_artifact(r#"{"coefficients": [2.0], "intercept": 1.0}"#);
        let regressor = ArtifactRegressor::new(file.path());

        assert_eq!(regressor.predict(2.5).await.unwrap(), 6.0);
        assert_eq!(regressor.predict(0.0).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_regressor_keeps_loaded_artifact() {
        let file = write_artifact(r#"{"coefficients": [1.0], "intercept": 0.0}"#);
        let path = file.path().to_path_buf();
        let regressor = ArtifactRegressor::new(&path);
        assert_eq!(regressor.predict(3.0).await.unwrap(), 3.0);

        drop(file);
        assert!(!path.exists());
        assert_eq!(regressor.predict(4.0).await.unwrap(), 4.0);
    }

    #[tokio::test]
    async fn test_missing_artifact_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbs.json");
        let regressor = ArtifactRegressor::new(&path);

        let err = regressor.predict(1.0).await.unwrap_err();
        assert!(matches!(err, AppError::Load(_)));

        // Not cached: once the file shows up the next call succeeds.
        std::fs::write(&path, r#"{"coefficients": [3.0], "intercept": 0.5}"#).unwrap();
        assert_eq!(regressor.predict(1.0).await.unwrap(), 3.5);
    }

    #[tokio::test]
    async fn test_wrong_coefficient_count_rejected() {
        let file = write_artifact(r#"{"coefficients": [1.0, 2.0], "intercept": 0.0}"#);
        let err = RegressionArtifact::load(file.path()).await.unwrap_err();
        assert!(format!("{err:#}").contains("2 coefficients"));

        let file = write_artifact("not json");
        assert!(RegressionArtifact::load(file.path()).await.is_err());
    }
}
