//! PyO3 bindings for the tradyx analytics pipeline.
//!
//! Exposes the Rust dashboard build to the Python batch job:
//! - `build_dashboard`: one-shot run over three JSON documents
//! - `Pipeline`: reusable engines for repeated runs with one configuration
//! - `default_config_json`: the default engine configuration

use chrono::Utc;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use tradyx_core::{Config as RustConfig, Error as RustError};
use tradyx_dashboard::{Pipeline as RustPipeline, Snapshots};

fn to_py_err(err: RustError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_config(config_json: Option<&str>) -> PyResult<RustConfig> {
    match config_json {
        Some(json) => RustConfig::from_json(json).map_err(to_py_err),
        None => Ok(RustConfig::default()),
    }
}

fn run(
    pipeline: &RustPipeline,
    yf_json: &str,
    chain_json: Option<&str>,
    prediction_json: &str,
) -> PyResult<String> {
    let snapshots = Snapshots::from_json(
        yf_json,
        chain_json,
        prediction_json,
        Utc::now().naive_utc(),
    )
    .map_err(to_py_err)?;
    let payload = pipeline.run(&snapshots).map_err(to_py_err)?;
    payload.to_json_pretty().map_err(to_py_err)
}

// ============================================================================
// Python-exposed Pipeline
// ============================================================================

/// Dashboard pipeline built once from a configuration.
#[pyclass(name = "Pipeline")]
pub struct PyPipeline {
    inner: RustPipeline,
}

#[pymethods]
impl PyPipeline {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = parse_config(config_json)?;
        Ok(PyPipeline {
            inner: RustPipeline::new(&config),
        })
    }

    /// Build the dashboard document.
    ///
    /// Raises `ValueError` when the spot snapshot has no spot price.
    #[pyo3(signature = (yf_json, chain_json, prediction_json))]
    fn run(&self, yf_json: &str, chain_json: Option<&str>, prediction_json: &str) -> PyResult<String> {
        run(&self.inner, yf_json, chain_json, prediction_json)
    }

    fn __repr__(&self) -> String {
        "Pipeline()".to_string()
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Build the dashboard document from the spot, chain and market documents.
#[pyfunction]
#[pyo3(signature = (yf_json, chain_json, prediction_json, config_json=None))]
fn build_dashboard(
    yf_json: &str,
    chain_json: Option<&str>,
    prediction_json: &str,
    config_json: Option<&str>,
) -> PyResult<String> {
    let config = parse_config(config_json)?;
    run(&RustPipeline::new(&config), yf_json, chain_json, prediction_json)
}

/// The default engine configuration as JSON.
#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string_pretty(&RustConfig::default())
        .map_err(|err| PyValueError::new_err(format!("failed to serialise default config: {err}")))
}

// ============================================================================
// Module Definition
// ============================================================================

/// Tradyx analytics - dashboard indicators and forecasts for Python.
#[pymodule]
fn tradyx_analytics(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPipeline>()?;
    m.add_function(wrap_pyfunction!(build_dashboard, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    Ok(())
}
