//! Python bindings for the geopiv displacement field library.
//!
//! Grids are passed as C-contiguous `float64` numpy arrays; results come back
//! in ground units, ready for `json.dump` or plotting.

use numpy::{PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use geopiv::{
    CorrelationMethod, DemPair, GeoTransform, GroundResults, HeightGrid, Piv, PivConfig, PivError,
};

/// Convert a PivError to a Python exception.
fn to_py_err(err: PivError) -> PyErr {
    match err {
        PivError::InvalidInput(_)
        | PivError::GridMismatch { .. }
        | PivError::TransformMismatch
        | PivError::MissingUncertainty => PyValueError::new_err(err.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

fn to_grid(array: &PyReadonlyArray2<'_, f64>, transform: GeoTransform) -> PyResult<HeightGrid> {
    let shape = array.shape();
    let (height, width) = (shape[0], shape[1]);
    let data = array.as_slice()?.to_vec();
    Ok(HeightGrid::new(data, width, height)
        .map_err(to_py_err)?
        .with_transform(transform))
}

/// Ground-unit results of one scan.
#[pyclass]
#[derive(Clone)]
pub struct PivResults {
    /// `[x, y, dx, dy]` per accepted tile, in lattice scan order.
    #[pyo3(get)]
    pub origins_vectors: Vec<[f64; 4]>,
    /// 2x2 displacement covariance per accepted tile, or None.
    #[pyo3(get)]
    pub covariances: Option<Vec<[[f64; 2]; 2]>>,
    /// Number of accepted tiles.
    #[pyo3(get)]
    pub accepted: usize,
    /// Number of skipped tiles.
    #[pyo3(get)]
    pub skipped: usize,
}

#[pymethods]
impl PivResults {
    /// Write `<prefix>origins_vectors.json` (and the covariance file when
    /// present) into `directory`. Returns the written paths.
    #[pyo3(signature = (directory, prefix = ""))]
    fn write(&self, directory: &str, prefix: &str) -> PyResult<Vec<String>> {
        let results = GroundResults {
            origins_vectors: self.origins_vectors.clone(),
            covariances: self.covariances.clone(),
        };
        let paths = results.write(directory, prefix).map_err(to_py_err)?;
        let mut out = vec![paths.origins_vectors.display().to_string()];
        if let Some(path) = paths.covariances {
            out.push(path.display().to_string());
        }
        Ok(out)
    }

    fn __len__(&self) -> usize {
        self.origins_vectors.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "PivResults(accepted={}, skipped={}, propagated={})",
            self.accepted,
            self.skipped,
            self.covariances.is_some()
        )
    }
}

/// Compute a displacement field between two elevation grids.
///
/// Args:
///     before: Pre-event heights, 2-D float64 array
///     after: Post-event heights, same shape as `before`
///     template_size: Template edge length in pixels (default: 9)
///     step_size: Lattice step in pixels (default: 5)
///     transform: Affine six-tuple (a, b, c, d, e, f) mapping pixel to ground
///         (default: identity)
///     before_uncertainty: Per-pixel height std for `before` (optional)
///     after_uncertainty: Per-pixel height std for `after` (optional)
///     method: "fft" or "spatial" (default: "fft")
///     parallel: Process tiles in parallel (default: False)
///
/// Returns:
///     PivResults with ground-unit origins/vectors and, when both uncertainty
///     grids are given, covariances
#[pyfunction]
#[pyo3(signature = (
    before,
    after,
    template_size = 9,
    step_size = 5,
    transform = None,
    before_uncertainty = None,
    after_uncertainty = None,
    method = "fft",
    parallel = false
))]
#[allow(clippy::too_many_arguments)]
fn piv(
    before: PyReadonlyArray2<'_, f64>,
    after: PyReadonlyArray2<'_, f64>,
    template_size: usize,
    step_size: usize,
    transform: Option<[f64; 6]>,
    before_uncertainty: Option<PyReadonlyArray2<'_, f64>>,
    after_uncertainty: Option<PyReadonlyArray2<'_, f64>>,
    method: &str,
    parallel: bool,
) -> PyResult<PivResults> {
    let method = match method {
        "fft" => CorrelationMethod::Fft,
        "spatial" => CorrelationMethod::Spatial,
        _ => return Err(PyValueError::new_err("method must be 'fft' or 'spatial'")),
    };
    let transform = transform.map(GeoTransform::from_affine).unwrap_or_default();

    let before = to_grid(&before, transform)?;
    let after = to_grid(&after, transform)?;
    let uncertainty = match (before_uncertainty, after_uncertainty) {
        (Some(b), Some(a)) => Some((to_grid(&b, transform)?, to_grid(&a, transform)?)),
        (None, None) => None,
        _ => {
            return Err(PyValueError::new_err(
                "before_uncertainty and after_uncertainty must be given together",
            ))
        }
    };

    let mut pair = DemPair::new(&before, &after).map_err(to_py_err)?;
    if let Some((b, a)) = &uncertainty {
        pair = pair.with_uncertainty(b, a).map_err(to_py_err)?;
    }

    let piv = Piv::new(PivConfig {
        template_size,
        step_size,
        propagate: uncertainty.is_some(),
        method,
        parallel,
        ..PivConfig::default()
    })
    .map_err(to_py_err)?;
    let output = piv.run(&pair).map_err(to_py_err)?;
    let ground = GroundResults::from_output(&output, &transform);

    Ok(PivResults {
        origins_vectors: ground.origins_vectors,
        covariances: ground.covariances,
        accepted: output.stats.accepted,
        skipped: output.stats.skipped_total(),
    })
}

#[pymodule]
fn _geopiv(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PivResults>()?;
    m.add_function(wrap_pyfunction!(piv, m)?)?;

    // Add version
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
