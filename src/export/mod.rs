//! Conversion of pixel-space results to ground units and JSON persistence.
//!
//! Two index-aligned files are produced:
//! `<prefix>origins_vectors.json`, an array of `[x, y, dx, dy]`, and, when
//! covariances exist, `<prefix>covariance_matrices.json`, an array of 2x2
//! matrices.

use crate::grid::GeoTransform;
use crate::piv::PivOutput;
use crate::trace::trace_event;
use crate::util::{PivError, PivResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name suffix of the origins/vectors array.
pub const ORIGINS_VECTORS_FILE: &str = "origins_vectors.json";
/// File name suffix of the covariance array.
pub const COVARIANCE_FILE: &str = "covariance_matrices.json";

/// Scan results in ground units.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundResults {
    /// `[x, y, dx, dy]` per accepted tile.
    pub origins_vectors: Vec<[f64; 4]>,
    /// Displacement covariance per accepted tile, in squared ground units.
    pub covariances: Option<Vec<[[f64; 2]; 2]>>,
}

/// Paths written by [`GroundResults::write`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    /// Path of the origins/vectors file.
    pub origins_vectors: PathBuf,
    /// Path of the covariance file, when one was written.
    pub covariances: Option<PathBuf>,
}

impl GroundResults {
    /// Converts a scan output with the pixel-to-ground `transform`.
    ///
    /// Origins are scaled by the pixel size and offset by the transform
    /// translation, with the row axis flipped so that ground `y` grows
    /// northward. Vectors are scaled only; covariances scale by the squared
    /// pixel size.
    pub fn from_output(output: &PivOutput, transform: &GeoTransform) -> Self {
        let p = transform.pixel_size();
        let origins_vectors = output
            .matches
            .iter()
            .map(|m| {
                [
                    m.origin[0] * p + transform.origin_x(),
                    transform.origin_y() - m.origin[1] * p,
                    m.vector[0] * p,
                    m.vector[1] * p,
                ]
            })
            .collect();
        let p2 = p * p;
        let covariances = output.covariances().map(|covs| {
            covs.into_iter()
                .map(|c| [[c[0][0] * p2, c[0][1] * p2], [c[1][0] * p2, c[1][1] * p2]])
                .collect()
        });
        Self {
            origins_vectors,
            covariances,
        }
    }

    /// Number of exported tiles.
    pub fn len(&self) -> usize {
        self.origins_vectors.len()
    }

    /// True when no tile was accepted.
    pub fn is_empty(&self) -> bool {
        self.origins_vectors.is_empty()
    }

    /// Serializes the origins/vectors array.
    pub fn origins_vectors_json(&self) -> PivResult<String> {
        serde_json::to_string(&self.origins_vectors).map_err(export_err)
    }

    /// Serializes the covariance array, if any.
    pub fn covariances_json(&self) -> PivResult<Option<String>> {
        self.covariances
            .as_ref()
            .map(|c| serde_json::to_string(c).map_err(export_err))
            .transpose()
    }

    /// Parses the two arrays, checking that they are index-aligned.
    pub fn from_json(origins_vectors: &str, covariances: Option<&str>) -> PivResult<Self> {
        let origins_vectors: Vec<[f64; 4]> =
            serde_json::from_str(origins_vectors).map_err(export_err)?;
        let covariances = covariances
            .map(|s| serde_json::from_str::<Vec<[[f64; 2]; 2]>>(s).map_err(export_err))
            .transpose()?;
        if let Some(c) = &covariances {
            if c.len() != origins_vectors.len() {
                return Err(PivError::Export {
                    reason: format!(
                        "{} covariance matrices for {} vectors",
                        c.len(),
                        origins_vectors.len()
                    ),
                });
            }
        }
        Ok(Self {
            origins_vectors,
            covariances,
        })
    }

    /// Writes `<prefix>origins_vectors.json` and, when present,
    /// `<prefix>covariance_matrices.json` into `dir`.
    pub fn write(&self, dir: impl AsRef<Path>, prefix: &str) -> PivResult<OutputPaths> {
        let dir = dir.as_ref();
        let origins_vectors = dir.join(format!("{prefix}{ORIGINS_VECTORS_FILE}"));
        write_file(&origins_vectors, &self.origins_vectors_json()?)?;
        let covariances = match self.covariances_json()? {
            Some(json) => {
                let path = dir.join(format!("{prefix}{COVARIANCE_FILE}"));
                write_file(&path, &json)?;
                Some(path)
            }
            None => None,
        };
        trace_event!(
            "export_written",
            tiles = self.len(),
            with_covariance = covariances.is_some()
        );
        Ok(OutputPaths {
            origins_vectors,
            covariances,
        })
    }

    /// Reads files written by [`GroundResults::write`]. The covariance file
    /// is optional.
    pub fn read(dir: impl AsRef<Path>, prefix: &str) -> PivResult<Self> {
        let dir = dir.as_ref();
        let origins_vectors = read_file(&dir.join(format!("{prefix}{ORIGINS_VECTORS_FILE}")))?;
        let cov_path = dir.join(format!("{prefix}{COVARIANCE_FILE}"));
        let covariances = if cov_path.exists() {
            Some(read_file(&cov_path)?)
        } else {
            None
        };
        Self::from_json(&origins_vectors, covariances.as_deref())
    }
}

fn export_err(err: serde_json::Error) -> PivError {
    PivError::Export {
        reason: err.to_string(),
    }
}

fn write_file(path: &Path, contents: &str) -> PivResult<()> {
    std::fs::write(path, contents).map_err(|err| PivError::Export {
        reason: format!("{}: {err}", path.display()),
    })
}

fn read_file(path: &Path) -> PivResult<String> {
    std::fs::read_to_string(path).map_err(|err| PivError::Export {
        reason: format!("{}: {err}", path.display()),
    })
}
