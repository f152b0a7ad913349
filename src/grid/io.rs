//! Single-band GeoTIFF loading via the `tiff` crate.
//!
//! Available when the `geotiff-io` feature is enabled. Only the first band is
//! read; the transform is recovered from the GeoTIFF model tags.

use crate::grid::{GeoTransform, HeightGrid};
use crate::util::{PivError, PivResult};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;

/// Loads band 1 of a GeoTIFF as a height (or uncertainty) grid.
pub fn read_height_grid<P: AsRef<Path>>(path: P) -> PivResult<HeightGrid> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| PivError::RasterIo {
        reason: format!("{}: {err}", path.display()),
    })?;
    decode_height_grid(BufReader::new(file))
}

/// Decodes band 1 of a GeoTIFF from any seekable reader.
pub fn decode_height_grid<R: Read + Seek>(reader: R) -> PivResult<HeightGrid> {
    let mut decoder = Decoder::new(reader).map_err(raster_err)?;
    let (width, height) = decoder.dimensions().map_err(raster_err)?;
    let width = width as usize;
    let height = height as usize;

    let samples = match decoder.read_image().map_err(raster_err)? {
        DecodingResult::U8(buf) => widen(buf),
        DecodingResult::U16(buf) => widen(buf),
        DecodingResult::U32(buf) => widen(buf),
        DecodingResult::U64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(buf) => widen(buf),
        DecodingResult::I16(buf) => widen(buf),
        DecodingResult::I32(buf) => widen(buf),
        DecodingResult::I64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(buf) => widen(buf),
        DecodingResult::F64(buf) => buf,
        #[allow(unreachable_patterns)]
        _ => {
            return Err(PivError::RasterIo {
                reason: "unsupported sample format".to_string(),
            })
        }
    };

    let pixels = width
        .checked_mul(height)
        .ok_or(PivError::InvalidDimensions { width, height })?;
    if pixels == 0 || samples.len() % pixels != 0 {
        return Err(PivError::InvalidDimensions { width, height });
    }
    let bands = samples.len() / pixels;
    let data = if bands == 1 {
        samples
    } else {
        samples.into_iter().step_by(bands).collect()
    };

    let grid = HeightGrid::new(data, width, height)?;
    Ok(match read_transform(&mut decoder) {
        Some(transform) => grid.with_transform(transform),
        None => grid,
    })
}

fn widen<T: Into<f64>>(buf: Vec<T>) -> Vec<f64> {
    buf.into_iter().map(Into::into).collect()
}

fn raster_err(err: tiff::TiffError) -> PivError {
    PivError::RasterIo {
        reason: err.to_string(),
    }
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TRANSFORMATION)) {
        if m.len() >= 16 {
            // 4x4 row-major model matrix; drop the z row and column
            return Some(GeoTransform::from_matrix([
                [m[0], m[1], m[3]],
                [m[4], m[5], m[7]],
                [0.0, 0.0, 1.0],
            ]));
        }
    }

    let scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE))
        .ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z], raster (I, J) maps to model (X, Y)
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::from_affine([
        scale[0], 0.0, origin_x, 0.0, -scale[1], origin_y,
    ]))
}
