use crate::types::{ensure_same_shape, NdviImage, VegResult};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Per-pixel normalized difference. A zero or undefined denominator yields NaN.
#[inline]
pub fn normalized_difference(nir: f32, red: f32) -> f32 {
    let denominator = nir + red;
    if denominator == 0.0 || !denominator.is_finite() {
        return f32::NAN;
    }
    let value = (nir - red) / denominator;
    if value.is_finite() {
        value
    } else {
        f32::NAN
    }
}

/// NDVI = (nir - red) / (nir + red), elementwise
pub fn ndvi(nir: &Array2<f32>, red: &Array2<f32>) -> VegResult<NdviImage> {
    ensure_same_shape("NDVI red band", nir.dim(), red.dim())?;

    let (rows, cols) = nir.dim();
    log::debug!("Computing NDVI over {}x{} pixels", rows, cols);

    #[cfg(feature = "parallel")]
    let result = Zip::from(nir)
        .and(red)
        .par_map_collect(|&n, &r| normalized_difference(n, r));

    #[cfg(not(feature = "parallel"))]
    let result = Zip::from(nir)
        .and(red)
        .map_collect(|&n, &r| normalized_difference(n, r));

    Ok(result)
}

/// Keep values where `mask` is 1, NaN elsewhere
pub fn apply_mask(values: &Array2<f32>, mask: &Array2<u8>) -> VegResult<Array2<f32>> {
    ensure_same_shape("mask", values.dim(), mask.dim())?;
    Ok(Zip::from(values)
        .and(mask)
        .map_collect(|&v, &m| if m == 1 { v } else { f32::NAN }))
}

/// Aggregate NDVI statistics, optionally restricted to a mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdviSummary {
    pub mean: Option<f64>,
    pub min: Option<f32>,
    pub max: Option<f32>,
    /// Pixels that contributed to the statistics
    pub valid_pixels: usize,
    /// In-mask pixels where NDVI could not be computed
    pub undefined_pixels: usize,
}

/// Summarize an NDVI image over the pixels selected by `mask` (all pixels if None)
pub fn summarize(ndvi: &Array2<f32>, mask: Option<&Array2<u8>>) -> VegResult<NdviSummary> {
    if let Some(mask) = mask {
        ensure_same_shape("summary mask", ndvi.dim(), mask.dim())?;
    }

    let mut sum = 0.0f64;
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut valid_pixels = 0usize;
    let mut undefined_pixels = 0usize;

    for ((i, j), &value) in ndvi.indexed_iter() {
        if let Some(mask) = mask {
            if mask[[i, j]] != 1 {
                continue;
            }
        }
        if value.is_nan() {
            undefined_pixels += 1;
            continue;
        }
        valid_pixels += 1;
        sum += value as f64;
        min = min.min(value);
        max = max.max(value);
    }

    let summary = if valid_pixels == 0 {
        NdviSummary {
            mean: None,
            min: None,
            max: None,
            valid_pixels,
            undefined_pixels,
        }
    } else {
        NdviSummary {
            mean: Some(sum / valid_pixels as f64),
            min: Some(min),
            max: Some(max),
            valid_pixels,
            undefined_pixels,
        }
    };

    log::debug!("NDVI summary: {:?}", summary);
    Ok(summary)
}
