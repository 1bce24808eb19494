use crate::types::{ensure_same_shape, CompositeImage, ReflectanceImage, VegError, VegResult};
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

/// Percentile bounds for display stretching
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretchParams {
    /// Lower percentile mapped to 0.0
    pub low_percentile: f64,
    /// Upper percentile mapped to 1.0
    pub high_percentile: f64,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self {
            low_percentile: 2.0,
            high_percentile: 98.0,
        }
    }
}

impl StretchParams {
    pub fn validate(&self) -> VegResult<()> {
        let (low, high) = (self.low_percentile, self.high_percentile);
        if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low >= high {
            return Err(VegError::InvalidParameter(format!(
                "percentiles must satisfy 0 <= low < high <= 100, got {} and {}",
                low, high
            )));
        }
        Ok(())
    }
}

/// Percentile of an ascending slice, linear interpolation between closest ranks
fn percentile(sorted: &[f32], p: f64) -> f32 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = (rank - lower as f64) as f32;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Percentile bounds over the finite samples of a band, or None if there are none
pub fn percentile_bounds(band: &Array2<f32>, params: &StretchParams) -> Option<(f32, f32)> {
    let mut valid: Vec<f32> = band.iter().copied().filter(|v| v.is_finite()).collect();
    if valid.is_empty() {
        return None;
    }
    valid.sort_by(f32::total_cmp);
    Some((
        percentile(&valid, params.low_percentile),
        percentile(&valid, params.high_percentile),
    ))
}

/// Linearly remap the [low, high] percentile range onto [0, 1]
pub fn stretch(band: &Array2<f32>, params: &StretchParams) -> VegResult<ReflectanceImage> {
    params.validate()?;

    let (low, high) = match percentile_bounds(band, params) {
        Some(bounds) => bounds,
        None => {
            log::warn!("Band has no valid samples, returning it unstretched");
            return Ok(band.clone());
        }
    };

    if low == high {
        log::warn!("Degenerate stretch range ({}), returning band unchanged", low);
        return Ok(band.clone());
    }

    log::debug!(
        "Stretching p{}={} .. p{}={}",
        params.low_percentile,
        low,
        params.high_percentile,
        high
    );

    let span = high - low;
    Ok(band.mapv(|v| {
        if v.is_nan() {
            v
        } else {
            ((v - low) / span).clamp(0.0, 1.0)
        }
    }))
}

/// Build a NIR/red/green false-colour composite, each channel stretched on its own
pub fn false_color_composite(
    nir: &Array2<f32>,
    red: &Array2<f32>,
    green: &Array2<f32>,
    params: &StretchParams,
) -> VegResult<CompositeImage> {
    ensure_same_shape("false colour red channel", nir.dim(), red.dim())?;
    ensure_same_shape("false colour green channel", nir.dim(), green.dim())?;

    let (rows, cols) = nir.dim();
    log::info!("Building {}x{} false colour composite", rows, cols);

    let mut composite = Array3::<f32>::zeros((rows, cols, 3));
    for (channel, band) in [nir, red, green].into_iter().enumerate() {
        let stretched = stretch(band, params)?;
        composite.index_axis_mut(Axis(2), channel).assign(&stretched);
    }
    Ok(composite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_stretch_spans_unit_interval() {
        let band = Array2::from_shape_fn((10, 10), |(i, j)| (i * 10 + j) as f32 / 200.0);
        let out = stretch(&band, &StretchParams::default()).unwrap();

        let min = out.iter().copied().fold(f32::INFINITY, f32::min);
        let max = out.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert_abs_diff_eq!(min, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(max, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nodata_stays_nodata() {
        let band = array![[f32::NAN, 0.1, 0.2], [0.3, 0.4, f32::NAN]];
        let out = stretch(&band, &StretchParams::default()).unwrap();
        assert!(out[[0, 0]].is_nan());
        assert!(out[[1, 2]].is_nan());
        assert!(out.iter().filter(|v| !v.is_nan()).all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_constant_band_is_returned_unchanged() {
        let band = Array2::<f32>::from_elem((4, 4), 0.25);
        let out = stretch(&band, &StretchParams::default()).unwrap();
        assert_eq!(out, band);

        let empty = Array2::<f32>::from_elem((2, 2), f32::NAN);
        let out = stretch(&empty, &StretchParams::default()).unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_percentiles_interpolate_linearly() {
        let band = array![[1.0f32, 2.0, 3.0, 4.0, 5.0]];
        let params = StretchParams {
            low_percentile: 25.0,
            high_percentile: 90.0,
        };
        let (low, high) = percentile_bounds(&band, &params).unwrap();
        assert_abs_diff_eq!(low, 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(high, 4.6, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_percentiles_rejected() {
        let band = array![[1.0f32, 2.0]];
        for (low, high) in [(50.0, 50.0), (60.0, 40.0), (-1.0, 50.0), (2.0, 101.0)] {
            let params = StretchParams {
                low_percentile: low,
                high_percentile: high,
            };
            assert!(matches!(stretch(&band, &params), Err(VegError::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_composite_channel_order_and_shape_check() {
        let nir = Array2::from_shape_fn((3, 3), |(i, j)| (i + j) as f32);
        let red = Array2::from_shape_fn((3, 3), |(i, j)| (i * j) as f32);
        let green = Array2::from_shape_fn((3, 3), |(i, _)| i as f32);

        let composite = false_color_composite(&nir, &red, &green, &StretchParams::default()).unwrap();
        assert_eq!(composite.dim(), (3, 3, 3));
        let nir_channel = stretch(&nir, &StretchParams::default()).unwrap();
        assert_eq!(composite.index_axis(Axis(2), 0), nir_channel);

        let small = Array2::<f32>::zeros((2, 3));
        assert!(matches!(
            false_color_composite(&nir, &small, &green, &StretchParams::default()),
            Err(VegError::InvalidShape(_))
        ));
    }
}
