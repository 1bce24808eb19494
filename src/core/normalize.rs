use crate::types::{into_band, BandData, ReflectanceImage, VegError, VegResult};
use ndarray::{Array2, ArrayD};
use num_traits::{ToPrimitive, Unsigned};

/// Sentinel-2 L2A digital numbers are reflectance scaled by 10000
pub const DEFAULT_SCALE_FACTOR: f32 = 10_000.0;

/// Converts raw digital numbers into NaN-masked surface reflectance
#[derive(Debug, Clone, Copy)]
pub struct ReflectanceNormalizer {
    scale_factor: f32,
}

impl Default for ReflectanceNormalizer {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
        }
    }
}

impl ReflectanceNormalizer {
    pub fn new(scale_factor: f32) -> VegResult<Self> {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(VegError::InvalidParameter(format!(
                "scale factor must be a positive finite number, got {}",
                scale_factor
            )));
        }
        Ok(Self { scale_factor })
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Scale an unsigned digital-number band. Zero after scaling is no-data.
    pub fn normalize<T>(&self, raw: &Array2<T>) -> ReflectanceImage
    where
        T: Copy + Unsigned + ToPrimitive,
    {
        let (rows, cols) = raw.dim();
        log::debug!(
            "Normalizing {}x{} band with scale factor {}",
            rows,
            cols,
            self.scale_factor
        );
        raw.mapv(|dn| self.scale_sample(dn.to_f32().unwrap_or(f32::NAN)))
    }

    /// Same rule applied to an already floating-point band
    pub fn normalize_reflectance(&self, band: &Array2<f32>) -> ReflectanceImage {
        band.mapv(|v| self.scale_sample(v))
    }

    /// Dispatch on the band's sample type; only unsigned digital numbers qualify
    pub fn normalize_band(&self, band: &BandData) -> VegResult<ReflectanceImage> {
        match band {
            BandData::UInt8(a) => Ok(self.normalize(a)),
            BandData::UInt16(a) => Ok(self.normalize(a)),
            BandData::UInt32(a) => Ok(self.normalize(a)),
            other => Err(VegError::UnsupportedDtype(format!(
                "reflectance normalization expects unsigned digital numbers, got {}",
                other.sample_type()
            ))),
        }
    }

    #[inline]
    fn scale_sample(&self, value: f32) -> f32 {
        let scaled = value / self.scale_factor;
        if scaled == 0.0 {
            f32::NAN
        } else {
            scaled
        }
    }
}

/// Normalize a raw band with the given scale factor
pub fn normalize<T>(raw: &Array2<T>, scale_factor: f32) -> VegResult<ReflectanceImage>
where
    T: Copy + Unsigned + ToPrimitive,
{
    Ok(ReflectanceNormalizer::new(scale_factor)?.normalize(raw))
}

/// Normalize an array of unknown dimensionality; anything but 2-D is rejected
pub fn normalize_dyn<T>(raw: ArrayD<T>, scale_factor: f32) -> VegResult<ReflectanceImage>
where
    T: Copy + Unsigned + ToPrimitive,
{
    let normalizer = ReflectanceNormalizer::new(scale_factor)?;
    let band = into_band(raw)?;
    Ok(normalizer.normalize(&band))
}

/// Correction step applied before writing: reflectance above 1 is clamped to 1
pub fn clamp_reflectance(band: &Array2<f32>) -> ReflectanceImage {
    let clamped = band.iter().filter(|v| **v > 1.0).count();
    if clamped > 0 {
        log::debug!("Clamping {} reflectance samples above 1.0", clamped);
    }
    band.mapv(|v| if v > 1.0 { 1.0 } else { v })
}
