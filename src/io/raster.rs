use crate::types::{BandData, GeoTransform, SampleType, VegError, VegResult};
use serde::{Deserialize, Serialize};

/// Georeferencing and layout of a raster dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub sample_type: SampleType,
    pub transform: GeoTransform,
    /// CRS identifier (WKT or authority code such as "EPSG:32633")
    pub crs: String,
    pub nodata: Option<f64>,
}

impl RasterMetadata {
    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Metadata for a single-band product derived from this raster
    pub fn for_single_band(&self, sample_type: SampleType, nodata: Option<f64>) -> Self {
        Self {
            band_count: 1,
            sample_type,
            nodata,
            ..self.clone()
        }
    }

    /// Metadata after cropping to a window with a new origin
    pub fn cropped(&self, transform: GeoTransform, height: usize, width: usize) -> Self {
        Self {
            transform,
            height,
            width,
            ..self.clone()
        }
    }

    /// Bands from both rasters can be combined pixel by pixel
    pub fn ensure_aligned(&self, other: &RasterMetadata) -> VegResult<()> {
        if self.shape() != other.shape() {
            return Err(VegError::InvalidShape(format!(
                "raster grids differ: {}x{} vs {}x{}",
                self.height, self.width, other.height, other.width
            )));
        }
        if self.transform != other.transform {
            return Err(VegError::InvalidShape(format!(
                "raster transforms differ: {:?} vs {:?}",
                self.transform, other.transform
            )));
        }
        if self.crs != other.crs {
            return Err(VegError::InvalidShape(format!(
                "raster CRS differ: '{}' vs '{}'",
                self.crs, other.crs
            )));
        }
        Ok(())
    }

    /// Check that a band can be written under this metadata
    pub fn ensure_matches(&self, band: &BandData) -> VegResult<()> {
        if band.dim() != self.shape() {
            let (rows, cols) = band.dim();
            return Err(VegError::InvalidShape(format!(
                "band is {}x{} but metadata declares {}x{}",
                rows, cols, self.height, self.width
            )));
        }
        if band.sample_type() != self.sample_type {
            return Err(VegError::UnsupportedDtype(format!(
                "band holds {} but metadata declares {}",
                band.sample_type(),
                self.sample_type
            )));
        }
        Ok(())
    }
}

/// Source of raster bands
pub trait RasterReader {
    fn metadata(&self) -> &RasterMetadata;

    /// Read band `index` (1-based, as in GDAL)
    fn read_band(&self, index: usize) -> VegResult<BandData>;
}

/// Sink for raster bands
pub trait RasterWriter {
    fn write_band(&mut self, band: &BandData, metadata: &RasterMetadata) -> VegResult<()>;
}

pub(crate) fn check_band_index(index: usize, band_count: usize) -> VegResult<()> {
    if index == 0 || index > band_count {
        return Err(VegError::InvalidParameter(format!(
            "band index {} out of range 1..={}",
            index, band_count
        )));
    }
    Ok(())
}

/// Raster held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    metadata: RasterMetadata,
    bands: Vec<BandData>,
}

impl MemoryRaster {
    /// Build from bands that all share the metadata's shape and sample type
    pub fn new(metadata: RasterMetadata, bands: Vec<BandData>) -> VegResult<Self> {
        if bands.len() != metadata.band_count {
            return Err(VegError::InvalidParameter(format!(
                "metadata declares {} bands, got {}",
                metadata.band_count,
                bands.len()
            )));
        }
        for band in &bands {
            metadata.ensure_matches(band)?;
        }
        Ok(Self { metadata, bands })
    }

    /// Empty raster that accepts its first band through `RasterWriter`
    pub fn empty(metadata: RasterMetadata) -> Self {
        Self {
            metadata: RasterMetadata {
                band_count: 0,
                ..metadata
            },
            bands: Vec::new(),
        }
    }
}

impl RasterReader for MemoryRaster {
    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    fn read_band(&self, index: usize) -> VegResult<BandData> {
        check_band_index(index, self.bands.len())?;
        Ok(self.bands[index - 1].clone())
    }
}

impl RasterWriter for MemoryRaster {
    /// Replaces the raster contents with a single band
    fn write_band(&mut self, band: &BandData, metadata: &RasterMetadata) -> VegResult<()> {
        metadata.ensure_matches(band)?;
        self.metadata = metadata.for_single_band(band.sample_type(), metadata.nodata);
        self.bands = vec![band.clone()];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn metadata(height: usize, width: usize) -> RasterMetadata {
        RasterMetadata {
            width,
            height,
            band_count: 1,
            sample_type: SampleType::UInt16,
            transform: GeoTransform::from_gdal([600000.0, 10.0, 0.0, 5000000.0, 0.0, -10.0]),
            crs: "EPSG:32633".to_string(),
            nodata: Some(0.0),
        }
    }

    #[test]
    fn test_band_index_is_one_based() {
        let raster = MemoryRaster::new(metadata(1, 2), vec![BandData::UInt16(array![[1u16, 2]])]).unwrap();
        assert!(raster.read_band(1).is_ok());
        assert!(matches!(raster.read_band(0), Err(VegError::InvalidParameter(_))));
        assert!(matches!(raster.read_band(2), Err(VegError::InvalidParameter(_))));
    }

    #[test]
    fn test_new_rejects_mismatched_band() {
        let band = BandData::UInt16(Array2::zeros((3, 3)));
        assert!(matches!(
            MemoryRaster::new(metadata(2, 2), vec![band]),
            Err(VegError::InvalidShape(_))
        ));
        let band = BandData::UInt8(Array2::zeros((2, 2)));
        assert!(matches!(
            MemoryRaster::new(metadata(2, 2), vec![band]),
            Err(VegError::UnsupportedDtype(_))
        ));
    }

    #[test]
    fn test_float_roundtrip_is_bit_exact() {
        let values = array![[0.1234f32, f32::NAN], [1.0, 0.000_1]];
        let meta = metadata(2, 2).for_single_band(SampleType::Float32, Some(f64::NAN));

        let mut raster = MemoryRaster::empty(meta.clone());
        raster.write_band(&BandData::Float32(values.clone()), &meta).unwrap();

        match raster.read_band(1).unwrap() {
            BandData::Float32(back) => {
                for (a, b) in values.iter().zip(back.iter()) {
                    assert_eq!(a.to_bits(), b.to_bits());
                }
            }
            other => panic!("unexpected band type {:?}", other.sample_type()),
        }
        assert_eq!(raster.metadata().band_count, 1);
    }

    #[test]
    fn test_alignment_and_crop() {
        let a = metadata(4, 4);
        let mut b = metadata(4, 4);
        assert!(a.ensure_aligned(&b).is_ok());

        b.crs = "EPSG:4326".to_string();
        assert!(matches!(a.ensure_aligned(&b), Err(VegError::InvalidShape(_))));

        let crop_origin = GeoTransform::from_gdal([600020.0, 10.0, 0.0, 4999990.0, 0.0, -10.0]);
        let cropped = a.cropped(crop_origin, 2, 3);
        assert_eq!(cropped.shape(), (2, 3));
        assert_eq!(cropped.transform, crop_origin);
        assert!(matches!(a.ensure_aligned(&cropped), Err(VegError::InvalidShape(_))));
    }
}
