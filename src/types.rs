use ndarray::{Array2, Array3, ArrayD, Ix2};
use serde::{Deserialize, Serialize};

/// Normalized surface reflectance sample
pub type Reflectance = f32;

/// 2D reflectance raster (rows x cols), NaN marks no-data
pub type ReflectanceImage = Array2<Reflectance>;

/// 2D NDVI raster, values in [-1, 1] or NaN
pub type NdviImage = Array2<f32>;

/// Binary mask raster (1 = selected, 0 = not selected)
pub type MaskImage = Array2<u8>;

/// Display composite (rows x cols x channel)
pub type CompositeImage = Array3<Reflectance>;

/// Land-cover category code as found in the categorical raster
pub type CategoryCode = u32;

/// Sample type of a raster band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    UInt8,
    UInt16,
    UInt32,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl SampleType {
    pub fn is_unsigned(&self) -> bool {
        matches!(self, SampleType::UInt8 | SampleType::UInt16 | SampleType::UInt32)
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, SampleType::Float32 | SampleType::Float64)
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleType::UInt8 => write!(f, "uint8"),
            SampleType::UInt16 => write!(f, "uint16"),
            SampleType::UInt32 => write!(f, "uint32"),
            SampleType::Int16 => write!(f, "int16"),
            SampleType::Int32 => write!(f, "int32"),
            SampleType::Float32 => write!(f, "float32"),
            SampleType::Float64 => write!(f, "float64"),
        }
    }
}

/// A single raster band tagged with its sample type
#[derive(Debug, Clone, PartialEq)]
pub enum BandData {
    UInt8(Array2<u8>),
    UInt16(Array2<u16>),
    UInt32(Array2<u32>),
    Int16(Array2<i16>),
    Int32(Array2<i32>),
    Float32(Array2<f32>),
    Float64(Array2<f64>),
}

impl BandData {
    pub fn sample_type(&self) -> SampleType {
        match self {
            BandData::UInt8(_) => SampleType::UInt8,
            BandData::UInt16(_) => SampleType::UInt16,
            BandData::UInt32(_) => SampleType::UInt32,
            BandData::Int16(_) => SampleType::Int16,
            BandData::Int32(_) => SampleType::Int32,
            BandData::Float32(_) => SampleType::Float32,
            BandData::Float64(_) => SampleType::Float64,
        }
    }

    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        match self {
            BandData::UInt8(a) => a.dim(),
            BandData::UInt16(a) => a.dim(),
            BandData::UInt32(a) => a.dim(),
            BandData::Int16(a) => a.dim(),
            BandData::Int32(a) => a.dim(),
            BandData::Float32(a) => a.dim(),
            BandData::Float64(a) => a.dim(),
        }
    }
}

/// Affine georeferencing transform (GDAL ordering)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Geographic coordinate of the upper-left corner of pixel (row, col)
    pub fn pixel_to_geo(&self, row: f64, col: f64) -> (f64, f64) {
        let x = self.top_left_x + col * self.pixel_width + row * self.rotation_x;
        let y = self.top_left_y + col * self.rotation_y + row * self.pixel_height;
        (x, y)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self {
            top_left_x: 0.0,
            pixel_width: 1.0,
            rotation_x: 0.0,
            top_left_y: 0.0,
            rotation_y: 0.0,
            pixel_height: -1.0,
        }
    }
}

/// Error types for band-math processing
#[derive(Debug, thiserror::Error)]
pub enum VegError {
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Duplicate category code {code}: '{first}' vs '{second}'")]
    DuplicateCategory {
        code: CategoryCode,
        first: String,
        second: String,
    },

    #[error("Unsupported dtype: {0}")]
    UnsupportedDtype(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Lookup table error: {0}")]
    LookupTable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Raster I/O error: {0}")]
    Raster(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for VegError {
    fn from(err: gdal::errors::GdalError) -> Self {
        VegError::Raster(err.to_string())
    }
}

/// Result type for band-math operations
pub type VegResult<T> = Result<T, VegError>;

/// Fail with `InvalidShape` unless both grids have the same (rows, cols)
pub fn ensure_same_shape(
    what: &str,
    left: (usize, usize),
    right: (usize, usize),
) -> VegResult<()> {
    if left != right {
        return Err(VegError::InvalidShape(format!(
            "{}: {}x{} does not match {}x{}",
            what, left.0, left.1, right.0, right.1
        )));
    }
    Ok(())
}

/// Convert a dynamic-dimension array into a 2D band
pub fn into_band<T>(array: ArrayD<T>) -> VegResult<Array2<T>> {
    let ndim = array.ndim();
    array.into_dimensionality::<Ix2>().map_err(|_| {
        VegError::InvalidShape(format!("expected a 2-D grid, got {} dimension(s)", ndim))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_into_band_rejects_3d() {
        let cube = ArrayD::<u16>::zeros(IxDyn(&[2, 3, 4]));
        assert!(matches!(into_band(cube), Err(VegError::InvalidShape(_))));

        let grid = ArrayD::<u16>::zeros(IxDyn(&[2, 3]));
        assert_eq!(into_band(grid).unwrap().dim(), (2, 3));
    }

    #[test]
    fn test_geotransform_roundtrip_and_pixel_lookup() {
        let gt = GeoTransform::from_gdal([500000.0, 10.0, 0.0, 4600000.0, 0.0, -10.0]);
        assert_eq!(gt.to_gdal(), [500000.0, 10.0, 0.0, 4600000.0, 0.0, -10.0]);
        assert_eq!(gt.pixel_to_geo(2.0, 3.0), (500030.0, 4599980.0));
    }
}
