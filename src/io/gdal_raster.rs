use crate::io::raster::{check_band_index, RasterMetadata, RasterReader, RasterWriter};
use crate::types::{BandData, GeoTransform, SampleType, VegError, VegResult};
use gdal::raster::{Buffer, GdalDataType, GdalType, RasterBand};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::{Path, PathBuf};

fn sample_type_of(band: &RasterBand) -> VegResult<SampleType> {
    match band.band_type() {
        GdalDataType::UInt8 => Ok(SampleType::UInt8),
        GdalDataType::UInt16 => Ok(SampleType::UInt16),
        GdalDataType::UInt32 => Ok(SampleType::UInt32),
        GdalDataType::Int16 => Ok(SampleType::Int16),
        GdalDataType::Int32 => Ok(SampleType::Int32),
        GdalDataType::Float32 => Ok(SampleType::Float32),
        GdalDataType::Float64 => Ok(SampleType::Float64),
        other => Err(VegError::UnsupportedDtype(format!(
            "GDAL data type {:?} is not supported",
            other
        ))),
    }
}

fn read_typed<T: GdalType + Copy>(
    band: &RasterBand,
    width: usize,
    height: usize,
) -> VegResult<Array2<T>> {
    let buffer = band.read_as::<T>((0, 0), (width, height), (width, height), None)?;
    Array2::from_shape_vec((height, width), buffer.data)
        .map_err(|e| VegError::InvalidShape(format!("Failed to reshape band data: {}", e)))
}

/// GeoTIFF (or any GDAL-readable) raster opened from disk
pub struct GdalRaster {
    dataset: Dataset,
    metadata: RasterMetadata,
}

impl GdalRaster {
    pub fn open<P: AsRef<Path>>(path: P) -> VegResult<Self> {
        log::info!("Opening raster: {}", path.as_ref().display());

        let dataset = Dataset::open(path.as_ref())?;
        let (width, height) = dataset.raster_size();
        let band_count = dataset.raster_count().max(0) as usize;
        if band_count == 0 {
            return Err(VegError::Raster(format!(
                "{} contains no raster bands",
                path.as_ref().display()
            )));
        }

        let transform = GeoTransform::from_gdal(dataset.geo_transform()?);
        let first = dataset.rasterband(1)?;
        let sample_type = sample_type_of(&first)?;
        let nodata = first.no_data_value();

        let metadata = RasterMetadata {
            width,
            height,
            band_count,
            sample_type,
            transform,
            crs: dataset.projection(),
            nodata,
        };
        log::debug!("Raster metadata: {:?}", metadata);

        Ok(Self { dataset, metadata })
    }
}

impl RasterReader for GdalRaster {
    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    fn read_band(&self, index: usize) -> VegResult<BandData> {
        check_band_index(index, self.metadata.band_count)?;
        let band = self.dataset.rasterband(index as isize)?;
        let (width, height) = (self.metadata.width, self.metadata.height);

        let data = match sample_type_of(&band)? {
            SampleType::UInt8 => BandData::UInt8(read_typed(&band, width, height)?),
            SampleType::UInt16 => BandData::UInt16(read_typed(&band, width, height)?),
            SampleType::UInt32 => BandData::UInt32(read_typed(&band, width, height)?),
            SampleType::Int16 => BandData::Int16(read_typed(&band, width, height)?),
            SampleType::Int32 => BandData::Int32(read_typed(&band, width, height)?),
            SampleType::Float32 => BandData::Float32(read_typed(&band, width, height)?),
            SampleType::Float64 => BandData::Float64(read_typed(&band, width, height)?),
        };
        log::debug!("Read band {} ({}) from raster", index, data.sample_type());
        Ok(data)
    }
}

/// Writes single-band GeoTIFF files
pub struct GdalRasterWriter {
    path: PathBuf,
}

impl GdalRasterWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn write_typed<T: GdalType + Copy>(
        &self,
        data: &Array2<T>,
        metadata: &RasterMetadata,
        nodata: Option<f64>,
    ) -> VegResult<()> {
        let (height, width) = data.dim();
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut dataset = driver.create_with_band_type::<T, _>(
            &self.path,
            width as isize,
            height as isize,
            1,
        )?;

        dataset.set_geo_transform(&metadata.transform.to_gdal())?;
        if !metadata.crs.is_empty() {
            let srs = SpatialRef::from_definition(&metadata.crs)?;
            dataset.set_projection(&srs.to_wkt()?)?;
        }

        let mut rasterband = dataset.rasterband(1)?;
        let flat_data: Vec<T> = data.iter().copied().collect();
        let buffer = Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;
        rasterband.set_no_data_value(nodata)?;
        Ok(())
    }
}

impl RasterWriter for GdalRasterWriter {
    /// Float32/Float64 bands always carry NaN as their no-data value
    fn write_band(&mut self, band: &BandData, metadata: &RasterMetadata) -> VegResult<()> {
        metadata.ensure_matches(band)?;
        log::info!("Writing {} band to {}", band.sample_type(), self.path.display());

        match band {
            BandData::UInt8(a) => self.write_typed(a, metadata, metadata.nodata),
            BandData::UInt16(a) => self.write_typed(a, metadata, metadata.nodata),
            BandData::UInt32(a) => self.write_typed(a, metadata, metadata.nodata),
            BandData::Int16(a) => self.write_typed(a, metadata, metadata.nodata),
            BandData::Int32(a) => self.write_typed(a, metadata, metadata.nodata),
            BandData::Float32(a) => self.write_typed(a, metadata, Some(f64::NAN)),
            BandData::Float64(a) => self.write_typed(a, metadata, Some(f64::NAN)),
        }
    }
}
