#![cfg(feature = "gdal")]

use ndarray::{array, Array2};
use tempfile::TempDir;
use verdin::io::{GdalRaster, GdalRasterWriter, RasterMetadata};
use verdin::pipeline::export_reflectance;
use verdin::types::{BandData, GeoTransform, SampleType};
use verdin::{RasterReader, RasterWriter};

fn metadata(height: usize, width: usize, sample_type: SampleType) -> RasterMetadata {
    RasterMetadata {
        width,
        height,
        band_count: 1,
        sample_type,
        transform: GeoTransform::from_gdal([440000.0, 10.0, 0.0, 4650000.0, 0.0, -10.0]),
        crs: "EPSG:32633".to_string(),
        nodata: None,
    }
}

#[test]
fn test_reflectance_geotiff_roundtrip_is_bit_exact() {
    let _ = env_logger::builder().is_test(true).try_init();

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nir.tif");

    let reflectance: Array2<f32> = array![[0.1234, f32::NAN, 0.9999], [0.0001, 0.5, 1.0]];
    let source = metadata(2, 3, SampleType::UInt16);

    let mut writer = GdalRasterWriter::new(&path);
    export_reflectance(&reflectance, &source, &mut writer).unwrap();

    let raster = GdalRaster::open(&path).unwrap();
    let meta = raster.metadata();
    assert_eq!(meta.shape(), (2, 3));
    assert_eq!(meta.sample_type, SampleType::Float32);
    assert_eq!(meta.transform, source.transform);
    assert!(meta.nodata.map_or(false, f64::is_nan));

    match raster.read_band(1).unwrap() {
        BandData::Float32(back) => {
            for (a, b) in reflectance.iter().zip(back.iter()) {
                if a.is_nan() {
                    assert!(b.is_nan());
                } else {
                    assert_eq!(a.to_bits(), b.to_bits());
                }
            }
        }
        other => panic!("unexpected band type {:?}", other.sample_type()),
    }
}

#[test]
fn test_categorical_band_keeps_nodata() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("clc.tif");

    let codes: Array2<u8> = array![[23, 24, 48], [41, 23, 25]];
    let mut meta = metadata(2, 3, SampleType::UInt8);
    meta.nodata = Some(48.0);

    let mut writer = GdalRasterWriter::new(&path);
    writer.write_band(&BandData::UInt8(codes.clone()), &meta).unwrap();

    let raster = GdalRaster::open(&path).unwrap();
    assert_eq!(raster.metadata().nodata, Some(48.0));
    assert!(raster.read_band(2).is_err());
    match raster.read_band(1).unwrap() {
        BandData::UInt8(back) => assert_eq!(back, codes),
        other => panic!("unexpected band type {:?}", other.sample_type()),
    }
}
