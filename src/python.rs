//! Python bindings for the band-math stages

use crate::io::lookup::{LookupColumns, LookupTable};
use crate::types::{BandData, VegError};
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::{PyIOError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use std::collections::{BTreeMap, HashMap};

impl From<VegError> for PyErr {
    fn from(err: VegError) -> PyErr {
        match err {
            VegError::Io(_) | VegError::Http(_) | VegError::Raster(_) => {
                PyIOError::new_err(err.to_string())
            }
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

/// Scale uint16 digital numbers to reflectance; zero becomes NaN
#[pyfunction]
#[pyo3(signature = (raw, scale_factor = 10000.0))]
fn normalize<'py>(
    py: Python<'py>,
    raw: PyReadonlyArray2<'py, u16>,
    scale_factor: f32,
) -> PyResult<&'py PyArray2<f32>> {
    let band = raw.as_array().to_owned();
    let reflectance = crate::core::normalize(&band, scale_factor)?;
    Ok(reflectance.into_pyarray(py))
}

/// Percentile contrast stretch for display
#[pyfunction]
#[pyo3(signature = (band, low_percentile = 2.0, high_percentile = 98.0))]
fn stretch<'py>(
    py: Python<'py>,
    band: PyReadonlyArray2<'py, f32>,
    low_percentile: f64,
    high_percentile: f64,
) -> PyResult<&'py PyArray2<f32>> {
    let params = crate::core::StretchParams {
        low_percentile,
        high_percentile,
    };
    let stretched = crate::core::stretch(&band.as_array().to_owned(), &params)?;
    Ok(stretched.into_pyarray(py))
}

/// (nir - red) / (nir + red); NaN where undefined
#[pyfunction]
fn ndvi<'py>(
    py: Python<'py>,
    nir: PyReadonlyArray2<'py, f32>,
    red: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let result = crate::core::ndvi(&nir.as_array().to_owned(), &red.as_array().to_owned())?;
    Ok(result.into_pyarray(py))
}

/// Wrap an integer numpy array in the matching `BandData` variant
fn categorical_band<'py>(array: &'py PyAny) -> PyResult<BandData> {
    if let Ok(a) = array.extract::<PyReadonlyArray2<'py, u8>>() {
        return Ok(BandData::UInt8(a.as_array().to_owned()));
    }
    if let Ok(a) = array.extract::<PyReadonlyArray2<'py, u16>>() {
        return Ok(BandData::UInt16(a.as_array().to_owned()));
    }
    if let Ok(a) = array.extract::<PyReadonlyArray2<'py, u32>>() {
        return Ok(BandData::UInt32(a.as_array().to_owned()));
    }
    if let Ok(a) = array.extract::<PyReadonlyArray2<'py, i16>>() {
        return Ok(BandData::Int16(a.as_array().to_owned()));
    }
    if let Ok(a) = array.extract::<PyReadonlyArray2<'py, i32>>() {
        return Ok(BandData::Int32(a.as_array().to_owned()));
    }
    Err(PyTypeError::new_err(
        "categorical array must be 2-D uint8, uint16, uint32, int16 or int32",
    ))
}

/// Binary mask of pixels whose code is in `codes`
#[pyfunction]
#[pyo3(signature = (categorical, codes, nodata = None))]
fn forest_mask<'py>(
    py: Python<'py>,
    categorical: &'py PyAny,
    codes: Vec<u32>,
    nodata: Option<f64>,
) -> PyResult<&'py PyArray2<u8>> {
    let band = categorical_band(categorical)?;
    let codes: crate::core::CategorySet = codes.into_iter().collect();
    let mask = crate::core::forest_mask_band(&band, &codes, nodata)?;
    Ok(mask.into_pyarray(py))
}

/// Parse a CSV lookup table into {code: label}
#[pyfunction]
#[pyo3(signature = (csv_text, code_column = "GRID_CODE", label_column = "LABEL3"))]
fn build_category_map(
    csv_text: &str,
    code_column: &str,
    label_column: &str,
) -> PyResult<BTreeMap<u32, String>> {
    let columns = LookupColumns {
        code: code_column.to_string(),
        label: label_column.to_string(),
    };
    let table = LookupTable::from_csv(csv_text.as_bytes(), &columns)?;
    let map = crate::core::build_category_map(&table)?;
    Ok(map.iter().map(|(code, label)| (code, label.to_string())).collect())
}

/// Counts -> percentages rounded to one decimal
#[pyfunction]
fn to_percentages(record: HashMap<String, u64>) -> BTreeMap<String, f64> {
    let record: crate::core::ZonalRecord<String> = record.into_iter().collect();
    crate::core::to_percentages(&record)
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize, m)?)?;
    m.add_function(wrap_pyfunction!(stretch, m)?)?;
    m.add_function(wrap_pyfunction!(ndvi, m)?)?;
    m.add_function(wrap_pyfunction!(forest_mask, m)?)?;
    m.add_function(wrap_pyfunction!(build_category_map, m)?)?;
    m.add_function(wrap_pyfunction!(to_percentages, m)?)?;
    Ok(())
}
