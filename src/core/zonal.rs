use crate::core::category::{is_nodata, CategoryMap, CategorySample};
use crate::types::{ensure_same_shape, BandData, CategoryCode, VegError, VegResult};
use ndarray::Array2;
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Pixel counts per category within one zone
pub type ZonalRecord<K> = BTreeMap<K, u64>;

/// Decimal places kept in percentage output
pub const PERCENT_DECIMALS: i32 = 1;

fn round_percent(value: f64) -> f64 {
    let factor = 10f64.powi(PERCENT_DECIMALS);
    (value * factor).round() / factor
}

/// `part` as a percentage of `total`, rounded like `to_percentages`
pub fn share_percent(part: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(round_percent(100.0 * part as f64 / total as f64))
    }
}

/// Share of each entry in the record's total, in percent rounded to one decimal.
/// An empty or all-zero record yields an empty map.
pub fn to_percentages<K: Ord + Clone>(record: &ZonalRecord<K>) -> BTreeMap<K, f64> {
    let total: u64 = record.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }
    record
        .iter()
        .map(|(key, &count)| (key.clone(), round_percent(100.0 * count as f64 / total as f64)))
        .collect()
}

/// Percentages for many independent zones
pub fn percentages_for_zones<K>(records: &[ZonalRecord<K>]) -> Vec<BTreeMap<K, f64>>
where
    K: Ord + Clone + Send + Sync,
{
    log::debug!("Computing percentages for {} zones", records.len());

    #[cfg(feature = "parallel")]
    let result = records.par_iter().map(to_percentages).collect();

    #[cfg(not(feature = "parallel"))]
    let result = records.iter().map(to_percentages).collect();

    result
}

/// Replace category codes with labels; unmapped codes keep their numeric text
pub fn label_record(record: &ZonalRecord<CategoryCode>, map: &CategoryMap) -> ZonalRecord<String> {
    let mut labelled = ZonalRecord::new();
    for (&code, &count) in record {
        let label = match map.label(code) {
            Some(label) => label.to_string(),
            None => {
                log::debug!("Code {} has no label in the category map", code);
                code.to_string()
            }
        };
        *labelled.entry(label).or_insert(0) += count;
    }
    labelled
}

/// Count category codes inside a zone mask (1 = inside). No-data and
/// negative codes are not counted.
pub fn category_counts<T: CategorySample>(
    categorical: &Array2<T>,
    zone: Option<&Array2<u8>>,
    nodata: Option<f64>,
) -> VegResult<ZonalRecord<CategoryCode>> {
    if let Some(zone) = zone {
        ensure_same_shape("zone mask", categorical.dim(), zone.dim())?;
    }

    let mut record = ZonalRecord::new();
    for ((i, j), &value) in categorical.indexed_iter() {
        if let Some(zone) = zone {
            if zone[[i, j]] != 1 {
                continue;
            }
        }
        if is_nodata(value, nodata) {
            continue;
        }
        if let Some(code) = value.to_u32() {
            *record.entry(code).or_insert(0) += 1;
        }
    }
    Ok(record)
}

/// `category_counts` over a dtype-tagged band
pub fn category_counts_band(
    band: &BandData,
    zone: Option<&Array2<u8>>,
    nodata: Option<f64>,
) -> VegResult<ZonalRecord<CategoryCode>> {
    match band {
        BandData::UInt8(a) => category_counts(a, zone, nodata),
        BandData::UInt16(a) => category_counts(a, zone, nodata),
        BandData::UInt32(a) => category_counts(a, zone, nodata),
        BandData::Int16(a) => category_counts(a, zone, nodata),
        BandData::Int32(a) => category_counts(a, zone, nodata),
        other => Err(VegError::UnsupportedDtype(format!(
            "zonal counts need integer category codes, got {}",
            other.sample_type()
        ))),
    }
}
