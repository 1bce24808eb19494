use crate::io::lookup::LookupTable;
use crate::types::{ensure_same_shape, BandData, CategoryCode, MaskImage, VegError, VegResult};
use ndarray::{Array2, Zip};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// Corine level-3 classes treated as forest
pub const FOREST_LABELS: [&str; 5] = [
    "Agro-forestry areas",
    "Broad-leaved forest",
    "Coniferous forest",
    "Mixed forest",
    "Transitional woodland-shrub",
];

/// Read-only mapping from land-cover code to class label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryMap {
    entries: BTreeMap<CategoryCode, String>,
}

impl CategoryMap {
    pub fn label(&self, code: CategoryCode) -> Option<&str> {
        self.entries.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryCode, &str)> + '_ {
        self.entries.iter().map(|(code, label)| (*code, label.as_str()))
    }

    /// Codes whose label matches one of `labels` (ASCII case-insensitive)
    pub fn codes_for_labels<S: AsRef<str>>(&self, labels: &[S]) -> VegResult<CategorySet> {
        let mut codes = BTreeSet::new();
        for wanted in labels {
            let wanted = wanted.as_ref().trim();
            let mut matched = false;
            for (code, label) in &self.entries {
                if label.eq_ignore_ascii_case(wanted) {
                    codes.insert(*code);
                    matched = true;
                }
            }
            if !matched {
                return Err(VegError::UnknownCategory(wanted.to_string()));
            }
        }
        Ok(CategorySet { codes })
    }

    /// The five Corine forest classes
    pub fn forest_codes(&self) -> VegResult<CategorySet> {
        self.codes_for_labels(&FOREST_LABELS[..])
    }
}

/// Immutable set of category codes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySet {
    codes: BTreeSet<CategoryCode>,
}

impl CategorySet {
    pub fn contains(&self, code: CategoryCode) -> bool {
        self.codes.contains(&code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CategoryCode> + '_ {
        self.codes.iter().copied()
    }
}

impl FromIterator<CategoryCode> for CategorySet {
    fn from_iter<I: IntoIterator<Item = CategoryCode>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}

/// Build the code -> label map from raw lookup rows.
///
/// Rows whose code is not a non-negative integer, or whose label is empty, are
/// skipped with a warning. A code that appears twice with different labels is
/// an error; an exact repeat is tolerated.
pub fn build_category_map(table: &LookupTable) -> VegResult<CategoryMap> {
    let mut entries = BTreeMap::new();
    let mut skipped = 0usize;

    for row in table.rows() {
        let code = match row.code.trim().parse::<CategoryCode>() {
            Ok(code) => code,
            Err(_) => {
                log::warn!(
                    "Skipping lookup row {}: unparsable code '{}'",
                    row.line,
                    row.code
                );
                skipped += 1;
                continue;
            }
        };
        let label = row.label.trim();
        if label.is_empty() {
            log::warn!("Skipping lookup row {}: empty label for code {}", row.line, code);
            skipped += 1;
            continue;
        }

        match entries.entry(code) {
            Entry::Vacant(slot) => {
                slot.insert(label.to_string());
            }
            Entry::Occupied(existing) => {
                if existing.get() != label {
                    return Err(VegError::DuplicateCategory {
                        code,
                        first: existing.get().clone(),
                        second: label.to_string(),
                    });
                }
                log::warn!("Lookup row {} repeats code {} with the same label", row.line, code);
            }
        }
    }

    log::info!(
        "Category map built: {} categories, {} rows skipped",
        entries.len(),
        skipped
    );
    Ok(CategoryMap { entries })
}

/// Integer sample types that can hold category codes
pub trait CategorySample: Copy + ToPrimitive + Send + Sync {}

impl CategorySample for u8 {}
impl CategorySample for u16 {}
impl CategorySample for u32 {}
impl CategorySample for i16 {}
impl CategorySample for i32 {}

#[inline]
pub(crate) fn is_nodata<T: CategorySample>(value: T, nodata: Option<f64>) -> bool {
    match nodata {
        Some(nd) => value.to_f64() == Some(nd),
        None => false,
    }
}

/// 1 where the pixel's code is in `codes`, 0 otherwise (including no-data)
pub fn forest_mask<T: CategorySample>(
    categorical: &Array2<T>,
    codes: &CategorySet,
    nodata: Option<f64>,
) -> MaskImage {
    categorical.mapv(|value| {
        if is_nodata(value, nodata) {
            return 0;
        }
        match value.to_u32() {
            Some(code) if codes.contains(code) => 1,
            _ => 0,
        }
    })
}

/// 1 for every pixel holding a valid (non-negative, non-no-data) code
pub fn valid_mask<T: CategorySample>(categorical: &Array2<T>, nodata: Option<f64>) -> MaskImage {
    categorical.mapv(|value| {
        if is_nodata(value, nodata) || value.to_u32().is_none() {
            0
        } else {
            1
        }
    })
}

/// `forest_mask` over a dtype-tagged band; floating-point rasters are not categorical
pub fn forest_mask_band(
    band: &BandData,
    codes: &CategorySet,
    nodata: Option<f64>,
) -> VegResult<MaskImage> {
    match band {
        BandData::UInt8(a) => Ok(forest_mask(a, codes, nodata)),
        BandData::UInt16(a) => Ok(forest_mask(a, codes, nodata)),
        BandData::UInt32(a) => Ok(forest_mask(a, codes, nodata)),
        BandData::Int16(a) => Ok(forest_mask(a, codes, nodata)),
        BandData::Int32(a) => Ok(forest_mask(a, codes, nodata)),
        other => Err(VegError::UnsupportedDtype(format!(
            "categorical raster must hold integer codes, got {}",
            other.sample_type()
        ))),
    }
}

/// Pointwise AND of two masks
pub fn intersect_masks(a: &MaskImage, b: &MaskImage) -> VegResult<MaskImage> {
    ensure_same_shape("mask intersection", a.dim(), b.dim())?;
    Ok(Zip::from(a)
        .and(b)
        .map_collect(|&x, &y| u8::from(x == 1 && y == 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::lookup::{LookupColumns, LookupTable};
    use ndarray::array;

    fn table(csv: &str) -> LookupTable {
        LookupTable::from_csv(csv.as_bytes(), &LookupColumns::default()).unwrap()
    }

    #[test]
    fn test_forest_mask_example() {
        let categorical = array![[1u8, 2, 3], [4, 5, 1]];
        let codes: CategorySet = [2, 4].into_iter().collect();
        let mask = forest_mask(&categorical, &codes, None);
        assert_eq!(mask, array![[0u8, 1, 0], [1, 0, 0]]);
    }

    #[test]
    fn test_nodata_never_selected() {
        let categorical = array![[-128i16, 23, 24], [48, 23, -1]];
        let codes: CategorySet = [23, 24, 48].into_iter().collect();

        let mask = forest_mask(&categorical, &codes, Some(48.0));
        assert_eq!(mask, array![[0u8, 1, 1], [0, 1, 0]]);

        let valid = valid_mask(&categorical, Some(48.0));
        assert!(mask.iter().zip(valid.iter()).all(|(m, v)| m <= v));
    }

    #[test]
    fn test_forest_mask_band_rejects_float() {
        let codes: CategorySet = [1].into_iter().collect();
        let band = BandData::Float32(array![[1.0f32]]);
        assert!(matches!(
            forest_mask_band(&band, &codes, None),
            Err(VegError::UnsupportedDtype(_))
        ));
        let band = BandData::UInt16(array![[1u16, 2]]);
        assert_eq!(forest_mask_band(&band, &codes, None).unwrap(), array![[1u8, 0]]);
    }

    #[test]
    fn test_forest_mask_band_same_for_every_integer_dtype() {
        let codes: CategorySet = [23, 24].into_iter().collect();
        let corine = array![[23u8, 41, 48], [24, 23, 1]];
        let expected = array![[1u8, 0, 0], [1, 1, 0]];

        let bands = [
            BandData::UInt8(corine.clone()),
            BandData::UInt16(corine.mapv(u16::from)),
            BandData::UInt32(corine.mapv(u32::from)),
            BandData::Int16(corine.mapv(i16::from)),
            BandData::Int32(corine.mapv(i32::from)),
        ];
        for band in &bands {
            assert_eq!(forest_mask_band(band, &codes, Some(48.0)).unwrap(), expected);
        }
    }

    #[test]
    fn test_duplicate_code_with_conflicting_label() {
        let t = table("GRID_CODE,LABEL3\n7,Mineral extraction sites\n7,Dump sites\n");
        match build_category_map(&t) {
            Err(VegError::DuplicateCategory { code, first, second }) => {
                assert_eq!(code, 7);
                assert_eq!(first, "Mineral extraction sites");
                assert_eq!(second, "Dump sites");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_rows_skipped_and_exact_repeat_tolerated() {
        let t = table(
            "GRID_CODE,LABEL3\n23,Broad-leaved forest\nabc,Garbage\n-4,Negative\n24,\n23,Broad-leaved forest\n25,Mixed forest\n",
        );
        let map = build_category_map(&t).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.label(23), Some("Broad-leaved forest"));
        assert_eq!(map.label(25), Some("Mixed forest"));
        assert_eq!(map.label(24), None);
    }

    #[test]
    fn test_codes_for_labels() {
        let t = table(
            "GRID_CODE,LABEL3\n22,Agro-forestry areas\n23,Broad-leaved forest\n24,Coniferous forest\n25,Mixed forest\n29,Transitional woodland-shrub\n41,Water bodies\n",
        );
        let map = build_category_map(&t).unwrap();

        let forest = map.forest_codes().unwrap();
        assert_eq!(forest.iter().collect::<Vec<_>>(), vec![22, 23, 24, 25, 29]);

        let water = map.codes_for_labels(&["water BODIES"][..]).unwrap();
        assert!(water.contains(41));

        assert!(matches!(
            map.codes_for_labels(&["Glaciers and perpetual snow"][..]),
            Err(VegError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_repeated_label_still_matches() {
        let map = build_category_map(&table("GRID_CODE,LABEL3\n25,Mixed forest\n")).unwrap();

        let codes = map
            .codes_for_labels(&["Mixed forest", "mixed forest", "Mixed forest"][..])
            .unwrap();
        assert_eq!(codes.iter().collect::<Vec<_>>(), vec![25]);
    }

    #[test]
    fn test_intersect_masks() {
        let a = array![[1u8, 1, 0]];
        let b = array![[1u8, 0, 0]];
        assert_eq!(intersect_masks(&a, &b).unwrap(), array![[1u8, 0, 0]]);
    }
}
