//! Band-math and land-cover classification stages

pub mod normalize;
pub mod stretch;
pub mod ndvi;
pub mod category;
pub mod zonal;

// Re-export main types
pub use normalize::{
    ReflectanceNormalizer, normalize, normalize_dyn, clamp_reflectance, DEFAULT_SCALE_FACTOR
};
pub use stretch::{StretchParams, stretch, false_color_composite, percentile_bounds};
pub use ndvi::{NdviSummary, ndvi, apply_mask, summarize};
pub use category::{
    CategoryMap, CategorySet, CategorySample, FOREST_LABELS,
    build_category_map, forest_mask, forest_mask_band, valid_mask, intersect_masks
};
pub use zonal::{
    ZonalRecord, to_percentages, percentages_for_zones, label_record,
    category_counts, category_counts_band, share_percent
};
