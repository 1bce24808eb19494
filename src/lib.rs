//! Verdin: Sentinel-2 band math and land-cover filtering for forest health
//!
//! This library turns raw Sentinel-2 digital numbers and a Corine land-cover
//! raster into reflectance, display composites, NDVI, forest masks and
//! land-cover percentages. Raster I/O, lookup-table retrieval and the other
//! side-effecting steps sit behind the traits in [`io`], so every stage in
//! [`core`] stays a pure function over in-memory grids.

pub mod types;
pub mod io;
pub mod core;
pub mod pipeline;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    BandData, GeoTransform, SampleType, VegError, VegResult,
    ReflectanceImage, NdviImage, MaskImage, CompositeImage, CategoryCode
};

pub use crate::core::{
    normalize, stretch, ndvi, build_category_map, forest_mask, to_percentages,
    StretchParams, CategoryMap, CategorySet, ZonalRecord, NdviSummary
};

pub use io::{RasterMetadata, RasterReader, RasterWriter, MemoryRaster, DataSource};

pub use pipeline::{ForestHealthPipeline, ForestHealthReport, ForestHealthOutputs, PipelineConfig};
