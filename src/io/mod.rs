//! Collaborator contracts and adapters: rasters, data sources, lookup tables

pub mod raster;
pub mod source;
pub mod lookup;
#[cfg(feature = "gdal")]
pub mod gdal_raster;

pub use raster::{RasterMetadata, RasterReader, RasterWriter, MemoryRaster};
pub use source::{DataSource, FileSource, StaticSource, HttpSource};
pub use lookup::{LookupColumns, LookupRow, LookupTable};
#[cfg(feature = "gdal")]
pub use gdal_raster::{GdalRaster, GdalRasterWriter};
