//! End-to-end forest health pipeline over the raster and data-source collaborators

use crate::core::category::{
    build_category_map, forest_mask_band, CategoryMap, CategorySet, FOREST_LABELS,
};
use crate::core::ndvi::{apply_mask, ndvi, summarize, NdviSummary};
use crate::core::normalize::{clamp_reflectance, ReflectanceNormalizer, DEFAULT_SCALE_FACTOR};
use crate::core::stretch::{false_color_composite, StretchParams};
use crate::core::zonal::{category_counts_band, label_record, share_percent, to_percentages};
use crate::io::lookup::{LookupColumns, LookupTable};
use crate::io::raster::{RasterMetadata, RasterReader, RasterWriter};
use crate::io::source::DataSource;
use crate::types::{
    BandData, CompositeImage, MaskImage, NdviImage, ReflectanceImage, SampleType, VegError,
    VegResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 1-based band positions inside the multispectral raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandLayout {
    pub green: usize,
    pub red: usize,
    pub nir: usize,
}

impl Default for BandLayout {
    fn default() -> Self {
        // Sentinel-2 B2, B3, B4, B8 stacked in that order
        Self {
            green: 2,
            red: 3,
            nir: 4,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Digital-number to reflectance divisor
    pub scale_factor: f32,
    pub bands: BandLayout,
    pub stretch: StretchParams,
    /// Land-cover labels counted as forest
    pub forest_labels: Vec<String>,
    pub lookup: LookupColumns,
    /// Name of the lookup table within the data source
    pub lookup_table: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            bands: BandLayout::default(),
            stretch: StretchParams::default(),
            forest_labels: FOREST_LABELS.iter().map(|s| s.to_string()).collect(),
            lookup: LookupColumns::default(),
            lookup_table: "clc_legend.csv".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> VegResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> VegResult<Self> {
        log::info!("Loading pipeline configuration from {}", path.as_ref().display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> VegResult<()> {
        ReflectanceNormalizer::new(self.scale_factor)?;
        self.stretch.validate()?;

        let BandLayout { green, red, nir } = self.bands;
        if green == 0 || red == 0 || nir == 0 {
            return Err(VegError::InvalidParameter(
                "band positions are 1-based".to_string(),
            ));
        }
        if green == red || green == nir || red == nir {
            return Err(VegError::InvalidParameter(format!(
                "band positions must be distinct, got green={} red={} nir={}",
                green, red, nir
            )));
        }
        if self.forest_labels.is_empty() {
            return Err(VegError::InvalidParameter(
                "at least one forest label is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scalar results of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestHealthReport {
    pub generated_at: DateTime<Utc>,
    /// Mean NDVI over forest pixels; None when no forest pixel has a valid NDVI
    pub mean_forest_ndvi: Option<f64>,
    pub forest_summary: NdviSummary,
    /// Forest share of all valid land-cover pixels
    pub forest_percentage: Option<f64>,
    /// Land-cover label -> percentage of valid pixels
    pub landcover_percentages: BTreeMap<String, f64>,
}

impl ForestHealthReport {
    pub fn to_json_pretty(&self) -> VegResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> VegResult<()> {
        std::fs::write(path.as_ref(), self.to_json_pretty()?)?;
        log::info!("Report written to {}", path.as_ref().display());
        Ok(())
    }
}

/// Arrays and report produced by a pipeline run
#[derive(Debug, Clone)]
pub struct ForestHealthOutputs {
    pub green: ReflectanceImage,
    pub red: ReflectanceImage,
    pub nir: ReflectanceImage,
    pub composite: CompositeImage,
    pub ndvi: NdviImage,
    pub forest_mask: MaskImage,
    /// NDVI restricted to forest pixels, NaN elsewhere
    pub forest_ndvi: NdviImage,
    pub category_map: CategoryMap,
    pub forest_codes: CategorySet,
    pub report: ForestHealthReport,
}

/// Sentinel-2 + Corine forest health pipeline
pub struct ForestHealthPipeline {
    config: PipelineConfig,
    normalizer: ReflectanceNormalizer,
}

impl ForestHealthPipeline {
    pub fn new(config: PipelineConfig) -> VegResult<Self> {
        config.validate()?;
        let normalizer = ReflectanceNormalizer::new(config.scale_factor)?;
        Ok(Self { config, normalizer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn read_reflectance(
        &self,
        imagery: &dyn RasterReader,
        index: usize,
    ) -> VegResult<ReflectanceImage> {
        let band = imagery.read_band(index)?;
        self.normalizer.normalize_band(&band)
    }

    /// Run every stage over an imagery raster and an aligned land-cover raster
    pub fn run(
        &self,
        imagery: &dyn RasterReader,
        landcover: &dyn RasterReader,
        source: &dyn DataSource,
    ) -> VegResult<ForestHealthOutputs> {
        log::info!("Starting forest health pipeline");
        imagery.metadata().ensure_aligned(landcover.metadata())?;

        let bands = self.config.bands;
        let green = self.read_reflectance(imagery, bands.green)?;
        let red = self.read_reflectance(imagery, bands.red)?;
        let nir = self.read_reflectance(imagery, bands.nir)?;
        log::debug!("Reflectance bands normalized");

        let composite = false_color_composite(&nir, &red, &green, &self.config.stretch)?;
        let ndvi_image = ndvi(&nir, &red)?;

        let table = LookupTable::fetch(source, &self.config.lookup_table, &self.config.lookup)?;
        let category_map = build_category_map(&table)?;
        let forest_codes = category_map.codes_for_labels(&self.config.forest_labels)?;
        log::debug!("Forest codes: {:?}", forest_codes);

        let nodata = landcover.metadata().nodata;
        let landcover_band = landcover.read_band(1)?;
        let forest_mask = forest_mask_band(&landcover_band, &forest_codes, nodata)?;

        let forest_ndvi = apply_mask(&ndvi_image, &forest_mask)?;
        let forest_summary = summarize(&ndvi_image, Some(&forest_mask))?;

        let counts = category_counts_band(&landcover_band, None, nodata)?;
        let total: u64 = counts.values().sum();
        let forest_count: u64 = counts
            .iter()
            .filter(|(code, _)| forest_codes.contains(**code))
            .map(|(_, count)| *count)
            .sum();
        let landcover_percentages = to_percentages(&label_record(&counts, &category_map));

        let report = ForestHealthReport {
            generated_at: Utc::now(),
            mean_forest_ndvi: forest_summary.mean,
            forest_summary,
            forest_percentage: share_percent(forest_count, total),
            landcover_percentages,
        };

        match report.mean_forest_ndvi {
            Some(mean) => log::info!("Mean forest NDVI: {:.4}", mean),
            None => log::warn!("No forest pixel with a valid NDVI"),
        }
        log::info!("Forest health pipeline completed");

        Ok(ForestHealthOutputs {
            green,
            red,
            nir,
            composite,
            ndvi: ndvi_image,
            forest_mask,
            forest_ndvi,
            category_map,
            forest_codes,
            report,
        })
    }
}

/// Write a reflectance band as Float32, clamping values above 1
pub fn export_reflectance(
    band: &ReflectanceImage,
    source: &RasterMetadata,
    writer: &mut dyn RasterWriter,
) -> VegResult<RasterMetadata> {
    let metadata = source.for_single_band(SampleType::Float32, Some(f64::NAN));
    writer.write_band(&BandData::Float32(clamp_reflectance(band)), &metadata)?;
    Ok(metadata)
}

/// Write an NDVI image as Float32 with NaN no-data
pub fn export_ndvi(
    ndvi_image: &NdviImage,
    source: &RasterMetadata,
    writer: &mut dyn RasterWriter,
) -> VegResult<RasterMetadata> {
    let metadata = source.for_single_band(SampleType::Float32, Some(f64::NAN));
    writer.write_band(&BandData::Float32(ndvi_image.clone()), &metadata)?;
    Ok(metadata)
}
