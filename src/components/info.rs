use gdal::{raster::ColorInterpretation, Dataset, Metadata};

use crate::{components::georeference::Georeference, errors::Result};

/// How invalid pixels are identified, in order of precedence: an alpha band
/// wins over a scalar nodata value, which wins over an internal mask band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum NodataType {
    None,
    Alpha,
    Nodata,
    MaskBand,
}

impl std::fmt::Display for NodataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NodataType::None => "None",
            NodataType::Alpha => "Alpha",
            NodataType::Nodata => "Nodata",
            NodataType::MaskBand => "MaskBand",
        };
        f.write_str(label)
    }
}

/// Masking rule derived from the nodata classification, consumed by every
/// read path. Band indexes are 1-based, as in GDAL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MaskPolicy {
    /// Mask where the given alpha band is zero.
    Alpha(usize),
    /// Mask where every selected band equals the value.
    Nodata(f64),
    /// Consult the internal mask band.
    MaskBand,
    /// Fully valid data, no mask.
    AllValid,
}

impl MaskPolicy {
    pub(crate) fn nodata_type(&self) -> NodataType {
        match self {
            MaskPolicy::Alpha(_) => NodataType::Alpha,
            MaskPolicy::Nodata(_) => NodataType::Nodata,
            MaskPolicy::MaskBand => NodataType::MaskBand,
            MaskPolicy::AllValid => NodataType::None,
        }
    }
}

/// Classifies how `dataset` marks invalid pixels: alpha band wins, then
/// scalar nodata, then an internal mask band, else everything is valid.
pub(crate) fn classify(dataset: &Dataset) -> Result<MaskPolicy> {
    for index in 1..=dataset.raster_count() {
        if dataset.rasterband(index)?.color_interpretation() == ColorInterpretation::AlphaBand {
            return Ok(MaskPolicy::Alpha(index));
        }
    }
    let first = dataset.rasterband(1)?;
    if let Some(value) = first.no_data_value() {
        return Ok(MaskPolicy::Nodata(value));
    }
    if first.mask_flags()?.is_per_dataset() {
        return Ok(MaskPolicy::MaskBand);
    }
    Ok(MaskPolicy::AllValid)
}

/// Info record derived from an opened dataset and its resolved georeference.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RasterInfo {
    pub count: usize,
    pub width: usize,
    pub height: usize,
    pub crs: Option<String>,
    pub bounds: Option<(f64, f64, f64, f64)>,
    pub band_descriptions: Vec<(String, String)>,
    pub colorinterp: Vec<String>,
    pub nodata_type: NodataType,
}

fn color_interpretation_label(interpretation: ColorInterpretation) -> &'static str {
    match interpretation {
        ColorInterpretation::GrayIndex => "gray",
        ColorInterpretation::PaletteIndex => "palette",
        ColorInterpretation::RedBand => "red",
        ColorInterpretation::GreenBand => "green",
        ColorInterpretation::BlueBand => "blue",
        ColorInterpretation::AlphaBand => "alpha",
        ColorInterpretation::HueBand => "hue",
        ColorInterpretation::SaturationBand => "saturation",
        ColorInterpretation::LightnessBand => "lightness",
        ColorInterpretation::CyanBand => "cyan",
        ColorInterpretation::MagentaBand => "magenta",
        ColorInterpretation::YellowBand => "yellow",
        ColorInterpretation::BlackBand => "black",
        _ => "undefined",
    }
}

/// Derives the [`RasterInfo`] snapshot. Pure read of the handle's current
/// state; nothing is cached, so it stays consistent across reopens.
pub fn assemble(dataset: &Dataset, georeference: &Georeference) -> Result<RasterInfo> {
    let (width, height) = dataset.raster_size();
    let count = dataset.raster_count();

    let mut band_descriptions = Vec::with_capacity(count);
    let mut colorinterp = Vec::with_capacity(count);
    for index in 1..=count {
        let band = dataset.rasterband(index)?;
        // Names are positional; the stored GDAL description, if any, fills
        // the description slot.
        let stored = band.description()?;
        let description = if stored.is_empty() {
            band.metadata_item("DESCRIPTION", "").unwrap_or_default()
        } else {
            stored
        };
        band_descriptions.push((format!("b{index}"), description));
        colorinterp.push(color_interpretation_label(band.color_interpretation()).to_string());
    }

    let bounds = georeference
        .transform()
        .ok()
        .map(|transform| transform.bounds(width, height));

    Ok(RasterInfo {
        count,
        width,
        height,
        crs: georeference.crs().map(str::to_string),
        bounds,
        band_descriptions,
        colorinterp,
        nodata_type: classify(dataset)?.nodata_type(),
    })
}
