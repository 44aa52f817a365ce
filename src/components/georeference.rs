use gdal::Dataset;
use log::{info, warn};

use crate::{
    components::{
        gcps::{GcpSet, GroundControlPoint},
        transform::GcpTransform,
    },
    errors::{Result, TilerioError},
};

const DEFAULT_CRS: &str = "epsg:4326";

/// Where the georeference of an opened dataset came from.
///
/// Selected exactly once at open time; every downstream operation consults
/// the resolved mode instead of re-inspecting the raw source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum GeoreferenceMode {
    EmbeddedGcps,
    ExternalGcps,
    NoGeoreference,
}

/// Scoped resolver configuration.
///
/// Replaces rasterio-style process-wide warning suppression: concurrent
/// callers with different needs each pass their own flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Suppress the log warning emitted for non-georeferenced datasets.
    pub quiet: bool,
}

/// Resolved georeference of one opened dataset: mode, target CRS and the
/// GCP-derived transform. Recomputed only by reopening.
#[derive(Debug, Clone)]
pub struct Georeference {
    mode: GeoreferenceMode,
    crs: Option<String>,
    transform: Option<GcpTransform>,
}

impl Georeference {
    pub fn mode(&self) -> GeoreferenceMode {
        self.mode
    }

    /// Lower-cased `authority:code` of the anchored CRS, `None` when the
    /// dataset resolved to [`GeoreferenceMode::NoGeoreference`].
    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn transform(&self) -> Result<&GcpTransform> {
        self.transform
            .as_ref()
            .ok_or(TilerioError::NotGeoreferenced)
    }

    pub fn is_georeferenced(&self) -> bool {
        self.transform.is_some()
    }
}

/// Decides how to georeference `dataset`, once, at open time.
///
/// An externally supplied non-empty set wins over embedded GCPs; a dataset
/// with neither resolves to [`GeoreferenceMode::NoGeoreference`], where pixel
/// space and "geographic" space coincide and CRS-aware operations fail with
/// [`TilerioError::NotGeoreferenced`]. GCP validation (size, raster bounds,
/// collinearity) happens here, never lazily at first use. The dataset itself
/// is only read, never mutated.
pub fn resolve(
    dataset: &Dataset,
    external_gcps: Option<&GcpSet>,
    options: &ResolveOptions,
) -> Result<Georeference> {
    let (width, height) = dataset.raster_size();

    let (mode, gcps) = match external_gcps {
        Some(set) if !set.is_empty() => (GeoreferenceMode::ExternalGcps, set.clone()),
        _ => match embedded_gcps(dataset) {
            Some(set) => (GeoreferenceMode::EmbeddedGcps, set),
            None => {
                if !options.quiet {
                    warn!("dataset carries no gcps; resolved as not georeferenced");
                }
                return Ok(Georeference {
                    mode: GeoreferenceMode::NoGeoreference,
                    crs: None,
                    transform: None,
                });
            }
        },
    };

    gcps.validate_for(width, height)?;
    let transform = GcpTransform::fit(gcps.points())?;
    let crs = gcps.crs().unwrap_or(DEFAULT_CRS).to_string();
    info!(
        "resolved {mode:?} georeference into {crs} from {} gcp(s)",
        gcps.len()
    );

    Ok(Georeference {
        mode,
        crs: Some(crs),
        transform: Some(transform),
    })
}

/// Reads the GCP list embedded in the dataset, if any, tagged with the GCP
/// spatial reference when one is set.
///
/// The gdal crate exposes the GCP projection but not the point list, so the
/// list comes straight from the C API.
pub fn embedded_gcps(dataset: &Dataset) -> Option<GcpSet> {
    let points = unsafe {
        let count = gdal_sys::GDALGetGCPCount(dataset.c_dataset());
        if count <= 0 {
            return None;
        }
        let head = gdal_sys::GDALGetGCPs(dataset.c_dataset());
        if head.is_null() {
            return None;
        }
        std::slice::from_raw_parts(head, count as usize)
            .iter()
            .map(|gcp| GroundControlPoint {
                row: gcp.dfGCPLine,
                col: gcp.dfGCPPixel,
                x: gcp.dfGCPX,
                y: gcp.dfGCPY,
                z: gcp.dfGCPZ,
            })
            .collect::<Vec<_>>()
    };

    let mut set = GcpSet::new(points);
    if let Some(authority) = dataset
        .gcp_spatial_ref()
        .and_then(|srs| srs.authority().ok())
    {
        set = set.with_crs(&authority);
    }
    Some(set)
}
