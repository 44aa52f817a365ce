use std::str::FromStr;

use itertools::Itertools;

use crate::errors::{Result, TilerioError};

/// Correspondence between an image pixel and a ground coordinate.
///
/// `row`/`col` are in the pixel space of the raster the point will be
/// attached to; `x`/`y` are in the set's CRS (lon/lat for geographic CRSs).
/// They are not bounds-checked here: a set may be built before the target
/// raster is known and is validated at resolve time.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroundControlPoint {
    pub row: f64,
    pub col: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GroundControlPoint {
    pub fn new(row: f64, col: f64, x: f64, y: f64) -> Self {
        Self {
            row,
            col,
            x,
            y,
            z: 0.,
        }
    }

    pub fn with_elevation(mut self, z: f64) -> Self {
        self.z = z;
        self
    }
}

impl FromStr for GroundControlPoint {
    type Err = TilerioError;

    /// Parses the wire form `"row,col,lon,lat,alt"`.
    ///
    /// Exactly five numeric fields are required; anything else is
    /// [`TilerioError::MalformedGcpInput`].
    fn from_str(s: &str) -> Result<Self> {
        let malformed = || TilerioError::MalformedGcpInput {
            input: s.to_string(),
        };
        let fields = s
            .split(',')
            .map(|field| field.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|_| malformed())?;
        match fields.as_slice() {
            &[row, col, x, y, z] => Ok(GroundControlPoint { row, col, x, y, z }),
            _ => Err(malformed()),
        }
    }
}

/// Ordered, immutable collection of ground control points.
///
/// A set needs at least three non-collinear points to anchor a raster; that
/// is checked by [`GcpSet::validate_for`] against the raster it is used with,
/// not at construction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GcpSet {
    points: Vec<GroundControlPoint>,
    crs: Option<String>,
}

impl GcpSet {
    pub fn new(points: Vec<GroundControlPoint>) -> Self {
        Self { points, crs: None }
    }

    /// Tags the set with an explicit CRS, overriding the `epsg:4326` default.
    pub fn with_crs(mut self, crs: &str) -> Self {
        self.crs = Some(crs.to_lowercase());
        self
    }

    /// Parses repeated `"row,col,lon,lat,alt"` strings into a set.
    pub fn from_strings<I, S>(inputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let points: Vec<GroundControlPoint> = inputs
            .into_iter()
            .map(|input| input.as_ref().parse())
            .try_collect()?;
        Ok(Self::new(points))
    }

    pub fn points(&self) -> &[GroundControlPoint] {
        &self.points
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Checks the set is usable to solve a transform for a `width` × `height`
    /// raster: at least three points, all pixel coordinates inside
    /// `[0, width) × [0, height)`, pixel locations not collinear.
    pub fn validate_for(&self, width: usize, height: usize) -> Result<()> {
        if self.len() < 3 {
            return Err(TilerioError::InvalidGcp(format!(
                "{} point(s) given, at least 3 required",
                self.len()
            )));
        }
        for point in &self.points {
            let inside = point.col >= 0.
                && point.col < width as f64
                && point.row >= 0.
                && point.row < height as f64;
            if !inside {
                return Err(TilerioError::InvalidGcp(format!(
                    "pixel ({}, {}) outside raster {}x{}",
                    point.row, point.col, width, height
                )));
            }
        }
        if pixels_collinear(&self.points) {
            return Err(TilerioError::InvalidGcp(
                "pixel locations are collinear".to_string(),
            ));
        }
        Ok(())
    }
}

/// True when all pixel locations lie on one line (or fewer than 3 are
/// distinct), i.e. the affine fit would be rank deficient.
pub(crate) fn pixels_collinear(points: &[GroundControlPoint]) -> bool {
    let origin = match points.first() {
        Some(point) => point,
        None => return true,
    };
    let Some(base) = points
        .iter()
        .map(|p| (p.col - origin.col, p.row - origin.row))
        .find(|(dx, dy)| dx.hypot(*dy) > 0.)
    else {
        return true;
    };
    let base_len = base.0.hypot(base.1);
    points.iter().all(|p| {
        let (dx, dy) = (p.col - origin.col, p.row - origin.row);
        let cross = base.0 * dy - base.1 * dx;
        cross.abs() <= 1e-9 * base_len * dx.hypot(dy).max(1.)
    })
}
