use geo::{AffineTransform, Coord};
use log::debug;
use proj::Proj;

use crate::{
    components::gcps::GroundControlPoint,
    errors::{Result, TilerioError},
};

/// Affine pixel⇄geographic mapping solved from ground control points.
///
/// The forward model follows the GDAL geotransform convention,
/// `x = t0 + t1·col + t2·row` and `y = t3 + t4·col + t5·row`, fit by least
/// squares over all points. Three non-collinear points interpolate exactly;
/// more points are fit with the residual kept for diagnostics. The forward
/// map is affine, so the inverse is exact and both directions are total.
#[derive(Debug, Clone)]
pub struct GcpTransform {
    forward: AffineTransform,
    inverse: AffineTransform,
    rms_residual: f64,
}

impl GcpTransform {
    /// Solves the affine fit. Fails with [`TilerioError::InvalidGcp`] when
    /// the system is rank deficient (collinear pixel or ground locations).
    pub fn fit(points: &[GroundControlPoint]) -> Result<Self> {
        if points.len() < 3 {
            return Err(TilerioError::InvalidGcp(format!(
                "{} point(s) given, at least 3 required",
                points.len()
            )));
        }

        // Normal equations over the basis (1, col, row), one system per axis.
        let mut m = [[0f64; 3]; 3];
        let mut rhs_x = [0f64; 3];
        let mut rhs_y = [0f64; 3];
        for p in points {
            let u = [1., p.col, p.row];
            for i in 0..3 {
                for j in 0..3 {
                    m[i][j] += u[i] * u[j];
                }
                rhs_x[i] += u[i] * p.x;
                rhs_y[i] += u[i] * p.y;
            }
        }
        let singular = || TilerioError::InvalidGcp("pixel locations are collinear".to_string());
        let tx = solve3(m, rhs_x).ok_or_else(singular)?;
        let ty = solve3(m, rhs_y).ok_or_else(singular)?;

        let forward = AffineTransform::new(tx[1], tx[2], tx[0], ty[1], ty[2], ty[0]);
        let inverse = forward.inverse().ok_or_else(|| {
            TilerioError::InvalidGcp("ground locations are collinear".to_string())
        })?;

        let rms_residual = (points
            .iter()
            .map(|p| {
                let fitted = forward.apply(Coord { x: p.col, y: p.row });
                (fitted.x - p.x).powi(2) + (fitted.y - p.y).powi(2)
            })
            .sum::<f64>()
            / points.len() as f64)
            .sqrt();
        debug!(
            "solved gcp transform from {} point(s), rms residual {rms_residual:.3e}",
            points.len()
        );

        Ok(Self {
            forward,
            inverse,
            rms_residual,
        })
    }

    pub fn pixel_to_geo(&self, row: f64, col: f64) -> (f64, f64) {
        let geo = self.forward.apply(Coord { x: col, y: row });
        (geo.x, geo.y)
    }

    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let pixel = self.inverse.apply(Coord { x, y });
        (pixel.y, pixel.x)
    }

    /// Geographic bounding box `(minx, miny, maxx, maxy)` of a
    /// `width` × `height` raster: min/max of the four corner images.
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (w, h) = (width as f64, height as f64);
        let corners = [(0., 0.), (0., w), (h, 0.), (h, w)];
        let mut bounds = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (row, col) in corners {
            let (x, y) = self.pixel_to_geo(row, col);
            bounds.0 = bounds.0.min(x);
            bounds.1 = bounds.1.min(y);
            bounds.2 = bounds.2.max(x);
            bounds.3 = bounds.3.max(y);
        }
        bounds
    }

    /// Ground distance covered by one pixel step along columns and rows.
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.forward.a().hypot(self.forward.d()),
            self.forward.b().hypot(self.forward.e()),
        )
    }

    /// Root-mean-square fit residual over the solving points, in ground
    /// units. Zero (up to floating point) for exactly three points.
    pub fn rms_residual(&self) -> f64 {
        self.rms_residual
    }
}

/// Converts one coordinate pair between two CRSs, e.g. `"epsg:4326"` to
/// `"epsg:3857"`. Pass-through to PROJ; never used for the GCP fit itself.
pub fn reproject(x: f64, y: f64, from_crs: &str, to_crs: &str) -> Result<(f64, f64)> {
    if from_crs.eq_ignore_ascii_case(to_crs) {
        return Ok((x, y));
    }
    let proj = Proj::new_known_crs(&from_crs.to_uppercase(), &to_crs.to_uppercase(), None)?;
    Ok(proj.convert((x, y))?)
}

/// 3×3 linear solve by Gaussian elimination with partial pivoting.
/// `None` when the matrix is singular.
fn solve3(mut m: [[f64; 3]; 3], mut rhs: [f64; 3]) -> Option<[f64; 3]> {
    let scale = m
        .iter()
        .flatten()
        .fold(0f64, |acc, v| acc.max(v.abs()))
        .max(1.);
    for col in 0..3 {
        let pivot_row = (col..3).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot_row][col].abs() <= 1e-12 * scale {
            return None;
        }
        m.swap(col, pivot_row);
        rhs.swap(col, pivot_row);
        for row in col + 1..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..3 {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }
    let mut out = [0f64; 3];
    for col in (0..3).rev() {
        let mut acc = rhs[col];
        for k in col + 1..3 {
            acc -= m[col][k] * out[k];
        }
        out[col] = acc / m[col][col];
    }
    Some(out)
}
