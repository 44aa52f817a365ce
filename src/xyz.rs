//! Web Mercator (XYZ) tile arithmetic.
//!
//! Only the geometry of the tile grid lives here; reading pixels for a tile
//! is [`crate::Reader::tile`]'s job and image encoding belongs to the
//! serving layer.

/// Half the Web Mercator world extent in meters.
pub const WEB_MERCATOR_MAX: f64 = 20_037_508.342_789_244;

/// CRS of the XYZ tile grid.
pub const TILE_CRS: &str = "epsg:3857";

/// Bounds `(minx, miny, maxx, maxy)` of tile `(x, y)` at zoom `z`,
/// in EPSG:3857 meters.
pub fn mercator_tile_bounds(x: u32, y: u32, z: u8) -> (f64, f64, f64, f64) {
    let tiles = 2f64.powi(z as i32);
    let tile_size = 2. * WEB_MERCATOR_MAX / tiles;

    let minx = -WEB_MERCATOR_MAX + x as f64 * tile_size;
    let maxy = WEB_MERCATOR_MAX - y as f64 * tile_size;
    (minx, maxy - tile_size, minx + tile_size, maxy)
}

/// Tile index containing a longitude/latitude at zoom `z`. Handy for tests
/// and for callers turning a point of interest into a tile request.
pub fn tile_index(lon: f64, lat: f64, z: u8) -> (u32, u32) {
    let tiles = 2f64.powi(z as i32);
    let x = (lon + 180.) / 360. * tiles;
    let y = (1. - lat.to_radians().tan().asinh() / std::f64::consts::PI) / 2. * tiles;
    let max = tiles as u32 - 1;
    (
        (x.floor() as u32).min(max),
        (y.floor() as u32).min(max),
    )
}
