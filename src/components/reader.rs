use std::path::{Path, PathBuf};

use gdal::{raster::ResampleAlg, Dataset};
use log::debug;
use ndarray::{s, Array2, Array3};

use crate::{
    components::{
        array::MaskedArray,
        gcps::GcpSet,
        georeference::{resolve, Georeference, ResolveOptions},
        info::{assemble, classify, MaskPolicy, RasterInfo},
        transform::reproject,
        DataType,
    },
    errors::{Result, TilerioError},
    xyz,
};

const WGS84: &str = "epsg:4326";

/// Rectangular pixel region, offsets in raster pixel space.
///
/// Offsets may be negative and the window may extend past the raster: read
/// paths clip it and mask the uncovered remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: isize,
    pub row_off: isize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(col_off: isize, row_off: isize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Smallest integer window covering fractional pixel bounds.
    pub(crate) fn from_float_bounds(
        col_min: f64,
        row_min: f64,
        col_max: f64,
        row_max: f64,
    ) -> Self {
        let col_off = col_min.floor();
        let row_off = row_min.floor();
        Self {
            col_off: col_off as isize,
            row_off: row_off as isize,
            width: (col_max.ceil() - col_off).max(1.) as usize,
            height: (row_max.ceil() - row_off).max(1.) as usize,
        }
    }

    /// Part of the window inside a `width` × `height` raster, if any.
    pub(crate) fn intersect_raster(&self, width: usize, height: usize) -> Option<PixelWindow> {
        let col_start = self.col_off.max(0);
        let row_start = self.row_off.max(0);
        let col_end = (self.col_off + self.width as isize).min(width as isize);
        let row_end = (self.row_off + self.height as isize).min(height as isize);
        if col_end <= col_start || row_end <= row_start {
            return None;
        }
        Some(PixelWindow {
            col_off: col_start,
            row_off: row_start,
            width: (col_end - col_start) as usize,
            height: (row_end - row_start) as usize,
        })
    }
}

/// Scoped dataset reader: one GDAL handle and one resolved georeference per
/// instance, isolated from every other instance.
///
/// The underlying handle is released when the reader is dropped, on every
/// exit path. A single instance is not synchronized for concurrent use;
/// callers open one reader per request.
#[derive(Debug)]
pub struct Reader {
    path: PathBuf,
    dataset: Dataset,
    georeference: Georeference,
    resampling: ResampleAlg,
}

impl Reader {
    /// Opens `path` and resolves its georeference, preferring `gcps` over
    /// GCPs embedded in the file.
    pub fn open<P: AsRef<Path>>(path: P, gcps: Option<GcpSet>) -> Result<Self> {
        Self::open_with_options(path, gcps, &ResolveOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        gcps: Option<GcpSet>,
        options: &ResolveOptions,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dataset = Dataset::open(&path).map_err(|source| TilerioError::RasterAccess {
            path: path.display().to_string(),
            source,
        })?;
        let georeference = resolve(&dataset, gcps.as_ref(), options)?;
        Ok(Self {
            path,
            dataset,
            georeference,
            resampling: ResampleAlg::NearestNeighbour,
        })
    }

    /// Resampling used by GDAL when a read is rescaled. Nearest by default.
    pub fn resampling(mut self, resampling: ResampleAlg) -> Self {
        self.resampling = resampling;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn georeference(&self) -> &Georeference {
        &self.georeference
    }

    pub fn crs(&self) -> Option<&str> {
        self.georeference.crs()
    }

    pub fn info(&self) -> Result<RasterInfo> {
        assemble(&self.dataset, &self.georeference)
    }

    /// Geographic `(minx, miny, maxx, maxy)` of the full raster extent.
    pub fn bounds(&self) -> Result<(f64, f64, f64, f64)> {
        let (width, height) = self.dataset.raster_size();
        Ok(self.georeference.transform()?.bounds(width, height))
    }

    pub fn pixel_to_geo(&self, row: f64, col: f64) -> Result<(f64, f64)> {
        Ok(self.georeference.transform()?.pixel_to_geo(row, col))
    }

    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        Ok(self.georeference.transform()?.geo_to_pixel(x, y))
    }

    /// WGS84 latitude/longitude to `(row, col)`, composing a CRS reprojection
    /// with the GCP transform.
    pub fn latlng_to_pixel(&self, lat: f64, lng: f64) -> Result<(f64, f64)> {
        let crs = self.crs().ok_or(TilerioError::NotGeoreferenced)?;
        let (x, y) = reproject(lng, lat, WGS84, crs)?;
        self.geo_to_pixel(x, y)
    }

    /// `(row, col)` to WGS84 `(lat, lng)`.
    pub fn pixel_to_latlng(&self, row: f64, col: f64) -> Result<(f64, f64)> {
        let crs = self.crs().ok_or(TilerioError::NotGeoreferenced)?;
        let (x, y) = self.pixel_to_geo(row, col)?;
        let (lng, lat) = reproject(x, y, crs, WGS84)?;
        Ok((lat, lng))
    }

    /// Downscaled full-extent read: the longer side is capped at `max_size`,
    /// aspect preserved. `indexes` defaults to all non-alpha bands.
    pub fn preview<T: DataType>(
        &self,
        indexes: Option<&[usize]>,
        max_size: usize,
    ) -> Result<MaskedArray<T>> {
        let (width, height) = self.dataset.raster_size();
        let scale = (max_size as f64 / width.max(height).max(1) as f64).min(1.);
        let out_shape = (
            ((height as f64 * scale).round() as usize).max(1),
            ((width as f64 * scale).round() as usize).max(1),
        );
        self.read_padded(&PixelWindow::new(0, 0, width, height), indexes, out_shape)
    }

    /// Reads a pixel window, resampled to `out_shape` (`(rows, cols)`,
    /// defaults to the window shape). Parts of the window outside the raster
    /// come back masked; a window that misses the raster entirely fails with
    /// [`TilerioError::TileOutsideBounds`].
    pub fn read_window<T: DataType>(
        &self,
        window: &PixelWindow,
        indexes: Option<&[usize]>,
        out_shape: Option<(usize, usize)>,
    ) -> Result<MaskedArray<T>> {
        self.read_padded(window, indexes, out_shape.unwrap_or_else(|| window.shape()))
    }

    /// Reads a geographic window given as `(minx, miny, maxx, maxy)`.
    /// `bounds_crs` defaults to the resolved CRS; when it differs the bounds
    /// are reprojected before the corners are mapped to pixel space.
    pub fn part<T: DataType>(
        &self,
        bounds: (f64, f64, f64, f64),
        bounds_crs: Option<&str>,
        indexes: Option<&[usize]>,
        out_shape: Option<(usize, usize)>,
    ) -> Result<MaskedArray<T>> {
        let window = self.geo_window(bounds, bounds_crs)?;
        self.read_window(&window, indexes, out_shape)
    }

    /// Reads the Web Mercator tile `z/x/y` as a `tile_size` × `tile_size`
    /// masked array. Tiles that do not intersect the raster extent fail with
    /// [`TilerioError::TileOutsideBounds`].
    pub fn tile<T: DataType>(
        &self,
        x: u32,
        y: u32,
        z: u8,
        tile_size: usize,
        indexes: Option<&[usize]>,
    ) -> Result<MaskedArray<T>> {
        let bounds = xyz::mercator_tile_bounds(x, y, z);
        let window = self.geo_window(bounds, Some(xyz::TILE_CRS))?;
        self.read_padded(&window, indexes, (tile_size, tile_size))
            .map_err(|err| match err {
                TilerioError::TileOutsideBounds(_) => TilerioError::TileOutsideBounds(format!(
                    "tile {z}/{x}/{y} is outside raster bounds"
                )),
                other => other,
            })
    }

    /// Maps geographic bounds to the covering pixel window via the resolved
    /// transform, reprojecting from `bounds_crs` first when it differs.
    fn geo_window(
        &self,
        bounds: (f64, f64, f64, f64),
        bounds_crs: Option<&str>,
    ) -> Result<PixelWindow> {
        let crs = self.crs().ok_or(TilerioError::NotGeoreferenced)?;
        let transform = self.georeference.transform()?;
        let (minx, miny, maxx, maxy) = bounds;

        let mut pixel_bounds = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in [(minx, miny), (minx, maxy), (maxx, miny), (maxx, maxy)] {
            let (x, y) = match bounds_crs {
                Some(from) => reproject(x, y, from, crs)?,
                None => (x, y),
            };
            let (row, col) = transform.geo_to_pixel(x, y);
            pixel_bounds.0 = pixel_bounds.0.min(col);
            pixel_bounds.1 = pixel_bounds.1.min(row);
            pixel_bounds.2 = pixel_bounds.2.max(col);
            pixel_bounds.3 = pixel_bounds.3.max(row);
        }
        Ok(PixelWindow::from_float_bounds(
            pixel_bounds.0,
            pixel_bounds.1,
            pixel_bounds.2,
            pixel_bounds.3,
        ))
    }

    /// Shared read path: clips the window to the raster, reads the covered
    /// part into its place in an `out_shape` output and leaves the rest
    /// masked. The dataset's masking policy is applied over the covered part.
    fn read_padded<T: DataType>(
        &self,
        window: &PixelWindow,
        indexes: Option<&[usize]>,
        out_shape: (usize, usize),
    ) -> Result<MaskedArray<T>> {
        let (out_rows, out_cols) = out_shape;
        if out_rows == 0 || out_cols == 0 {
            return Err(TilerioError::EmptyOutputShape(out_rows, out_cols));
        }
        let policy = classify(&self.dataset)?;
        let indexes = self.data_indexes(indexes, policy);
        let (width, height) = self.dataset.raster_size();
        let clipped = window.intersect_raster(width, height).ok_or_else(|| {
            TilerioError::TileOutsideBounds(format!(
                "window {window:?} does not intersect raster extent {width}x{height}"
            ))
        })?;

        let scale_col = out_cols as f64 / window.width as f64;
        let scale_row = out_rows as f64 / window.height as f64;
        let dst_col = ((((clipped.col_off - window.col_off) as f64) * scale_col).round() as usize)
            .min(out_cols - 1);
        let dst_row = ((((clipped.row_off - window.row_off) as f64) * scale_row).round() as usize)
            .min(out_rows - 1);
        let dst_cols = ((clipped.width as f64 * scale_col).round() as usize)
            .clamp(1, out_cols - dst_col);
        let dst_rows = ((clipped.height as f64 * scale_row).round() as usize)
            .clamp(1, out_rows - dst_row);

        let data = self.read_bands::<T>(&indexes, &clipped, (dst_rows, dst_cols))?;
        let mask = self.read_mask(policy, &clipped, (dst_rows, dst_cols), &data)?;

        let mut output = MaskedArray::masked_zeros([indexes.len(), out_rows, out_cols]);
        output
            .data
            .slice_mut(s![.., dst_row..dst_row + dst_rows, dst_col..dst_col + dst_cols])
            .assign(&data);
        output
            .mask
            .slice_mut(s![dst_row..dst_row + dst_rows, dst_col..dst_col + dst_cols])
            .assign(&mask);
        debug!(
            "read {clipped:?} of requested {window:?} into {out_rows}x{out_cols}, {:.1}% valid",
            output.valid_fraction() * 100.
        );
        Ok(output)
    }

    /// Default band selection: everything except a band classified as alpha,
    /// which is consumed as the mask instead.
    fn data_indexes(&self, indexes: Option<&[usize]>, policy: MaskPolicy) -> Vec<usize> {
        match indexes {
            Some(indexes) => indexes.to_vec(),
            None => (1..=self.dataset.raster_count())
                .filter(|&index| policy != MaskPolicy::Alpha(index))
                .collect(),
        }
    }

    fn read_bands<T: DataType>(
        &self,
        indexes: &[usize],
        window: &PixelWindow,
        (rows, cols): (usize, usize),
    ) -> Result<Array3<T>> {
        let mut array = Array3::zeros((indexes.len(), rows, cols));
        for (slot, band_index) in indexes.iter().enumerate() {
            let buffer = self.dataset.rasterband(*band_index)?.read_as::<T>(
                (window.col_off, window.row_off),
                (window.width, window.height),
                (cols, rows),
                Some(self.resampling),
            )?;
            array
                .slice_mut(s![slot, .., ..])
                .assign(&Array2::from_shape_vec((rows, cols), buffer.data().to_vec())?);
        }
        Ok(array)
    }

    /// Validity mask for one clipped window, per the resolved policy.
    /// Alpha and mask bands are sampled nearest-neighbour so mask values
    /// stay categorical under rescaling.
    fn read_mask<T: DataType>(
        &self,
        policy: MaskPolicy,
        window: &PixelWindow,
        (rows, cols): (usize, usize),
        data: &Array3<T>,
    ) -> Result<Array2<bool>> {
        match policy {
            MaskPolicy::Alpha(alpha_index) => {
                let alpha = self.read_mask_values(alpha_index, window, (rows, cols), false)?;
                Ok(alpha.mapv(|value| value == 0.))
            }
            MaskPolicy::Nodata(nodata) => {
                let bands = data.shape()[0];
                Ok(Array2::from_shape_fn((rows, cols), |(row, col)| {
                    (0..bands).all(|band| {
                        data[[band, row, col]].to_f64().is_some_and(|v| v == nodata)
                    })
                }))
            }
            MaskPolicy::MaskBand => {
                let valid = self.read_mask_values(1, window, (rows, cols), true)?;
                Ok(valid.mapv(|value| value == 0.))
            }
            MaskPolicy::AllValid => Ok(Array2::from_elem((rows, cols), false)),
        }
    }

    fn read_mask_values(
        &self,
        band_index: usize,
        window: &PixelWindow,
        (rows, cols): (usize, usize),
        mask_band: bool,
    ) -> Result<Array2<f64>> {
        let band = self.dataset.rasterband(band_index)?;
        let request = (
            (window.col_off, window.row_off),
            (window.width, window.height),
            (cols, rows),
            Some(ResampleAlg::NearestNeighbour),
        );
        let buffer = if mask_band {
            band.open_mask_band()?
                .read_as::<f64>(request.0, request.1, request.2, request.3)?
        } else {
            band.read_as::<f64>(request.0, request.1, request.2, request.3)?
        };
        Ok(Array2::from_shape_vec((rows, cols), buffer.data().to_vec())?)
    }
}
