use ndarray::{Array2, Array3, ArrayView2};

use crate::components::DataType;

/// Pixel data with validity information, shaped `(bands, rows, cols)`.
///
/// The mask is shared by all bands; `true` marks an invalid (masked) pixel,
/// following the convention of numpy masked arrays. How the mask was derived
/// (alpha band, nodata value, mask band or nothing) is the reader's concern;
/// consumers only see the result.
#[derive(Debug, Clone)]
pub struct MaskedArray<T> {
    pub data: Array3<T>,
    pub mask: Array2<bool>,
}

impl<T: DataType> MaskedArray<T> {
    pub fn new(data: Array3<T>, mask: Array2<bool>) -> Self {
        debug_assert_eq!(&data.shape()[1..], mask.shape());
        Self { data, mask }
    }

    /// Fully-masked array of the given shape, to be filled in by reads.
    pub fn masked_zeros(shape: [usize; 3]) -> Self {
        Self {
            data: Array3::zeros(shape),
            mask: Array2::from_elem([shape[1], shape[2]], true),
        }
    }

    pub fn bands(&self) -> usize {
        self.data.shape()[0]
    }

    /// `(bands, rows, cols)`
    pub fn shape(&self) -> (usize, usize, usize) {
        let shape = self.data.shape();
        (shape[0], shape[1], shape[2])
    }

    pub fn band(&self, index: usize) -> ArrayView2<'_, T> {
        self.data.index_axis(ndarray::Axis(0), index)
    }

    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        self.mask[[row, col]]
    }

    /// Share of unmasked pixels, useful for logging read coverage.
    pub fn valid_fraction(&self) -> f64 {
        let masked = self.mask.iter().filter(|&&m| m).count();
        1. - masked as f64 / self.mask.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn masked_zeros_is_fully_masked() {
        let array = MaskedArray::<u8>::masked_zeros([2, 4, 3]);
        assert_eq!(array.shape(), (2, 4, 3));
        assert!(array.is_masked(0, 0));
        assert_eq!(array.valid_fraction(), 0.);
    }

    #[rstest]
    fn band_views_share_the_mask() {
        let data = Array3::from_elem([2, 2, 2], 7u16);
        let mut mask = Array2::from_elem([2, 2], false);
        mask[[1, 1]] = true;
        let array = MaskedArray::new(data, mask);
        assert_eq!(array.band(1)[[0, 0]], 7);
        assert!(array.is_masked(1, 1));
        assert_eq!(array.valid_fraction(), 0.75);
    }
}
