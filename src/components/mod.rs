pub mod array;
pub mod gcps;
pub mod georeference;
pub mod info;
pub mod reader;
pub mod transform;

use std::fmt::Debug;

use gdal::raster::GdalType;
use num::{Num, ToPrimitive};

/// Pixel value types a raster band can be read as.
pub trait DataType: Num + ToPrimitive + Copy + Send + Sync + Debug + GdalType {}

impl<T> DataType for T where T: Num + ToPrimitive + Copy + Send + Sync + Debug + GdalType {}
