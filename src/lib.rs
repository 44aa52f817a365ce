//! Read rasters that carry no native affine transform.
//!
//! Imagery anchored only by ground control points (embedded in the file or
//! supplied by the caller) is resolved once at open time into an affine
//! GCP transform, after which metadata, pixel⇄geographic conversion and
//! masked reads (previews, windows, XYZ tiles) all go through that transform.
//!
//! ```no_run
//! use tilerio::{GcpSet, Reader};
//!
//! # fn main() -> tilerio::Result<()> {
//! let gcps = GcpSet::from_strings(["0,0,10.0,50.0,0", "0,99,11.0,50.0,0", "99,0,10.0,49.0,0"])?;
//! let reader = Reader::open("scan.tif", Some(gcps))?;
//! let info = reader.info()?;
//! let preview = reader.preview::<u8>(None, 512)?;
//! # Ok(())
//! # }
//! ```

mod components;
mod errors;
pub mod xyz;

pub use components::{
    array::MaskedArray,
    gcps::{GcpSet, GroundControlPoint},
    georeference::{resolve, Georeference, GeoreferenceMode, ResolveOptions},
    info::{assemble, NodataType, RasterInfo},
    reader::{PixelWindow, Reader},
    transform::{reproject, GcpTransform},
    DataType,
};
pub use errors::{Result, TilerioError};
