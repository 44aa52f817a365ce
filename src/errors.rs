pub type Result<T> = std::result::Result<T, TilerioError>;

#[derive(thiserror::Error, Debug)]
pub enum TilerioError {
    #[error("invalid ground control points: {0}")]
    InvalidGcp(String),
    #[error("dataset has no georeference")]
    NotGeoreferenced,
    #[error("{0}")]
    TileOutsideBounds(String),
    #[error("requested output shape {0}x{1} is empty")]
    EmptyOutputShape(usize, usize),
    #[error("could not parse {input:?} as `row,col,lon,lat,alt`")]
    MalformedGcpInput { input: String },
    #[error("raster access failed for {path}")]
    RasterAccess {
        path: String,
        #[source]
        source: gdal::errors::GdalError,
    },
    #[error(transparent)]
    GdalError(#[from] gdal::errors::GdalError),
    #[error(transparent)]
    ProjError(#[from] proj::ProjError),
    #[error(transparent)]
    ProjCreateError(#[from] proj::ProjCreateError),
    #[error(transparent)]
    NdarrayError(#[from] ndarray::ShapeError),
}
