mod image;
mod mem;
mod raster;
mod registry;
mod shapefile;
mod tiff;
mod vector;

pub use self::image::ImageDriver;
pub use self::mem::MemVectorDriver;
pub use self::raster::*;
pub use self::registry::DriverRegistry;
pub use self::shapefile::ShapefileDriver;
pub use self::tiff::{TiffDriver, read_tiff_bands};
pub use self::vector::*;
