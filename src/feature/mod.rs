mod class_map;
mod dictionary;
mod geotypical;
mod names;
mod resolved;
mod source;

pub use class_map::*;
pub use dictionary::*;
pub use geotypical::*;
pub use names::*;
pub use resolved::*;
pub use source::FeatureSource;
