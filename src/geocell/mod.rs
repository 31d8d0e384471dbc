mod contrib;
mod extent;

pub use contrib::*;
pub use extent::*;
