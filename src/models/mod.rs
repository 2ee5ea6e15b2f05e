mod cluster;
mod diagnosis;
mod fault;
mod resource;

pub use cluster::*;
pub use diagnosis::*;
pub use fault::*;
pub use resource::*;
