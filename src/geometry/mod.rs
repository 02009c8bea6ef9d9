pub mod region;

pub use region::{Aabb, Polygon, Rectangle, Region};
