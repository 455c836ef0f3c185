// private sub-modules defined in other files
mod array2d;
mod label_grid;
mod point2d;
mod point3d;
mod saturating_count;

// exports identifiers from private sub-modules in the current module namespace
pub use self::array2d::Array2D;
pub use self::label_grid::LabelGrid;
pub use self::point2d::Point2D;
pub use self::point3d::Point3D;
pub use self::saturating_count::SaturatingCount;
