pub mod area;
pub mod bounds;
pub mod grid;
pub mod projection;

pub use area::polygon_area_m2;
pub use bounds::BoundingBox;
pub use grid::{
    GridCell, GridEdge, GridOptions, GridResult, GridShape, LatticeAnchor, MAX_LATTICE_SIZE,
    SamplePoint, build_grid,
};
pub use projection::Projector;
