//! Boundary-to-grid decomposition
//!
//! Tiles the bounding box of a user-drawn boundary with a square or point
//! lattice and keeps the elements that belong to the boundary polygon:
//! - squares that intersect the polygon (touching counts)
//! - points strictly inside the polygon (points on an edge are dropped)
//!
//! Every lattice element carries its (row, col) index. Row grows with
//! latitude, column with longitude. Coordinates are always computed as
//! `origin + index * spacing`, so adjacency is integer arithmetic on the
//! indices and never depends on float equality.

use clap::ValueEnum;
use geo::{Contains, Intersects, LineString, Point, Polygon};
use serde::Deserialize;
use std::collections::HashMap;

use super::bounds::BoundingBox;
use crate::domain::boundary::closed_ring;
use crate::error::{Result, SurveyError};

/// Upper bound on lattice elements generated over a bounding box
pub const MAX_LATTICE_SIZE: u64 = 2_000_000;

/// Slack in index space when deciding whether the last row/column fits
const INDEX_TOLERANCE: f64 = 1e-9;

/// Default spacing in degrees (roughly 110 m of latitude)
pub const DEFAULT_SPACING: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GridShape {
    /// Closed square cells intersecting the polygon
    #[default]
    Square,
    /// Sample points inside the polygon, joined by grid edges
    Point,
}

/// Where the lattice origin sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LatticeAnchor {
    /// Aligned to the bounding box's south-west corner; shifts with every boundary
    #[default]
    #[value(name = "bbox")]
    #[serde(rename = "bbox")]
    BoundingBox,
    /// Aligned to whole multiples of the spacing from (0, 0), cropped to the box
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridOptions {
    /// Lattice spacing in degrees, applied to both axes
    pub spacing: f64,
    pub shape: GridShape,
    pub anchor: LatticeAnchor,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
            shape: GridShape::default(),
            anchor: LatticeAnchor::default(),
        }
    }
}

impl GridOptions {
    pub fn new(spacing: f64, shape: GridShape) -> Self {
        Self {
            spacing,
            shape,
            ..Default::default()
        }
    }

    pub fn with_anchor(mut self, anchor: LatticeAnchor) -> Self {
        self.anchor = anchor;
        self
    }
}

/// A square lattice cell
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
    /// Closed ring of (lat, lon): SW, NW, NE, SE, SW
    pub ring: [(f64, f64); 5],
}

impl GridCell {
    pub fn polygon(&self) -> Polygon<f64> {
        let ring: LineString<f64> = self
            .ring
            .iter()
            .map(|&(lat, lon)| geo::coord! { x: lon, y: lat })
            .collect();
        Polygon::new(ring, vec![])
    }
}

/// A lattice point kept by the containment filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub row: u32,
    pub col: u32,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// One column east
    Right,
    /// One row south
    Below,
}

/// Two sample points one lattice step apart; indices into the point list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridEdge {
    pub from: usize,
    pub to: usize,
    pub direction: EdgeDirection,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum GridResult {
    /// Fewer than three distinct boundary points
    #[default]
    Empty,
    Squares {
        bounds: BoundingBox,
        cells: Vec<GridCell>,
    },
    Points {
        bounds: BoundingBox,
        points: Vec<SamplePoint>,
        edges: Vec<GridEdge>,
    },
}

impl GridResult {
    pub fn bounds(&self) -> Option<&BoundingBox> {
        match self {
            GridResult::Empty => None,
            GridResult::Squares { bounds, .. } | GridResult::Points { bounds, .. } => Some(bounds),
        }
    }

    pub fn cells(&self) -> &[GridCell] {
        match self {
            GridResult::Squares { cells, .. } => cells,
            _ => &[],
        }
    }

    pub fn points(&self) -> &[SamplePoint] {
        match self {
            GridResult::Points { points, .. } => points,
            _ => &[],
        }
    }

    pub fn edges(&self) -> &[GridEdge] {
        match self {
            GridResult::Points { edges, .. } => edges,
            _ => &[],
        }
    }

    /// Number of kept cells or points
    pub fn len(&self) -> usize {
        self.cells().len() + self.points().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decompose the polygon enclosed by `boundary` ((lat, lon) in drawing order) into a grid.
///
/// Fewer than three distinct points yields [`GridResult::Empty`]. Self-intersecting
/// or zero-area boundaries are not rejected; membership is whatever geo's
/// `Intersects` / `Contains` report for them.
pub fn build_grid(boundary: &[(f64, f64)], options: &GridOptions) -> Result<GridResult> {
    let Some(ring) = closed_ring(boundary) else {
        return Ok(GridResult::Empty);
    };

    if !options.spacing.is_finite() || options.spacing <= 0.0 {
        return Err(SurveyError::InvalidSpacing(options.spacing));
    }

    let polygon = Polygon::new(ring, vec![]);
    let bounds = BoundingBox::from_points(boundary).ok_or_else(|| {
        SurveyError::InvalidBoundary("boundary has no points".to_string())
    })?;
    let lattice = Lattice::new(&bounds, options)?;

    tracing::debug!(
        rows = lattice.rows,
        cols = lattice.cols,
        spacing = options.spacing,
        shape = ?options.shape,
        "generated lattice"
    );

    let result = match options.shape {
        GridShape::Square => {
            let cells = lattice
                .cells()
                .filter(|cell| cell.polygon().intersects(&polygon))
                .collect();
            GridResult::Squares { bounds, cells }
        }
        GridShape::Point => {
            let points: Vec<SamplePoint> = lattice
                .points()
                .filter(|p| polygon.contains(&Point::new(p.longitude, p.latitude)))
                .collect();
            let edges = build_edges(&points);
            GridResult::Points {
                bounds,
                points,
                edges,
            }
        }
    };

    Ok(result)
}

/// Join every point to its east and south neighbours when both survived the filter
fn build_edges(points: &[SamplePoint]) -> Vec<GridEdge> {
    let index: HashMap<(u32, u32), usize> = points
        .iter()
        .enumerate()
        .map(|(i, p)| ((p.row, p.col), i))
        .collect();

    let mut edges = Vec::new();
    for (i, p) in points.iter().enumerate() {
        if let Some(&right) = p.col.checked_add(1).and_then(|c| index.get(&(p.row, c))) {
            edges.push(GridEdge {
                from: i,
                to: right,
                direction: EdgeDirection::Right,
            });
        }
        if let Some(&below) = p.row.checked_sub(1).and_then(|r| index.get(&(r, p.col))) {
            edges.push(GridEdge {
                from: i,
                to: below,
                direction: EdgeDirection::Below,
            });
        }
    }
    edges
}

/// Candidate lattice over a bounding box, before polygon filtering
#[derive(Debug, Clone, Copy)]
struct Lattice {
    base_lat: f64,
    base_lon: f64,
    /// Index of row/column 0 relative to the base, in spacing units
    lat_offset: f64,
    lon_offset: f64,
    spacing: f64,
    /// Rows and columns of elements (points or whole cells)
    rows: u32,
    cols: u32,
}

impl Lattice {
    fn new(bounds: &BoundingBox, options: &GridOptions) -> Result<Self> {
        let spacing = options.spacing;

        let (base_lat, base_lon, lat_offset, lon_offset) = match options.anchor {
            LatticeAnchor::BoundingBox => (bounds.min_lat, bounds.min_lon, 0.0, 0.0),
            LatticeAnchor::Global => (
                0.0,
                0.0,
                (bounds.min_lat / spacing - INDEX_TOLERANCE).ceil(),
                (bounds.min_lon / spacing - INDEX_TOLERANCE).ceil(),
            ),
        };

        // Extent from the first lattice line to the max edge, in spacing units
        let lat_steps = (bounds.max_lat - base_lat) / spacing - lat_offset;
        let lon_steps = (bounds.max_lon - base_lon) / spacing - lon_offset;

        let count = |steps: f64| -> u64 {
            if steps < -INDEX_TOLERANCE {
                return 0;
            }
            let whole = (steps + INDEX_TOLERANCE).floor() as u64;
            match options.shape {
                GridShape::Square => whole,
                GridShape::Point => whole.saturating_add(1),
            }
        };
        let rows = count(lat_steps);
        let cols = count(lon_steps);

        if rows.max(cols) > MAX_LATTICE_SIZE || rows.saturating_mul(cols) > MAX_LATTICE_SIZE {
            return Err(SurveyError::LatticeTooLarge {
                rows,
                cols,
                limit: MAX_LATTICE_SIZE,
            });
        }

        Ok(Self {
            base_lat,
            base_lon,
            lat_offset,
            lon_offset,
            spacing,
            rows: rows as u32,
            cols: cols as u32,
        })
    }

    fn lat(&self, row: u32) -> f64 {
        self.base_lat + (self.lat_offset + row as f64) * self.spacing
    }

    fn lon(&self, col: u32) -> f64 {
        self.base_lon + (self.lon_offset + col as f64) * self.spacing
    }

    fn indices(&self) -> impl Iterator<Item = (u32, u32)> + use<> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| (row, col)))
    }

    fn points(&self) -> impl Iterator<Item = SamplePoint> + '_ {
        self.indices().map(|(row, col)| SamplePoint {
            row,
            col,
            latitude: self.lat(row),
            longitude: self.lon(col),
        })
    }

    fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.indices().map(|(row, col)| {
            let (south, north) = (self.lat(row), self.lat(row + 1));
            let (west, east) = (self.lon(col), self.lon(col + 1));
            GridCell {
                row,
                col,
                ring: [
                    (south, west),
                    (north, west),
                    (north, east),
                    (south, east),
                    (south, west),
                ],
            }
        })
    }
}
