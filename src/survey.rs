//! The survey session: one boundary, its grid settings and everything derived from them

use crate::api::TideClient;
use crate::api::store::{RemoteStore, upload_markers};
use crate::domain::{Boundary, Coordinate, MarkerKey, TideReport};
use crate::error::Result;
use crate::geometry::{
    BoundingBox, GridOptions, GridResult, GridShape, Projector, build_grid, polygon_area_m2,
};

/// Optional behaviours of a survey session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurveyFeatures {
    /// Push markers to the remote store when publishing
    pub upload_markers: bool,
    /// Look up tides at the centre of the plot
    pub tide_lookup: bool,
}

/// Everything derived from the boundary in one generation pass
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyGrid {
    pub result: GridResult,
    /// Spherical area of the boundary polygon in square metres
    pub area_m2: f64,
    /// Ground size of one lattice step as (north-south, east-west) metres
    pub step_m: (f64, f64),
    /// Ground size of the boundary's bounding box, same axes as `step_m`
    pub extent_m: (f64, f64),
}

#[derive(Debug, Default)]
pub struct Survey {
    boundary: Boundary,
    options: GridOptions,
    features: SurveyFeatures,
    grid: Option<SurveyGrid>,
}

impl Survey {
    pub fn new(options: GridOptions, features: SurveyFeatures) -> Self {
        Self {
            options,
            features,
            ..Default::default()
        }
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn features(&self) -> &SurveyFeatures {
        &self.features
    }

    /// Last generated grid; `None` after any boundary or option change
    pub fn grid(&self) -> Option<&SurveyGrid> {
        self.grid.as_ref()
    }

    pub fn add_point(&mut self, latitude: f64, longitude: f64) -> MarkerKey {
        self.grid = None;
        self.boundary.add(latitude, longitude)
    }

    pub fn remove_point(&mut self, key: MarkerKey) -> bool {
        let removed = self.boundary.remove(key);
        if removed {
            self.grid = None;
        }
        removed
    }

    pub fn set_spacing(&mut self, spacing: f64) {
        self.options.spacing = spacing;
        self.grid = None;
    }

    pub fn set_shape(&mut self, shape: GridShape) {
        self.options.shape = shape;
        self.grid = None;
    }

    /// Rebuild the lattice, edges and area from the current boundary.
    ///
    /// Derived state is replaced as a whole; on error the previous grid is
    /// already gone and nothing partial is kept.
    pub fn generate_grid(&mut self) -> Result<&SurveyGrid> {
        self.grid = None;

        let coords = self.boundary.coords();
        let result = build_grid(&coords, &self.options)?;
        let area_m2 = polygon_area_m2(&coords);
        let (step_m, extent_m) = result
            .bounds()
            .map(|b| {
                let projector = Projector::new(b.center());
                (
                    projector.step_meters(self.options.spacing),
                    projector.extent_meters(b),
                )
            })
            .unwrap_or_default();

        tracing::info!(
            markers = self.boundary.len(),
            elements = result.len(),
            edges = result.edges().len(),
            area_m2,
            "grid generated"
        );

        Ok(&*self.grid.insert(SurveyGrid {
            result,
            area_m2,
            step_m,
            extent_m,
        }))
    }

    /// Upload the markers if that feature is on; `Ok(false)` when it is off.
    ///
    /// Independent of grid generation: any number of markers can be sent,
    /// and a failed upload leaves the grid untouched.
    pub fn publish_markers(&self, store: &dyn RemoteStore) -> Result<bool> {
        if !self.features.upload_markers {
            return Ok(false);
        }
        upload_markers(store, &self.markers_payload())?;
        Ok(true)
    }

    /// Centre of the boundary's bounding box, when tide lookup is on
    pub fn tide_site(&self) -> Option<(f64, f64)> {
        if !self.features.tide_lookup {
            return None;
        }
        BoundingBox::from_points(&self.boundary.coords()).map(|b| b.center())
    }

    /// Tides at the plot centre; `Ok(None)` when lookup is off or there are no markers
    pub fn lookup_tides(&self, client: &TideClient) -> Result<Option<TideReport>> {
        match self.tide_site() {
            Some((latitude, longitude)) => client.fetch(latitude, longitude).map(Some),
            None => Ok(None),
        }
    }

    /// Markers in drawing order, as uploaded
    pub fn markers_payload(&self) -> Vec<Coordinate> {
        self.boundary.coordinates()
    }

    /// Start over: no markers, no grid; options and features are kept
    pub fn reset(&mut self) {
        self.boundary.clear();
        self.grid = None;
    }
}
