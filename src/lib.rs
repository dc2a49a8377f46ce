//! mangrove-survey - Boundary-to-grid decomposition, tide extremes and live telemetry
//! for field surveys

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod geometry;
pub mod monitor;
pub mod sensors;
pub mod survey;

pub use error::{Result, SurveyError};
