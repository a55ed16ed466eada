//! Terrain hydrology and erosion library
//!
//! Re-exports modules for use by binaries and tools.

pub mod config;
pub mod erosion;
pub mod export;
pub mod hydrology;
pub mod rand;
pub mod seeds;
pub mod tilemap;
