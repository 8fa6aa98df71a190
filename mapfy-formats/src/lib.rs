//! # MapFy Formats
//!
//! File format bridge for the MapFy editor: KML, GPX and GeoJSON import
//! into the editor's feature collection, plus GeoJSON, KML and raster
//! snapshot export.
//!
//! Import is extension-dispatched and all-or-nothing — a malformed file
//! inserts nothing. Export of an empty collection is rejected locally.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]

pub mod error;
pub mod export;
pub mod import;
pub mod snapshot;

pub use error::{FormatError, FormatResult};
pub use export::{export_geojson, export_kml, GeoJsonExportOptions};
pub use import::{import, import_geojson, import_gpx, import_kml, ImportFormat};
pub use snapshot::{MapSnapshot, SnapshotConfig, SnapshotFormat, SnapshotRenderer};

/// Formats crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
