//! # meshferry-blender
//!
//! Locates a Blender installation and drives it headless to convert a glTF
//! binary into an FBX suitable for the editor's importer.
//!
//! The scene processing itself (child-mesh merging, decimation, transform
//! baking, export) lives in the bundled `scripts/mesh_process.py`; this crate
//! owns discovery, process supervision and output validation.

pub mod converter;
pub mod error;
pub mod locator;
pub mod report;

pub use converter::{BlenderConverter, ConversionRequest, ConversionResult};
pub use error::{ConversionError, LocateError};
pub use locator::{BlenderDiscovery, BlenderInstallation, DiscoveryMethod, SearchContext};
pub use report::MeshReport;
