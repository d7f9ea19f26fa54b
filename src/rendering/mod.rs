//! Renderer-facing mesh data, independent of both the wire format and the live runtime.
pub mod common;
pub mod importer;
