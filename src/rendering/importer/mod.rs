/// This module handles converting the types from rigport-files into an intermediate representation,
/// which the runtime uploads and the mesh algorithms operate on.
/// Keeping it separate from the parsed documents lets the same mesh be derived multiple times,
/// e.g. when a shared mesh has to be duplicated for renderers with different bone lists.
pub mod mesh_importer;
