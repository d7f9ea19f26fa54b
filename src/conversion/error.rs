use hecs::Entity;
use thiserror::Error;

use crate::conversion::scheduler::Phase;
use crate::engine::EngineError;
use crate::rendering::common::visibility_partitioner::PartitionError;

#[derive(Error, Debug)]
pub enum ConversionError {
    /// Only surfaces from strict lookups. Builders report unknown tags and carry on.
    #[error("No builder for type tag {tag}")]
    UnknownType { tag: String },
    #[error("A builder for {tag} is already registered")]
    DuplicateBuilder { tag: String },
    #[error("{id} does not refer to a {expected}")]
    ReferenceTypeMismatch { id: String, expected: &'static str },
    #[error("{id} was never created")]
    UnresolvedReference { id: String },
    #[error("{id} is already registered")]
    DuplicateIdentifier { id: String },
    #[error("The null identifier cannot be registered")]
    NullIdentifier,
    #[error("Asset {asset} failed to load: {reason}")]
    AssetLoadFailure { asset: String, reason: String },
    /// Soft, the waiter logs it and the conversion continues.
    #[error("Asset {asset} did not load within {waited_ms} ms")]
    AssetLoadTimeout { asset: String, waited_ms: u128 },
    #[error("Mesh {mesh}: {source}")]
    MalformedMeshIndex {
        mesh: String,
        #[source]
        source: PartitionError,
    },
    #[error("Cannot schedule into {requested:?}, the run is already at {current:?}")]
    PhaseAlreadyDrained { requested: Phase, current: Phase },
    #[error("{0:?} is not part of the converted graph")]
    MissingEntity(Entity),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<hecs::ComponentError> for ConversionError {
    fn from(value: hecs::ComponentError) -> Self {
        ConversionError::Engine(EngineError::Component(value))
    }
}

impl From<hecs::NoSuchEntity> for ConversionError {
    fn from(value: hecs::NoSuchEntity) -> Self {
        ConversionError::Engine(EngineError::NoSuchEntity(value))
    }
}
