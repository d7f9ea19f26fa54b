/// basic types (e.g. mesh) to abstract away from both the asset format and the runtime.
pub mod types;
/// Splits submeshes by the first person visibility of the bones they are weighted to.
pub mod visibility_partitioner;
