use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use glam::{Vec3, Vec4};
use hecs::{ComponentError, Entity, World};
use itertools::Itertools;
use log::{debug, trace, warn};

use crate::rendering::common::types::Mesh;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetName(pub String);

/// Shared so upload jobs can read the mesh off-thread. Changing the mesh means swapping the `Arc`.
#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub mesh: Arc<Mesh>,
}

/// Written once an upload succeeded.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshBounds {
    pub min: Vec3,
    pub max: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Unknown,
}

impl ImageFormat {
    pub fn sniff(bytes: &[u8]) -> ImageFormat {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            ImageFormat::Png
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else {
            ImageFormat::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureAsset {
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
    /// `None` for placeholders without pixel data.
    pub source: Option<PathBuf>,
    pub format: Option<ImageFormat>,
    pub byte_len: usize,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BlendMode {
    Opaque,
    Cutout { threshold: f32 },
    Transparent,
    /// Renders nothing. Used to hide geometry in first person.
    Invisible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialAsset {
    pub family: String,
    pub blend: BlendMode,
    pub color: Vec4,
    pub main_texture: Option<Entity>,
    pub normal_map: Option<Entity>,
    pub emission_map: Option<Entity>,
    pub emission_color: Vec3,
}

impl MaterialAsset {
    pub fn invisible() -> Self {
        Self {
            family: "Invisible".to_string(),
            blend: BlendMode::Invisible,
            color: Vec4::ZERO,
            main_texture: None,
            normal_map: None,
            emission_map: None,
            emission_color: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Ready,
    Failed(String),
}

/// Present on every asset that went through the pipeline. Each submission bumps the generation,
/// results of older submissions are dropped when they arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLoad {
    pub state: LoadState,
    pub generation: u32,
}

enum JobOutput {
    Mesh(Option<MeshBounds>),
    Texture { format: ImageFormat, byte_len: usize },
}

type JobResult = Result<JobOutput, String>;

/// Runs uploads on the blocking pool. Finished jobs are parked here until the owning engine
/// applies them on its next tick, so the world is only ever touched from the tick.
#[derive(Default, Clone)]
pub struct AssetPipeline {
    completed: Arc<DashMap<(Entity, u32), JobResult>>,
}

impl AssetPipeline {
    pub fn new() -> Self {
        AssetPipeline::default()
    }

    pub fn submit_mesh_upload(&self, world: &mut World, asset: Entity) -> Result<(), ComponentError> {
        let mesh = world.get::<&MeshAsset>(asset)?.mesh.clone();
        let generation = Self::begin(world, asset)?;
        trace!("Uploading mesh {:?} (generation {})", asset, generation);

        self.spawn_job(asset, generation, move || validate_mesh(&mesh).map(JobOutput::Mesh));
        Ok(())
    }

    pub fn submit_texture_load(&self, world: &mut World, asset: Entity, path: PathBuf) -> Result<(), ComponentError> {
        let generation = Self::begin(world, asset)?;
        trace!("Loading texture {:?} from {}", asset, path.display());

        self.spawn_job(asset, generation, move || {
            let bytes = std::fs::read(&path).map_err(|e| format!("Reading {}: {}", path.display(), e))?;
            Ok(JobOutput::Texture {
                format: ImageFormat::sniff(&bytes),
                byte_len: bytes.len(),
            })
        });
        Ok(())
    }

    /// For assets that have nothing to load (materials, placeholder textures).
    pub fn mark_ready(&self, world: &mut World, asset: Entity) -> Result<(), ComponentError> {
        let generation = Self::begin(world, asset)?;
        world.insert_one(
            asset,
            AssetLoad {
                state: LoadState::Ready,
                generation,
            },
        )?;
        Ok(())
    }

    /// Applies every finished job. Returns how many were applied (stale ones are not counted).
    pub fn poll(&self, world: &mut World) -> usize {
        // don't hold shard locks while touching the world
        let keys = self.completed.iter().map(|entry| *entry.key()).collect_vec();
        let mut applied = 0;

        for key in keys {
            let Some(((asset, generation), result)) = self.completed.remove(&key) else {
                continue;
            };

            let current = match world.get::<&AssetLoad>(asset) {
                Ok(load) => load.generation,
                Err(_) => {
                    trace!("Dropping load result for {:?}, the asset is gone", asset);
                    continue;
                }
            };

            if current != generation {
                debug!(
                    "Dropping stale load result for {:?} (generation {}, current {})",
                    asset, generation, current
                );
                continue;
            }

            if Self::apply(world, asset, generation, result).is_ok() {
                applied += 1;
            }
        }

        applied
    }

    fn begin(world: &mut World, asset: Entity) -> Result<u32, ComponentError> {
        let generation = world
            .get::<&AssetLoad>(asset)
            .map(|load| load.generation + 1)
            .unwrap_or(1);

        world.insert_one(
            asset,
            AssetLoad {
                state: LoadState::Pending,
                generation,
            },
        )?;
        Ok(generation)
    }

    fn spawn_job<F>(&self, asset: Entity, generation: u32, job: F)
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        let completed = self.completed.clone();
        tokio::task::spawn_blocking(move || {
            let result = job();
            completed.insert((asset, generation), result);
        });
    }

    fn apply(world: &mut World, asset: Entity, generation: u32, result: JobResult) -> Result<(), ComponentError> {
        let state = match result {
            Ok(JobOutput::Mesh(bounds)) => {
                if let Some(bounds) = bounds {
                    world.insert_one(asset, bounds)?;
                }
                LoadState::Ready
            }
            Ok(JobOutput::Texture { format, byte_len }) => {
                let mut texture = world.get::<&mut TextureAsset>(asset)?;
                texture.format = Some(format);
                texture.byte_len = byte_len;
                if format == ImageFormat::Unknown {
                    warn!("Texture {:?} is neither PNG nor JPEG", asset);
                }
                LoadState::Ready
            }
            Err(reason) => {
                warn!("Loading {:?} failed: {}", asset, reason);
                LoadState::Failed(reason)
            }
        };

        world.insert_one(asset, AssetLoad { state, generation })?;
        Ok(())
    }
}

/// What the runtime checks before it accepts a mesh. Problems the partitioner flags on its own
/// (misaligned index counts) and out of range bones are only warned about.
fn validate_mesh(mesh: &Mesh) -> Result<Option<MeshBounds>, String> {
    let vertex_count = mesh.vertex_count();
    let buffers = &mesh.vertex_buffers;
    let attributes = [
        ("normals", buffers.normals_buffer.len()),
        ("tangents", buffers.tangents_buffer.len()),
        ("uv0", buffers.texcoord_buffer_0.len()),
        ("uv1", buffers.texcoord_buffer_1.len()),
        ("colors", buffers.vertex_color_0.len()),
        ("bone bindings", buffers.bone_bindings.len()),
    ];

    for (attribute, len) in attributes {
        if len != 0 && len != vertex_count {
            return Err(format!(
                "Mesh has {} {} for {} vertices",
                len, attribute, vertex_count
            ));
        }
    }

    for (index, submesh) in mesh.submeshes.iter().enumerate() {
        if let Some(vertex) = submesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(format!(
                "Submesh {} references vertex {}, but the mesh only has {} vertices",
                index, vertex, vertex_count
            ));
        }

        if !submesh.is_aligned() {
            warn!(
                "Submesh {} has {} indices, not a multiple of {}",
                index,
                submesh.indices.len(),
                submesh.topology.element_size()
            );
        }
    }

    for shape in &mesh.blendshapes {
        for frame in &shape.frames {
            if !frame.position_deltas.is_empty() && frame.position_deltas.len() != vertex_count {
                return Err(format!(
                    "Blendshape {} has {} deltas for {} vertices",
                    shape.name,
                    frame.position_deltas.len(),
                    vertex_count
                ));
            }
        }
    }

    let bone_count = mesh.bone_count();
    let out_of_range = buffers
        .bone_bindings
        .iter()
        .flatten()
        .filter(|binding| binding.weight > 0.0 && binding.bone as usize >= bone_count)
        .count();
    if out_of_range > 0 {
        warn!(
            "{} bone influences point past the {} bind poses of the mesh",
            out_of_range, bone_count
        );
    }

    Ok(mesh.bounds().map(|(min, max)| MeshBounds { min, max }))
}
