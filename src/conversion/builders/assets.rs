use std::sync::Arc;

use glam::Vec3;
use hecs::Entity;
use log::trace;
use rigport_files::common::types::AssetId;
use rigport_files::scene::types::{Asset, AssetPayload, RenderMode};

use crate::conversion::asset_waiter::{AssetLoadWaiter, LoadOutcome};
use crate::conversion::context::ConversionContext;
use crate::conversion::error::ConversionError;
use crate::conversion::work::DeferredWork;
use crate::engine::assets::{AssetName, BlendMode, MaterialAsset, MeshAsset, TextureAsset};
use crate::rendering::importer::mesh_importer::MeshImporter;
use crate::util::array_as_color;

fn unexpected(asset: &Asset) -> ConversionError {
    ConversionError::UnknownType {
        tag: asset.payload.type_tag().to_string(),
    }
}

pub fn build_texture(ctx: &mut ConversionContext<'_>, asset: &Asset, name: String) -> Result<Entity, ConversionError> {
    let AssetPayload::Texture(data) = &asset.payload else {
        return Err(unexpected(asset));
    };

    let source = data.file.as_deref().map(|file| ctx.resolve_path(file));
    let texture = ctx.engine.attach_bundle(
        ctx.assets_root,
        (
            AssetName(name),
            TextureAsset {
                width: data.width,
                height: data.height,
                has_alpha: data.has_alpha,
                source: source.clone(),
                format: None,
                byte_len: 0,
            },
        ),
    )?;

    let (world, pipeline) = ctx.engine.world_and_pipeline();
    match source {
        Some(path) => {
            pipeline.submit_texture_load(world, texture, path)?;
            ctx.defer(DeferredWork::AwaitAsset {
                asset: texture,
                required: false,
            })?;
        }
        None => pipeline.mark_ready(world, texture)?,
    }

    Ok(texture)
}

pub fn build_material(ctx: &mut ConversionContext<'_>, asset: &Asset, name: String) -> Result<Entity, ConversionError> {
    let AssetPayload::Material(data) = &asset.payload else {
        return Err(unexpected(asset));
    };

    let blend = match data.render_mode {
        RenderMode::Opaque => BlendMode::Opaque,
        RenderMode::Cutout => BlendMode::Cutout {
            threshold: data.alpha_cutoff,
        },
        RenderMode::Transparent => BlendMode::Transparent,
    };

    let material = ctx.engine.attach_bundle(
        ctx.assets_root,
        (
            AssetName(name),
            MaterialAsset {
                family: data.family.clone(),
                blend,
                color: array_as_color(data.color),
                main_texture: None,
                normal_map: None,
                emission_map: None,
                emission_color: Vec3::from_array(data.emission_color),
            },
        ),
    )?;

    let (world, pipeline) = ctx.engine.world_and_pipeline();
    pipeline.mark_ready(world, material)?;

    // textures may come later in the asset list
    if !(data.main_texture.is_null() && data.normal_map.is_null() && data.emission_map.is_null()) {
        ctx.defer(DeferredWork::ResolveMaterialTextures {
            material,
            main_texture: data.main_texture,
            normal_map: data.normal_map,
            emission_map: data.emission_map,
        })?;
    }

    Ok(material)
}

pub fn build_mesh(ctx: &mut ConversionContext<'_>, asset: &Asset, name: String) -> Result<Entity, ConversionError> {
    let AssetPayload::Mesh(data) = &asset.payload else {
        return Err(unexpected(asset));
    };

    let Some(mesh_data) = &data.data else {
        return Err(ConversionError::AssetLoadFailure {
            asset: asset.id.to_string(),
            reason: match &data.file {
                Some(file) => format!("{} was never loaded", file),
                None => "the mesh has neither inline data nor a file".to_string(),
            },
        });
    };

    let mesh = MeshImporter::create_mesh(mesh_data);
    trace!("Imported mesh {} {:?}", name, mesh);

    let entity = ctx.engine.attach_bundle(
        ctx.assets_root,
        (AssetName(name), MeshAsset { mesh: Arc::new(mesh) }),
    )?;

    let (world, pipeline) = ctx.engine.world_and_pipeline();
    pipeline.submit_mesh_upload(world, entity)?;
    ctx.defer(DeferredWork::AwaitAsset {
        asset: entity,
        required: true,
    })?;

    Ok(entity)
}

/// Main texture, normal map and emission map, in that order.
pub fn resolve_material_textures(
    ctx: &mut ConversionContext<'_>,
    material: Entity,
    textures: [AssetId; 3],
) -> Result<(), ConversionError> {
    let world = ctx.engine.world();
    let [main_texture, normal_map, emission_map] = textures.map(|id| {
        let texture = ctx.registry.resolve_weak::<TextureAsset, _>(world, id);
        (id, texture)
    });

    for (id, texture) in [main_texture, normal_map, emission_map] {
        if !id.is_null() && texture.is_none() {
            ctx.report
                .warn(format!("Material {:?} references {}, which is not a texture we have", material, id));
        }
    }

    let mut live = ctx.engine.world().get::<&mut MaterialAsset>(material)?;
    live.main_texture = main_texture.1;
    live.normal_map = normal_map.1;
    live.emission_map = emission_map.1;
    Ok(())
}

pub async fn await_asset(ctx: &mut ConversionContext<'_>, asset: Entity, required: bool) -> Result<(), ConversionError> {
    let timeout = ctx.settings.asset_load_timeout;
    match AssetLoadWaiter::wait_until_loaded(ctx.engine, asset, timeout).await {
        Ok(LoadOutcome::Ready) => Ok(()),
        Ok(LoadOutcome::TimedOut { .. }) => {
            ctx.report.timed_out_assets.push(asset_label(ctx, asset));
            Ok(())
        }
        Err(ConversionError::AssetLoadFailure { asset: label, reason }) if !required => {
            ctx.report
                .warn(format!("Optional asset {} failed to load: {}", label, reason));
            ctx.report.failed_optional_assets.push(label);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn asset_label(ctx: &ConversionContext<'_>, asset: Entity) -> String {
    ctx.engine
        .world()
        .get::<&AssetName>(asset)
        .map(|name| name.0.clone())
        .unwrap_or_else(|_| format!("{:?}", asset))
}
