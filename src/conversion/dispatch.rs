use std::collections::HashMap;

use hecs::Entity;
use log::{debug, trace};
use rigport_files::scene::types::{Asset, AssetPayload, Component, ComponentPayload};

use crate::conversion::builders::{assets, avatar, dynamic_bone, first_person, renderer, rig};
use crate::conversion::context::ConversionContext;
use crate::conversion::error::ConversionError;

/// Builds the live component for `component` on `slot` and returns it.
pub type ComponentBuilder =
    fn(ctx: &mut ConversionContext<'_>, slot: Entity, component: &Component) -> Result<Entity, ConversionError>;

/// Builds the live asset, `name` is already made unique.
pub type AssetBuilder =
    fn(ctx: &mut ConversionContext<'_>, asset: &Asset, name: String) -> Result<Entity, ConversionError>;

/// Type tag -> build function tables. Filled once before the first conversion.
#[derive(Clone, Default)]
pub struct BuilderDispatch {
    components: HashMap<&'static str, ComponentBuilder>,
    assets: HashMap<&'static str, AssetBuilder>,
}

impl BuilderDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every type the wire schema knows about.
    pub fn with_default_builders() -> Result<Self, ConversionError> {
        let mut dispatch = Self::new();

        dispatch.register_component("MeshRenderer", renderer::build_mesh_renderer)?;
        dispatch.register_component("SkinnedMeshRenderer", renderer::build_skinned_mesh_renderer)?;
        dispatch.register_component("HumanoidRig", rig::build_humanoid_rig)?;
        dispatch.register_component("AvatarDescriptor", avatar::build_avatar_descriptor)?;
        dispatch.register_component("DynamicBoneChain", dynamic_bone::build_chain)?;
        dispatch.register_component("DynamicBoneCollider", dynamic_bone::build_collider)?;
        dispatch.register_component("FirstPersonVisibility", first_person::build_first_person_visibility)?;

        dispatch.register_asset("Texture", assets::build_texture)?;
        dispatch.register_asset("Material", assets::build_material)?;
        dispatch.register_asset("Mesh", assets::build_mesh)?;

        Ok(dispatch)
    }

    pub fn register_component(&mut self, tag: &'static str, builder: ComponentBuilder) -> Result<(), ConversionError> {
        if self.components.insert(tag, builder).is_some() {
            return Err(ConversionError::DuplicateBuilder { tag: tag.to_string() });
        }
        Ok(())
    }

    pub fn register_asset(&mut self, tag: &'static str, builder: AssetBuilder) -> Result<(), ConversionError> {
        if self.assets.insert(tag, builder).is_some() {
            return Err(ConversionError::DuplicateBuilder { tag: tag.to_string() });
        }
        Ok(())
    }

    pub fn knows_component(&self, tag: &str) -> bool {
        self.components.contains_key(tag)
    }

    pub fn knows_asset(&self, tag: &str) -> bool {
        self.assets.contains_key(tag)
    }

    /// Builds and registers one component. Unknown types are reported and skipped, so their
    /// identifier never resolves.
    pub fn build_component(
        &self,
        ctx: &mut ConversionContext<'_>,
        slot: Entity,
        component: &Component,
    ) -> Result<Option<Entity>, ConversionError> {
        let tag = component.payload.type_tag();
        let builder = match &component.payload {
            ComponentPayload::Unknown { .. } => None,
            _ => self.components.get(tag),
        };
        let Some(builder) = builder else {
            ctx.report.skipped_type(tag);
            return Ok(None);
        };

        let live = builder(ctx, slot, component)?;
        ctx.engine.set_enabled(live, component.enabled)?;
        if !component.id.is_null() {
            ctx.registry.register(component.id, live)?;
        }

        trace!("Built {} {} as {:?}", tag, component.id, live);
        ctx.report.components += 1;
        Ok(Some(live))
    }

    /// Builds and registers one asset. An asset whose stable identifier was seen before is not
    /// built again, its identifier resolves to the earlier asset.
    pub fn build_asset(&self, ctx: &mut ConversionContext<'_>, asset: &Asset) -> Result<Option<Entity>, ConversionError> {
        let tag = asset.payload.type_tag();
        let builder = match &asset.payload {
            AssetPayload::Unknown { .. } => None,
            _ => self.assets.get(tag),
        };
        let Some(builder) = builder else {
            ctx.report.skipped_type(tag);
            return Ok(None);
        };

        let stable_id = asset.stable_id.as_deref();
        if let Some(shared) = ctx.shared_asset(stable_id) {
            debug!("Asset {} ({}) shares its stable id with {:?}", asset.id, asset.name, shared);
            ctx.registry.register(asset.id, shared)?;
            ctx.report.deduplicated_assets += 1;
            return Ok(Some(shared));
        }

        let name = ctx.unique_asset_name(&asset.name, stable_id);
        let live = builder(ctx, asset, name)?;
        if asset.id.is_null() {
            ctx.report
                .warn(format!("Asset {} has no identifier, nothing can reference it", asset.name));
        } else {
            ctx.registry.register(asset.id, live)?;
        }
        ctx.remember_stable_id(stable_id, live);

        trace!("Built {} {} as {:?}", tag, asset.id, live);
        ctx.report.assets += 1;
        Ok(Some(live))
    }
}
