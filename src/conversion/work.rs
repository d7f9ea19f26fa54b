use hecs::Entity;
use rigport_files::common::types::AssetId;
use rigport_files::scene::types::{
    AvatarDescriptorData, DynamicBoneChainData, HumanoidBoneBinding, SkinnedMeshRendererData,
};

use crate::conversion::builders::{assets, avatar, dynamic_bone, first_person, renderer, rig};
use crate::conversion::context::ConversionContext;
use crate::conversion::error::ConversionError;
use crate::conversion::scheduler::Phase;

/// A piece of deferred setup, as plain data. Builders queue these, `ConversionContext` runs them.
#[derive(Debug)]
pub enum DeferredWork {
    ResolveMaterialTextures {
        material: Entity,
        main_texture: AssetId,
        normal_map: AssetId,
        emission_map: AssetId,
    },
    BindSkinnedMesh {
        renderer: Entity,
        data: SkinnedMeshRendererData,
    },
    WireDynamicBoneChain {
        chain: Entity,
        data: DynamicBoneChainData,
    },
    EnterRigScope {
        rig_root: Entity,
        bones: Vec<HumanoidBoneBinding>,
    },
    SetupAvatar {
        descriptor: Entity,
        data: AvatarDescriptorData,
    },
    ExitRigScope {
        rig_root: Entity,
    },
    PartitionFirstPerson {
        renderer: Entity,
    },
    AwaitAsset {
        asset: Entity,
        required: bool,
    },
    AnnotateReferences,
    PrepareForPackaging,
}

impl DeferredWork {
    /// The phase each kind of work belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            DeferredWork::ResolveMaterialTextures { .. }
            | DeferredWork::BindSkinnedMesh { .. }
            | DeferredWork::WireDynamicBoneChain { .. } => Phase::ResolveReferences,
            DeferredWork::EnterRigScope { .. } => Phase::RigSetup,
            DeferredWork::SetupAvatar { .. } => Phase::AvatarSetup,
            DeferredWork::ExitRigScope { .. } => Phase::EnableRig,
            DeferredWork::PartitionFirstPerson { .. } => Phase::PostProcess,
            DeferredWork::AwaitAsset { .. } => Phase::AwaitExternalLoad,
            DeferredWork::AnnotateReferences => Phase::Finalize,
            DeferredWork::PrepareForPackaging => Phase::BeforePackaging,
        }
    }

    pub(crate) async fn execute(self, ctx: &mut ConversionContext<'_>) -> Result<(), ConversionError> {
        match self {
            DeferredWork::ResolveMaterialTextures {
                material,
                main_texture,
                normal_map,
                emission_map,
            } => assets::resolve_material_textures(ctx, material, [main_texture, normal_map, emission_map]),
            DeferredWork::BindSkinnedMesh { renderer, data } => renderer::bind_skinned_mesh(ctx, renderer, &data),
            DeferredWork::WireDynamicBoneChain { chain, data } => dynamic_bone::wire_chain(ctx, chain, &data),
            DeferredWork::EnterRigScope { rig_root, bones } => rig::enter_rig_scope(ctx, rig_root, &bones),
            DeferredWork::SetupAvatar { descriptor, data } => avatar::setup_avatar(ctx, descriptor, &data),
            DeferredWork::ExitRigScope { rig_root } => rig::exit_rig_scope(ctx, rig_root),
            DeferredWork::PartitionFirstPerson { renderer } => first_person::partition_renderer(ctx, renderer),
            DeferredWork::AwaitAsset { asset, required } => assets::await_asset(ctx, asset, required).await,
            DeferredWork::AnnotateReferences => ctx.annotate_references(),
            DeferredWork::PrepareForPackaging => ctx.prepare_for_packaging(),
        }
    }
}
