use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use hecs::Entity;
use itertools::Itertools;
use log::{debug, trace, warn};

use crate::conversion::error::ConversionError;
use crate::conversion::registry::IdentifierRegistry;
use crate::conversion::report::ConversionReport;
use crate::conversion::rig::renamer::RenameScope;
use crate::conversion::scheduler::{Phase, PhaseExecutor, PhaseScheduler};
use crate::conversion::work::DeferredWork;
use crate::engine::Engine;
use crate::engine::assets::{AssetName, MaterialAsset};
use crate::engine::components::avatar::RigDetectionRequest;
use crate::engine::components::hierarchy::SourceReference;
use crate::settings::ConversionSettings;

/// The result of a successful conversion. The live tree stays in the engine's world.
#[derive(Debug)]
pub struct ConvertedAvatar {
    pub root: Entity,
    pub registry: IdentifierRegistry,
    pub report: ConversionReport,
}

/// Per-conversion state. Owns the partially built live tree: unless `commit` is called, dropping
/// the context destroys everything it created.
pub struct ConversionContext<'e> {
    pub engine: &'e mut Engine,
    pub registry: IdentifierRegistry,
    pub scheduler: PhaseScheduler<DeferredWork>,
    pub settings: ConversionSettings,
    pub report: ConversionReport,
    /// Holds the live assets until packaging moves it under the root.
    pub assets_root: Entity,
    pub root: Option<Entity>,
    /// Slots whose subtree is hidden in first person unless a visibility flag says otherwise.
    pub hidden_in_first_person: HashSet<Entity>,
    rig_scopes: HashMap<Entity, RenameScope>,
    stable_ids: HashMap<String, Entity>,
    asset_names: HashSet<String>,
    invisible_material: Option<Entity>,
    committed: bool,
}

impl<'e> ConversionContext<'e> {
    pub fn new(engine: &'e mut Engine, settings: ConversionSettings) -> Result<Self, ConversionError> {
        let assets_root = engine.spawn_slot("Assets", None)?;

        Ok(Self {
            engine,
            registry: IdentifierRegistry::new(),
            scheduler: PhaseScheduler::new(),
            settings,
            report: ConversionReport::default(),
            assets_root,
            root: None,
            hidden_in_first_person: HashSet::new(),
            rig_scopes: HashMap::new(),
            stable_ids: HashMap::new(),
            asset_names: HashSet::new(),
            invisible_material: None,
            committed: false,
        })
    }

    pub fn defer(&mut self, work: DeferredWork) -> Result<(), ConversionError> {
        self.scheduler.defer(work.phase(), work)
    }

    pub fn resolve_path(&self, file: &str) -> PathBuf {
        match &self.settings.asset_base_dir {
            Some(base) => base.join(file),
            None => PathBuf::from(file),
        }
    }

    /// A previously built asset with the same stable identifier, if any.
    pub fn shared_asset(&self, stable_id: Option<&str>) -> Option<Entity> {
        stable_id.and_then(|stable_id| self.stable_ids.get(stable_id).copied())
    }

    pub fn remember_stable_id(&mut self, stable_id: Option<&str>, asset: Entity) {
        if let Some(stable_id) = stable_id {
            self.stable_ids.insert(stable_id.to_string(), asset);
        }
    }

    /// Keeps packaged asset names unique. A taken name gets a short suffix of the stable
    /// identifier first, then a counter until the name is free.
    pub fn unique_asset_name(&mut self, name: &str, stable_id: Option<&str>) -> String {
        let base = match stable_id {
            Some(stable_id) if self.asset_names.contains(name) => {
                format!("{}_{}", name, crate::util::short_id(stable_id, 8))
            }
            _ => name.to_string(),
        };

        let mut unique = base.clone();
        let mut counter = 1;
        while self.asset_names.contains(&unique) {
            unique = format!("{}_{}", base, counter);
            counter += 1;
        }

        if unique != name {
            debug!("Asset name {} is taken, using {}", name, unique);
        }
        self.asset_names.insert(unique.clone());
        unique
    }

    /// The shared material used to hide submeshes, created on first use.
    pub fn invisible_material(&mut self) -> Result<Entity, ConversionError> {
        if let Some(material) = self.invisible_material {
            return Ok(material);
        }

        let name = self.unique_asset_name("Invisible", None);
        let material = self.engine.attach_bundle(
            self.assets_root,
            (AssetName(name), MaterialAsset::invisible()),
        )?;
        let (world, pipeline) = self.engine.world_and_pipeline();
        pipeline.mark_ready(world, material)?;

        self.invisible_material = Some(material);
        Ok(material)
    }

    pub fn open_rig_scope(&mut self, scope: RenameScope) {
        if let Some(previous) = self.rig_scopes.insert(scope.root(), scope) {
            warn!("A rename scope for {:?} was still open, restoring it first", previous.root());
            previous.restore(self.engine);
        }
    }

    pub fn close_rig_scope(&mut self, rig_root: Entity) -> Option<usize> {
        let scope = self.rig_scopes.remove(&rig_root)?;
        Some(scope.restore(self.engine))
    }

    pub fn annotate_references(&mut self) -> Result<(), ConversionError> {
        if !self.settings.annotate_references {
            return Ok(());
        }

        // sorted, so de-duplicated assets consistently keep the lowest identifier
        let objects = self.registry.objects().map(|(id, entity)| (id.0, false, entity));
        let assets = self.registry.assets().map(|(id, entity)| (id.0, true, entity));
        let mut annotated = 0;

        for (id, is_asset, entity) in objects.chain(assets).sorted_by_key(|(id, is_asset, _)| (*is_asset, *id)) {
            let world = self.engine.world_mut();
            if world.get::<&SourceReference>(entity).is_ok() {
                continue;
            }
            world.insert_one(entity, SourceReference { id, is_asset })?;
            annotated += 1;
        }

        trace!("Annotated {} live objects with their source identifier", annotated);
        Ok(())
    }

    pub fn prepare_for_packaging(&mut self) -> Result<(), ConversionError> {
        let root = self.root.ok_or(ConversionError::MissingEntity(self.assets_root))?;
        self.engine.set_parent(self.assets_root, Some(root))?;

        let pending_requests = self
            .engine
            .subtree(root)
            .into_iter()
            .filter(|&slot| self.engine.world().get::<&RigDetectionRequest>(slot).is_ok())
            .collect_vec();
        for slot in pending_requests {
            self.report.warn(format!("Rig detection on {:?} never ran", slot));
            self.engine.world_mut().remove_one::<RigDetectionRequest>(slot)?;
        }

        let leftover = self.rig_scopes.keys().copied().collect_vec();
        for rig_root in leftover {
            self.report
                .warn(format!("Bone names below {:?} were still renamed, restoring them", rig_root));
            self.close_rig_scope(rig_root);
        }

        Ok(())
    }

    /// Hands the live tree over to the caller.
    pub fn commit(mut self) -> Result<ConvertedAvatar, ConversionError> {
        let root = self.root.ok_or(ConversionError::MissingEntity(self.assets_root))?;
        self.committed = true;

        Ok(ConvertedAvatar {
            root,
            registry: std::mem::take(&mut self.registry),
            report: std::mem::take(&mut self.report),
        })
    }
}

impl PhaseExecutor for ConversionContext<'_> {
    type Work = DeferredWork;

    fn scheduler(&mut self) -> &mut PhaseScheduler<DeferredWork> {
        &mut self.scheduler
    }

    async fn execute(&mut self, _phase: Phase, work: DeferredWork) -> Result<(), ConversionError> {
        work.execute(self).await?;
        self.report.deferred_work += 1;
        Ok(())
    }

    async fn tick(&mut self) {
        self.engine.tick().await;
    }
}

impl Drop for ConversionContext<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        for (_, scope) in self.rig_scopes.drain() {
            scope.restore(self.engine);
        }

        let mut destroyed = 0;
        if let Some(root) = self.root {
            destroyed += self.engine.destroy(root);
        }
        destroyed += self.engine.destroy(self.assets_root);
        debug!("Conversion abandoned, destroyed {} partially built entities", destroyed);
    }
}
