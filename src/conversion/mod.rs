//! Turns a serialized scene document into a wired live graph inside an [`Engine`].
//!
//! The import pass creates every slot, asset and component right away. Whatever needs the rest of
//! the graph first is queued as [`work::DeferredWork`] and drained phase by phase afterwards, with
//! an engine tick between every item.

use hecs::Entity;
use log::{error, info};
use rigport_files::scene::types::SceneDocument;

use crate::conversion::context::{ConversionContext, ConvertedAvatar};
use crate::conversion::dispatch::BuilderDispatch;
use crate::conversion::error::ConversionError;
use crate::conversion::importer::GraphImporter;
use crate::conversion::scheduler::run_all;
use crate::conversion::work::DeferredWork;
use crate::engine::Engine;
use crate::settings::ConversionSettings;

pub mod asset_waiter;
pub mod builders;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod importer;
pub mod registry;
pub mod report;
pub mod rig;
pub mod scheduler;
pub mod work;

/// Coarse progress, reported to whoever started the conversion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Milestone {
    ConvertingAssets,
    ConvertingObjects,
    Finalizing,
    /// Reported by the packaging step, after the conversion returned.
    Exporting,
}

pub struct Converter {
    dispatch: BuilderDispatch,
    settings: ConversionSettings,
}

impl Converter {
    pub fn new(settings: ConversionSettings) -> Result<Self, ConversionError> {
        Ok(Self::with_dispatch(BuilderDispatch::with_default_builders()?, settings))
    }

    pub fn with_dispatch(dispatch: BuilderDispatch, settings: ConversionSettings) -> Self {
        Self { dispatch, settings }
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    /// Converts one document. On error, or when the returned future is dropped early, nothing the
    /// conversion created stays behind in the engine.
    pub async fn convert(
        &self,
        engine: &mut Engine,
        document: &SceneDocument,
        mut progress: impl FnMut(Milestone),
    ) -> Result<ConvertedAvatar, ConversionError> {
        let mut ctx = ConversionContext::new(engine, self.settings.clone())?;

        // ctx is dropped on the error path, which tears the partial tree down
        if let Err(e) = self.run(&mut ctx, document, &mut progress).await {
            error!("Conversion failed: {}", e);
            return Err(e);
        }

        let converted = ctx.commit()?;
        info!("{}", converted.report.summary());
        Ok(converted)
    }

    async fn run(
        &self,
        ctx: &mut ConversionContext<'_>,
        document: &SceneDocument,
        progress: &mut impl FnMut(Milestone),
    ) -> Result<Entity, ConversionError> {
        let root = GraphImporter::import(&self.dispatch, ctx, document, progress)?;

        progress(Milestone::Finalizing);
        ctx.defer(DeferredWork::AnnotateReferences)?;
        ctx.defer(DeferredWork::PrepareForPackaging)?;

        let executed = run_all(ctx).await?;
        info!("Ran {} deferred steps", executed);
        Ok(root)
    }
}
