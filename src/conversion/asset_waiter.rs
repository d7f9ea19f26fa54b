use std::time::Duration;

use hecs::Entity;
use log::{trace, warn};
use tokio::time::Instant;

use crate::conversion::error::ConversionError;
use crate::engine::Engine;
use crate::engine::assets::{AssetLoad, AssetName, LoadState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    /// Soft failure, the asset may still finish later.
    TimedOut { waited: Duration },
}

pub enum AssetLoadWaiter {}

impl AssetLoadWaiter {
    fn asset_name(engine: &Engine, asset: Entity) -> String {
        engine
            .world()
            .get::<&AssetName>(asset)
            .map(|name| name.0.clone())
            .unwrap_or_else(|_| format!("{:?}", asset))
    }

    /// Ticks the engine until the asset reports ready or failed, or `timeout` runs out.
    /// Assets that never went through the pipeline count as ready.
    pub async fn wait_until_loaded(
        engine: &mut Engine,
        asset: Entity,
        timeout: Duration,
    ) -> Result<LoadOutcome, ConversionError> {
        let started = Instant::now();
        let mut ticks = 0u32;

        loop {
            if !engine.world().contains(asset) {
                return Err(ConversionError::MissingEntity(asset));
            }

            let state = engine
                .world()
                .get::<&AssetLoad>(asset)
                .map(|load| load.state.clone())
                .unwrap_or(LoadState::Ready);

            match state {
                LoadState::Ready => {
                    trace!("{:?} ready after {} ticks", asset, ticks);
                    return Ok(LoadOutcome::Ready);
                }
                LoadState::Failed(reason) => {
                    return Err(ConversionError::AssetLoadFailure {
                        asset: Self::asset_name(engine, asset),
                        reason,
                    });
                }
                LoadState::Pending => {}
            }

            let waited = started.elapsed();
            if waited >= timeout {
                let timeout = ConversionError::AssetLoadTimeout {
                    asset: Self::asset_name(engine, asset),
                    waited_ms: waited.as_millis(),
                };
                warn!("{}, continuing without it", timeout);
                return Ok(LoadOutcome::TimedOut { waited });
            }

            engine.tick().await;
            ticks += 1;
        }
    }
}
