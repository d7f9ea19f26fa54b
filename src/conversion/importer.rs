use hecs::Entity;
use log::{debug, info, trace};
use rigport_files::scene::types::{Node, SceneDocument};

use crate::conversion::Milestone;
use crate::conversion::context::ConversionContext;
use crate::conversion::dispatch::BuilderDispatch;
use crate::conversion::error::ConversionError;
use crate::util::transform_from_data;

/// Turns the wire tree into live slots. Only creates and dispatches, everything that needs the
/// complete tree ends up in the context's scheduler.
pub enum GraphImporter {}

impl GraphImporter {
    pub fn import(
        dispatch: &BuilderDispatch,
        ctx: &mut ConversionContext<'_>,
        document: &SceneDocument,
        progress: &mut impl FnMut(Milestone),
    ) -> Result<Entity, ConversionError> {
        progress(Milestone::ConvertingAssets);
        Self::import_assets(dispatch, ctx, document)?;

        progress(Milestone::ConvertingObjects);
        let root = Self::import_nodes(dispatch, ctx, &document.root)?;

        info!(
            "Imported {} nodes and {} assets, {} steps deferred",
            ctx.report.nodes,
            ctx.report.assets,
            ctx.scheduler.pending()
        );
        Ok(root)
    }

    /// All assets before the first node, components resolve them while the tree is being built.
    fn import_assets(
        dispatch: &BuilderDispatch,
        ctx: &mut ConversionContext<'_>,
        document: &SceneDocument,
    ) -> Result<(), ConversionError> {
        for asset in &document.assets {
            dispatch.build_asset(ctx, asset)?;
        }

        debug!("Asset pass done: {} assets", document.assets.len());
        Ok(())
    }

    fn import_nodes(dispatch: &BuilderDispatch, ctx: &mut ConversionContext<'_>, root: &Node) -> Result<Entity, ConversionError> {
        let live_root = Self::import_node(dispatch, ctx, root, None)?;

        // reversed, so siblings are created in document order
        let mut stack = root.children.iter().rev().map(|child| (child, live_root)).collect::<Vec<_>>();
        while let Some((node, parent)) = stack.pop() {
            let slot = Self::import_node(dispatch, ctx, node, Some(parent))?;
            stack.extend(node.children.iter().rev().map(|child| (child, slot)));
        }

        Ok(live_root)
    }

    fn import_node(
        dispatch: &BuilderDispatch,
        ctx: &mut ConversionContext<'_>,
        node: &Node,
        parent: Option<Entity>,
    ) -> Result<Entity, ConversionError> {
        let slot = Self::create_slot(ctx, node, parent)?;
        if parent.is_none() {
            // owned by the context from here on, so a failing component still tears it down
            ctx.root = Some(slot);
        }

        for component in &node.components {
            dispatch.build_component(ctx, slot, component)?;
        }
        Ok(slot)
    }

    fn create_slot(ctx: &mut ConversionContext<'_>, node: &Node, parent: Option<Entity>) -> Result<Entity, ConversionError> {
        let slot = ctx.engine.spawn_slot(node.name.as_str(), parent)?;
        ctx.engine.set_transform(slot, transform_from_data(&node.transform))?;
        ctx.engine.set_active(slot, node.enabled)?;

        if !node.id.is_null() {
            ctx.registry.register(node.id, slot)?;
        }

        trace!("Created slot {:?} for {} ({})", slot, node.name, node.id);
        ctx.report.nodes += 1;
        Ok(slot)
    }
}
