use std::fs;

use anyhow::Context;
use clap::Parser;
use log::{info, trace, warn};

use rigport::conversion::{Converter, Milestone};
use rigport::engine::Engine;
use rigport::export::PackagedGraph;
use rigport::io::document::load_document;
use rigport::settings::{CliArgs, ConversionSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = CliArgs::parse();
    trace!("Starting with args: {:?}", args);

    let settings = ConversionSettings::from(&args);
    let document = load_document(&args.document)?;

    let mut engine = Engine::new(settings.tick_interval);
    let converter = Converter::new(settings)?;
    let progress = |milestone: Milestone| info!("{:?}", milestone);

    let avatar = converter
        .convert(&mut engine, &document, progress)
        .await
        .with_context(|| format!("Converting {}", args.document.display()))?;

    progress(Milestone::Exporting);
    let graph = PackagedGraph::capture(&engine, avatar.root);
    let json = graph.to_json()?;

    match &args.output {
        Some(output) => {
            fs::write(output, json).with_context(|| format!("Writing {}", output.display()))?;
            info!("Packaged {} slots into {}", graph.slot_count(), output.display());
        }
        None => println!("{}", json),
    }

    if avatar.report.has_warnings() {
        warn!("Finished with warnings: {}", avatar.report.summary());
    } else {
        info!("{}", avatar.report.summary());
    }
    Ok(())
}
