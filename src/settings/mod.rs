use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::rendering::common::visibility_partitioner::DEFAULT_EPSILON;

#[derive(Parser, Debug)]
#[command(name = "rigport")]
#[command(version)]
#[command(about = "Converts a serialized avatar rig into a live object graph and packages it")]
pub struct CliArgs {
    /// The scene document (JSON). External mesh blobs are looked up relative to it.
    pub document: PathBuf,

    /// Where to write the packaged graph. Printed to stdout when omitted.
    #[arg(long, short, env = "RIGPORT_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Bone weights at or below this do not hide a vertex in first person.
    #[arg(long, default_value_t = DEFAULT_EPSILON, env = "RIGPORT_EPSILON")]
    pub epsilon: f32,

    #[arg(long, default_value_t = 10_000, env = "RIGPORT_ASSET_TIMEOUT_MS")]
    pub asset_timeout_ms: u64,

    /// 0 only yields between ticks.
    #[arg(long, default_value_t = 0, env = "RIGPORT_TICK_INTERVAL_MS")]
    pub tick_interval_ms: u64,

    /// Skip tagging live objects with the identifier they were built from.
    #[arg(long, env = "RIGPORT_NO_ANNOTATIONS")]
    pub no_annotations: bool,

    /// Keep the head visible in first person even if the avatar asks to hide it.
    #[arg(long, env = "RIGPORT_SHOW_HEAD")]
    pub show_head: bool,
}

/// The knobs of a conversion. The CLI is folded into this, nothing else reaches the core.
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub visibility_epsilon: f32,
    pub asset_load_timeout: Duration,
    pub tick_interval: Duration,
    pub annotate_references: bool,
    pub hide_head_in_first_person: bool,
    /// Texture files are resolved against this.
    pub asset_base_dir: Option<PathBuf>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            visibility_epsilon: DEFAULT_EPSILON,
            asset_load_timeout: Duration::from_secs(10),
            tick_interval: Duration::ZERO,
            annotate_references: true,
            hide_head_in_first_person: true,
            asset_base_dir: None,
        }
    }
}

impl From<&CliArgs> for ConversionSettings {
    fn from(args: &CliArgs) -> Self {
        Self {
            visibility_epsilon: args.epsilon,
            asset_load_timeout: Duration::from_millis(args.asset_timeout_ms),
            tick_interval: Duration::from_millis(args.tick_interval_ms),
            annotate_references: !args.no_annotations,
            hide_head_in_first_person: !args.show_head,
            asset_base_dir: args.document.parent().map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_settings_defaults() {
        let args = CliArgs::parse_from(["rigport", "avatars/test.json"]);
        let settings = ConversionSettings::from(&args);
        let defaults = ConversionSettings::default();

        assert_eq!(settings.visibility_epsilon, defaults.visibility_epsilon);
        assert_eq!(settings.asset_load_timeout, defaults.asset_load_timeout);
        assert!(settings.annotate_references);
        assert_eq!(settings.asset_base_dir, Some(PathBuf::from("avatars")));
    }

    #[test]
    fn flags_override() {
        let args = CliArgs::parse_from([
            "rigport",
            "test.json",
            "--epsilon",
            "0.1",
            "--no-annotations",
            "--asset-timeout-ms",
            "250",
        ]);
        let settings = ConversionSettings::from(&args);

        assert_eq!(settings.visibility_epsilon, 0.1);
        assert_eq!(settings.asset_load_timeout, Duration::from_millis(250));
        assert!(!settings.annotate_references);
    }
}
