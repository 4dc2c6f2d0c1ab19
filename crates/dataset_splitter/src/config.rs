//! Optional TOML defaults for the splitter.
//!
//! Every field is optional; command line flags take precedence.
//!
//! ```toml
//! output = "engine.tri"
//! num_clusters = 64
//! strategy = "median"
//! pick = "most-primitives"
//!
//! [volume]
//! dims = [512, 512, 256]
//! type = "uint16"
//! ```

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use sort_last::{PickRule, SplitStrategy};
use std::path::{Path, PathBuf};

/// Split plane placement for meshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
	/// Midpoint of the domain bounds.
	Middle,
	/// Median triangle centroid.
	Median,
}

impl From<Strategy> for SplitStrategy {
	fn from(strategy: Strategy) -> Self {
		match strategy {
			Strategy::Middle => SplitStrategy::Middle,
			Strategy::Median => SplitStrategy::Median,
		}
	}
}

/// Which mesh domain is split next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Pick {
	/// Domain with the largest bounds volume.
	LargestVolume,
	/// Domain with the most triangles.
	MostPrimitives,
}

impl From<Pick> for PickRule {
	fn from(pick: Pick) -> Self {
		match pick {
			Pick::LargestVolume => PickRule::LargestVolume,
			Pick::MostPrimitives => PickRule::MostPrimitives,
		}
	}
}

/// Root configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Output file.
	pub output: Option<PathBuf>,
	/// Number of clusters to produce.
	pub num_clusters: Option<usize>,
	pub strategy: Option<Strategy>,
	pub pick: Option<Pick>,
	/// Raw volume description.
	pub volume: VolumeConfig,
}

/// Layout of a raw volume input.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VolumeConfig {
	pub dims: Option<[i32; 3]>,
	/// Bytes per component (1, 2 or 4).
	pub bpc: Option<u32>,
	/// Scalar type name (`uint8`, `uint16` or `float`).
	#[serde(rename = "type")]
	pub scalar_type: Option<String>,
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::from_toml(&content).with_context(|| format!("Invalid config file: {}", path.display()))
	}

	pub fn from_toml(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).context("Failed to parse config TOML")?;

		if config.num_clusters == Some(0) {
			anyhow::bail!("num_clusters must be positive");
		}
		if let Some(dims) = config.volume.dims {
			if dims.iter().any(|&d| d <= 0) {
				anyhow::bail!("volume dims must be positive, got {:?}", dims);
			}
		}

		Ok(config)
	}
}
