//! Offline dataset splitter.
//!
//! Splits a triangle mesh (`.obj`) or a raw structured volume (`.raw`) into
//! spatially disjoint clusters and writes a partitioned file that ranks load
//! with `sort_last::load_mesh` / `sort_last::load_volume`.
//!
//! ```text
//! split_dataset bunny.obj -n 16 -o bunny.tri
//! split_dataset skull.raw -dims 256 256 256 -type uint8 -n 8 -o skull.vol
//! ```

mod config;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use glam::IVec3;
use sort_last::{
	load_obj, save_mesh_file, save_volume_file, MeshSplitter, RawVolume, ScalarType, SplitConfig,
	VolumeSplitter,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, Pick, Strategy};

const DEFAULT_OUTPUT: &str = "chopSuey.tri";

/// Flags accepted with a single dash for compatibility with older scripts.
const LEGACY_FLAGS: [&str; 3] = ["-dims", "-bpc", "-type"];

/// Splits meshes and volumes into partitioned cluster files.
#[derive(Parser, Debug)]
#[command(name = "split_dataset")]
#[command(about = "Splits a mesh (.obj) or raw volume (.raw) into spatial clusters")]
struct Args {
	/// Input file (.obj mesh or .raw volume).
	input: PathBuf,

	/// Output file.
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Number of clusters to produce.
	#[arg(short = 'n', long)]
	num_clusters: Option<usize>,

	/// Volume dimensions (raw input only).
	#[arg(long, num_args = 3, value_names = ["X", "Y", "Z"])]
	dims: Option<Vec<i32>>,

	/// Volume bytes per component: 1, 2 or 4 (raw input only).
	#[arg(long, conflicts_with = "scalar_type")]
	bpc: Option<u32>,

	/// Volume scalar type: uint8, uint16 or float (raw input only).
	#[arg(long = "type", id = "scalar_type")]
	scalar_type: Option<ScalarType>,

	/// Mesh split plane placement.
	#[arg(long, value_enum)]
	strategy: Option<Strategy>,

	/// Which mesh domain is split next (defaults to the strategy's pairing).
	#[arg(long, value_enum)]
	pick: Option<Pick>,

	/// TOML file with defaults for the options above.
	#[arg(short, long)]
	config: Option<PathBuf>,
}

/// Input kinds, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputKind {
	Mesh,
	Volume,
}

impl InputKind {
	fn from_path(path: &Path) -> Option<Self> {
		let extension = path.extension()?.to_str()?.to_ascii_lowercase();
		match extension.as_str() {
			"obj" => Some(InputKind::Mesh),
			"raw" => Some(InputKind::Volume),
			_ => None,
		}
	}
}

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();

	let args = Args::parse_from(normalize_legacy_flags(std::env::args_os()));
	let config = match &args.config {
		Some(path) => Config::load(path)?,
		None => Config::default(),
	};

	let Some(kind) = InputKind::from_path(&args.input) else {
		usage_error(
			ErrorKind::InvalidValue,
			format!("unsupported input '{}' (expected .obj or .raw)", args.input.display()),
		);
	};

	let output = args
		.output
		.clone()
		.or_else(|| config.output.clone())
		.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
	let num_clusters = args.num_clusters.or(config.num_clusters).unwrap_or(1);
	if num_clusters == 0 {
		usage_error(ErrorKind::InvalidValue, "number of clusters must be positive");
	}

	match kind {
		InputKind::Mesh => split_mesh(&args, &config, num_clusters, &output),
		InputKind::Volume => split_volume(&args, &config, num_clusters, &output),
	}
}

fn split_mesh(args: &Args, config: &Config, num_clusters: usize, output: &Path) -> Result<()> {
	let mut split_config = SplitConfig::new(num_clusters);
	if let Some(strategy) = args.strategy.or(config.strategy) {
		split_config = split_config.with_strategy(strategy.into());
	}
	if let Some(pick) = args.pick.or(config.pick) {
		split_config = split_config.with_pick(pick.into());
	}

	let mut mesh = load_obj(&args.input).with_context(|| format!("Failed to load mesh: {}", args.input.display()))?;
	info!(
		clusters = num_clusters,
		strategy = ?split_config.strategy,
		pick = ?split_config.pick,
		"splitting mesh"
	);

	let domains = MeshSplitter::new(split_config)
		.split(&mut mesh)
		.context("Mesh split failed")?;
	save_mesh_file(output, &mesh, &domains)
		.with_context(|| format!("Failed to write: {}", output.display()))?;

	info!(output = %output.display(), clusters = domains.len(), "done");
	Ok(())
}

fn split_volume(args: &Args, config: &Config, num_clusters: usize, output: &Path) -> Result<()> {
	let dims = match args.dims.as_deref() {
		Some(&[x, y, z]) => IVec3::new(x, y, z),
		Some(_) => usage_error(ErrorKind::WrongNumberOfValues, "--dims takes three values"),
		None => match config.volume.dims {
			Some(dims) => IVec3::from_array(dims),
			None => usage_error(ErrorKind::MissingRequiredArgument, "raw volumes need --dims X Y Z"),
		},
	};
	if dims.cmple(IVec3::ZERO).any() {
		usage_error(ErrorKind::InvalidValue, format!("volume dims must be positive, got {}", dims));
	}
	let scalar = resolve_scalar_type(args, config)?;

	let mut volume = RawVolume::open(&args.input, dims, scalar)
		.with_context(|| format!("Failed to open volume: {}", args.input.display()))?;
	let domains = VolumeSplitter::new(num_clusters)
		.split(dims)
		.context("Volume split failed")?;
	save_volume_file(output, &mut volume, &domains)
		.with_context(|| format!("Failed to write: {}", output.display()))?;

	info!(output = %output.display(), clusters = domains.len(), "done");
	Ok(())
}

/// Scalar type from `--type`, then `--bpc`, then the config file.
fn resolve_scalar_type(args: &Args, config: &Config) -> Result<ScalarType> {
	if let Some(scalar) = args.scalar_type {
		return Ok(scalar);
	}
	if let Some(bpc) = args.bpc {
		return Ok(ScalarType::from_bpc(bpc)?);
	}
	if let Some(name) = &config.volume.scalar_type {
		return name.parse::<ScalarType>().map_err(anyhow::Error::msg);
	}
	if let Some(bpc) = config.volume.bpc {
		return Ok(ScalarType::from_bpc(bpc)?);
	}
	usage_error(
		ErrorKind::MissingRequiredArgument,
		"raw volumes need --type <uint8|uint16|float> or --bpc <1|2|4>",
	)
}

/// Rewrite `-dims`, `-bpc` and `-type` to their double-dash forms.
fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
	I: IntoIterator<Item = OsString>,
{
	args.into_iter()
		.map(|arg| match arg.to_str() {
			Some(flag) if LEGACY_FLAGS.contains(&flag) => OsString::from(format!("-{}", flag)),
			_ => arg,
		})
		.collect()
}

/// Print usage with `message` to stderr and exit with a failure code.
fn usage_error(kind: ErrorKind, message: impl std::fmt::Display) -> ! {
	Args::command().error(kind, message).exit()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(args: &[&str]) -> Result<Args, clap::Error> {
		let args = normalize_legacy_flags(args.iter().map(OsString::from));
		Args::try_parse_from(args)
	}

	#[test]
	fn test_legacy_flags_normalized() {
		let args = parse(&[
			"split_dataset",
			"skull.raw",
			"-dims",
			"256",
			"128",
			"64",
			"-type",
			"uint16",
			"-n",
			"8",
			"-o",
			"skull.vol",
		])
		.unwrap();

		assert_eq!(args.dims, Some(vec![256, 128, 64]));
		assert_eq!(args.scalar_type, Some(ScalarType::U16));
		assert_eq!(args.num_clusters, Some(8));
		assert_eq!(args.output, Some(PathBuf::from("skull.vol")));
	}

	#[test]
	fn test_mesh_options() {
		let args = parse(&["split_dataset", "bunny.obj", "--strategy", "middle", "--pick", "most-primitives"]).unwrap();
		assert_eq!(args.strategy, Some(Strategy::Middle));
		assert_eq!(args.pick, Some(Pick::MostPrimitives));
		assert!(args.output.is_none());
	}

	#[test]
	fn test_bad_arguments_rejected() {
		assert!(parse(&["split_dataset"]).is_err());
		assert!(parse(&["split_dataset", "a.raw", "-dims", "1", "2"]).is_err());
		assert!(parse(&["split_dataset", "a.raw", "-type", "double"]).is_err());
		assert!(parse(&["split_dataset", "a.raw", "-bpc", "2", "-type", "uint16"]).is_err());
		assert!(parse(&["split_dataset", "a.obj", "-n", "many"]).is_err());
	}

	#[test]
	fn test_input_kind() {
		assert_eq!(InputKind::from_path(Path::new("a/b.OBJ")), Some(InputKind::Mesh));
		assert_eq!(InputKind::from_path(Path::new("vol.raw")), Some(InputKind::Volume));
		assert_eq!(InputKind::from_path(Path::new("mesh.ply")), None);
		assert_eq!(InputKind::from_path(Path::new("noext")), None);
	}

	#[test]
	fn test_scalar_type_resolution() {
		let config = Config::from_toml("[volume]\nbpc = 4").unwrap();
		let args = parse(&["split_dataset", "a.raw"]).unwrap();
		assert_eq!(resolve_scalar_type(&args, &config).unwrap(), ScalarType::F32);

		let args = parse(&["split_dataset", "a.raw", "-bpc", "1"]).unwrap();
		assert_eq!(resolve_scalar_type(&args, &config).unwrap(), ScalarType::U8);

		let args = parse(&["split_dataset", "a.raw", "-bpc", "3"]).unwrap();
		assert!(resolve_scalar_type(&args, &config).is_err());
	}
}
