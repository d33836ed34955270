mod clip;
mod config;
mod eval;
mod hub;
mod logging;
mod source;

use anyhow::{bail, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

use clip::{BackendKind, ClipScorer, OnnxScorer, TorchScorer};
use config::Config;
use source::{GcsImageSource, NamedImage};

/// Which scorer(s) this run exercises
#[derive(Debug, Clone, Copy, PartialEq)]
enum RunMode {
    Single(BackendKind),
    Both,
}

struct CliArgs {
    config_path: Option<PathBuf>,
    bucket: Option<String>,
    prefix: Option<String>,
    images_dir: Option<PathBuf>,
    max_images: Option<usize>,
    seed: Option<u64>,
    tolerance: Option<f32>,
    mode: RunMode,
}

impl CliArgs {
    fn apply_to(&self, config: &mut Config) {
        if let Some(bucket) = &self.bucket {
            config.bucket = Some(bucket.clone());
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        if let Some(dir) = &self.images_dir {
            config.images_dir = Some(dir.clone());
        }
        if let Some(max_images) = self.max_images {
            config.max_images = max_images;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
    }
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> String {
    if *i + 1 < args.len() {
        *i += 1;
        args[*i].clone()
    } else {
        eprintln!("Error: {} requires a value", flag);
        std::process::exit(1);
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for {}: {}", flag, value);
        std::process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = CliArgs {
        config_path: None,
        bucket: None,
        prefix: None,
        images_dir: None,
        max_images: None,
        seed: None,
        tolerance: None,
        mode: RunMode::Both,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("clipscore {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                parsed.config_path = Some(PathBuf::from(take_value(&args, &mut i, "--config")));
            }
            "--bucket" => {
                parsed.bucket = Some(take_value(&args, &mut i, "--bucket"));
            }
            "--prefix" => {
                parsed.prefix = Some(take_value(&args, &mut i, "--prefix"));
            }
            "--images-dir" => {
                parsed.images_dir = Some(PathBuf::from(take_value(&args, &mut i, "--images-dir")));
            }
            "--max-images" => {
                let value = take_value(&args, &mut i, "--max-images");
                parsed.max_images = Some(parse_number(&value, "--max-images"));
            }
            "--seed" => {
                let value = take_value(&args, &mut i, "--seed");
                parsed.seed = Some(parse_number(&value, "--seed"));
            }
            "--tolerance" => {
                let value = take_value(&args, &mut i, "--tolerance");
                parsed.tolerance = Some(parse_number(&value, "--tolerance"));
            }
            "--backend" => {
                let value = take_value(&args, &mut i, "--backend");
                parsed.mode = match value.as_str() {
                    "both" => RunMode::Both,
                    other => match other.parse::<BackendKind>() {
                        Ok(kind) => RunMode::Single(kind),
                        Err(message) => {
                            eprintln!("Error: {}", message);
                            std::process::exit(1);
                        }
                    },
                };
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"clipscore - cross-backend CLIP similarity verification

USAGE:
    clipscore [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --bucket NAME       GCS bucket holding generated images
    --prefix PATH       Object prefix within the bucket
    --images-dir PATH   Sample a local directory instead of GCS
    --max-images N      Sample size cap (default 30)
    --backend KIND      torch, onnx, or both (default both)
    --seed N            RNG seed for reproducible sampling
    --tolerance T       Consistency tolerance (default 1e-3)
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    CLIPSCORE_LOG        Log level (trace, debug, info, warn, error)
    CLIPSCORE_GCS_TOKEN  Bearer token for private buckets

Config file location: $XDG_CONFIG_HOME/clipscore/config.toml"#
    );
}

fn load_images<R: Rng>(config: &Config, rng: &mut R) -> Result<Vec<NamedImage>> {
    if let Some(dir) = &config.images_dir {
        return source::load_random_images_from_dir(dir, config.max_images, rng);
    }

    match &config.bucket {
        Some(bucket) => {
            let gcs = GcsImageSource::new(bucket, &config.prefix);
            gcs.load_random_images(config.max_images, rng)
        }
        None => bail!("No image source configured; pass --bucket or --images-dir"),
    }
}

fn load_scorer(kind: BackendKind, models_dir: &Path) -> Result<Box<dyn ClipScorer>> {
    Ok(match kind {
        BackendKind::Torch => Box::new(TorchScorer::load(models_dir)?),
        BackendKind::Onnx => Box::new(OnnxScorer::load(models_dir)?),
    })
}

fn main() -> Result<()> {
    let args = parse_args();

    // Load configuration, then let CLI flags win
    let mut config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    args.apply_to(&mut config);

    let _ = logging::init(config.log_dir.clone());

    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let images = load_images(&config, &mut rng)?;
    let prompts: Vec<String> = (0..images.len())
        .map(|_| eval::random_caption(&mut rng).to_string())
        .collect();
    tracing::info!(count = images.len(), "Evaluation inputs ready");

    match args.mode {
        RunMode::Single(kind) => {
            let mut scorer = load_scorer(kind, &config.models_dir)?;
            let score = eval::evaluate(&images, &prompts, scorer.as_mut())?;
            tracing::info!(backend = %kind, score, "Aggregate CLIP score");
            println!("{} CLIP score: {:.6}", kind, score);
        }
        RunMode::Both => {
            let mut torch = TorchScorer::load(&config.models_dir)?;
            let mut onnx = OnnxScorer::load(&config.models_dir)?;
            let matched =
                eval::check_consistency(&images, &prompts, &mut torch, &mut onnx, config.tolerance)?;
            println!("{}", if matched { "Matched" } else { "Did not match" });
        }
    }

    Ok(())
}
