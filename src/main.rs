use clap::{Parser, Subcommand};
use simple_resize::config::{self, ResizeConfig};
use simple_resize::imaging::{
    self, ConversionRequest, ConvertJob, Enhancements, FormatCatalog, ImageSource, MagickBackend,
    PlanContext, Quality, ResizeSpec, SharpenTier, ValidationError, WorkRoots,
};
use simple_resize::{cleanup, logging, output};
use std::path::{Path, PathBuf};

/// Resize and output-format flags shared by `plan` and `convert`.
#[derive(clap::Args, Clone)]
struct ConvertArgs {
    /// Target width in pixels (needs --height)
    #[arg(long)]
    width: Option<u64>,
    /// Target height in pixels (needs --width)
    #[arg(long)]
    height: Option<u64>,
    /// Scale by a percentage instead of a box; ignored when both width and height are set
    #[arg(long)]
    percentage: Option<u64>,
    /// Output quality, 1-100 (default from config)
    #[arg(long)]
    quality: Option<u64>,
    /// Fit inside the box instead of stretching to it
    #[arg(long)]
    keep_aspect: bool,
    /// With --keep-aspect, never upscale
    #[arg(long)]
    no_enlarge: bool,
    #[arg(long)]
    auto_gamma: bool,
    #[arg(long)]
    auto_level: bool,
    /// Unsharp mask preset: low, standard, high, heavy
    #[arg(long, value_name = "TIER")]
    sharpen: Option<String>,
    /// Output format code (PNG, JPEG, WEBP, ...); default keeps the input's
    #[arg(long)]
    format: Option<String>,
}

impl ConvertArgs {
    fn to_request(&self, config: &ResizeConfig) -> Result<ConversionRequest, ValidationError> {
        Ok(ConversionRequest {
            resize: ResizeSpec::from_fields(
                self.width,
                self.height,
                self.percentage,
                &config.limits,
            )?,
            quality: Quality::new(self.quality.unwrap_or(config.defaults.quality.into()))?,
            keep_aspect: self.keep_aspect,
            no_enlarge: self.no_enlarge,
            enhancements: Enhancements {
                auto_gamma: self.auto_gamma,
                auto_level: self.auto_level,
                sharpen: self.sharpen.as_deref().map(SharpenTier::parse),
            },
            format: self.format.clone(),
        })
    }
}

#[derive(Parser)]
#[command(name = "simple-resize")]
#[command(about = "Classify images and synthesize ImageMagick conversions")]
#[command(long_about = "\
Classify images and synthesize ImageMagick conversions

Every input is classified as photo or graphic, transparent or opaque, and
gets a ranked list of output formats the installed ImageMagick can write.
Conversions are planned as explicit magick/exiftool invocations before
anything runs; camera RAW files are converted through their embedded JPEG
preview.

Working directories:

  uploads/      inputs must live here (--upload-dir)
  output/       results and scratch files land here (--output-dir)

Output files are named <stem>_rsz.<ext>.

Run 'simple-resize gen-config' to generate a documented simple-resize.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./simple-resize.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Input directory; overrides paths.upload_dir
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Output directory; overrides paths.output_dir
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List formats the installed backend can read or write
    Formats {
        /// Query the backend again instead of using the cached listing
        #[arg(long)]
        refresh: bool,
    },
    /// Classify files, report their dimensions and recommended formats
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Recommend one set of formats for a batch of files
    Recommend {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Show the commands a conversion would run, without running them
    Plan {
        file: PathBuf,
        #[command(flatten)]
        args: ConvertArgs,
    },
    /// Convert files into the output directory
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        args: ConvertArgs,
    },
    /// Delete stale files from the upload and output directories
    Cleanup {
        /// Age threshold; default from cleanup.max_age_hours
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
    /// Print a stock simple-resize.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match &cli.command {
        Command::Formats { refresh } => {
            let config = load_settings(&cli)?;
            let backend = MagickBackend::new(&config.tools);
            let catalog = FormatCatalog::global();
            let available = if *refresh {
                catalog.refresh(&backend)
            } else {
                catalog.available(&backend)
            };
            output::print_formats(&available, imaging::categories());
        }
        Command::Inspect { files, json } => {
            let config = load_settings(&cli)?;
            let backend = MagickBackend::new(&config.tools);
            let available = FormatCatalog::global().available(&backend);
            let inspections: Vec<_> = files
                .iter()
                .map(|f| imaging::inspect(&backend, f, &config, &available))
                .collect();
            if *json {
                println!("{}", serde_json::to_string_pretty(&inspections)?);
            } else {
                for inspection in &inspections {
                    output::print_inspection(inspection);
                }
            }
        }
        Command::Recommend { files, json } => {
            let config = load_settings(&cli)?;
            let backend = MagickBackend::new(&config.tools);
            let available = FormatCatalog::global().available(&backend);
            let batch = imaging::recommend_for_paths(files, &config, &available);
            if *json {
                println!("{}", serde_json::to_string_pretty(&batch)?);
            } else {
                output::print_batch_recommendation(&batch);
            }
        }
        Command::Plan { file, args } => {
            let config = load_settings(&cli)?;
            let backend = MagickBackend::new(&config.tools);
            let request = args.to_request(&config)?;
            let roots = work_roots(&config)?;
            let available = FormatCatalog::global().available(&backend);
            let ctx = PlanContext {
                roots: &roots,
                available: &available,
                limits: &config.limits,
            };
            let source = ImageSource::from_path(file);
            let destination = roots
                .output()
                .join(imaging::output_file_name(&source, request.format.as_deref()));
            let plan = source.build_plan(&backend, &destination, &request, ctx)?;
            output::print_plan(&plan);
        }
        Command::Convert { files, args } => {
            let config = load_settings(&cli)?;
            let backend = MagickBackend::new(&config.tools);
            let request = args.to_request(&config)?;
            let roots = work_roots(&config)?;
            let available = FormatCatalog::global().available(&backend);
            let ctx = PlanContext {
                roots: &roots,
                available: &available,
                limits: &config.limits,
            };
            let jobs: Vec<ConvertJob> = files
                .iter()
                .map(|source| ConvertJob {
                    source: source.clone(),
                    request: request.clone(),
                })
                .collect();
            let report = imaging::convert_batch(&backend, &jobs, ctx);
            output::print_batch_report(&report);
            if !report.is_complete() {
                return Err(format!(
                    "{} of {} conversions failed",
                    report.failures.len(),
                    jobs.len()
                )
                .into());
            }
        }
        Command::Cleanup { max_age_hours } => {
            let config = load_settings(&cli)?;
            let hours = max_age_hours.unwrap_or(config.cleanup.max_age_hours);
            let dirs = [
                config.paths.upload_dir.as_path(),
                config.paths.output_dir.as_path(),
            ];
            let stats = cleanup::sweep_all(dirs, cleanup::max_age_from_hours(hours));
            output::print_cleanup(&dirs, &stats);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file, apply directory overrides from the command line,
/// and size the rayon pool.
fn load_settings(cli: &Cli) -> Result<ResizeConfig, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(Path::new("."))?,
    };
    if let Some(dir) = &cli.upload_dir {
        config.paths.upload_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.paths.output_dir = dir.clone();
    }
    init_thread_pool(&config.processing);
    Ok(config)
}

/// Create the working directories if needed and canonicalize them.
fn work_roots(config: &ResizeConfig) -> std::io::Result<WorkRoots> {
    std::fs::create_dir_all(&config.paths.upload_dir)?;
    std::fs::create_dir_all(&config.paths.output_dir)?;
    WorkRoots::new(&config.paths.upload_dir, &config.paths.output_dir)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
