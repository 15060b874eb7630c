use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use thumbkit::cache::{CacheBackend, FileCache, ImageClass, MemoryCache, invalidation_patterns};
use thumbkit::config::{self, CacheBackendKind, ThumbkitConfig};
use thumbkit::freshness::FreshnessResolver;
use thumbkit::storage::{FileSystemStorage, storage_hash};
use thumbkit::{imaging, inspect, output};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "thumbkit")]
#[command(about = "Image introspection and modified-time caching for thumbnail pipelines")]
#[command(long_about = "\
Image introspection and modified-time caching for thumbnail pipelines

Modified times of images on remote storage are cached under keys of the form
easy:<source|thumbnail>:<name>, so repeated freshness checks skip the
round-trip. Local storage is always queried directly.

Whether a storage is remote, the cache TTL and the cache backend come from
thumbkit.toml. Run 'thumbkit gen-config' to generate a documented one.

Set RUST_LOG=debug to trace cache hits, misses and invalidations.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "thumbkit.toml", global = true)]
    config: PathBuf,

    /// Storage root that image names are resolved against
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClassArg {
    Source,
    Thumbnail,
}

impl From<ClassArg> for ImageClass {
    fn from(arg: ClassArg) -> Self {
        match arg {
            ClassArg::Source => ImageClass::Source,
            ClassArg::Thumbnail => ImageClass::Thumbnail,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the modified time of an image, using the cache for remote storage
    Mtime {
        /// Image name relative to the storage root
        name: String,
        #[arg(long, value_enum, default_value = "source")]
        class: ClassArg,
        /// Only consult the cache; never query storage
        #[arg(long)]
        cache_only: bool,
    },
    /// Decide whether a thumbnail is older than its source and must be rebuilt
    Check {
        /// Source image name
        source: String,
        /// Thumbnail name
        thumbnail: String,
    },
    /// Drop cached modified times of a source image and its thumbnails
    Invalidate {
        /// Source image name
        name: String,
    },
    /// Report entropy, colour mode, transparency and EXIF orientation
    Inspect {
        /// Image files or directories to walk
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Write an upright copy of an image with its EXIF orientation applied
    Orient { input: PathBuf, output: PathBuf },
    /// Print a stock thumbkit.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Mtime {
            name,
            class,
            cache_only,
        } => {
            let config = config::load_config(&cli.config)?;
            let resolver = FreshnessResolver::new(config.freshness(), open_cache(&config)?);
            let storage = open_storage(&cli.root);

            let class = ImageClass::from(class);
            let freshness = resolver.resolve_modified_time(&storage, &name, class, cache_only)?;
            output::print_mtime(&name, class, resolver.config().is_remote(class), freshness);
        }
        Command::Check { source, thumbnail } => {
            let config = config::load_config(&cli.config)?;
            let resolver = FreshnessResolver::new(config.freshness(), open_cache(&config)?);
            let storage = open_storage(&cli.root);

            let source_state =
                resolver.resolve_modified_time(&storage, &source, ImageClass::Source, false)?;
            let thumbnail_state = resolver.resolve_modified_time(
                &storage,
                &thumbnail,
                ImageClass::Thumbnail,
                false,
            )?;
            output::print_check(&source, &thumbnail, source_state, thumbnail_state);
        }
        Command::Invalidate { name } => {
            let config = config::load_config(&cli.config)?;
            let resolver = FreshnessResolver::new(config.freshness(), open_cache(&config)?);
            resolver.invalidate(&name)?;
            output::print_invalidate(&name, &invalidation_patterns(&name));
        }
        Command::Inspect { paths } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let files = inspect::collect_images(&paths);
            let results = inspect::inspect_all(&files);
            output::print_inspect(&results);
        }
        Command::Orient { input, output } => {
            orient(&input, &output)?;
            println!("{} → {}", input.display(), output.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open_cache(config: &ThumbkitConfig) -> Result<Box<dyn CacheBackend>, Box<dyn std::error::Error>> {
    let cache: Box<dyn CacheBackend> = match config.cache.backend {
        CacheBackendKind::Memory => Box::new(MemoryCache::new()),
        CacheBackendKind::File => Box::new(FileCache::open(Path::new(&config.cache.dir))?),
    };
    Ok(cache)
}

fn open_storage(root: &Path) -> FileSystemStorage {
    let storage = FileSystemStorage::new(root);
    tracing::debug!(
        storage = %storage_hash(&storage),
        root = %storage.root().display(),
        "opened filesystem storage"
    );
    storage
}

/// Size the global rayon pool from `[processing] max_processes`.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn orient(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(input)?;
    let image = imaging::load_oriented(&bytes)?;
    image.save(output)?;
    Ok(())
}
