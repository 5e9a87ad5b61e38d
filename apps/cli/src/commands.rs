//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use swangallery_core::pipeline::{BuildResult, ProgressReporter};
use swangallery_core::{load_config, run_build};
use swangallery_discovery::{collect_pages, scan_pages};
use swangallery_gallery::{CardTemplate, rewrite_page};
use swangallery_notebook::{DEFAULT_THEME, HtmlExporter, PageMeta, render_page};
use swangallery_shared::{
    CLONE_FOLDER_QUERY, CONFIG_FILE_NAME, GalleryConfig, NotebookRef, init_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SWAN Gallery: turn notebook links into a rendered gallery.
#[derive(Parser)]
#[command(
    name = "swangallery",
    version,
    about = "Render linked Jupyter notebooks and build gallery pages for a static documentation site.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the config file.
    #[arg(
        short,
        long,
        global = true,
        env = "SWANGALLERY_CONFIG",
        default_value = CONFIG_FILE_NAME
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render every linked notebook into the site and build the galleries.
    Build {
        /// Override the documentation directory from the config file.
        #[arg(long)]
        docs_dir: Option<PathBuf>,

        /// Override the site output directory from the config file.
        #[arg(long)]
        site_dir: Option<PathBuf>,

        /// Write a JSON manifest of the build to this file.
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// List the notebooks linked from the documentation pages.
    Scan {
        /// Override the documentation directory from the config file.
        #[arg(long)]
        docs_dir: Option<PathBuf>,
    },

    /// Render a single notebook page.
    Render {
        /// Notebook to render, as linked from the docs (e.g. `a/b/nb.ipynb`).
        notebook: PathBuf,

        /// Write the page here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output subdirectory used in the page's download URL.
        #[arg(long, default_value = "notebooks")]
        notebook_dir: String,

        /// Treat the notebook as shipped in a zipped folder.
        #[arg(long)]
        clone_folder: bool,

        /// Syntax highlighting theme.
        #[arg(long, default_value = DEFAULT_THEME)]
        theme: String,
    },

    /// Apply the gallery rewrite to built HTML pages in place.
    Rewrite {
        /// HTML pages to rewrite.
        #[arg(required = true)]
        pages: Vec<PathBuf>,

        /// Output subdirectory the notebook assets live under.
        #[arg(long, default_value = "notebooks")]
        notebook_dir: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a starter config file.
    Init {
        /// Where to write it (defaults to `--config`).
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "swangallery=info",
        1 => "swangallery=debug",
        _ => "swangallery=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Build {
            docs_dir,
            site_dir,
            manifest,
        } => cmd_build(&config_path, docs_dir, site_dir, manifest.as_deref()),
        Command::Scan { docs_dir } => cmd_scan(&config_path, docs_dir),
        Command::Render {
            notebook,
            out,
            notebook_dir,
            clone_folder,
            theme,
        } => cmd_render(&notebook, out.as_deref(), &notebook_dir, clone_folder, &theme),
        Command::Rewrite {
            pages,
            notebook_dir,
        } => cmd_rewrite(&pages, &notebook_dir),
        Command::Config { action } => match action {
            ConfigAction::Init { path } => {
                cmd_config_init(path.as_deref().unwrap_or(config_path.as_path()))
            }
            ConfigAction::Show => cmd_config_show(&config_path),
        },
    }
}

/// Load the config file and apply directory overrides from the command line.
fn resolve_config(
    path: &Path,
    docs_dir: Option<PathBuf>,
    site_dir: Option<PathBuf>,
) -> Result<GalleryConfig> {
    let mut config = load_config(path)
        .wrap_err_with(|| format!("cannot load configuration from {}", path.display()))?;
    if let Some(dir) = docs_dir {
        config.docs_dir = dir;
    }
    if let Some(dir) = site_dir {
        config.site_dir = dir;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(
    config_path: &Path,
    docs_dir: Option<PathBuf>,
    site_dir: Option<PathBuf>,
    manifest: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path, docs_dir, site_dir)?;

    info!(
        docs_dir = %config.docs_dir.display(),
        site_dir = %config.site_dir.display(),
        "building notebook gallery"
    );

    let reporter = CliProgress::new();
    let result = run_build(config, &reporter)?;

    if let Some(path) = manifest {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json)
            .wrap_err_with(|| format!("cannot write manifest to {}", path.display()))?;
        info!(path = %path.display(), "wrote build manifest");
    }

    println!();
    println!("  Gallery built successfully!");
    println!("  Pages scanned:  {}", result.pages_scanned);
    println!("  Notebooks:      {}", result.notebooks.len());
    println!("  Files emitted:  {}", result.files.len());
    println!(
        "  Gallery pages:  {} ({} cards)",
        result.rewrite.rewritten, result.rewrite.cards
    );
    if result.rewrite.skipped_links > 0 {
        println!("  Skipped links:  {}", result.rewrite.skipped_links);
    }
    println!("  Time:           {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_scan(config_path: &Path, docs_dir: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config_path, docs_dir, None)?;
    let pages = collect_pages(&config.docs_dir)?;
    let refs = scan_pages(&pages)?;

    info!(pages = pages.len(), notebooks = refs.len(), "scan complete");
    for reference in &refs {
        println!("{reference}");
    }
    Ok(())
}

fn cmd_render(
    notebook: &Path,
    out: Option<&Path>,
    notebook_dir: &str,
    clone_folder: bool,
    theme: &str,
) -> Result<()> {
    let mut link = notebook.to_string_lossy().replace('\\', "/");
    if clone_folder {
        link.push_str(CLONE_FOLDER_QUERY);
    }
    let layout = NotebookRef::parse(&link).layout()?;
    let meta = PageMeta::for_layout(&layout, notebook_dir.trim_matches('/'));

    let raw = std::fs::read(notebook)
        .wrap_err_with(|| format!("cannot read notebook {}", notebook.display()))?;
    let exporter = HtmlExporter::with_theme(theme)?;
    let page = render_page(&raw, &meta, &exporter)?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &page)
                .wrap_err_with(|| format!("cannot write {}", path.display()))?;
            info!(path = %path.display(), "rendered notebook page");
        }
        None => print!("{page}"),
    }
    Ok(())
}

fn cmd_rewrite(pages: &[PathBuf], notebook_dir: &str) -> Result<()> {
    let template = CardTemplate::new();
    let notebook_dir = notebook_dir.trim_matches('/');
    let mut cards = 0;

    for page in pages {
        let html = std::fs::read_to_string(page)
            .wrap_err_with(|| format!("cannot read {}", page.display()))?;
        let rewrite = rewrite_page(&html, &template, notebook_dir);

        if rewrite.is_rewritten() {
            std::fs::write(page, rewrite.html.as_bytes())
                .wrap_err_with(|| format!("cannot write {}", page.display()))?;
            println!("{}: {} card(s)", page.display(), rewrite.cards);
            cards += rewrite.cards;
        } else {
            println!("{}: unchanged", page.display());
        }

        for link in &rewrite.skipped {
            warn!(page = %page.display(), href = %link.href, "skipped: {}", link.reason);
        }
    }

    info!(pages = pages.len(), cards, "rewrite complete");
    Ok(())
}

fn cmd_config_init(path: &Path) -> Result<()> {
    init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: &Path) -> Result<()> {
    let config = resolve_config(config_path, None, None)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid spinner template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn notebook_rendered(&self, reference: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Rendering [{current}/{total}] {reference}"));
    }

    fn page_rewritten(&self, path: &str, cards: usize) {
        self.spinner
            .set_message(format!("Gallery {path} ({cards} cards)"));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}
