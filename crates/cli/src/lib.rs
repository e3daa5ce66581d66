use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_model::{Preferences, ThemeId};
use lumina_core::{format_file_size, Bookmark, DocumentLoader, LoadedDocument};
use pdf_engine::default_engine;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use storage::Storage;

mod replay;

#[derive(Debug, Parser)]
#[command(name = "lumina-cli")]
#[command(about = "Lumina Reader CLI")]
pub struct Cli {
    /// Preferences directory (defaults to $LUMINA_DATA_DIR, then the platform data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable document metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the bookmark tree of a PDF as JSON.
    Outline {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Drive a session manager from a JSON script and print the final state.
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Show or change stored preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Subcommand)]
enum PrefsAction {
    /// Print the effective preferences as JSON.
    Show,
    /// Set the process-wide theme (dark or light).
    SetTheme {
        #[arg(value_name = "THEME")]
        theme: String,
    },
    /// Set the brightness; values are clamped to 20..=100.
    SetBrightness {
        #[arg(value_name = "PERCENT")]
        value: u8,
    },
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    kind: &'static str,
    size_bytes: u64,
    size: String,
    page_count: u32,
    first_page_size_pt: Option<PageSizeOutput>,
    bookmark_count: usize,
    word_count: Option<usize>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Outline { file } => run_outline(&file),
        Commands::Replay { script } => {
            let preferences = load_preferences_or_default(cli.data_dir);
            replay::run_script(&script, preferences)
        }
        Commands::Prefs { action } => run_prefs(cli.data_dir, action),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_document(file: &Path) -> Result<LoadedDocument> {
    let mut loader = DocumentLoader::new(default_engine());
    loader.load(file).context("failed to open document")
}

fn run_info(file: &Path) -> Result<()> {
    let document = load_document(file)?;

    let first_page_size_pt = match document.kind {
        doc_model::DocumentKind::Pdf => document
            .metrics
            .page_size(0)
            .map(|size| PageSizeOutput { width: size.width_pt, height: size.height_pt }),
        doc_model::DocumentKind::Markdown => None,
    };

    let payload = InfoOutput {
        path: file.display().to_string(),
        kind: document.kind.label(),
        size_bytes: document.file_size,
        size: format_file_size(document.file_size),
        page_count: document.page_count(),
        first_page_size_pt,
        bookmark_count: document.bookmarks.iter().map(Bookmark::count).sum(),
        word_count: document.word_count,
    };

    print_json(&payload)
}

fn run_outline(file: &Path) -> Result<()> {
    let document = load_document(file)?;
    if document.kind != doc_model::DocumentKind::Pdf {
        anyhow::bail!("outline is only available for PDF files: {}", file.display());
    }
    print_json(&document.bookmarks)
}

fn run_prefs(data_dir: Option<PathBuf>, action: PrefsAction) -> Result<()> {
    let storage = Storage::resolve(data_dir).context("failed to locate preferences")?;
    let mut preferences = storage.load_preferences().with_context(|| {
        format!("failed to read preferences from {}", storage.preferences_path().display())
    })?;

    match action {
        PrefsAction::Show => return print_json(&preferences),
        PrefsAction::SetTheme { theme } => {
            preferences.theme = ThemeId::parse(&theme)
                .with_context(|| format!("unknown theme '{theme}' (expected dark or light)"))?;
        }
        PrefsAction::SetBrightness { value } => {
            preferences.brightness = doc_model::clamp_brightness(value);
        }
    }

    storage.save_preferences(&preferences).context("failed to save preferences")?;
    print_json(&preferences)
}

/// Preferences for replay. A missing or unreadable store falls back to
/// defaults so scripts stay runnable on any machine.
fn load_preferences_or_default(data_dir: Option<PathBuf>) -> Preferences {
    let loaded = Storage::resolve(data_dir).and_then(|storage| storage.load_preferences());
    match loaded {
        Ok(preferences) => preferences,
        Err(err) => {
            log::warn!("using default preferences: {err}");
            Preferences::default()
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
