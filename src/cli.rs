use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "issue-reconcile",
    version,
    about = "Reconcile magazine table-of-contents page ranges and attach problem solutions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Reconcile(ReconcileArgs),
    Interleave(InterleaveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    /// Issue JSON produced by table-of-contents extraction.
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = ".cache/issue-reconcile")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub output_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// JSON file overriding the built-in recurring-feature taxonomy.
    #[arg(long)]
    pub taxonomy_path: Option<PathBuf>,

    /// Overrides `totalPages` from the input document.
    #[arg(long)]
    pub total_pages: Option<u32>,

    /// Extracted page text, pages separated by form feeds (pdftotext output).
    #[arg(long)]
    pub page_text_path: Option<PathBuf>,

    /// Directory holding `page-NNN.png` renders for the solution-page reader.
    #[arg(long)]
    pub page_image_dir: Option<PathBuf>,

    /// External program that reads a solution-page reference from one page image.
    #[arg(long)]
    pub reader_command: Option<String>,

    #[arg(long = "reader-arg")]
    pub reader_args: Vec<String>,

    #[arg(long, default_value_t = 1500)]
    pub reader_min_interval_ms: u64,

    #[arg(long, default_value_t = 3)]
    pub reader_max_retries: u32,

    #[arg(long, default_value_t = 2000)]
    pub reader_backoff_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct InterleaveArgs {
    /// Per-article fragment JSON produced by content extraction.
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = ".cache/issue-reconcile")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub output_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}
