//! PDF Unwatermark CLI tool
//!
//! A command-line tool for removing known watermarks from PDF files.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use glob::glob;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use pdf_unwatermark::pdf::{remove_watermarks_from_file, scan_file, RemovalOptions};
use pdf_unwatermark::watermark::matcher::{
    DEFAULT_GRAPHICS_STATE_PREFIX, DEFAULT_GROUP_NAME, DEFAULT_IMAGE_PREFIX,
};
use pdf_unwatermark::Matcher;

/// PDF Unwatermark - Remove known watermarks from PDF pages
#[derive(Parser)]
#[command(name = "pdf-unwatermark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Remove all built-in watermark variants
    pdf-unwatermark remove report.pdf -o report-clean.pdf

    # Clean every PDF in a directory into another directory
    pdf-unwatermark remove \"in/*.pdf\" --out-dir out

    # Only remove graphics-state watermarks with a custom prefix
    pdf-unwatermark remove report.pdf -o clean.pdf --only gstate --gstate-prefix Wm

    # Show what would be removed
    pdf-unwatermark scan report.pdf")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove watermarks and write cleaned PDFs
    Remove {
        /// Input PDF files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path (single input only)
        #[arg(short, long, conflicts_with = "out_dir")]
        output: Option<PathBuf>,

        /// Output directory; each input keeps its file name
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Keep objects that are no longer referenced after removal
        #[arg(long)]
        no_prune: bool,

        #[command(flatten)]
        variants: VariantArgs,
    },

    /// List watermark candidates per page without modifying anything
    Scan {
        /// Input PDF files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        #[command(flatten)]
        variants: VariantArgs,
    },
}

/// Watermark variant kinds selectable on the command line
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Variant {
    /// Image XObjects matched by name prefix
    Image,
    /// Graphics states matched by name prefix
    Gstate,
    /// Form XObjects matched by optional content group name
    Form,
}

#[derive(Args)]
struct VariantArgs {
    /// Only remove these variants (repeatable). Default: all
    #[arg(long, value_enum)]
    only: Vec<Variant>,

    /// Name prefix of watermark image XObjects
    #[arg(long, default_value = DEFAULT_IMAGE_PREFIX)]
    image_prefix: String,

    /// Name prefix of watermark graphics states
    #[arg(long, default_value = DEFAULT_GRAPHICS_STATE_PREFIX)]
    gstate_prefix: String,

    /// Optional content group name of watermark forms
    #[arg(long, default_value = DEFAULT_GROUP_NAME)]
    ocg_name: String,
}

impl VariantArgs {
    fn matchers(&self) -> Vec<Matcher> {
        let selected = |variant| self.only.is_empty() || self.only.contains(&variant);

        let mut matchers = Vec::new();
        if selected(Variant::Image) {
            matchers.push(Matcher::image(self.image_prefix.clone()));
        }
        if selected(Variant::Gstate) {
            matchers.push(Matcher::graphics_state(self.gstate_prefix.clone()));
        }
        if selected(Variant::Form) {
            matchers.push(Matcher::form(self.ocg_name.clone()));
        }
        matchers
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Remove { inputs, output, out_dir, no_prune, variants } => {
            cmd_remove(inputs, output, out_dir, no_prune, &variants)
        }
        Commands::Scan { inputs, variants } => cmd_scan(inputs, &variants),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            let entries = glob(&pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();

    Ok(paths)
}

/// Pick the output path for each input
fn output_paths(inputs: &[PathBuf], output: Option<PathBuf>, out_dir: Option<PathBuf>) -> Result<Vec<PathBuf>> {
    match (output, out_dir) {
        (Some(output), None) => {
            if inputs.len() != 1 {
                bail!("--output takes a single input; use --out-dir for {} inputs", inputs.len());
            }
            Ok(vec![output])
        }
        (None, Some(dir)) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Cannot create output directory {}", dir.display()))?;
            inputs
                .iter()
                .map(|input| {
                    let name = input
                        .file_name()
                        .with_context(|| format!("Input has no file name: {}", input.display()))?;
                    Ok(dir.join(name))
                })
                .collect()
        }
        _ => bail!("Either --output or --out-dir is required"),
    }
}

/// Remove watermarks from each input
fn cmd_remove(
    inputs: Vec<String>,
    output: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    no_prune: bool,
    variants: &VariantArgs,
) -> Result<()> {
    let inputs = expand_globs(inputs)?;
    let outputs = output_paths(&inputs, output, out_dir)?;
    let matchers = variants.matchers();

    let mut failed_files = 0;
    for (input, output) in inputs.iter().zip(outputs) {
        if input == &output {
            bail!("Refusing to overwrite input file: {}", input.display());
        }

        let options = RemovalOptions {
            input_path: input.clone(),
            output_path: output.clone(),
            matchers: matchers.clone(),
            prune_unused: !no_prune,
        };

        match remove_watermarks_from_file(&options) {
            Ok(report) => {
                for failure in &report.failures {
                    eprintln!("Warning: {}: {}", input.display(), failure);
                }
                if !report.is_clean() {
                    failed_files += 1;
                }
                eprintln!(
                    "{} -> {}: {} page(s), {} rewrite(s), {} resource(s) removed",
                    input.display(),
                    output.display(),
                    report.pages,
                    report.rewrites,
                    report.resources_removed,
                );
            }
            Err(e) => {
                eprintln!("Error: {}: {}", input.display(), e);
                failed_files += 1;
            }
        }
    }

    if failed_files > 0 {
        bail!("{} of {} file(s) had errors", failed_files, inputs.len());
    }

    Ok(())
}

/// Print watermark candidates for each input
fn cmd_scan(inputs: Vec<String>, variants: &VariantArgs) -> Result<()> {
    let inputs = expand_globs(inputs)?;
    let matchers = variants.matchers();

    for input in &inputs {
        print_scan(input, &matchers)?;
    }

    Ok(())
}

fn print_scan(input: &Path, matchers: &[Matcher]) -> Result<()> {
    let scans = scan_file(input, matchers).with_context(|| format!("Cannot scan {}", input.display()))?;

    println!("File: {}", input.display());
    if scans.is_empty() {
        println!("  No watermarks found");
    }
    for scan in scans {
        println!(
            "  Page {}: {} ({}): {}",
            scan.page,
            scan.variant,
            scan.candidates.kind,
            scan.candidates.names.display_names().join(", ")
        );
    }

    Ok(())
}
