//! Example: ddibank extract --src_path voice.idx --dst_path out --gen_seg --classify
//! Example: ddibank pack --src_path voice.tree --dst_path out
//! Example: ddibank mixins --src_path voice.idx --mixins_path growl.idx --dst_path out --mixins_item sta2vqm --sta2vqm_phoneme a

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{command, Parser, Subcommand};
use colored::Colorize;

use ddibank::catalogue::Catalogue;
use ddibank::error::{DdiError, Result};
use ddibank::extract::{extract, ExtractOptions};
use ddibank::mixin::{mixin, MixinMode};
use ddibank::pack::pack;
use ddibank::paths::FilenameStyle;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(author = "Adakite", version = VERSION, about = "Tools for working with voice bank IDX/DAT files", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit WAVs and optional labels from a voice bank
    Extract {
        /// Source index file path
        #[arg(long, value_name = "P.idx")]
        src_path: PathBuf,

        /// Destination extract folder
        #[arg(long, value_name = "D")]
        dst_path: PathBuf,

        /// Generate .lab label files
        #[arg(long)]
        gen_lab: bool,

        /// Generate .trans/.seg/.as0 segmentation files
        #[arg(long)]
        gen_seg: bool,

        /// Classify output files with a per-unit index
        #[arg(long)]
        classify: bool,

        /// "flat" or "devkit"
        #[arg(long, value_name = "STYLE", default_value = "flat")]
        filename_style: String,
    },
    /// Reassemble an IDX/DAT pair from a devkit-style source tree
    Pack {
        /// Singer tree file path (a `.tree` file alongside a same-named source directory)
        #[arg(long, value_name = "P.tree")]
        src_path: PathBuf,

        /// Destination folder
        #[arg(long, value_name = "D")]
        dst_path: PathBuf,
    },
    /// Splice a donor growl voice-quality region into a recipient bank
    Mixins {
        /// Recipient index file path
        #[arg(long, value_name = "R.idx")]
        src_path: PathBuf,

        /// Donor index file path
        #[arg(long, value_name = "D.idx")]
        mixins_path: PathBuf,

        /// Output folder
        #[arg(long, value_name = "O")]
        dst_path: PathBuf,

        /// "vqm" or "sta2vqm"
        #[arg(long, value_name = "ITEM", default_value = "vqm")]
        mixins_item: String,

        /// Donor phoneme to synthesize from, required when mixins_item=sta2vqm
        #[arg(long, value_name = "S")]
        sta2vqm_phoneme: Option<String>,
    },
}

fn parse_filename_style(s: &str) -> Result<FilenameStyle> {
    match s {
        "flat" => Ok(FilenameStyle::Flat),
        "devkit" => Ok(FilenameStyle::Devkit),
        other => Err(DdiError::CorruptInput {
            path: "--filename_style".to_string(),
            reason: format!("expected \"flat\" or \"devkit\", got {other:?}"),
        }),
    }
}

/// Strips a literal suffix like `.tree` off a path, the way `pack_ddb.py`'s
/// `re.sub(r"\.tree$", "", src_path)` derives the singer source directory.
fn strip_suffix(path: &Path, suffix: &str) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_suffix(suffix) {
        Some(stripped) => PathBuf::from(stripped),
        None => path.to_path_buf(),
    }
}

fn run_extract(
    src_path: PathBuf,
    dst_path: PathBuf,
    gen_lab: bool,
    gen_seg: bool,
    classify: bool,
    filename_style: String,
) -> Result<()> {
    let style = parse_filename_style(&filename_style)?;
    let dat_path = src_path.with_extension("dat");

    println!("Reading index...");
    let idx_bytes = fs::read(&src_path)?;
    let catalogue = Catalogue::read(&idx_bytes)?;
    let dat_bytes = fs::read(&dat_path)?;

    fs::create_dir_all(&dst_path)?;

    let opts = ExtractOptions { style, gen_lab, gen_seg, classify };

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)).ok();

    let report = extract(&catalogue, &dat_bytes, &dst_path, &opts, &cancel)?;
    println!(
        "{}",
        format!(
            "Done: {} articulation, {} stationary, {} VQM, {} unindexed, {} skipped",
            report.articulation, report.stationary, report.vqm, report.unindexed, report.skipped
        )
        .green()
    );
    Ok(())
}

fn run_pack(src_path: PathBuf, dst_path: PathBuf) -> Result<()> {
    let src_root = strip_suffix(&src_path, ".tree");
    let singer_name = src_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("voice")
        .to_string();

    println!("Reading index template...");
    let idx_bytes = fs::read(&src_path)?;
    let catalogue = Catalogue::read(&idx_bytes)?;

    println!("Packing data file from {}...", src_root.display());
    let (out_idx, out_dat) = pack(&idx_bytes, &catalogue, &src_root)?;

    fs::create_dir_all(&dst_path)?;
    fs::write(dst_path.join(format!("{singer_name}.idx")), &out_idx)?;
    fs::write(dst_path.join(format!("{singer_name}.dat")), &out_dat)?;
    println!("{}", format!("Packed {singer_name} -> {}", dst_path.display()).green());
    Ok(())
}

fn run_mixins(
    src_path: PathBuf,
    mixins_path: PathBuf,
    dst_path: PathBuf,
    mixins_item: String,
    sta2vqm_phoneme: Option<String>,
) -> Result<()> {
    let mode = match mixins_item.as_str() {
        "vqm" => MixinMode::Vqm,
        "sta2vqm" => {
            let phoneme = sta2vqm_phoneme.ok_or_else(|| DdiError::CorruptInput {
                path: "--sta2vqm_phoneme".to_string(),
                reason: "required when --mixins_item is \"sta2vqm\"".to_string(),
            })?;
            MixinMode::Sta2Vqm { phoneme }
        }
        other => {
            return Err(DdiError::CorruptInput {
                path: "--mixins_item".to_string(),
                reason: format!("expected \"vqm\" or \"sta2vqm\", got {other:?}"),
            })
        }
    };

    println!("Reading source index...");
    let recipient_idx = fs::read(&src_path)?;
    let recipient_catalogue = Catalogue::read(&recipient_idx)?;
    let recipient_dat = fs::read(src_path.with_extension("dat"))?;

    println!("Reading mixins index...");
    let donor_idx = fs::read(&mixins_path)?;
    let donor_catalogue = Catalogue::read(&donor_idx)?;
    let donor_dat = fs::read(mixins_path.with_extension("dat"))?;

    println!("Mixing in growl region...");
    let (out_idx, out_dat) = mixin(&recipient_idx, &recipient_dat, &recipient_catalogue, &donor_dat, &donor_catalogue, &mode)?;

    let singer_name = src_path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("voice")
        .to_string();
    fs::create_dir_all(&dst_path)?;
    fs::write(dst_path.join(format!("{singer_name}.idx")), &out_idx)?;
    fs::write(dst_path.join(format!("{singer_name}.dat")), &out_dat)?;
    println!("{}", format!("Mixed in -> {}", dst_path.display()).green());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Extract { src_path, dst_path, gen_lab, gen_seg, classify, filename_style } => {
            run_extract(src_path, dst_path, gen_lab, gen_seg, classify, filename_style)
        }
        Commands::Pack { src_path, dst_path } => run_pack(src_path, dst_path),
        Commands::Mixins { src_path, mixins_path, dst_path, mixins_item, sta2vqm_phoneme } => {
            run_mixins(src_path, mixins_path, dst_path, mixins_item, sta2vqm_phoneme)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}{e}", "Error: ".red());
            ExitCode::FAILURE
        }
    }
}
