use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "sigil")]
#[command(about = "Signature scanning and address resolution over PE images")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved section table of an image
    Sections { image: PathBuf },

    /// Scan a section for a signature
    Scan {
        image: PathBuf,
        /// Pattern text, e.g. "48 8B 0D ?? ?? ?? ??"
        signature: String,
        /// Section to scan: text, data, rdata, or module
        #[arg(short, long, default_value = "text")]
        section: String,
        /// Byte offset added to the match address
        #[arg(short, long, default_value_t = 0)]
        offset: i64,
        /// Report whether the match is a valid hook target
        #[arg(long)]
        hook_check: bool,
    },

    /// Resolve a RIP-relative static address from a signature
    Static {
        image: PathBuf,
        signature: String,
        /// Offset of the displacement operand within the match
        #[arg(short = 'p', long, default_value_t = 0)]
        operand_offset: i64,
        /// Adjustment added to the resolved address
        #[arg(long, default_value_t = 0)]
        addend: i64,
    },

    /// Resolve every entry of a signature-set file
    Resolve {
        image: PathBuf,
        sigset: PathBuf,
        /// Write a diagnostics dump to this path
        #[arg(short, long)]
        dump: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sigil=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Sections { image } => commands::sections::run(&image),
        Command::Scan {
            image,
            signature,
            section,
            offset,
            hook_check,
        } => commands::scan::run(&image, &signature, &section, offset, hook_check),
        Command::Static {
            image,
            signature,
            operand_offset,
            addend,
        } => commands::static_addr::run(&image, &signature, operand_offset, addend),
        Command::Resolve {
            image,
            sigset,
            dump,
        } => commands::resolve::run(&image, &sigset, dump.as_deref()),
    }
}
