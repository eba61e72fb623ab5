use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use rkc::codegen;
use rkc::matrix::{self, FillCategory};
use rkc::registry::Registry;

#[derive(Parser, Debug)]
#[command(
    name = "rkc",
    version,
    about = "Ragged Kernel Compiler — generates CUDA kernels and numeric boilerplate from kernel specifications"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate CUDA kernels and host wrappers from the specification registry
    Kernels {
        /// Generate only this kernel (default: all eligible kernels)
        kernel: Option<String>,

        /// Specification registry manifest
        #[arg(long, default_value = "specs/manifest.json")]
        manifest: PathBuf,

        /// Print registry statistics
        #[arg(long)]
        verbose: bool,
    },

    /// Emit the numeric conversion boilerplate matrix
    Fill {
        /// Destination file kind: declaration, stub, or dispatch
        #[arg(long, value_parser = FillCategory::from_str)]
        category: FillCategory,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Kernels {
            kernel,
            manifest,
            verbose,
        } => {
            let registry = match Registry::load_manifest(&manifest) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("rkc: error: {e}");
                    std::process::exit(2);
                }
            };

            if verbose {
                eprintln!(
                    "rkc: loaded {} kernel specs from {}",
                    registry.len(),
                    manifest.display()
                );
                eprintln!("rkc: {} eligible", registry.eligible().count());
                eprintln!("rkc: spec fingerprint = {}", registry.fingerprint());
            }

            match codegen::generate(&registry, kernel.as_deref()) {
                Ok(code) => print!("{code}"),
                Err(e) => {
                    eprintln!("rkc: error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Fill { category } => {
            print!("{}", matrix::emit(category));
        }
    }
}
