//! Command line front end: merge a presentation against a name list.
//!
//! ```text
//! slidegen deck.pptx names.txt -o deck-merged.pptx
//! ```
//!
//! The names file carries one name per line; blank lines are skipped. Log
//! verbosity follows the `RUST_LOG` environment variable.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use slidegen::merge::{DEFAULT_MARKER, MergeEngine, MergeOptions, NameList, PlacementPolicy};
use slidegen::pptx::PresentationPackage;

#[derive(Parser)]
#[command(name = "slidegen", version, about = "Duplicate marker slides in a .pptx, once per name")]
struct Cli {
    /// Input presentation (.pptx)
    input: PathBuf,

    /// Text file with one name per line
    names: PathBuf,

    /// Output presentation path
    #[arg(short, long)]
    output: PathBuf,

    /// Literal marker text to replace in template slides
    #[arg(short, long, default_value = DEFAULT_MARKER)]
    marker: String,

    /// Where generated slides are placed
    #[arg(long, value_enum, default_value = "after-template")]
    placement: Placement,
}

#[derive(Clone, Copy, ValueEnum)]
enum Placement {
    /// Directly after the template slide, in name order
    AfterTemplate,
    /// At the end of the presentation, in generation order
    Append,
}

impl From<Placement> for PlacementPolicy {
    fn from(p: Placement) -> Self {
        match p {
            Placement::AfterTemplate => PlacementPolicy::InsertAfterTemplate,
            Placement::Append => PlacementPolicy::AppendOnly,
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let raw_names = fs::read_to_string(&cli.names)?;
    let names = NameList::parse(&raw_names)?;
    let package = PresentationPackage::open(&cli.input)?;

    let options = MergeOptions {
        marker: cli.marker,
        placement: cli.placement.into(),
    };
    let mut engine = MergeEngine::with_options(package, options);
    let report = engine.run(&names)?;
    engine.save(&cli.output)?;

    println!(
        "generated {} slides into {}",
        report.slides_generated,
        cli.output.display()
    );
    for diag in &report.diagnostics {
        eprintln!("warning: {diag}");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
