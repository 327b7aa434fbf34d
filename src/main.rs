use clap::{Parser, Subcommand};
use std::path::PathBuf;

use g4post::error::PostProcError;
use g4post::process::{ProcessParams, parse_row_range, process_file};
use g4post::spectra::{SpectraParams, write_spectra};

#[derive(Parser)]
#[command(name = "g4post")]
#[command(about = "Post-processing for step-wise g4simple simulation output")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate per-event energy deposits in a detector volume and apply
    /// resolution smearing
    Process {
        /// Step-wise simulation output (parquet)
        input: PathBuf,
        /// Output detector-hit table
        #[arg(long, default_value = "processed.parquet")]
        output: PathBuf,
        /// Physical volume to select steps from
        #[arg(long, default_value_t = 2)]
        volume_id: i64,
        /// Percent energy resolution at 1 MeV
        #[arg(long, default_value_t = 1.0)]
        pct_res: f64,
        /// Seed for the smearing random source; omit to seed from entropy
        #[arg(long)]
        seed: Option<u64>,
        /// Contiguous row window START:END for memory-bounded runs
        #[arg(long)]
        rows: Option<String>,
    },
    /// Histogram the smeared energies of each detector in a processed file
    Spectra {
        /// Processed detector-hit table (parquet)
        input: PathBuf,
        /// Output spectra file (JSON)
        #[arg(long, default_value = "spectra.json")]
        output: PathBuf,
        /// Number of histogram bins
        #[arg(long, default_value_t = 1100)]
        bins: usize,
        /// Lower histogram edge [MeV]
        #[arg(long, default_value_t = 0.0)]
        min: f64,
        /// Upper histogram edge [MeV]
        #[arg(long, default_value_t = 1.1)]
        max: f64,
        /// Fixed unit factor applied to energies before binning
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
}

fn run(cli: Cli) -> Result<(), PostProcError> {
    match cli.command {
        Commands::Process {
            input,
            output,
            volume_id,
            pct_res,
            seed,
            rows,
        } => {
            let row_range = match rows {
                Some(text) => Some(parse_row_range(&text)?),
                None => None,
            };
            process_file(&ProcessParams {
                input_path: input,
                output_path: output,
                target_vol_id: volume_id,
                pct_res_at_1mev: pct_res,
                seed,
                row_range,
            })
        }
        Commands::Spectra {
            input,
            output,
            bins,
            min,
            max,
            scale,
        } => write_spectra(&SpectraParams {
            input_path: input,
            output_path: output,
            number_of_bins: bins,
            range: (min, max),
            energy_scale: scale,
        }),
    }
}

fn main() {
    env_logger::init(); // Log to stderr (run with `RUST_LOG=info`)

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
