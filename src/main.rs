use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{info, warn};

use org_harvester_lib::{config, harvest, logger, output};
use org_harvester_lib::{CareersClassifier, Fetcher, OrgRecord, Progress};

#[derive(Parser)]
#[command(
    name = "org-harvester",
    about = "Harvest organization records and discover their careers pages."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest all configured sources and write JSONL (plus optional CSV).
    Harvest {
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        #[arg(long, default_value = "output/orgs.jsonl")]
        output: PathBuf,
        /// Optional CSV projection of the output.
        #[arg(long)]
        csv_output: Option<PathBuf>,
        /// Maximum records to emit (0 = no limit).
        #[arg(long, default_value_t = 0)]
        max: usize,
        /// Skip careers-page enrichment.
        #[arg(long)]
        no_enrich: bool,
    },
    /// Fill careers pages on an existing JSONL file, with resume support.
    Enrich {
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        csv_output: Option<PathBuf>,
        /// Maximum records to process (0 = all).
        #[arg(long, default_value_t = 0)]
        max: usize,
        /// Start index into the input.
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Only fill records whose careers_url is missing.
        #[arg(long)]
        only_missing: bool,
        /// Resume from the progress file and append to the output.
        #[arg(long)]
        resume: bool,
        #[arg(long, default_value = "output/enrich_progress.json")]
        progress_file: PathBuf,
        /// Only write records that ended up with a careers_url.
        #[arg(long)]
        only_with_careers: bool,
        /// Rebuild the CSV projection from the output JSONL and exit.
        #[arg(long)]
        build_csv: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Harvest {
            config,
            output,
            csv_output,
            max,
            no_enrich,
        } => run_harvest(config, output, csv_output, max, no_enrich),
        Command::Enrich {
            config,
            input,
            output,
            csv_output,
            max,
            start,
            only_missing,
            resume,
            progress_file,
            only_with_careers,
            build_csv,
        } => run_enrich(EnrichArgs {
            config,
            input,
            output,
            csv_output,
            max,
            start,
            only_missing,
            resume,
            progress_file,
            only_with_careers,
            build_csv,
        }),
    }
}

fn run_harvest(
    config_path: PathBuf,
    output_path: PathBuf,
    csv_output: Option<PathBuf>,
    max: usize,
    no_enrich: bool,
) -> Result<(), Box<dyn Error>> {
    let config = config::load_config(&config_path)?;
    let mut fetcher = Fetcher::new(&config.fetcher_config());
    let limit = (max > 0).then_some(max);
    let enrich = !no_enrich && config.enrich_careers;

    let records = harvest::run(&config, &mut fetcher, limit, enrich);

    output::write_jsonl(&output_path, &records)?;
    info!("wrote {} records to {}", records.len(), output_path.display());
    if let Some(csv_path) = csv_output {
        output::write_csv(&csv_path, &records)?;
        info!("wrote CSV to {}", csv_path.display());
    }
    Ok(())
}

struct EnrichArgs {
    config: PathBuf,
    input: PathBuf,
    output: PathBuf,
    csv_output: Option<PathBuf>,
    max: usize,
    start: usize,
    only_missing: bool,
    resume: bool,
    progress_file: PathBuf,
    only_with_careers: bool,
    build_csv: bool,
}

fn run_enrich(args: EnrichArgs) -> Result<(), Box<dyn Error>> {
    if args.build_csv {
        match &args.csv_output {
            Some(csv_path) => {
                let records = output::read_jsonl(&args.output)?;
                output::write_csv(csv_path, &records)?;
                info!("wrote CSV to {}", csv_path.display());
            }
            None => warn!("--build-csv given without --csv-output; nothing to do"),
        }
        return Ok(());
    }

    let config = config::load_config(&args.config)?;
    let mut fetcher = Fetcher::new(&config.fetcher_config());
    let classifier = CareersClassifier::new();

    let start_index = if args.resume {
        Progress::load(&args.progress_file).next_index
    } else {
        args.start
    };
    let mut pending: Vec<OrgRecord> = output::read_jsonl(&args.input)?
        .into_iter()
        .skip(start_index)
        .collect();
    if args.max > 0 {
        pending.truncate(args.max);
    }
    let examined = pending.len();

    let mut processed = Vec::with_capacity(examined);
    for mut record in pending {
        match record.website.clone() {
            None => record.careers_url = None,
            Some(website) => {
                let keep_existing = args.only_missing && record.careers_url.is_some();
                if !keep_existing {
                    record.careers_url = classifier.find_careers_url(&mut fetcher, &website);
                }
            }
        }
        if args.only_with_careers && record.careers_url.is_none() {
            continue;
        }
        processed.push(record);
    }

    if args.resume {
        output::append_jsonl(&args.output, &processed)?;
        Progress {
            next_index: start_index + examined,
        }
        .save(&args.progress_file);
        info!("appended {} records to {}", processed.len(), args.output.display());
    } else {
        output::write_jsonl(&args.output, &processed)?;
        info!("wrote {} records to {}", processed.len(), args.output.display());
    }

    if let Some(csv_path) = &args.csv_output {
        let records = output::read_jsonl(&args.output)?;
        output::write_csv(csv_path, &records)?;
        info!("wrote CSV to {}", csv_path.display());
    }
    Ok(())
}
