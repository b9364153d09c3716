use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mymlst::config::{PipelineConfig, RawOptions};
use mymlst::domain::{DEFAULT_RUN_NAME, DEFAULT_THREADS};
use mymlst::error::PipelineError;
use mymlst::manifest::RunSummary;
use mymlst::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "mymlst")]
#[command(about = "Assemble, MLST-type and annotate a folder of paired-end FASTQ files")]
#[command(version)]
struct Cli {
    #[arg(short = 'f', long = "fastqfolder", help = "Folder holding paired FASTQ files")]
    fastq_folder: String,

    #[arg(
        short = 'o',
        long = "outname",
        default_value = DEFAULT_RUN_NAME,
        help = "Run name, used as prefix for every output"
    )]
    outname: String,

    #[arg(
        short = 't',
        long = "threads",
        default_value = DEFAULT_THREADS,
        allow_hyphen_values = true,
        help = "Threads passed to each tool"
    )]
    threads: String,

    #[arg(short = 'c', long = "conversion", help = "Also convert GFF annotations to GTF")]
    conversion: bool,

    #[arg(long = "workdir", help = "Working root for outputs (default: current directory)")]
    work_dir: Option<String>,

    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // usage errors and --help both exit with 1
            return ExitCode::from(1);
        }
    };

    init_tracing(cli.verbose);

    match run(cli) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<RunSummary, PipelineError> {
    let config = PipelineConfig::resolve(RawOptions {
        fastq_folder: cli.fastq_folder,
        run_name: cli.outname,
        threads: cli.threads,
        conversion: cli.conversion,
        work_dir: cli.work_dir,
    })?;
    let pipeline = Pipeline::discover(config)?;
    pipeline.run()
}

fn print_summary(summary: &RunSummary) {
    println!("mymlst run {} finished", summary.run_name);
    println!("  samples:       {}", summary.samples.len());
    println!("  typing report: {} ({} rows)", summary.typing_report, summary.typing_rows);
    println!("  output:        {}", summary.output_root);
    for sample in &summary.samples {
        println!("    {} -> {}", sample.name, sample.directory);
    }
    if let Some(file) = &summary.unpaired_file {
        println!("  unpaired file skipped: {file}");
    }
}
