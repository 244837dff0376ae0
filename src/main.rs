//! Turns storage array support dumps (archives of CLI command output) into
//! tables. Each array type has its own catalog of TextFSM templates; the
//! config file can add more reports on top of it.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use ntsparser::core::config::Settings;
use ntsparser::reports::ArrayType;

mod utils;

#[derive(Parser)]
#[command(name = "ntsparser")]
#[command(version)]
#[command(about = "Extract tables from storage array support dumps with TextFSM templates")]
struct Cli {
    /// Array type: vnx, vmax, xtremio, celerra, 3par, ibmds, isilon, xiv, eva
    #[arg(short, long)]
    array: Option<String>,

    /// Support dumps: directories, plain files or (nested) tar/gz/bz2 archives
    #[arg(short, long, num_args = 1..)]
    input_files: Vec<PathBuf>,

    /// Output file; .json, .yaml or .toml
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    /// Config file with custom reports
    #[arg(short, long, default_value = "ntsparser.toml")]
    config: PathBuf,

    /// Debug logging and table headers in the summary
    #[arg(long)]
    verbose: bool,

    /// Validate the config file and the built-in templates, then exit
    #[arg(long)]
    check: bool,

    /// Print the header of a template (built-in name or file), then exit
    #[arg(long, value_name = "TEMPLATE")]
    header: Option<String>,

    /// Write a default config file, then exit
    #[arg(long)]
    init_config: bool,
}

fn init_logging(verbose: bool) {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ntsparser=info"));
    if verbose {
        if let Ok(directive) = "ntsparser=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn usage_error(message: &str) -> ! {
    eprintln!("{message}\n");
    let _ = Cli::command().print_help();
    std::process::exit(1);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::default();
    println!("{}", settings.title);

    if cli.init_config {
        return utils::initialize_config(&cli.config);
    }
    if cli.check {
        return utils::check_config(&cli.config);
    }
    if let Some(template) = &cli.header {
        return utils::print_header(template);
    }

    let array = match cli.array.as_deref().map(str::parse::<ArrayType>) {
        Some(Ok(array)) => array,
        Some(Err(e)) => usage_error(&format!("{e}")),
        None => usage_error("Missing --array"),
    };
    let Some(output) = &cli.output_file else {
        usage_error("Missing --output-file");
    };
    if cli.input_files.is_empty() {
        usage_error("Missing --input-files");
    }

    tracing::info!(program = %settings.prog_name, version = %settings.version, array = %array, "starting");
    utils::generate_report(&cli.config, array, &cli.input_files, output, cli.verbose)
}
