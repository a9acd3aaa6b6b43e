use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bayes_junk_tool::codec::xml;
use bayes_junk_tool::data::writer::{render, write_dtd};
use bayes_junk_tool::{
    load_token_file, write_token_file, OutputFormat, RunConfig, Summary, Thresholds,
    TokenCollection,
};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Junk-mail filter training token toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a token file, optionally merge and filter it, and write it out
    Convert(ConvertArgs),
    /// Merge two token files into one
    Merge(MergeArgs),
    /// Print message and token counts of a token file
    Info(InfoArgs),
    /// Write the XML token file DTD
    Dtd(DtdArgs),
}

/// Output formats accepted on the command line.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    /// Binary training.dat layout
    Data,
    /// XML document plus trainer_xml.dtd
    Xml,
    /// Plain-text listing
    Text,
    /// HTML table
    Html,
    /// token,good,bad rows
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Data => OutputFormat::Data,
            FormatArg::Xml => OutputFormat::Xml,
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output file; standard output when omitted
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Output format; guessed from the output extension, text otherwise
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Keep the output path exactly as given
    #[arg(long)]
    no_extension: bool,

    /// Drop tokens seen fewer times than this in good messages (<= 0 disables)
    #[arg(
        long = "remove-good",
        value_name = "COUNT",
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    remove_good: i64,

    /// Drop tokens seen fewer times than this in bad messages (<= 0 disables)
    #[arg(
        long = "remove-bad",
        value_name = "COUNT",
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    remove_bad: i64,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Binary or XML token file to read
    #[arg(default_value = bayes_junk_tool::codec::binary::DEFAULT_FILE_NAME)]
    input: PathBuf,

    /// Second token file merged into the input
    #[arg(short, long, value_name = "PATH")]
    merge: Option<PathBuf>,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// First token file
    first: PathBuf,

    /// Second token file
    second: PathBuf,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Token file to inspect
    input: PathBuf,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DtdArgs {
    /// Where to write the DTD
    #[arg(short, long, value_name = "PATH", default_value = xml::DTD_FILE_NAME)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let quiet = cli.quiet > 0;

    match cli.command {
        Commands::Convert(args) => {
            run_convert(build_config(args.input, args.merge, args.out, quiet))
        }
        Commands::Merge(args) => {
            run_convert(build_config(args.first, Some(args.second), args.out, quiet))
        }
        Commands::Info(args) => run_info(args),
        Commands::Dtd(args) => run_dtd(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.target(env_logger::Target::Stderr);

    // -v / -q override RUST_LOG; without them RUST_LOG (or "info") decides.
    let level = match (verbose, quiet) {
        (_, 1) => Some(LevelFilter::Warn),
        (_, q) if q > 1 => Some(LevelFilter::Error),
        (0, _) => None,
        (1, _) => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    };
    if let Some(level) = level {
        builder.filter_level(level);
    }
    let _ = builder.try_init();
}

fn build_config(
    input: PathBuf,
    merge_input: Option<PathBuf>,
    out: OutputArgs,
    quiet: bool,
) -> RunConfig {
    RunConfig {
        input,
        merge_input,
        output: out.output,
        format: out.format.map(OutputFormat::from),
        ensure_extension: !out.no_extension,
        thresholds: Thresholds::new(out.remove_good, out.remove_bad),
        quiet,
    }
}

fn run_convert(cfg: RunConfig) -> Result<()> {
    cfg.validate().context("invalid arguments")?;

    let collection = cfg.prepare().context("failed to load token data")?;

    let format = cfg.effective_format();
    match cfg.effective_output() {
        Some(path) => write_token_file(&collection, &path, format)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let bytes = render(&collection, format).context("failed to render token data")?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes).context("failed to write to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn load(path: &Path) -> Result<TokenCollection> {
    load_token_file(path).with_context(|| format!("failed to load {}", path.display()))
}

fn run_info(args: InfoArgs) -> Result<()> {
    let collection = load(&args.input)?;
    let summary = Summary::of(&collection, Some(args.input.as_path()));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Good messages: {}", summary.good_messages);
        println!("Bad messages : {}", summary.bad_messages);
        println!("Tokens       : {}", summary.tokens);
        println!("Good tokens  : {}", summary.good_tokens);
        println!("Bad tokens   : {}", summary.bad_tokens);
    }
    Ok(())
}

fn run_dtd(args: DtdArgs) -> Result<()> {
    write_dtd(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("wrote {}", args.output.display());
    Ok(())
}
