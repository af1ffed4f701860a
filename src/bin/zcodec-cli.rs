//! zcodec-cli - Command-line interface for zcodec
//!
//! Compresses, decompresses and inspects zcodec frames, and trains
//! dictionaries from sample files.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use zcodec::{
    get_frame_info, get_frame_size, train_dictionary_for_level, CompressParameter, CompressWriter,
    CompressionParams, DecompressReader, DecompressionParams, Dictionary, Strategy,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Inputs above this size get a progress bar
const PROGRESS_THRESHOLD: u64 = 1024 * 1024;

#[derive(Parser)]
#[command(name = "zcodec-cli")]
#[command(about = "Compress, decompress and inspect zcodec frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (repeat for debug logging)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into a single frame
    Compress {
        /// Input file to compress
        input: PathBuf,

        /// Output compressed file
        output: PathBuf,

        /// Compression level
        #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(i32).range(1..=22))]
        level: i32,

        /// Override the level's match finding strategy
        #[arg(short, long, value_enum)]
        strategy: Option<CliStrategy>,

        /// Override the window log
        #[arg(short, long)]
        window_log: Option<u32>,

        /// Enable long distance matching
        #[arg(long)]
        long: bool,

        /// Omit the content checksum
        #[arg(long)]
        no_checksum: bool,

        /// Dictionary file
        #[arg(short = 'D', long)]
        dictionary: Option<PathBuf>,

        /// Force overwrite of output file
        #[arg(short, long)]
        force: bool,
    },

    /// Decompress every frame of a file
    Decompress {
        /// Input compressed file
        input: PathBuf,

        /// Output decompressed file
        output: PathBuf,

        /// Dictionary file
        #[arg(short = 'D', long)]
        dictionary: Option<PathBuf>,

        /// Largest window log to accept
        #[arg(long)]
        window_log_max: Option<u32>,

        /// Force overwrite of output file
        #[arg(short, long)]
        force: bool,
    },

    /// Train a dictionary from sample files
    Train {
        /// Sample files
        #[arg(required = true)]
        samples: Vec<PathBuf>,

        /// Output dictionary file
        #[arg(short, long)]
        output: PathBuf,

        /// Dictionary content size in bytes
        #[arg(long, default_value_t = 112_640)]
        max_size: usize,

        /// Level the dictionary's tables are tuned for
        #[arg(short, long, default_value_t = 3)]
        level: i32,

        /// Force overwrite of output file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the frames of a compressed file
    Info {
        /// Compressed file to analyze
        input: PathBuf,

        /// Dictionary used to verify the content
        #[arg(short = 'D', long)]
        dictionary: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliStrategy {
    Fast,
    Dfast,
    Greedy,
    Lazy,
    Lazy2,
    Btlazy2,
    Btopt,
    Btultra,
    Btultra2,
}

impl From<CliStrategy> for Strategy {
    fn from(strategy: CliStrategy) -> Self {
        match strategy {
            CliStrategy::Fast => Strategy::Fast,
            CliStrategy::Dfast => Strategy::DFast,
            CliStrategy::Greedy => Strategy::Greedy,
            CliStrategy::Lazy => Strategy::Lazy,
            CliStrategy::Lazy2 => Strategy::Lazy2,
            CliStrategy::Btlazy2 => Strategy::BtLazy2,
            CliStrategy::Btopt => Strategy::BtOpt,
            CliStrategy::Btultra => Strategy::BtUltra,
            CliStrategy::Btultra2 => Strategy::BtUltra2,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            level,
            strategy,
            window_log,
            long,
            no_checksum,
            dictionary,
            force,
        } => build_params(level, strategy, window_log, long, !no_checksum).and_then(|params| {
            compress_file(
                &input,
                &output,
                &params,
                dictionary.as_deref(),
                force,
                cli.quiet,
            )
        }),
        Commands::Decompress {
            input,
            output,
            dictionary,
            window_log_max,
            force,
        } => decompress_file(
            &input,
            &output,
            dictionary.as_deref(),
            window_log_max,
            force,
            cli.quiet,
        ),
        Commands::Train {
            samples,
            output,
            max_size,
            level,
            force,
        } => train_file(&samples, &output, max_size, level, force, cli.quiet),
        Commands::Info { input, dictionary } => show_file_info(&input, dictionary.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => log::LevelFilter::Error,
        (false, 0) => log::LevelFilter::Warn,
        (false, 1) => log::LevelFilter::Info,
        (false, _) => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn build_params(
    level: i32,
    strategy: Option<CliStrategy>,
    window_log: Option<u32>,
    long: bool,
    checksum: bool,
) -> CliResult<CompressionParams> {
    let mut params = CompressionParams::from_level(level)?.with_checksum(checksum)?;
    if let Some(strategy) = strategy {
        params = params.with_strategy(strategy.into())?;
    }
    if let Some(window_log) = window_log {
        params = params.with_window_log(window_log)?;
    }
    if long {
        params = params.with(CompressParameter::EnableLongDistanceMatching, 1)?;
    }
    Ok(params)
}

fn check_paths(input: &Path, output: &Path, force: bool) -> CliResult<()> {
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()).into());
    }
    if output.exists() && !force {
        return Err(format!(
            "Output file '{}' already exists. Use --force to overwrite",
            output.display()
        )
        .into());
    }
    Ok(())
}

fn load_dictionary(path: Option<&Path>) -> CliResult<Option<Arc<Dictionary>>> {
    match path {
        Some(path) => {
            let dict = Dictionary::from_bytes(&fs::read(path)?)?;
            log::info!("loaded dictionary {:#010x} from {}", dict.id(), path.display());
            Ok(Some(Arc::new(dict)))
        }
        None => Ok(None),
    }
}

fn progress_bar(len: u64, quiet: bool, message: &'static str) -> CliResult<ProgressBar> {
    if quiet || len <= PROGRESS_THRESHOLD {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    Ok(pb)
}

fn compress_file(
    input: &Path,
    output: &Path,
    params: &CompressionParams,
    dictionary: Option<&Path>,
    force: bool,
    quiet: bool,
) -> CliResult<()> {
    check_paths(input, output, force)?;
    let dictionary = load_dictionary(dictionary)?;
    let start_time = Instant::now();

    let source = File::open(input)?;
    let input_size = source.metadata()?.len();
    log::info!("compressing {} at level {}", input.display(), params.level());

    let sink = BufWriter::new(File::create(output)?);
    let mut writer = match dictionary {
        Some(dict) => CompressWriter::with_dictionary(sink, params, dict)?,
        None => CompressWriter::new(sink, params)?,
    };
    writer.set_pledged_size(input_size)?;

    let pb = progress_bar(input_size, quiet, "Compressing...")?;
    io::copy(&mut pb.wrap_read(BufReader::new(source)), &mut writer)?;
    writer.finish()?.flush()?;
    pb.finish_with_message("Compression complete");

    let output_size = fs::metadata(output)?.len();
    if !quiet {
        print_summary("Compression", input_size, output_size, start_time);
    }
    Ok(())
}

fn decompress_file(
    input: &Path,
    output: &Path,
    dictionary: Option<&Path>,
    window_log_max: Option<u32>,
    force: bool,
    quiet: bool,
) -> CliResult<()> {
    check_paths(input, output, force)?;
    let dictionary = load_dictionary(dictionary)?;
    let mut params = DecompressionParams::default();
    if let Some(limit) = window_log_max {
        params = params.with_window_log_max(limit)?;
    }
    let start_time = Instant::now();

    let source = File::open(input)?;
    let input_size = source.metadata()?.len();
    let pb = progress_bar(input_size, quiet, "Decompressing...")?;
    let source = pb.wrap_read(BufReader::new(source));
    let mut reader = match dictionary {
        Some(dict) => DecompressReader::with_dictionary(source, &params, dict),
        None => DecompressReader::with_params(source, &params),
    };

    let mut sink = BufWriter::new(File::create(output)?);
    let output_size = io::copy(&mut reader, &mut sink)?;
    sink.flush()?;
    pb.finish_with_message("Decompression complete");

    if !quiet {
        print_summary("Decompression", output_size, input_size, start_time);
    }
    Ok(())
}

fn train_file(
    samples: &[PathBuf],
    output: &Path,
    max_size: usize,
    level: i32,
    force: bool,
    quiet: bool,
) -> CliResult<()> {
    if output.exists() && !force {
        return Err(format!(
            "Output file '{}' already exists. Use --force to overwrite",
            output.display()
        )
        .into());
    }
    let start_time = Instant::now();
    let data = samples.iter().map(fs::read).collect::<io::Result<Vec<_>>>()?;
    let total: usize = data.iter().map(Vec::len).sum();
    log::info!("training on {} samples ({} bytes)", data.len(), total);

    let dictionary = train_dictionary_for_level(&data, max_size, level)?;
    let bytes = dictionary.to_bytes();
    fs::write(output, &bytes)?;

    if !quiet {
        println!("Dictionary trained");
        println!("  Samples: {} ({} bytes)", data.len(), total);
        println!("  Id:      {:#010x}", dictionary.id());
        println!("  Content: {} bytes", dictionary.content().len());
        println!("  Tables:  {}", if dictionary.tables().is_some() { "yes" } else { "no" });
        println!("  Output:  {} bytes", bytes.len());
        println!("  Time:    {:.2?}", start_time.elapsed());
    }
    Ok(())
}

fn print_summary(action: &str, content_size: u64, compressed_size: u64, start_time: Instant) {
    let ratio = if content_size == 0 {
        0.0
    } else {
        compressed_size as f64 / content_size as f64 * 100.0
    };
    println!("{} successful", action);
    println!("  Content:    {} bytes", content_size);
    println!("  Compressed: {} bytes", compressed_size);
    println!("  Ratio:      {:.1}%", ratio);
    println!("  Time:       {:.2?}", start_time.elapsed());
}

fn show_file_info(input: &Path, dictionary: Option<&Path>) -> CliResult<()> {
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()).into());
    }
    let dictionary = load_dictionary(dictionary)?;
    let data = fs::read(input)?;

    println!("File: {}", input.display());
    println!("Size: {} bytes", data.len());

    let mut pos = 0;
    let mut index = 0;
    while pos < data.len() {
        let rest = &data[pos..];
        let info = get_frame_info(rest)?;
        let size = get_frame_size(rest)?;
        println!("Frame {index} at offset {pos}:");
        println!("  Compressed size: {size} bytes");
        match info.content_size {
            Some(content) => println!("  Content size:    {content} bytes"),
            None => println!("  Content size:    unknown"),
        }
        println!("  Window size:     {} bytes", info.window_size);
        println!("  Checksum:        {}", if info.has_checksum { "yes" } else { "no" });
        if let Some(id) = info.dictionary_id {
            println!("  Dictionary id:   {id:#010x}");
        }
        pos += size;
        index += 1;
    }

    let mut reader = match dictionary {
        Some(dict) => DecompressReader::with_dictionary(&data[..], &DecompressionParams::default(), dict),
        None => DecompressReader::new(&data[..]),
    };
    let mut sink = io::sink();
    match io::copy(&mut reader, &mut sink) {
        Ok(content) => println!("Status: valid, {index} frame(s), {content} bytes of content"),
        Err(e) => println!("Status: invalid ({e})"),
    }
    Ok(())
}
