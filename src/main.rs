use std::path::{Path, PathBuf};

use clap::ArgEnum;
use env_logger;
use log;

use wavesort::SorterBuilder;

fn main() {
    let arg_parser = match build_arg_parser().try_get_matches_from(recognized_args()) {
        Ok(matches) => matches,
        // help requests land here as well as rejected flag values
        Err(err) => {
            println!("{}", err);
            return;
        }
    };

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let input = match arg_parser.value_of("input") {
        Some(input) => PathBuf::from(input),
        None => {
            println!("an input file is required: -i <path>");
            return;
        }
    };
    let output: Option<PathBuf> = arg_parser.value_of("output").map(PathBuf::from);
    let chunk_size: usize = arg_parser.value_of_t_or_exit("chunk_size");
    let threads: Option<usize> = arg_parser
        .is_present("threads")
        .then(|| arg_parser.value_of_t_or_exit("threads"));
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");

    let mut sorter_builder = SorterBuilder::new().with_chunk_size(chunk_size);
    if let Some(threads) = threads {
        sorter_builder = sorter_builder.with_threads_number(threads);
    }
    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(Path::new(tmp_dir));
    }

    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            println!("sorter initialization failed: {}", err);
            return;
        }
    };

    match sorter.sort(&input, output.as_deref()) {
        Ok(Some(output)) => println!("sorted output written to {}", output.display()),
        Ok(None) => println!("{} holds no lines, no output produced", input.display()),
        Err(err) => println!("{}", err),
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

/// Flags the parser understands and whether they consume the next token.
/// Anything else on the command line is dropped silently.
const KNOWN_FLAGS: &[(&str, &str, bool)] = &[
    ("-i", "--input", true),
    ("-o", "--output", true),
    ("-s", "--chunk-size", true),
    ("-t", "--threads", true),
    ("-d", "--tmp-dir", true),
    ("-l", "--loglevel", true),
    ("-h", "--help", false),
];

fn recognized_args() -> Vec<String> {
    let mut args = std::env::args();
    let mut kept = Vec::from_iter(args.next());

    while let Some(arg) = args.next() {
        let name = arg.split_once('=').map_or(arg.as_str(), |(name, _)| name);
        let known = KNOWN_FLAGS
            .iter()
            .find(|(short, long, _)| name == *short || name == *long);

        if let Some((_, _, takes_value)) = known {
            let has_inline_value = arg.contains('=');
            kept.push(arg);
            if *takes_value && !has_inline_value {
                kept.extend(args.next());
            }
        }
    }

    return kept;
}

fn build_arg_parser() -> clap::App<'static> {
    clap::App::new("wavesort")
        .about("external merge sorter for numbered word lines")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file to be sorted")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file, defaults to <input-stem>-sorted<ext> beside the input")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("chunk_size")
                .short('s')
                .long("chunk-size")
                .help("number of lines sorted in memory at once")
                .takes_value(true)
                .default_value("1000")
                .validator(|v| match v.parse::<usize>() {
                    Ok(n) if n >= 1 => Ok(()),
                    Ok(_) => Err("chunk size must be at least 1".to_owned()),
                    Err(err) => Err(format!("chunk size format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("number of threads to use for parallel sorting and merging")
                .takes_value(true)
                .validator(|v| match v.parse::<usize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("threads format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
