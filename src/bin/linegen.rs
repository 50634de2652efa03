use std::path::PathBuf;

use env_logger;

use wavesort::generate::{self, GenerateConfig};

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    let arg_parser = match build_arg_parser().try_get_matches_from(recognized_args()) {
        Ok(matches) => matches,
        // help requests land here as well as rejected flag values
        Err(err) => {
            println!("{}", err);
            return;
        }
    };

    let output = match arg_parser.value_of("output") {
        Some(output) => PathBuf::from(output),
        None => {
            println!("an output file is required: -o <path>");
            return;
        }
    };

    let config = GenerateConfig {
        line_count: arg_parser.value_of_t_or_exit("lines"),
        max_line_number: arg_parser.value_of_t_or_exit("max_number"),
        max_words_per_line: arg_parser.value_of_t_or_exit("max_words"),
        channel_capacity: arg_parser.value_of_t_or_exit("capacity"),
        seed: arg_parser
            .is_present("seed")
            .then(|| arg_parser.value_of_t_or_exit("seed")),
    };

    match generate::write_file(&output, &config) {
        Ok(()) => println!(
            "generated {} lines into {}",
            config.line_count,
            output.display()
        ),
        Err(err) => println!("generation failed: {}", err),
    }
}

/// Flags the parser understands and whether they consume the next token.
/// Anything else on the command line is dropped silently.
const KNOWN_FLAGS: &[(&str, &str, bool)] = &[
    ("-o", "--output", true),
    ("-n", "--lines", true),
    ("-m", "--max-number", true),
    ("-w", "--max-words", true),
    ("-c", "--capacity", true),
    ("--seed", "--seed", true),
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
    clap::App::new("linegen")
        .about("generates numbered word lines for sorting")
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("file to generate into")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("lines")
                .short('n')
                .long("lines")
                .help("number of lines to emit")
                .takes_value(true)
                .default_value("1000")
                .validator(validate::<u64>),
        )
        .arg(
            clap::Arg::new("max_number")
                .short('m')
                .long("max-number")
                .help("exclusive upper bound of the numeric line prefix")
                .takes_value(true)
                .default_value("100")
                .validator(|v| match v.parse::<u64>() {
                    Ok(n) if n >= 1 => Ok(()),
                    Ok(_) => Err("max number must be at least 1".to_owned()),
                    Err(err) => Err(format!("max number format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("max_words")
                .short('w')
                .long("max-words")
                .help("exclusive upper bound of words per line")
                .takes_value(true)
                .default_value("10")
                .validator(|v| match v.parse::<usize>() {
                    Ok(n) if n >= 2 => Ok(()),
                    Ok(_) => Err("max words must be at least 2".to_owned()),
                    Err(err) => Err(format!("max words format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("capacity")
                .short('c')
                .long("capacity")
                .help("bounded channel capacity between producer and writer")
                .takes_value(true)
                .default_value("64")
                .validator(|v| match v.parse::<usize>() {
                    Ok(n) if n >= 1 => Ok(()),
                    Ok(_) => Err("capacity must be at least 1".to_owned()),
                    Err(err) => Err(format!("capacity format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("seed")
                .long("seed")
                .help("seed for reproducible output")
                .takes_value(true)
                .validator(validate::<u64>),
        )
}

fn validate<T: std::str::FromStr>(value: &str) -> Result<(), String>
where
    T::Err: std::fmt::Display,
{
    match value.parse::<T>() {
        Ok(_) => Ok(()),
        Err(err) => Err(format!("value format incorrect: {}", err)),
    }
}
