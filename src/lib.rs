use clap::{App, Arg};
use std::{
    error::Error,
    io::{self, Write},
};

pub mod error;
pub mod extract;
pub mod index;
pub mod path_list;
pub mod random;
pub mod resolver;
pub mod scanner;

pub use error::{ErrorKind, FortuneError};
pub use extract::{extract, rot13, Fragment};
pub use index::{locate_random_fragment, FragmentLocation, IndexFormat, IndexHeader};
pub use path_list::choose_random_path;
pub use resolver::{resolve_fortune, Fallbacks};
pub use scanner::choose_random_index_file;

/// Suffix of the binary index next to every fortune file.
pub const INDEX_SUFFIX: &str = ".dat";
/// Environment variable holding a colon separated list of fortune paths.
pub const FORTUNE_PATH_VAR: &str = "FORTUNE_PATH";
pub const DEFAULT_FORTUNE_DIR: &str = "/usr/share/games/fortunes";

type MyResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug)]
pub struct Config {
    path: Option<String>,
    seed: Option<u64>,
    fallbacks: Fallbacks,
}

pub fn get_args() -> MyResult<Config> {
    let matches = App::new("randfortune")
        .version("0.1.0")
        .author("Marcin Rogowski <rogowskimarcin11@gmail.com>")
        .about("Rust fortune")
        .arg(
            Arg::with_name("path")
                .value_name("PATH")
                .help("Fortune file, directory, or colon separated list of them"),
        )
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .value_name("SEED")
                .help("Random seed"),
        )
        .get_matches();

    let seed = matches
        .value_of("seed")
        .map(|s| s.parse::<u64>().map_err(|_| format!("Invalid seed \"{}\"", s)))
        .transpose()?;

    Ok(Config {
        path: matches.value_of_lossy("path").map(|p| p.to_string()),
        seed,
        fallbacks: Fallbacks::from_env(),
    })
}

pub fn run(config: Config) -> MyResult<()> {
    let mut rng = random::seed_rng(config.seed);
    match resolve_fortune(config.path.as_deref(), &config.fallbacks, &mut rng) {
        Ok(fortune) => print_fortune(&fortune),
        Err(e) if e.kind() == ErrorKind::NoSource => {
            println!("{}. Install some fortunes or set {}.", e, FORTUNE_PATH_VAR);
            Ok(())
        }
        Err(e) => Err(From::from(e)),
    }
}

fn print_fortune(fortune: &Fragment) -> MyResult<()> {
    let mut out = io::stdout().lock();
    out.write_all(fortune.as_bytes())?;
    if !fortune.ends_with_newline() {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
