use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tierra::config::Config;
use tierra::simulator::Simulation;

/// Batch driver for the soup simulation (spec §6).
#[derive(Parser, Debug)]
#[command(name = "tierra-rs", about = "An artificial-life evolutionary runtime")]
struct Cli {
    /// si0-style configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ancestor genome to boot at the soup's center, in place of any
    /// inoculation list in the config file.
    #[arg(long)]
    ancestor: Option<PathBuf>,

    /// Maximum instructions to execute, e.g. `10M`, `500K`, `2G`.
    #[arg(long, default_value = "1M")]
    max_instructions: String,

    /// Instructions between periodic report lines (0 disables).
    #[arg(long, default_value_t = 100_000)]
    report_interval: u64,

    /// Overrides the config's soup size.
    #[arg(long)]
    soup_size: Option<usize>,

    /// Overrides the config's RNG seed (0 derives from the OS entropy source).
    #[arg(long)]
    seed: Option<u64>,

    /// Suppresses the periodic report lines.
    #[arg(long)]
    quiet: bool,
}

/// Parses a count with an optional `K`/`M`/`G` suffix (×1e3/1e6/1e9).
fn parse_count(text: &str) -> Option<u64> {
    let text = text.trim();
    let (digits, multiplier) = match text.chars().last() {
        Some('K') | Some('k') => (&text[..text.len() - 1], 1_000),
        Some('M') | Some('m') => (&text[..text.len() - 1], 1_000_000),
        Some('G') | Some('g') => (&text[..text.len() - 1], 1_000_000_000),
        _ => (text, 1),
    };
    digits.trim().parse::<u64>().ok().map(|n| n * multiplier)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                log::error!("failed to load config: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if let Some(size) = cli.soup_size {
        config.soup_size = size;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let Some(max_instructions) = parse_count(&cli.max_instructions) else {
        log::error!("could not parse --max-instructions value {:?}", cli.max_instructions);
        return ExitCode::FAILURE;
    };

    let mut sim = Simulation::new(config);

    let boot_result = match &cli.ancestor {
        Some(path) => sim.boot(path).map(|_| ()),
        None => sim.boot_from_config(&PathBuf::from(".")),
    };
    if let Err(e) = boot_result {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }
    if sim.arena.is_empty() {
        log::error!("no cells could be booted into the soup");
        return ExitCode::FAILURE;
    }

    let report_interval = if cli.quiet { 0 } else { cli.report_interval };
    sim.run(max_instructions, report_interval);

    if !cli.quiet {
        println!("{}", sim.report());
    }
    ExitCode::SUCCESS
}
