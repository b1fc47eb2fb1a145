mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use commands::DatasetFormat;
use dataset::{PolicySearchOptions, RewardMode};
use replay::SplitOptions;
use trace::Profile;

#[derive(Parser)]
#[command(
    name = "tracemill",
    about = "Normalize agent session logs into trace events and training datasets",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a run directory and its run metadata file.
    RunInit {
        #[arg(long, default_value = "traces")]
        root: PathBuf,
        /// Run id to use; generated when omitted.
        #[arg(long)]
        run_id: Option<String>,
        #[arg(long)]
        session_key: Option<String>,
        #[arg(long, default_value = "openclaw")]
        source: String,
    },
    /// Import a session JSONL file into normalized trace events.
    ImportSession {
        #[arg(long)]
        session_jsonl: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        run_id: Option<String>,
        #[arg(long, value_enum, default_value = "lean")]
        profile: ProfileArg,
        /// Force content payload retention regardless of profile.
        #[arg(long)]
        include_content: bool,
        /// Append to an existing events file instead of overwriting.
        #[arg(long)]
        append: bool,
        #[arg(long, default_value_t = 1)]
        start_sequence_id: u64,
    },
    /// Summarize an events JSONL file.
    Stats {
        #[arg(long)]
        events: PathBuf,
    },
    /// Export trace events into training dataset rows.
    Export {
        #[arg(long)]
        events: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value = "messages")]
        format: FormatArg,
        #[arg(long, value_enum, default_value = "none")]
        reward_mode: RewardModeArg,
    },
    /// Deterministic sample + A/B split of a JSONL dataset.
    ReplaySplit {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_a: PathBuf,
        #[arg(long)]
        out_b: PathBuf,
        #[arg(long, default_value_t = 0.5)]
        split_ratio: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value = "id")]
        key_field: String,
        #[arg(long)]
        sample_size: Option<usize>,
        #[arg(long, default_value_t = 42)]
        sample_seed: u64,
    },
    /// Fingerprint a dataset file: row count plus content digest.
    ReplayManifest {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Trainer-side smoke check of an exported dataset.
    Smoke {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value = "messages")]
        format: FormatArg,
        #[arg(long)]
        max_rows: Option<usize>,
        /// Exit non-zero when validation fails.
        #[arg(long)]
        strict: bool,
    },
    /// Offline policy search over a triplet dataset.
    Optimize {
        #[arg(long)]
        triplets: PathBuf,
        #[arg(long, default_value_t = 0.2)]
        val_ratio: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        max_rows: Option<usize>,
        /// Also write the report JSON to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    Lean,
    Bridge,
    Debug,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Lean => Profile::Lean,
            ProfileArg::Bridge => Profile::Bridge,
            ProfileArg::Debug => Profile::Debug,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Messages,
    Triplets,
}

impl From<FormatArg> for DatasetFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Messages => DatasetFormat::Messages,
            FormatArg::Triplets => DatasetFormat::Triplets,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RewardModeArg {
    None,
    Heuristic,
}

impl From<RewardModeArg> for RewardMode {
    fn from(arg: RewardModeArg) -> Self {
        match arg {
            RewardModeArg::None => RewardMode::None,
            RewardModeArg::Heuristic => RewardMode::Heuristic,
        }
    }
}

fn main() {
    let args = Args::parse();

    // Logs go to stderr; stdout carries exactly one JSON result object.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<i32> {
    match args.command {
        Command::RunInit { root, run_id, session_key, source } => {
            let payload = commands::run_init(&root, run_id, session_key, &source)?;
            println!("{payload}");
            Ok(0)
        }
        Command::ImportSession {
            session_jsonl,
            out,
            run_id,
            profile,
            include_content,
            append,
            start_sequence_id,
        } => {
            let payload = commands::import_session(
                &session_jsonl,
                &out,
                run_id,
                profile.into(),
                include_content,
                append,
                start_sequence_id,
            )?;
            println!("{payload}");
            Ok(0)
        }
        Command::Stats { events } => {
            let payload = commands::stats(&events)?;
            println!("{payload}");
            Ok(0)
        }
        Command::Export { events, out, format, reward_mode } => {
            let payload = commands::export(&events, &out, format.into(), reward_mode.into())?;
            println!("{payload}");
            Ok(0)
        }
        Command::ReplaySplit {
            input,
            out_a,
            out_b,
            split_ratio,
            seed,
            key_field,
            sample_size,
            sample_seed,
        } => {
            let opts = SplitOptions { split_ratio, seed, key_field, sample_size, sample_seed };
            let payload = commands::replay_split(&input, &out_a, &out_b, &opts)?;
            println!("{payload}");
            Ok(0)
        }
        Command::ReplayManifest { input, out } => {
            let payload = commands::replay_manifest(&input, &out)?;
            println!("{payload}");
            Ok(0)
        }
        Command::Smoke { input, format, max_rows, strict } => {
            let (payload, code) = commands::smoke(&input, format.into(), max_rows, strict)?;
            println!("{payload}");
            Ok(code)
        }
        Command::Optimize { triplets, val_ratio, seed, max_rows, out } => {
            let opts = PolicySearchOptions { val_ratio, seed, max_rows };
            let payload = commands::optimize(&triplets, &opts, out.as_deref())?;
            println!("{payload}");
            Ok(0)
        }
    }
}
