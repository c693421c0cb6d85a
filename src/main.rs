use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use track_recommender::ranker::{DEFAULT_TOP_K, HEAD_K};
use track_recommender::{
    Error, Pool, RankOptions, RankedCandidate, Ranker, Recommendation, Seed, FEATURE_COUNT,
    FEATURE_NAMES,
};

#[derive(Debug, Parser)]
#[command(name = "track-recommender", version, about = "Recommend acoustically similar tracks")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print results as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Look up a track by name in one pool and recommend from another
    ///
    /// Swap --seeds and --pool to run the lookup in the other direction.
    Similar {
        /// Pool the seed track is looked up in
        #[arg(long, env = "RECO_SEEDS")]
        seeds: PathBuf,

        /// Pool recommendations are drawn from
        #[arg(long, env = "RECO_POOL")]
        pool: PathBuf,

        /// Exact track name of the seed
        #[arg(long)]
        song: String,

        /// Number of recommendations
        #[arg(short, long, env = "RECO_TOP_K", default_value_t = DEFAULT_TOP_K)]
        k: usize,

        /// Leave the seed's own track (same track_id) out of the results
        #[arg(long)]
        exclude_self: bool,

        /// Show the three distances next to each result
        #[arg(long)]
        show_distances: bool,
    },
    /// Recommend from a hand-built feature profile
    Profile {
        /// Pool to recommend from; its means fill in omitted features
        #[arg(long, env = "RECO_POOL")]
        pool: PathBuf,

        #[command(flatten)]
        features: ProfileArgs,

        /// Number of recommendations
        #[arg(short, long, default_value_t = HEAD_K)]
        k: usize,

        /// Show the three distances next to each result
        #[arg(long)]
        show_distances: bool,
    },
    /// Print per-feature mean and profile range for a pool
    Stats {
        #[arg(long, env = "RECO_POOL")]
        pool: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ProfileArgs {
    #[arg(long)]
    danceability: Option<f64>,
    #[arg(long)]
    energy: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    loudness: Option<f64>,
    #[arg(long)]
    speechiness: Option<f64>,
    #[arg(long)]
    acousticness: Option<f64>,
    #[arg(long)]
    instrumentalness: Option<f64>,
    #[arg(long)]
    liveness: Option<f64>,
    #[arg(long)]
    valence: Option<f64>,
    #[arg(long)]
    tempo: Option<f64>,
}

impl ProfileArgs {
    /// User values in `FEATURE_NAMES` order; `None` where not given.
    fn values(&self) -> [Option<f64>; FEATURE_COUNT] {
        [
            self.danceability,
            self.energy,
            self.loudness,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
            self.valence,
            self.tempo,
        ]
    }

    fn overrides(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES
            .iter()
            .zip(self.values())
            .filter_map(|(name, value)| value.map(|v| (*name, v)))
            .collect()
    }
}

fn load_pool(path: &Path) -> Result<Pool> {
    Pool::load(path).with_context(|| format!("failed to load pool {}", path.display()))
}

fn print_ranked(ranked: &[RankedCandidate<'_>], show_distances: bool, json: bool) -> Result<()> {
    if json {
        let out = if show_distances {
            serde_json::to_string_pretty(ranked)?
        } else {
            let recs: Vec<_> = ranked.iter().map(Recommendation::from).collect();
            serde_json::to_string_pretty(&recs)?
        };
        println!("{}", out);
        return Ok(());
    }

    for (i, r) in ranked.iter().enumerate() {
        if show_distances {
            println!(
                "{:>3}. {} - {}  (cosine {:.6}, euclidean {:.4}, manhattan {:.4})",
                i + 1,
                r.record.track_name,
                r.record.artist_name,
                r.distances.cosine,
                r.distances.euclidean,
                r.distances.manhattan
            );
        } else {
            println!("{:>3}. {} - {}", i + 1, r.record.track_name, r.record.artist_name);
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Similar {
            seeds,
            pool,
            song,
            k,
            exclude_self,
            show_distances,
        } => {
            let seed_pool = load_pool(&seeds)?;
            let pool = load_pool(&pool)?;
            let seed = seed_pool.find_by_name(&song)?;

            let ranker = Ranker::new(RankOptions {
                k,
                exclude_self,
                ..RankOptions::default()
            });
            let ranked = ranker.rank(&seed, pool.records())?;
            print_ranked(&ranked, show_distances, cli.json)
        }
        Command::Profile {
            pool,
            features,
            k,
            show_distances,
        } => {
            let pool = load_pool(&pool)?;
            let bounds = pool.profile_bounds()?;
            let given = FEATURE_NAMES.iter().zip(features.values()).zip(bounds);
            for ((name, value), (lo, hi)) in given {
                if let Some(value) = value.filter(|v| *v < lo || *v > hi) {
                    warn!(feature = *name, value, lo, hi, "profile value outside pool range");
                }
            }
            let profile = pool.profile_with(&features.overrides())?;

            let ranker = Ranker::new(RankOptions {
                k,
                ..RankOptions::default()
            });
            let ranked = ranker.rank(&Seed::from_profile(profile), pool.records())?;
            print_ranked(&ranked, show_distances, cli.json)
        }
        Command::Stats { pool } => {
            let pool = load_pool(&pool)?;
            let means = pool.feature_means()?;
            let bounds = pool.profile_bounds()?;
            println!("{} ({} tracks)", pool.label(), pool.len());
            for ((name, mean), (lo, hi)) in FEATURE_NAMES.iter().zip(means).zip(bounds) {
                println!("  {:<17} mean {:>10.4}   range [{}, {}]", name, mean, lo, hi);
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let (code, message) = failure_report(&e);
            eprintln!("{}", message);
            ExitCode::from(code)
        }
    }
}

/// Exit code and message for a failed run. A missing seed is the user's
/// input problem and gets its own code; everything else is reported as is.
fn failure_report(err: &anyhow::Error) -> (u8, String) {
    match err.downcast_ref::<Error>() {
        Some(Error::SeedNotFound { name }) => (
            2,
            format!(
                "Could not find a track named {:?}. Check the spelling and try again.",
                name
            ),
        ),
        _ => (1, format!("Error: {:#}", err)),
    }
}
