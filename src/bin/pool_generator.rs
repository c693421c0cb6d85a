// src/bin/pool_generator.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{thread_rng, Rng};
use track_recommender::{CandidateRecord, FeatureVector, Pool, FEATURE_COUNT};

/// Value range per feature, in `FEATURE_NAMES` order.
const FEATURE_RANGES: [(f64, f64); FEATURE_COUNT] = [
    (0.0, 1.0),     // danceability
    (0.0, 1.0),     // energy
    (-30.0, 0.0),   // loudness (dB)
    (0.0, 1.0),     // speechiness
    (0.0, 1.0),     // acousticness
    (0.0, 1.0),     // instrumentalness
    (0.0, 1.0),     // liveness
    (0.0, 1.0),     // valence
    (50.0, 200.0),  // tempo (BPM)
];

/// Write a synthetic candidate pool of clustered tracks as JSON.
#[derive(Debug, Parser)]
#[command(name = "pool-generator")]
struct Args {
    /// Output file
    #[arg(long, default_value = "pool.json")]
    output: PathBuf,

    /// Number of artists; each artist's tracks cluster around one sound
    #[arg(long, default_value_t = 20)]
    artists: usize,

    /// Tracks per artist
    #[arg(long, default_value_t = 10)]
    tracks_per_artist: usize,
}

fn random_center(rng: &mut impl Rng) -> [f64; FEATURE_COUNT] {
    FEATURE_RANGES.map(|(lo, hi)| rng.gen_range(lo..hi))
}

fn generate_pool(args: &Args) -> Result<Pool> {
    let mut rng = thread_rng();
    let total = args.artists * args.tracks_per_artist;

    let pb = ProgressBar::new(total as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .context("invalid progress template")?
        .progress_chars("=>-"));

    let mut records = Vec::with_capacity(total);
    for artist_idx in 0..args.artists {
        let artist = format!("Artist {:03}", artist_idx);
        let center = random_center(&mut rng);

        // Each track is the artist's center plus noise scaled to the feature's range
        for track_idx in 0..args.tracks_per_artist {
            let mut values = [0.0; FEATURE_COUNT];
            for (i, value) in values.iter_mut().enumerate() {
                let (lo, hi) = FEATURE_RANGES[i];
                let noise = rng.gen_range(-0.1..0.1) * (hi - lo);
                *value = (center[i] + noise).clamp(lo, hi);
            }

            let record = CandidateRecord::new(
                format!("{} Track {:02}", artist, track_idx),
                artist.clone(),
                FeatureVector::new(values)?,
            )
            .with_track_id(format!("syn-{:03}-{:02}", artist_idx, track_idx));
            records.push(record);
            pb.inc(1);
        }

        pb.set_message(format!("Generated artist {}/{}", artist_idx + 1, args.artists));
    }

    pb.finish_with_message("Pool generation complete");
    Ok(Pool::new(args.output.display().to_string(), records))
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Pool Generation Tool");
    println!("--------------------");
    println!("Output file: {}", args.output.display());
    println!("Artists: {}", args.artists);
    println!("Tracks per artist: {}", args.tracks_per_artist);
    println!("Total tracks: {}", args.artists * args.tracks_per_artist);
    println!();

    let pool = generate_pool(&args)?;
    pool.save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("\nPool has been written to {}", args.output.display());
    Ok(())
}
