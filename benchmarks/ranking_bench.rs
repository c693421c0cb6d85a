use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use track_recommender::{
    CandidateRecord, FeatureVector, RankOptions, Ranker, Seed, FEATURE_COUNT,
};

fn generate_random_vector(rng: &mut impl Rng) -> FeatureVector {
    let mut values = [0.0; FEATURE_COUNT];
    for value in values.iter_mut() {
        *value = rng.gen_range(0.0..1.0);
    }
    // loudness and tempo live on their own scales
    values[2] = rng.gen_range(-30.0..0.0);
    values[8] = rng.gen_range(50.0..200.0);
    FeatureVector::new(values).expect("generated values are finite")
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap()
        .progress_chars("=>-"));
    pb
}

fn main() {
    let n_tracks = 200_000;  // Size of the candidate pool
    let n_queries = 50;      // Number of seeds to rank against
    let k = 10;

    println!("=== Ranking Performance Test ===");
    println!("Parameters:");
    println!("  Tracks: {}", n_tracks);
    println!("  Queries: {}", n_queries);
    println!("  Top-k: {}", k);

    let mut rng = rand::thread_rng();

    println!("\nGenerating {} random tracks...", n_tracks);
    let pb = progress_bar(n_tracks);
    let mut pool = Vec::with_capacity(n_tracks);
    for i in 0..n_tracks {
        pool.push(
            CandidateRecord::new(format!("Track {}", i), "Bench", generate_random_vector(&mut rng))
                .with_track_id(i.to_string()),
        );
        pb.inc(1);
    }
    pb.finish_with_message("Pool generation complete");

    let sequential = Ranker::new(RankOptions { k, parallel_threshold: usize::MAX, ..RankOptions::default() });
    let parallel = Ranker::new(RankOptions { k, parallel_threshold: 1, ..RankOptions::default() });

    println!("\nRanking {} seeds...", n_queries);
    let pb = progress_bar(n_queries);
    let mut sequential_time = Duration::ZERO;
    let mut parallel_time = Duration::ZERO;
    let mut mismatches = 0;

    for _ in 0..n_queries {
        let seed = Seed::from_profile(generate_random_vector(&mut rng));

        let start = Instant::now();
        let seq = sequential.rank(&seed, &pool);
        sequential_time += start.elapsed();

        let start = Instant::now();
        let par = parallel.rank(&seed, &pool);
        parallel_time += start.elapsed();

        match (seq, par) {
            (Ok(seq), Ok(par)) => {
                let seq_ids: Vec<_> = seq.iter().map(|r| r.index).collect();
                let par_ids: Vec<_> = par.iter().map(|r| r.index).collect();
                if seq_ids != par_ids {
                    mismatches += 1;
                }
            }
            (Err(e), _) | (_, Err(e)) => println!("Ranking error: {}", e),
        }
        pb.inc(1);
    }
    pb.finish();

    println!("\nPerformance Metrics:");
    println!("  Sequential avg per query: {:?}", sequential_time / n_queries as u32);
    println!("  Parallel avg per query:   {:?}", parallel_time / n_queries as u32);
    println!(
        "  Speedup: {:.2}x",
        sequential_time.as_secs_f64() / parallel_time.as_secs_f64()
    );
    println!("  Result mismatches: {}", mismatches);

    let memory_per_track = FEATURE_COUNT * std::mem::size_of::<f64>();
    println!("\nMemory Usage Estimation:");
    println!("  Features per track: {} bytes", memory_per_track);
    println!("  Features total: {:.2} MB", (memory_per_track * n_tracks) as f64 / 1024.0 / 1024.0);
}
