//! End-to-end tests: pool files on disk, seed lookup, ranking.

use std::io::Write;

use tempfile::NamedTempFile;
use track_recommender::{
    compute_distances, recommend, Error, Pool, RankOptions, Ranker, Recommendation, Seed,
};

const SB19: &str = r#"[
    {"track_name": "Gento", "artist_name": "SB19", "track_id": "sb-1",
     "danceability": 0.8, "energy": 0.7, "loudness": -5.0, "speechiness": 0.05,
     "acousticness": 0.1, "instrumentalness": 0.0, "liveness": 0.2,
     "valence": 0.9, "tempo": 120.0},
    {"track_name": "MAPA", "artist_name": "SB19", "track_id": "sb-2",
     "danceability": 0.4, "energy": 0.3, "loudness": -9.0, "speechiness": 0.03,
     "acousticness": 0.7, "instrumentalness": 0.0, "liveness": 0.1,
     "valence": 0.3, "tempo": 72.0}
]"#;

const TOP: &str = r#"[
    {"track_name": "Ballad", "artist_name": "Slow Hands", "track_id": "top-1",
     "danceability": 0.3, "energy": 0.2, "loudness": -11.0, "speechiness": 0.03,
     "acousticness": 0.8, "instrumentalness": 0.0, "liveness": 0.1,
     "valence": 0.2, "tempo": 70.0},
    {"track_name": "Banger", "artist_name": "Loud Crew", "track_id": "top-2",
     "danceability": 0.8, "energy": 0.8, "loudness": -4.5, "speechiness": 0.06,
     "acousticness": 0.1, "instrumentalness": 0.0, "liveness": 0.2,
     "valence": 0.85, "tempo": 122.0},
    {"track_name": "Middle", "artist_name": "Someone", "track_id": "top-3",
     "danceability": 0.6, "energy": 0.5, "loudness": -7.0, "speechiness": 0.1,
     "acousticness": 0.4, "instrumentalness": 0.1, "liveness": 0.3,
     "valence": 0.5, "tempo": 95.0},
    {"track_name": "Gento", "artist_name": "SB19", "track_id": "sb-1",
     "danceability": 0.8, "energy": 0.7, "loudness": -5.0, "speechiness": 0.05,
     "acousticness": 0.1, "instrumentalness": 0.0, "liveness": 0.2,
     "valence": 0.9, "tempo": 120.0}
]"#;

fn write_pool(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write pool");
    file
}

fn names(recs: &[Recommendation]) -> Vec<&str> {
    recs.iter().map(|r| r.track_name.as_str()).collect()
}

#[test]
fn seed_lookup_then_rank_other_pool() {
    let seeds = Pool::load(write_pool(SB19).path()).unwrap();
    let top = Pool::load(write_pool(TOP).path()).unwrap();

    let seed = seeds.find_by_name("Gento").unwrap();
    let recs = Ranker::default().recommend(&seed, top.records()).unwrap();
    assert_eq!(names(&recs), ["Gento", "Banger", "Middle", "Ballad"]);
}

#[test]
fn reverse_direction_uses_the_same_engine() {
    let seeds = Pool::load(write_pool(TOP).path()).unwrap();
    let sb19 = Pool::load(write_pool(SB19).path()).unwrap();

    let seed = seeds.find_by_name("Ballad").unwrap();
    let recs = Ranker::default().recommend(&seed, sb19.records()).unwrap();
    assert_eq!(names(&recs), ["MAPA", "Gento"]);
}

#[test]
fn exclude_self_removes_the_seed_track() {
    let top = Pool::load(write_pool(TOP).path()).unwrap();
    let seed = top.find_by_name("Gento").unwrap();

    let ranker = Ranker::new(RankOptions {
        exclude_self: true,
        ..RankOptions::default()
    });
    let recs = ranker.recommend(&seed, top.records()).unwrap();
    assert_eq!(recs.len(), 3);
    assert!(!names(&recs).contains(&"Gento"));
}

#[test]
fn unknown_song_is_seed_not_found() {
    let seeds = Pool::load(write_pool(SB19).path()).unwrap();
    let err = seeds.find_by_name("Not A Song").unwrap_err();
    assert!(matches!(err, Error::SeedNotFound { ref name } if name == "Not A Song"));
}

#[test]
fn pool_missing_tempo_fails_to_load() {
    let broken = SB19.replacen(r#", "tempo": 72.0"#, "", 1);
    let err = Pool::load(write_pool(&broken).path()).unwrap_err();
    match err {
        Error::MalformedVector { field, row, .. } => {
            assert_eq!(field, "tempo");
            assert_eq!(row, Some(1));
        }
        other => panic!("expected MalformedVector, got {other:?}"),
    }
}

#[test]
fn missing_file_is_io_error() {
    let err = Pool::load(std::path::Path::new("/nonexistent/pool.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn profile_defaults_to_pool_means() {
    let top = Pool::load(write_pool(TOP).path()).unwrap();
    let profile = top.profile_with(&[("tempo", 121.0), ("loudness", -4.8)]).unwrap();
    let recs = recommend(&profile, top.records(), 5).unwrap();
    assert_eq!(recs.len(), 4);

    let seed = Seed::from_profile(profile);
    let ranked = Ranker::default().rank(&seed, top.records()).unwrap();
    for pair in ranked.windows(2) {
        assert!(pair[0].distances.cosine <= pair[1].distances.cosine);
    }
    for r in &ranked {
        let direct = compute_distances(&profile, &r.record.features).unwrap();
        assert_eq!(direct, r.distances);
    }
}
