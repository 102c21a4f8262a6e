//! Benchmark utilities.

use cinedex_core::Record;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GENRES: &[&str] = &["Drama", "Comedy", "Horror", "Romance", "Documentary", "Short"];

/// Seed shared by every benchmark so runs compare like with like.
pub const SEED: u64 = 0x00C1_7EDE;

/// Generates `count` records with `directors` distinct directors.
///
/// Years span 1890..2030 and titles share short prefixes, roughly the
/// shape of a real movie catalog.
pub fn generate_records(count: usize, directors: usize) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count)
        .map(|i| {
            let year = rng.gen_range(1890..2030);
            let first = GENRES[rng.gen_range(0..GENRES.len())];
            let second = GENRES[rng.gen_range(0..GENRES.len())];
            let initial = char::from(b'A' + rng.gen_range(0..26u8));
            Record::new(
                format!("tt{i:07}"),
                format!("{initial}{} {i}", random_word(&mut rng)),
                year,
                format!("{first},{second}"),
                format!("Director {}", rng.gen_range(0..directors.max(1))),
            )
        })
        .collect()
}

fn random_word(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(2..10);
    (0..len)
        .map(|_| char::from(b'a' + rng.gen_range(0..26u8)))
        .collect()
}
