//! Random test data for accounts.
//!
//! Every generator takes the caller's RNG so a seeded run produces the same
//! accounts every time.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::monetary::{Currency, SUPPORTED_CURRENCIES};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Random integer in `min..=max`.
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    rng.gen_range(min..=max)
}

/// Random lowercase string of length `n`.
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, n: usize) -> String {
    (0..n)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Random six-letter owner name.
pub fn random_owner<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_string(rng, 6)
}

/// Random amount of money in `0..=1000` minor units.
pub fn random_money<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    random_int(rng, 0, 1000)
}

/// Random supported currency.
pub fn random_currency<R: Rng + ?Sized>(rng: &mut R) -> Currency {
    let code = SUPPORTED_CURRENCIES
        .choose(rng)
        .copied()
        .unwrap_or(SUPPORTED_CURRENCIES[0]);
    Currency::new(code)
}
