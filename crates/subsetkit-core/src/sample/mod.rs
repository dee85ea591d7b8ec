//! # Large-Table Sampling
//!
//! Reduces a table to at most `target_size` rows without `ORDER BY random()`
//! or a full `COUNT(*)`, both of which are too slow on large tables.
//!
//! 1. Read `max_key`, the largest primary key.
//! 2. Estimate the *density* (the share of integers in `[0, max_key]` that
//!    are real keys) by probing `DENSITY_PROBES` random keys.
//! 3. Draw `round(1.1 × target_size / density)` random keys in the same
//!    range, deduplicate them, keep those that exist and pass the table's
//!    own condition, and stop at `target_size`.
//! 4. Store the result as `<working schema>.sample_<table>` with an index.
//!
//! The 1.1 over-draw absorbs duplicate draws and rows dropped by the
//! condition. A shortfall is accepted as is; `target_size` is an upper
//! bound, not a promise.

pub mod postgres;

use std::future::Future;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::job::SampleSpec;

/// Number of random keys probed to estimate density.
pub const DENSITY_PROBES: usize = 10_000;

/// Most candidate keys drawn for one table. Bounds the `bigint[]` bound to
/// a single statement (16 MB) on sparse key ranges.
pub const MAX_CANDIDATES: usize = 2_000_000;

/// Over-draw factor applied to the candidate count.
pub const OVERSAMPLE_FACTOR: f64 = 1.1;

/// Everything needed to materialize one keyset.
#[derive(Debug, Clone, Copy)]
pub struct KeysetRequest<'a> {
    pub table: &'a str,
    pub key_column: &'a str,
    /// Keyset table name inside the working schema.
    pub keyset_table: &'a str,
    /// Distinct candidate keys in preference order. The first `limit`
    /// that exist and pass the condition are kept.
    pub candidates: &'a [i64],
    /// The table's own condition, ANDed into the selection.
    pub condition: Option<&'a str>,
    pub limit: u64,
}

/// The database interactions the sampler needs.
pub trait KeySource: Send + Sync {
    /// Largest primary key in `table`, `None` when the table is empty.
    fn max_key(
        &self,
        table: &str,
        key_column: &str,
    ) -> impl Future<Output = Result<Option<i64>>> + Send;

    /// How many of `keys` exist in `table`.
    fn count_existing(
        &self,
        table: &str,
        key_column: &str,
        keys: &[i64],
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Replace the keyset table with the existing, condition-passing
    /// candidates (at most `limit`). Returns the number of keys stored.
    fn store_keyset(&self, request: KeysetRequest<'_>) -> impl Future<Output = Result<u64>> + Send;
}

/// Outcome of sampling one table.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleKeyset {
    pub table: String,
    pub keyset_table: String,
    pub max_key: Option<i64>,
    pub density: f64,
    /// Distinct candidate keys offered to the database.
    pub candidates: usize,
    /// Keys actually stored.
    pub size: u64,
    pub target_size: u64,
}

impl SampleKeyset {
    /// Whether the keyset came up short of its target.
    pub fn is_short(&self) -> bool {
        self.size < self.target_size
    }
}

/// Draw `count` uniform keys in `[0, max_key]`, sorted and deduplicated.
pub fn draw_keys<R: Rng>(rng: &mut R, max_key: i64, count: usize) -> Vec<i64> {
    let mut keys: Vec<i64> = (0..count).map(|_| rng.random_range(0..=max_key)).collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Share of probed keys that exist. Never zero, so the candidate count
/// stays finite when a probe happens to miss every row.
pub fn estimate_density(hits: u64, probes: usize) -> f64 {
    if probes == 0 {
        return 1.0;
    }
    let floor = 1.0 / DENSITY_PROBES as f64;
    (hits as f64 / probes as f64).clamp(floor, 1.0)
}

/// Number of keys to draw: `round(1.1 × target / density)`, capped at the
/// size of the key range and at `MAX_CANDIDATES`.
pub fn candidate_count(target_size: u64, density: f64, max_key: i64) -> usize {
    let wanted = (OVERSAMPLE_FACTOR * target_size as f64 / density).round();
    let range = (max_key as u64).saturating_add(1);
    let ceiling = range.min(MAX_CANDIDATES as u64);
    let wanted = if wanted >= ceiling as f64 {
        ceiling
    } else {
        wanted as u64
    };
    usize::try_from(wanted).unwrap_or(MAX_CANDIDATES)
}

/// Builds keysets against a `KeySource`.
pub struct Sampler<'a, S: KeySource> {
    source: &'a S,
    rng: StdRng,
}

impl<'a, S: KeySource> Sampler<'a, S> {
    /// A fixed `seed` makes the drawn keys reproducible.
    pub fn new(source: &'a S, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { source, rng }
    }

    /// Sample `spec.table` and store its keyset as `keyset_table`.
    pub async fn materialize(
        &mut self,
        spec: &SampleSpec,
        key_column: &str,
        keyset_table: &str,
        condition: Option<&str>,
    ) -> Result<SampleKeyset> {
        let max_key = self.source.max_key(&spec.table, key_column).await?;

        let (density, candidates) = match max_key {
            Some(max_key) if max_key > 0 => {
                let probes = draw_keys(&mut self.rng, max_key, DENSITY_PROBES);
                let hits = self
                    .source
                    .count_existing(&spec.table, key_column, &probes)
                    .await?;
                let density = estimate_density(hits, probes.len());
                let count = candidate_count(spec.target_size, density, max_key);
                if count == MAX_CANDIDATES {
                    tracing::warn!(
                        "Sampling {}: density {:.4} over keys up to {} draws only {} candidates; the sample may fall short",
                        spec.table,
                        density,
                        max_key,
                        MAX_CANDIDATES
                    );
                }
                let mut candidates = draw_keys(&mut self.rng, max_key, count);
                // Random order, so the limit keeps an unbiased prefix.
                candidates.shuffle(&mut self.rng);
                (density, candidates)
            }
            _ => (0.0, Vec::new()),
        };

        tracing::debug!(
            "Sampling {}: max key {:?}, density {:.4}, {} candidates",
            spec.table,
            max_key,
            density,
            candidates.len()
        );

        let size = self
            .source
            .store_keyset(KeysetRequest {
                table: &spec.table,
                key_column,
                keyset_table,
                candidates: &candidates,
                condition,
                limit: spec.target_size,
            })
            .await?;

        let keyset = SampleKeyset {
            table: spec.table.clone(),
            keyset_table: keyset_table.to_string(),
            max_key,
            density,
            candidates: candidates.len(),
            size,
            target_size: spec.target_size,
        };

        if keyset.is_short() {
            tracing::info!(
                "Sample for {} has {} of {} requested rows",
                keyset.table,
                keyset.size,
                keyset.target_size
            );
        }

        Ok(keyset)
    }
}
