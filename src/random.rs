use rand::{rngs::OsRng, rngs::StdRng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Builds the generator used for every draw in one invocation.
///
/// A fixed `seed` gives reproducible picks. Without one the generator is
/// seeded from the OS entropy source, falling back to the current time plus
/// the process id when no entropy source can be read.
pub fn seed_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(OsRng).unwrap_or_else(|e| {
            warn!("OS entropy unavailable ({}), seeding from time and pid", e);
            StdRng::seed_from_u64(fallback_seed())
        }),
    }
}

fn fallback_seed() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    now.wrapping_add(u64::from(std::process::id()))
}
