//! Seeded `i32` inputs shared by the engine tests and the benchmarks.
//!
//! Every pattern draws from one seed per process, so all engines see the same values inside a
//! run. Set `OVERRIDE_SEED` to replay a run.

use std::env;
use std::sync::Mutex;

use rand::distributions::Uniform;
use rand::prelude::*;

const OVERRIDE_SEED_ENV: &str = "OVERRIDE_SEED";

#[derive(Copy, Clone, PartialEq, Eq)]
enum Seed {
    PerProcess(u64),
    Override(u64),
    EachCall,
}

static SEED: Mutex<Option<Seed>> = Mutex::new(None);

fn seed_state() -> Seed {
    *SEED.lock().unwrap().get_or_insert_with(|| {
        match env::var(OVERRIDE_SEED_ENV) {
            Ok(raw) => Seed::Override(
                raw.parse()
                    .unwrap_or_else(|_| panic!("{OVERRIDE_SEED_ENV} must be a u64, got {raw:?}")),
            ),
            Err(_) => Seed::PerProcess(thread_rng().gen()),
        }
    })
}

/// The seed the next pattern is generated from.
pub fn current_seed() -> u64 {
    match seed_state() {
        Seed::PerProcess(seed) | Seed::Override(seed) => seed,
        Seed::EachCall => thread_rng().gen(),
    }
}

/// Makes every pattern call draw fresh values, for benchmarks that must not replay one input.
pub fn use_random_seed_each_time() {
    if let Seed::Override(_) = seed_state() {
        panic!("{OVERRIDE_SEED_ENV} is set, refusing to switch to a fresh seed per call");
    }

    *SEED.lock().unwrap() = Some(Seed::EachCall);
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(current_seed())
}

pub fn random(len: usize) -> Vec<i32> {
    let mut rng = rng();
    (0..len).map(|_| rng.gen()).collect()
}

/// Values drawn from `range`, which may be half open or inclusive.
pub fn random_uniform<R>(len: usize, range: R) -> Vec<i32>
where
    R: Into<Uniform<i32>>,
{
    let dist: Uniform<i32> = range.into();
    rng().sample_iter(dist).take(len).collect()
}

/// Random values whose leading `sorted_percent` are already in order.
pub fn random_sorted(len: usize, sorted_percent: f64) -> Vec<i32> {
    let mut v = random(len);
    let prefix = ((len as f64) * sorted_percent / 100.0).round() as usize;
    v[..prefix.min(len)].sort_unstable();
    v
}

pub fn ascending(len: usize) -> Vec<i32> {
    (0..len as i32).collect()
}

pub fn descending(len: usize) -> Vec<i32> {
    (0..len as i32).rev().collect()
}

/// About `runs` sorted runs, each ascending or descending at random.
pub fn saw_mixed(len: usize, runs: usize) -> Vec<i32> {
    let mut rng = rng();
    let mut v: Vec<i32> = (0..len).map(|_| rng.gen()).collect();
    if len == 0 {
        return v;
    }

    let run_len = (len / runs.max(1)).max(1);
    for run in v.chunks_mut(run_len) {
        if rng.gen::<bool>() {
            run.sort_unstable();
        } else {
            run.sort_unstable_by(|a, b| b.cmp(a));
        }
    }

    v
}

/// Ascending first half followed by a descending second half.
pub fn pipe_organ(len: usize) -> Vec<i32> {
    let mut v = random(len);
    let (up, down) = v.split_at_mut(len / 2);
    up.sort_unstable();
    down.sort_unstable_by(|a, b| b.cmp(a));
    v
}
