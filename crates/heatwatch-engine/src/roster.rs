//! Worker registry and baseline generation.
//!
//! The registry is the subject resolver the simulation loop consumes: it
//! resolves workers by id or name, and takes the loop's per-tick merges.
//! The loop is the sole writer of the simulated fields while a run is
//! active; everything else reads snapshots.
//!
//! Baseline generation seeds each worker's vitals from tier-shaped random
//! ranges, then normalizes the result through the same clamp/derive
//! pipeline the signal generator uses, so a freshly generated worker
//! already satisfies every bounds invariant.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;
use heatwatch_core::bounds::VitalBounds;
use heatwatch_core::signal;
use heatwatch_types::{RiskAnnotation, RiskTier, Vitals, Worker, WorkerId};
use rand::Rng;
use uuid::Uuid;

/// Built-in pool of worker display names used when seeding a registry.
/// Names wrap with a numeric suffix once the pool is exhausted.
const NAME_POOL: &[&str] = &[
    "Amara", "Bekele", "Calloway", "Dimitriou", "Esteban", "Farah", "Grieve",
    "Huang", "Iqbal", "Jansen", "Kowalski", "Lindqvist", "Moreau", "Nakamura",
    "Okafor", "Petrov", "Quinn", "Ramirez", "Sato", "Tesfaye", "Ueda",
    "Vasquez", "Whitfield", "Yilmaz",
];

// ---------------------------------------------------------------------------
// Baseline generation
// ---------------------------------------------------------------------------

/// Generate fresh baseline vitals for a worker of the given tier.
///
/// Each tier draws from its own physiological window -- a `High` tier
/// worker starts warm, humid, and sympathetically aroused, close to the
/// warning thresholds. The raw draws are normalized (clamped, rounded,
/// derived fields recomputed) before being returned.
pub fn generate_baseline(tier: RiskTier, rng: &mut impl Rng, bounds: &VitalBounds) -> Vitals {
    let raw = match tier {
        RiskTier::Low => Vitals {
            temperature_c: rng.random_range(18.0..24.0),
            humidity_pct: rng.random_range(35.0..55.0),
            hr_mean: rng.random_range(58.0..72.0),
            rmssd: rng.random_range(45.0..80.0),
            sdnn: rng.random_range(50.0..100.0),
            pnn50: rng.random_range(15.0..35.0),
            mean_nni: rng.random_range(800.0..1050.0),
            total_power: rng.random_range(2000.0..4000.0),
            vlf: rng.random_range(600.0..1400.0),
            lf: rng.random_range(400.0..1100.0),
            hf: rng.random_range(400.0..1200.0),
            ..zeroed_derived()
        },
        RiskTier::Moderate => Vitals {
            temperature_c: rng.random_range(20.0..27.0),
            humidity_pct: rng.random_range(40.0..65.0),
            hr_mean: rng.random_range(68.0..85.0),
            rmssd: rng.random_range(30.0..55.0),
            sdnn: rng.random_range(35.0..70.0),
            pnn50: rng.random_range(8.0..20.0),
            mean_nni: rng.random_range(700.0..900.0),
            total_power: rng.random_range(1500.0..2800.0),
            vlf: rng.random_range(500.0..1100.0),
            lf: rng.random_range(500.0..1300.0),
            hf: rng.random_range(250.0..700.0),
            ..zeroed_derived()
        },
        RiskTier::High => Vitals {
            temperature_c: rng.random_range(24.0..31.0),
            humidity_pct: rng.random_range(55.0..80.0),
            hr_mean: rng.random_range(80.0..100.0),
            rmssd: rng.random_range(16.0..35.0),
            sdnn: rng.random_range(22.0..45.0),
            pnn50: rng.random_range(2.0..10.0),
            mean_nni: rng.random_range(600.0..760.0),
            total_power: rng.random_range(900.0..1800.0),
            vlf: rng.random_range(350.0..800.0),
            lf: rng.random_range(600.0..1500.0),
            hf: rng.random_range(130.0..400.0),
            ..zeroed_derived()
        },
    };
    signal::normalize(&raw, bounds)
}

/// Generate a complete worker record with fresh baseline vitals.
pub fn generate_worker(
    name: &str,
    tier: RiskTier,
    rng: &mut impl Rng,
    bounds: &VitalBounds,
) -> Worker {
    Worker {
        id: WorkerId::new(),
        name: name.to_owned(),
        age_years: rng.random_range(21..60),
        risk_tier: tier,
        vitals: generate_baseline(tier, rng, bounds),
        risk: None,
        created_at: Utc::now(),
    }
}

/// A vitals block with only primaries meaningful; derived fields zeroed,
/// to be filled by [`signal::normalize`].
const fn zeroed_derived() -> Vitals {
    Vitals {
        temperature_c: 0.0,
        humidity_pct: 0.0,
        hr_mean: 0.0,
        hr_min: 0.0,
        hr_max: 0.0,
        hr_std: 0.0,
        rmssd: 0.0,
        sdnn: 0.0,
        pnn50: 0.0,
        mean_nni: 0.0,
        median_nni: 0.0,
        range_nni: 0.0,
        cv_nni: 0.0,
        total_power: 0.0,
        vlf: 0.0,
        lf: 0.0,
        hf: 0.0,
        lf_hf_ratio: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// In-memory worker registry: the subject resolver consumed by the loop.
///
/// All methods take snapshots or perform one short mutation under the
/// lock; nothing holds the lock across an await point. A poisoned lock
/// yields the last written state rather than propagating the panic.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    inner: RwLock<BTreeMap<WorkerId, Worker>>,
}

impl WorkerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with `count` generated workers, cycling risk
    /// tiers and the name pool. Returns the new ids in insertion order.
    pub fn seed(&self, count: u32, rng: &mut impl Rng, bounds: &VitalBounds) -> Vec<WorkerId> {
        let tiers = [RiskTier::Low, RiskTier::Moderate, RiskTier::High];
        let mut ids = Vec::new();
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        for index in 0..count {
            let pool_index = index.checked_rem(NAME_POOL.len()).unwrap_or(0);
            let base = NAME_POOL.get(pool_index).copied().unwrap_or("Worker");
            let cycle = index.checked_div(NAME_POOL.len()).unwrap_or(0);
            let name = if cycle == 0 {
                base.to_owned()
            } else {
                format!("{base}-{cycle}")
            };
            let tier_index = index.checked_rem(tiers.len()).unwrap_or(0);
            let tier = tiers.get(tier_index).copied().unwrap_or(RiskTier::Low);
            let worker = generate_worker(&name, tier, rng, bounds);
            ids.push(worker.id);
            self.insert(worker);
        }
        ids
    }

    /// Insert or replace a worker record.
    pub fn insert(&self, worker: Worker) {
        self.write().insert(worker.id, worker);
    }

    /// Snapshot a worker by id.
    pub fn get(&self, id: WorkerId) -> Option<Worker> {
        self.read().get(&id).cloned()
    }

    /// Resolve a worker by id or (case-insensitive) display name.
    pub fn find_by_identity(&self, identity: &str) -> Option<Worker> {
        let guard = self.read();
        if let Ok(uuid) = Uuid::parse_str(identity) {
            if let Some(worker) = guard.get(&WorkerId::from(uuid)) {
                return Some(worker.clone());
            }
        }
        guard
            .values()
            .find(|w| w.name.eq_ignore_ascii_case(identity))
            .cloned()
    }

    /// Merge simulated fields back into a worker after a tick.
    ///
    /// Returns `false` when the worker no longer exists, which the loop
    /// treats as subject-not-found.
    pub fn merge_simulated(
        &self,
        id: WorkerId,
        vitals: Vitals,
        risk: Option<RiskAnnotation>,
    ) -> bool {
        let mut guard = self.write();
        guard.get_mut(&id).is_some_and(|worker| {
            worker.vitals = vitals;
            worker.risk = risk;
            true
        })
    }

    /// Replace a worker's vitals wholesale and discard any risk
    /// annotation. Used by the baseline reset. Returns the updated
    /// record, or `None` if the worker no longer exists.
    pub fn replace_vitals(&self, id: WorkerId, vitals: Vitals) -> Option<Worker> {
        let mut guard = self.write();
        guard.get_mut(&id).map(|worker| {
            worker.vitals = vitals;
            worker.risk = None;
            worker.clone()
        })
    }

    /// Remove a worker record.
    pub fn remove(&self, id: WorkerId) -> Option<Worker> {
        self.write().remove(&id)
    }

    /// Number of workers in the registry.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot all workers in id order.
    pub fn workers(&self) -> Vec<Worker> {
        self.read().values().cloned().collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<WorkerId, Worker>> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<WorkerId, Worker>> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
