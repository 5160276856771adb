use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::model::time::TimeRange;
use crate::rendering::media::QualityTier;
use crate::rendering::plan::RenderPlan;

const DEFAULT_PLAN_CACHE_SIZE: usize = 64;

/// A plan is only valid for the timeline revision it was resolved from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PlanKey {
    pub revision: u64,
    pub tier: QualityTier,
    pub range: TimeRange,
}

pub type SharedPlanCache = Arc<PlanCache>;

/// LRU cache of resolved preview plans.
pub struct PlanCache {
    plans: Mutex<LruCache<PlanKey, Arc<RenderPlan>>>,
}

impl PlanCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            plans: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn plans(&self) -> MutexGuard<'_, LruCache<PlanKey, Arc<RenderPlan>>> {
        self.plans.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &PlanKey) -> Option<Arc<RenderPlan>> {
        self.plans().get(key).cloned()
    }

    pub fn put(&self, key: PlanKey, plan: Arc<RenderPlan>) {
        self.plans().put(key, plan);
    }

    /// Drops plans resolved from revisions older than `revision`.
    pub fn retain_revision(&self, revision: u64) {
        let mut plans = self.plans();
        let stale: Vec<PlanKey> = plans
            .iter()
            .filter(|(key, _)| key.revision < revision)
            .map(|(key, _)| *key)
            .collect();
        for key in stale {
            plans.pop(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.plans().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.plans().clear();
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN_CACHE_SIZE)
    }
}
