use std::collections::HashMap;

use crate::state::CellId;

use super::hook::{Cleanup, EffectHook, HookId};
use super::trigger::EffectTrigger;

/// A hook action that returned an error during a pass.
#[derive(Debug)]
pub struct HookFailure {
    pub hook: HookId,
    pub error: anyhow::Error,
}

#[derive(Default)]
struct HookRecord {
    /// Cell versions observed at the end of the previous pass.
    seen: HashMap<CellId, u64>,
    cleanup: Option<Cleanup>,
    runs: u64,
}

/// Per-view bookkeeping of effect hooks.
#[derive(Default)]
pub struct EffectScheduler {
    records: HashMap<HookId, HookRecord>,
    passes: u64,
}

impl EffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// How many times the hook's action has been started.
    pub fn runs(&self, hook: &HookId) -> u64 {
        self.records.get(hook).map(|r| r.runs).unwrap_or(0)
    }

    /// Run every due hook of one render pass, in declaration order.
    ///
    /// Hooks that were registered in the previous pass but are missing now
    /// are retired: their cleanup runs and their bookkeeping is dropped.
    /// A failing action does not stop the remaining hooks.
    pub async fn run_pass(&mut self, hooks: Vec<EffectHook>) -> Vec<HookFailure> {
        self.passes += 1;
        self.retire_missing(&hooks);

        let mut failures = Vec::new();
        for hook in hooks {
            let triggers = hook.triggers();
            let is_new = !self.records.contains_key(hook.id());
            let record = self.records.entry(hook.id().clone()).or_default();

            let due = is_due(&triggers, record, is_new);
            for (cell, version) in triggers.iter().filter_map(EffectTrigger::watched_cell) {
                record.seen.insert(cell, version);
            }
            if !due {
                continue;
            }

            if let Some(cleanup) = record.cleanup.take() {
                cleanup.run();
            }
            record.runs += 1;
            tracing::debug!(hook = %hook.id(), pass = self.passes, "running effect");

            match hook.start().await {
                Ok(cleanup) => {
                    if let Some(record) = self.records.get_mut(hook.id()) {
                        record.cleanup = Some(cleanup);
                    }
                }
                Err(error) => {
                    tracing::warn!(hook = %hook.id(), error = %error, "effect failed");
                    failures.push(HookFailure {
                        hook: hook.id().clone(),
                        error,
                    });
                }
            }
        }
        failures
    }

    /// Run every retained cleanup and forget all hooks.
    pub fn dispose(&mut self) {
        for (_, record) in self.records.drain() {
            if let Some(cleanup) = record.cleanup {
                cleanup.run();
            }
        }
    }

    fn retire_missing(&mut self, hooks: &[EffectHook]) {
        let retired: Vec<HookId> = self
            .records
            .keys()
            .filter(|id| !hooks.iter().any(|hook| hook.id() == *id))
            .cloned()
            .collect();
        for id in retired {
            if let Some(record) = self.records.remove(&id) {
                tracing::debug!(hook = %id, "retiring effect");
                if let Some(cleanup) = record.cleanup {
                    cleanup.run();
                }
            }
        }
    }
}

fn is_due(triggers: &[EffectTrigger], record: &HookRecord, is_new: bool) -> bool {
    triggers.iter().any(|trigger| match trigger {
        EffectTrigger::AfterInit => is_new,
        EffectTrigger::AfterRender => true,
        EffectTrigger::AfterChange(source) => record
            .seen
            .get(&source.cell_id())
            .is_some_and(|seen| *seen != source.version()),
    })
}
