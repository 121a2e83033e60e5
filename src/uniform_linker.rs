// src/uniform_linker.rs
//! Propagates uniform changes from a source entity to linked targets.
//!
//! Links form a forest: a target has at most one source, a source any number of
//! targets. Per target, a per-name link takes precedence over the catch-all link,
//! and an ignored name is never propagated. Targets of one source are visited in
//! no particular order.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::entity::EntityId;
use crate::hash::HashValue;

/// `(source_data, dimension, count, target_data)`.
pub type UpdateUniformFn = Box<dyn FnMut(&[f32], usize, usize, &mut [f32])>;

/// Where the linker writes propagated values.
pub trait UniformTargets {
    /// Storage for `dimension * count` floats of the uniform being updated on `target`.
    fn uniform_data_mut(
        &mut self,
        target: EntityId,
        dimension: usize,
        count: usize,
    ) -> Option<&mut [f32]>;
}

enum LinkedUpdate {
    /// Copies `dimension * count` floats.
    Copy,
    Custom(UpdateUniformFn),
}

impl LinkedUpdate {
    fn from_fn(update_fn: Option<UpdateUniformFn>) -> Self {
        update_fn.map_or(LinkedUpdate::Copy, LinkedUpdate::Custom)
    }

    fn apply(&mut self, data: &[f32], dimension: usize, count: usize, target_data: &mut [f32]) {
        match self {
            LinkedUpdate::Copy => {
                let len = (dimension * count).min(data.len()).min(target_data.len());
                target_data[..len].copy_from_slice(&data[..len]);
            }
            LinkedUpdate::Custom(update_fn) => update_fn(data, dimension, count, target_data),
        }
    }
}

#[derive(Default)]
struct TargetRecord {
    source: Option<EntityId>,
    ignored: HashSet<HashValue>,
    per_name: HashMap<HashValue, LinkedUpdate>,
    catch_all: Option<LinkedUpdate>,
}

impl TargetRecord {
    fn update_for(&mut self, name: HashValue) -> Option<&mut LinkedUpdate> {
        if self.ignored.contains(&name) {
            return None;
        }
        match self.per_name.get_mut(&name) {
            Some(update) => Some(update),
            None => self.catch_all.as_mut(),
        }
    }
}

#[derive(Default)]
pub struct UniformLinker {
    sources: HashMap<EntityId, HashSet<EntityId>>,
    targets: HashMap<EntityId, TargetRecord>,
}

impl fmt::Debug for UniformLinker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformLinker")
            .field("sources", &self.sources.len())
            .field("targets", &self.targets.len())
            .finish()
    }
}

impl UniformLinker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `name` on `target` to `source`. `None` copies the source values as-is.
    pub fn link_uniform(
        &mut self,
        target: EntityId,
        source: EntityId,
        name: HashValue,
        update_fn: Option<UpdateUniformFn>,
    ) {
        let record = self.attach(target, source);
        record.per_name.insert(name, LinkedUpdate::from_fn(update_fn));
    }

    /// Links every uniform of `target` not linked by name to `source`.
    pub fn link_all_uniforms(
        &mut self,
        target: EntityId,
        source: EntityId,
        update_fn: Option<UpdateUniformFn>,
    ) {
        let record = self.attach(target, source);
        record.catch_all = Some(LinkedUpdate::from_fn(update_fn));
    }

    /// Stops `name` from propagating to `target`. Holds for links made later too.
    pub fn ignore_linked_uniform(&mut self, target: EntityId, name: HashValue) {
        self.targets.entry(target).or_default().ignored.insert(name);
    }

    /// Removes every link `entity` takes part in, as a target and as a source.
    pub fn unlink_uniforms(&mut self, entity: EntityId) {
        if let Some(record) = self.targets.remove(&entity) {
            if let Some(source) = record.source {
                self.detach(source, entity);
            }
        }
        if let Some(targets) = self.sources.remove(&entity) {
            for target in targets {
                self.targets.remove(&target);
            }
        }
    }

    /// Propagates `name` from `source` to each linked target that does not ignore it.
    pub fn update_linked_uniforms(
        &mut self,
        source: EntityId,
        name: HashValue,
        data: &[f32],
        dimension: usize,
        count: usize,
        targets: &mut dyn UniformTargets,
    ) {
        let Some(linked) = self.sources.get(&source) else {
            return;
        };
        for target in linked {
            let record = self.targets.get_mut(target);
            let Some(update) = record.and_then(|record| record.update_for(name)) else {
                continue;
            };
            match targets.uniform_data_mut(*target, dimension, count) {
                Some(target_data) => update.apply(data, dimension, count, target_data),
                None => crate::dfatal!("Invalid target_data."),
            }
        }
    }

    /// Source `target` is linked to, if any.
    pub fn source_of(&self, target: EntityId) -> Option<EntityId> {
        self.targets.get(&target).and_then(|record| record.source)
    }

    pub fn targets_of(&self, source: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.sources.get(&source).into_iter().flatten().copied()
    }

    /// Sets `target`'s source, evicting a link to a different one.
    fn attach(&mut self, target: EntityId, source: EntityId) -> &mut TargetRecord {
        let previous = self.targets.get(&target).and_then(|record| record.source);
        match previous {
            Some(old) if old == source => {}
            Some(old) => {
                log::warn!(
                    "Relinking target {:?} from source {:?} to {:?}; dropping the old link.",
                    target,
                    old,
                    source
                );
                self.detach(old, target);
                self.sources.entry(source).or_default().insert(target);
            }
            None => {
                self.sources.entry(source).or_default().insert(target);
            }
        }

        let record = self.targets.entry(target).or_default();
        if previous.is_some_and(|old| old != source) {
            record.per_name.clear();
            record.catch_all = None;
        }
        record.source = Some(source);
        record
    }

    fn detach(&mut self, source: EntityId, target: EntityId) {
        if let Some(targets) = self.sources.get_mut(&source) {
            targets.remove(&target);
            if targets.is_empty() {
                self.sources.remove(&source);
            }
        }
    }
}
