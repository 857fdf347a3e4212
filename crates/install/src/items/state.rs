//! Per-run bookkeeping of the item installer

use cpkg_types::{
    BehaviourOptions, CollisionKind, Id, ItemDescriptor, ItemReference, ItemUri, PackageEntry,
    VersionInstallMode,
};
use std::collections::{HashMap, HashSet};

/// Item entry waiting in the installation queue
#[derive(Debug, Clone)]
pub(crate) struct QueuedEntry {
    pub entry: PackageEntry,
    pub reference: ItemReference,
    /// Parsed payload, kept while the entry is postponed
    pub descriptor: Option<ItemDescriptor>,
}

/// Pending-delete key
pub(crate) type RecordKey = (String, Id);

#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub queue: Vec<QueuedEntry>,
    pub postponed: Vec<QueuedEntry>,
    /// Ids declared by the package and not committed yet, per database
    pub to_install: HashMap<String, HashSet<Id>>,
    /// Ids resolved this run (incoming and collision targets), per database
    pub already_installed: HashMap<String, HashSet<Id>>,
    /// Stub records created ahead of their template
    pub created: HashSet<Id>,
    pub pending_delete: Vec<RecordKey>,
    /// Records touched this run; never re-queued for deletion
    pub spared: HashSet<RecordKey>,
    pub options: HashMap<CollisionKind, BehaviourOptions>,
    pub apply_to_all: HashSet<CollisionKind>,
    /// Incoming id of the record whose mode is cached in `version_mode`
    pub current_id: Option<Id>,
    pub version_mode: VersionInstallMode,
    pub installed: Vec<ItemUri>,
}

impl RunState {
    pub fn declare(&mut self, database: &str, id: Id) {
        self.to_install
            .entry(database.to_string())
            .or_default()
            .insert(id);
    }

    pub fn commit(&mut self, database: &str, id: Id) {
        if let Some(ids) = self.to_install.get_mut(database) {
            ids.remove(&id);
        }
    }

    pub fn is_pending(&self, database: &str, id: Id) -> bool {
        self.to_install
            .get(database)
            .is_some_and(|ids| ids.contains(&id))
    }

    pub fn mark_resolved(&mut self, database: &str, id: Id) {
        self.already_installed
            .entry(database.to_string())
            .or_default()
            .insert(id);
    }

    /// Whether the record is declared by, or was resolved for, this package
    pub fn in_package(&self, database: &str, id: Id) -> bool {
        self.is_pending(database, id)
            || self
                .already_installed
                .get(database)
                .is_some_and(|ids| ids.contains(&id))
    }

    /// Template or base template still waiting in the queue
    pub fn is_blocked(&self, database: &str, record_id: Id, descriptor: &ItemDescriptor) -> bool {
        descriptor.template_id != record_id
            && descriptor
                .template_dependencies()
                .any(|id| self.is_pending(database, id))
    }

    /// Take a record out of the deletion queue for good
    pub fn spare(&mut self, database: &str, id: Id) {
        self.pending_delete
            .retain(|(db, queued)| !(db == database && *queued == id));
        self.spared.insert((database.to_string(), id));
    }

    pub fn enqueue_delete(&mut self, database: &str, id: Id) -> bool {
        let key = (database.to_string(), id);
        if self.spared.contains(&key) || self.pending_delete.contains(&key) {
            return false;
        }
        self.pending_delete.push(key);
        true
    }

    /// Cached options for a collision kind once apply-to-all was chosen
    pub fn cached_options(&self, kind: CollisionKind) -> Option<BehaviourOptions> {
        if self.apply_to_all.contains(&kind) {
            self.options.get(&kind).copied()
        } else {
            None
        }
    }

    pub fn remember_options(&mut self, kind: CollisionKind, options: BehaviourOptions, all: bool) {
        self.options.insert(kind, options);
        if all {
            self.apply_to_all.insert(kind);
        } else {
            self.apply_to_all.remove(&kind);
        }
    }

    /// Drop everything scoped to one flush; the deletion queue and the
    /// collision answers outlive it
    pub fn reset_pass_state(&mut self) {
        self.queue.clear();
        self.postponed.clear();
        self.to_install.clear();
        self.already_installed.clear();
        self.spared.clear();
        self.created.clear();
        self.current_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpkg_types::{InstallMode, MergeMode};

    #[test]
    fn test_spared_records_are_not_requeued() {
        let mut state = RunState::default();
        let id = Id::new_random();
        assert!(state.enqueue_delete("master", id));
        assert!(!state.enqueue_delete("master", id));

        state.spare("master", id);
        assert!(state.pending_delete.is_empty());
        assert!(!state.enqueue_delete("master", id));
        assert!(state.enqueue_delete("web", id));
    }

    #[test]
    fn test_options_are_cached_per_kind() {
        let mut state = RunState::default();
        let overwrite = BehaviourOptions::new(InstallMode::Overwrite, MergeMode::Undefined);
        state.remember_options(CollisionKind::Id, overwrite, true);
        state.remember_options(
            CollisionKind::Path,
            BehaviourOptions::new(InstallMode::Skip, MergeMode::Undefined),
            false,
        );
        assert_eq!(state.cached_options(CollisionKind::Id), Some(overwrite));
        assert_eq!(state.cached_options(CollisionKind::Path), None);
    }

    #[test]
    fn test_pending_templates_block_dependents() {
        let mut state = RunState::default();
        let (template, base, record) = (Id::new_random(), Id::new_random(), Id::new_random());
        let descriptor = ItemDescriptor {
            name: "a".to_string(),
            id: Some(record),
            template_id: template,
            base_template_ids: vec![base],
            parent_id: None,
            branch_id: None,
            created: None,
            language: None,
            version: None,
            fields: Vec::new(),
        };
        state.declare("master", base);
        assert!(state.is_blocked("master", record, &descriptor));
        assert!(!state.is_blocked("web", record, &descriptor));
        state.commit("master", base);
        assert!(!state.is_blocked("master", record, &descriptor));
    }
}
