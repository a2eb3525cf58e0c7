use std::sync::RwLock;

use tracing::{debug, warn};

use grove_apply::{apply, transfer, transfer_subtree, ApplyReport};
use grove_cache::{CacheNode, ChangeCache};
use grove_snapshot::{default_forest, SnapshotCodec};
use grove_store::TreeStore;
use grove_types::{DisplayNode, NodeId};

use crate::config::SessionConfig;
use crate::error::SessionResult;

/// One editing session over a tree store and its change cache.
pub struct Session {
    config: SessionConfig,
    codec: SnapshotCodec,
    store: TreeStore,
    cache: ChangeCache,
    selection: RwLock<Option<NodeId>>,
}

impl Session {
    /// Start a session on a freshly generated seed forest with an empty
    /// cache.
    pub fn new(config: SessionConfig) -> Self {
        let store = TreeStore::from_forest(default_forest(&config.seed));
        Self::assemble(config, store, ChangeCache::new())
    }

    /// Start a session from saved snapshots.
    ///
    /// A missing or unusable store snapshot falls back to the seed forest.
    /// A missing or unusable cache snapshot leaves the cache empty.
    pub fn open(config: SessionConfig, store_bytes: Option<&[u8]>, cache_bytes: Option<&[u8]>) -> Self {
        let codec = SnapshotCodec::new(config.snapshot.clone());

        let store = match store_bytes.and_then(|b| codec.decode_forest(b)) {
            Some(records) => TreeStore::from_records(records),
            None => {
                warn!("no usable store snapshot, starting from seed forest");
                TreeStore::from_forest(default_forest(&config.seed))
            }
        };

        let cache = ChangeCache::new();
        if let Some(forest) = cache_bytes.and_then(|b| codec.decode_cache(b)) {
            cache.restore(forest);
        }

        Self::assemble(config, store, cache)
    }

    fn assemble(config: SessionConfig, store: TreeStore, cache: ChangeCache) -> Self {
        debug!(nodes = store.len(), cached = cache.len(), "session opened");
        Self {
            codec: SnapshotCodec::new(config.snapshot.clone()),
            config,
            store,
            cache,
            selection: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &TreeStore {
        &self.store
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    // ---- Editing ----

    /// Copy a live store node into the cache.
    pub fn transfer(&self, id: &NodeId) -> SessionResult<CacheNode<String>> {
        Ok(transfer(&self.store, &self.cache, id)?)
    }

    /// Copy a live store subtree into the cache.
    pub fn transfer_subtree(&self, id: &NodeId) -> SessionResult<Vec<NodeId>> {
        Ok(transfer_subtree(&self.store, &self.cache, id)?)
    }

    /// Create a new node in the cache.
    pub fn create(&self, value: impl Into<String>, parent_id: Option<NodeId>) -> CacheNode<String> {
        self.cache.create_node(value.into(), parent_id)
    }

    pub fn modify(&self, id: &NodeId, value: impl Into<String>) -> SessionResult<()> {
        Ok(self.cache.modify_node(id, value.into())?)
    }

    /// Delete a node in the cache. A selection that vanished with it is
    /// cleared.
    pub fn delete(&self, id: &NodeId) -> SessionResult<()> {
        self.cache.delete_node(id)?;
        self.refresh_selection(None);
        Ok(())
    }

    /// Merge pending cache edits into the store.
    ///
    /// A selected node that was just created follows its new permanent id;
    /// a selection that no longer resolves is cleared.
    pub fn apply(&self) -> ApplyReport {
        let report = apply(&self.store, &self.cache);
        self.refresh_selection(Some(&report));
        report
    }

    // ---- Selection ----

    /// Select a node. Returns `false` and leaves the selection unchanged if
    /// `id` does not resolve to a live node.
    pub fn select(&self, id: NodeId) -> bool {
        if !self.resolves(&id) {
            return false;
        }
        *self.selection.write().expect("lock poisoned") = Some(id);
        true
    }

    pub fn selection(&self) -> Option<NodeId> {
        *self.selection.read().expect("lock poisoned")
    }

    pub fn clear_selection(&self) {
        *self.selection.write().expect("lock poisoned") = None;
    }

    /// The cache view wins over the store for nodes it holds.
    fn resolves(&self, id: &NodeId) -> bool {
        match self.cache.find_node(id) {
            Some(node) => !node.is_deleted,
            None => self.store.get_non_deleted(id).is_some(),
        }
    }

    fn refresh_selection(&self, report: Option<&ApplyReport>) {
        let mut selection = self.selection.write().expect("lock poisoned");
        let Some(selected) = *selection else {
            return;
        };
        let current = report
            .and_then(|r| r.permanent_id(&selected))
            .unwrap_or(selected);
        if self.resolves(&current) {
            *selection = Some(current);
        } else {
            debug!(node = %selected.short_id(), "cleared stale selection");
            *selection = None;
        }
    }

    // ---- Views ----

    /// Display tree of the live store.
    pub fn store_view(&self) -> Vec<DisplayNode> {
        self.store.display_forest()
    }

    /// Display tree of the cache, deleted nodes included.
    pub fn cache_view(&self) -> Vec<DisplayNode> {
        self.cache.display_forest()
    }

    // ---- Persistence ----

    pub fn save_store(&self) -> SessionResult<Vec<u8>> {
        Ok(self.codec.encode_forest(&self.store.export_records())?)
    }

    pub fn save_cache(&self) -> SessionResult<Vec<u8>> {
        Ok(self.codec.encode_cache(&self.cache.export())?)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use grove_snapshot::{Codec, SnapshotConfig, MAX_DEPTH};
    use grove_types::{flatten, ChangeState, VisualState};

    fn root_of(session: &Session) -> NodeId {
        session.store().root_ids()[0]
    }

    // -----------------------------------------------------------------------
    // Opening
    // -----------------------------------------------------------------------

    #[test]
    fn new_session_starts_from_seed_forest() {
        let session = Session::default();
        assert_eq!(session.store().len(), 10);
        assert!(session.cache().is_empty());
        assert_eq!(session.store_view()[0].title, "Root");
        assert!(session.selection().is_none());
    }

    #[test]
    fn open_falls_back_on_garbage() {
        let session = Session::open(SessionConfig::default(), Some(&b"not json"[..]), Some(&b"[]"[..]));
        assert_eq!(session.store().len(), 10);
        assert!(session.cache().is_empty());
    }

    #[test]
    fn save_and_reopen_with_both_codecs() {
        for codec in [Codec::Json, Codec::Bincode] {
            let config = SessionConfig {
                snapshot: SnapshotConfig { codec, pretty: false },
                ..Default::default()
            };
            let session = Session::new(config.clone());
            let root = root_of(&session);
            session.transfer(&root).unwrap();
            let fresh = session.create("draft", Some(root));

            let store_bytes = session.save_store().unwrap();
            let cache_bytes = session.save_cache().unwrap();
            let reopened = Session::open(config, Some(store_bytes.as_slice()), Some(cache_bytes.as_slice()));

            assert_eq!(reopened.store().export_records(), session.store().export_records());
            assert_eq!(reopened.cache().pending_order(), vec![fresh.id]);
            assert_eq!(reopened.cache_view(), session.cache_view());
        }
    }

    #[test]
    fn saving_over_deep_cache_reports_error() {
        let session = Session::default();
        let mut parent = None;
        for level in 0..=MAX_DEPTH {
            parent = Some(session.create(format!("level {level}"), parent).id);
        }
        assert!(matches!(session.save_cache(), Err(SessionError::Snapshot(_))));
        assert!(session.save_store().is_ok());
    }

    // -----------------------------------------------------------------------
    // Editing and apply
    // -----------------------------------------------------------------------

    #[test]
    fn edit_apply_cycle() {
        let session = Session::default();
        let root = root_of(&session);
        session.transfer_subtree(&root).unwrap();
        let first_child = session.cache().find_node(&root).unwrap().children[0];

        session.modify(&root, "Renamed").unwrap();
        session.delete(&first_child).unwrap();
        let fresh = session.create("Added", Some(root));

        let report = session.apply();
        assert!(report.is_complete());
        assert_eq!(report.updated, vec![root]);
        assert!(report.deleted.contains(&first_child));

        let view = session.store_view();
        assert_eq!(view[0].title, "Renamed");
        let added = report.permanent_id(&fresh.id).unwrap();
        assert!(DisplayNode::find(&view, &added).is_some());
        assert!(DisplayNode::find(&view, &first_child).is_none());

        let cached = DisplayNode::find(&session.cache_view(), &first_child).cloned().unwrap();
        assert_eq!(cached.state, VisualState::Deleted);
        assert!(session.cache().all_modified().is_empty());
    }

    #[test]
    fn selection_follows_created_node() {
        let session = Session::default();
        let fresh = session.create("draft", None);
        assert!(session.select(fresh.id));

        let report = session.apply();
        let permanent = report.permanent_id(&fresh.id).unwrap();
        assert_eq!(session.selection(), Some(permanent));
        assert_eq!(
            session.cache().find_node(&permanent).unwrap().state,
            ChangeState::Unchanged
        );
    }

    #[test]
    fn selection_cleared_after_deleting_it() {
        let session = Session::default();
        let root = root_of(&session);
        session.transfer(&root).unwrap();
        assert!(session.select(root));

        session.delete(&root).unwrap();
        assert!(session.selection().is_none());
        session.apply();
        assert!(!session.select(root));
    }

    #[test]
    fn selecting_unknown_node_fails() {
        let session = Session::default();
        assert!(!session.select(NodeId::new()));
        assert!(session.select(root_of(&session)));
        session.clear_selection();
        assert!(session.selection().is_none());
    }

    #[test]
    fn errors_surface_through_session() {
        let session = Session::default();
        let missing = NodeId::new();
        assert!(session.transfer(&missing).is_err());
        assert!(session.modify(&missing, "x").is_err());
        assert!(session.delete(&missing).is_err());
    }

    #[test]
    fn views_flatten_for_rendering() {
        let session = Session::default();
        let view = session.store_view();
        let collapsed = flatten(&view, |_| false);
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[0].level, 0);
        let expanded = flatten(&view, |_| true);
        assert_eq!(expanded.len(), 10);
    }
}
