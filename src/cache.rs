use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{Group, ObjectKind, ObjectRef, Owner, RemoteObject, Scope};
use crate::fetcher::sort_by_name;
use crate::filter::matches_scope;

pub type Children = Arc<Vec<ObjectRef>>;

#[derive(Debug, Default)]
pub struct ScopedCache {
    roots: Mutex<HashMap<Group, HashMap<Owner, Children>>>,
    containers: Mutex<HashMap<(ObjectKind, i64), Children>>,
}

impl ScopedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, parent: &RemoteObject, group: &Group, owner: &Owner) -> Option<Children> {
        match parent.kind() {
            ObjectKind::Server => self
                .roots
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .get(group)
                .and_then(|owners| owners.get(owner))
                .cloned(),
            ObjectKind::OrphanedFolder => None,
            kind => self
                .containers
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .get(&(kind, parent.id()))
                .cloned(),
        }
    }

    /// Returns the cached children of `parent`, running `fetch` on a miss.
    ///
    /// The lock is not held while fetching; if two callers race on the same
    /// slot the first stored list wins and both get that instance.
    pub fn get_or_fetch<F>(
        &self,
        parent: &RemoteObject,
        group: &Group,
        owner: &Owner,
        fetch: F,
    ) -> Children
    where
        F: FnOnce() -> Vec<ObjectRef>,
    {
        if let Some(hit) = self.cached(parent, group, owner) {
            tracing::debug!(parent_id = parent.id(), kind = %parent.kind(), "cache hit");
            return hit;
        }
        tracing::debug!(parent_id = parent.id(), kind = %parent.kind(), "cache miss");
        let mut children = fetch();
        sort_by_name(&mut children);
        self.store(parent, group, owner, Arc::new(children))
    }

    fn store(&self, parent: &RemoteObject, group: &Group, owner: &Owner, children: Children) -> Children {
        match parent.kind() {
            ObjectKind::Server => self
                .roots
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .entry(group.clone())
                .or_default()
                .entry(owner.clone())
                .or_insert(children)
                .clone(),
            ObjectKind::OrphanedFolder => children,
            kind => self
                .containers
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .entry((kind, parent.id()))
                .or_insert(children)
                .clone(),
        }
    }

    pub fn len(&self) -> usize {
        let roots: usize = self
            .roots
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .values()
            .map(HashMap::len)
            .sum();
        roots
            + self
                .containers
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanedSnapshot {
    pub loaded: usize,
    pub total: Option<usize>,
    pub current: usize,
    pub is_loading: bool,
}

type Listener = Box<dyn Fn(&OrphanedSnapshot) + Send>;

pub struct OrphanedFolder {
    object: ObjectRef,
    images: Mutex<Vec<ObjectRef>>,
    loaded: AtomicUsize,
    total: AtomicI64,
    started: AtomicBool,
    observed: Mutex<OrphanedSnapshot>,
    listeners: Mutex<Vec<Listener>>,
}

impl OrphanedFolder {
    pub fn new(server: &ObjectRef, name: &str) -> Self {
        Self {
            object: RemoteObject::orphaned_folder(server, name),
            images: Mutex::new(Vec::new()),
            loaded: AtomicUsize::new(0),
            total: AtomicI64::new(-1),
            started: AtomicBool::new(false),
            observed: Mutex::new(OrphanedSnapshot {
                loaded: 0,
                total: None,
                current: 0,
                is_loading: true,
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn begin_loading(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    pub fn set_total(&self, total: usize) {
        self.total.store(total as i64, Ordering::SeqCst);
    }

    /// Appends one image. The counter moves under the list lock so readers
    /// never see more images than `loaded_count`.
    pub fn push(&self, image: ObjectRef) {
        let mut images = self.images.lock().unwrap_or_else(|err| err.into_inner());
        images.push(image);
        self.loaded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn total_count(&self) -> Option<usize> {
        let total = self.total.load(Ordering::SeqCst);
        (total >= 0).then_some(total as usize)
    }

    pub fn is_leaf(&self) -> bool {
        self.total_count() == Some(0)
    }

    pub fn images(&self) -> Vec<ObjectRef> {
        self.images
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn images_in_scope(&self, scope: &Scope) -> Vec<ObjectRef> {
        let mut visible: Vec<_> = self
            .images
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .iter()
            .filter(|image| matches_scope(image, &scope.group, &scope.owner))
            .cloned()
            .collect();
        sort_by_name(&mut visible);
        visible
    }

    pub fn snapshot(&self) -> OrphanedSnapshot {
        *self.observed.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&OrphanedSnapshot) + Send + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(Box::new(listener));
    }

    pub fn refresh(&self, scope: &Scope, is_loading: Option<bool>) -> OrphanedSnapshot {
        let (loaded, current) = {
            let images = self.images.lock().unwrap_or_else(|err| err.into_inner());
            let current = images
                .iter()
                .filter(|image| matches_scope(image, &scope.group, &scope.owner))
                .count();
            (self.loaded_count(), current)
        };

        let (snapshot, changed) = {
            let mut observed = self.observed.lock().unwrap_or_else(|err| err.into_inner());
            let next = OrphanedSnapshot {
                loaded,
                total: self.total_count(),
                current,
                is_loading: is_loading.unwrap_or(observed.is_loading),
            };
            let changed = next != *observed;
            *observed = next;
            (next, changed)
        };

        if changed {
            for listener in self
                .listeners
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .iter()
            {
                listener(&snapshot);
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RemoteRecord;
    use crate::domain::{Entity, ImageInfo, OwnerInfo};

    fn project(server: &ObjectRef, id: i64, name: &str) -> ObjectRef {
        RemoteObject::from_record(
            RemoteRecord::new(id, name, Entity::Project { child_count: 1 }),
            server,
        )
    }

    #[test]
    fn second_lookup_returns_same_instance() {
        let cache = ScopedCache::new();
        let server = RemoteObject::server("imaging.example.org");
        let calls = AtomicUsize::new(0);
        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            vec![project(&server, 2, "b"), project(&server, 1, "a")]
        };

        let first = cache.get_or_fetch(&server, &Group::All, &Owner::All, fetch);
        let second = cache.get_or_fetch(&server, &Group::All, &Owner::All, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first[0].name(), "a");
    }

    #[test]
    fn server_slots_are_scoped() {
        let cache = ScopedCache::new();
        let server = RemoteObject::server("imaging.example.org");
        let ada = Owner::User(OwnerInfo::new(1, "Ada", "Lovelace"));

        cache.get_or_fetch(&server, &Group::All, &Owner::All, || vec![project(&server, 1, "a")]);
        let for_ada = cache.get_or_fetch(&server, &Group::All, &ada, Vec::new);

        assert!(for_ada.is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn container_slots_ignore_scope() {
        let cache = ScopedCache::new();
        let server = RemoteObject::server("imaging.example.org");
        let p = project(&server, 4, "p");
        let ada = Owner::User(OwnerInfo::new(1, "Ada", "Lovelace"));

        let first = cache.get_or_fetch(&p, &Group::All, &Owner::All, Vec::new);
        let second = cache.get_or_fetch(&p, &Group::All, &ada, || vec![project(&server, 9, "x")]);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn orphaned_counters_stay_ordered() {
        let server = RemoteObject::server("imaging.example.org");
        let folder = OrphanedFolder::new(&server, "Orphaned Images");
        assert!(folder.begin_loading());
        assert!(!folder.begin_loading());
        assert_eq!(folder.total_count(), None);

        folder.set_total(3);
        for id in 0..3 {
            let image = RemoteObject::from_record(
                RemoteRecord::new(id, "img", Entity::Image(ImageInfo::default()))
                    .with_owner(OwnerInfo::new(id % 2, "A", "B")),
                folder.object(),
            );
            folder.push(image);
            let snap = folder.refresh(
                &Scope::new(Group::All, Owner::User(OwnerInfo::new(0, "A", "B"))),
                None,
            );
            assert!(snap.current <= snap.loaded);
            assert!(snap.loaded <= snap.total.unwrap());
        }
        assert_eq!(folder.snapshot().current, 2);
        assert!(folder.snapshot().is_loading);
    }

    #[test]
    fn subscribers_see_only_changes() {
        let server = RemoteObject::server("imaging.example.org");
        let folder = OrphanedFolder::new(&server, "Orphaned Images");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        folder.subscribe(move |snap| sink.lock().unwrap().push(*snap));

        folder.set_total(0);
        folder.refresh(&Scope::default(), Some(false));
        folder.refresh(&Scope::default(), Some(false));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].is_loading);
        assert!(folder.is_leaf());
    }
}
