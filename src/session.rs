use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::{Children, OrphanedFolder, OrphanedSnapshot, ScopedCache};
use crate::client::{RemoteClient, Thumbnail};
use crate::config::BrowserConfig;
use crate::domain::{Group, ObjectKind, ObjectRef, Owner, RemoteObject, Scope};
use crate::fetcher::{Fetcher, sort_by_name};
use crate::filter::{self, Filter};
use crate::notify::{Notification, NotificationSink};
use crate::thumbnail::{ThumbnailBank, load_thumbnail};
use crate::tree::{LazyTree, LoadState, NodeId};
use crate::worker::WorkerPool;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeChoices {
    pub groups: Vec<Group>,
    pub owners: HashMap<Group, Vec<Owner>>,
}

impl ScopeChoices {
    pub fn owners_of(&self, group: &Group) -> Vec<Owner> {
        match group {
            Group::Known(_) => self.owners.get(group).cloned().unwrap_or_default(),
            Group::All => {
                let mut seen = HashSet::new();
                let mut owners: Vec<Owner> = self
                    .groups
                    .iter()
                    .filter_map(|group| self.owners.get(group))
                    .flatten()
                    .filter(|owner| seen.insert(owner.id()))
                    .cloned()
                    .collect();
                owners.sort_by_key(Owner::display_name);
                owners
            }
        }
    }

    pub fn fan_out(&self, scope: &Scope) -> Vec<(Group, Owner)> {
        let groups: Vec<Group> = match &scope.group {
            Group::All if !self.groups.is_empty() => self.groups.clone(),
            group => vec![group.clone()],
        };

        let mut pairs = Vec::new();
        for group in groups {
            let members = self.owners.get(&group);
            match &scope.owner {
                Owner::All => match members {
                    Some(members) if !members.is_empty() => pairs.extend(
                        members
                            .iter()
                            .map(|owner| (group.clone(), owner.clone())),
                    ),
                    _ => pairs.push((group, Owner::All)),
                },
                owner => {
                    let listed = members.is_some_and(|members| members.contains(owner));
                    if listed || group.is_all() || self.groups.is_empty() {
                        pairs.push((group, owner.clone()));
                    }
                }
            }
        }
        if pairs.is_empty() {
            pairs.push((scope.group.clone(), scope.owner.clone()));
        }
        pairs
    }
}

pub fn reconcile_scope(current: &Scope, choices: &ScopeChoices) -> Scope {
    let group = if current.group.is_all() || choices.groups.contains(&current.group) {
        current.group.clone()
    } else {
        let fallback = choices.groups.first().cloned().unwrap_or(Group::All);
        tracing::warn!(
            previous = %current.group.display_name(),
            selected = %fallback.display_name(),
            "selected group is no longer available"
        );
        fallback
    };

    let owner = if current.owner.is_all() || choices.owners_of(&group).contains(&current.owner) {
        current.owner.clone()
    } else {
        tracing::warn!(
            previous = %current.owner.display_name(),
            group = %group.display_name(),
            "selected owner is not a member of the group"
        );
        Owner::All
    };

    Scope::new(group, owner)
}

#[derive(Debug, Clone)]
pub enum SessionUpdate {
    ChildrenChanged(NodeId),
    ScopeChoicesChanged,
    ScopeChanged(Scope),
    OrphanedChanged(OrphanedSnapshot),
    ThumbnailReady(i64),
    Notified(Notification),
}

enum UiEvent {
    ChildrenLoaded {
        node: NodeId,
        generation: u64,
        children: Children,
    },
    ScopeRefreshed {
        node: NodeId,
        generation: u64,
        scope: Scope,
    },
    OrphanedProgress,
    OrphanedFinished,
    ThumbnailLoaded(i64),
    Notify(Notification),
}

struct QueueSink {
    events: Sender<UiEvent>,
}

impl NotificationSink for QueueSink {
    fn notify(&self, notification: Notification) {
        let _ = self.events.send(UiEvent::Notify(notification));
    }
}

struct Shared<C: RemoteClient> {
    client: C,
    config: BrowserConfig,
    server: ObjectRef,
    cache: ScopedCache,
    orphaned: OrphanedFolder,
    thumbnails: ThumbnailBank,
    choices: Mutex<ScopeChoices>,
    remote_context: Mutex<()>,
    queue: QueueSink,
    closed: AtomicBool,
}

impl<C: RemoteClient> Shared<C> {
    fn send(&self, event: UiEvent) {
        let _ = self.queue.events.send(event);
    }

    fn fetcher(&self) -> Fetcher<'_, C> {
        Fetcher::new(&self.client, &self.queue)
            .with_orphaned_folder(self.orphaned.object())
            .with_context_lock(&self.remote_context)
    }

    fn choices(&self) -> ScopeChoices {
        self.choices
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    fn is_leaf(&self, object: &RemoteObject) -> bool {
        match object.kind() {
            ObjectKind::OrphanedFolder => self.orphaned.is_leaf(),
            _ => object.is_leaf(),
        }
    }

    fn children_of(&self, parent: &ObjectRef, group: &Group, owner: &Owner) -> Children {
        if self.is_leaf(parent) {
            return Arc::new(Vec::new());
        }
        match parent.kind() {
            ObjectKind::Server => self.root_children(parent, group, owner),
            ObjectKind::OrphanedFolder => Arc::new(
                self.orphaned
                    .images_in_scope(&Scope::new(group.clone(), owner.clone())),
            ),
            _ => self.cached_or_fetched(parent, group, owner),
        }
    }

    fn cached_or_fetched(&self, parent: &ObjectRef, group: &Group, owner: &Owner) -> Children {
        if self.closed.load(Ordering::SeqCst) {
            return self
                .cache
                .cached(parent, group, owner)
                .unwrap_or_default();
        }
        self.cache.get_or_fetch(parent, group, owner, || {
            self.fetcher().fetch_children(parent, group, owner)
        })
    }

    /// Server children for a scope. The remote API cannot list for "all
    /// owners" or "all groups", so such scopes are split into concrete pairs,
    /// each cached on its own, and merged.
    fn root_children(&self, server: &ObjectRef, group: &Group, owner: &Owner) -> Children {
        let scope = Scope::new(group.clone(), owner.clone());
        let pairs = self.choices().fan_out(&scope);
        if let [(g, o)] = pairs.as_slice() {
            if *g == scope.group && *o == scope.owner {
                return self.cached_or_fetched(server, group, owner);
            }
        }

        if let Some(hit) = self.cache.cached(server, group, owner) {
            return hit;
        }
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for (g, o) in &pairs {
            for child in self.cached_or_fetched(server, g, o).iter() {
                if seen.insert((child.kind(), child.id())) {
                    merged.push(child.clone());
                }
            }
        }
        if self.closed.load(Ordering::SeqCst) {
            return Arc::new(merged);
        }
        self.cache.get_or_fetch(server, group, owner, || merged)
    }

    fn refresh_choices(&self) -> ScopeChoices {
        let groups = match self.client.groups_for_current_user() {
            Ok(groups) => groups,
            Err(err) => {
                tracing::error!(error = ?err, "failed to list groups");
                self.queue.notify(Notification::error(
                    "Unable to load groups",
                    format!("{}: {err}", self.server.name()),
                ));
                return self.choices();
            }
        };

        let mut choices = ScopeChoices::default();
        for info in groups {
            let group_id = info.id;
            let group = Group::Known(info);
            let mut owners: Vec<Owner> = match self.client.users_for_group(group_id) {
                Ok(users) => users.into_iter().map(Owner::User).collect(),
                Err(err) => {
                    tracing::error!(group = group_id, error = ?err, "failed to list group members");
                    self.queue.notify(Notification::warning(
                        "Unable to load group members",
                        format!("{}: {err}", group.display_name()),
                    ));
                    Vec::new()
                }
            };
            owners.sort_by_key(Owner::display_name);
            choices.owners.insert(group.clone(), owners);
            choices.groups.push(group);
        }
        choices.groups.sort();

        *self.choices.lock().unwrap_or_else(|err| err.into_inner()) = choices.clone();
        choices
    }

    fn load_root(&self, node: NodeId, generation: u64, requested: Scope) {
        let choices = self.refresh_choices();
        let scope = reconcile_scope(&requested, &choices);
        self.send(UiEvent::ScopeRefreshed {
            node,
            generation,
            scope: scope.clone(),
        });
        let children = self.root_children(&self.server, &scope.group, &scope.owner);
        self.send(UiEvent::ChildrenLoaded {
            node,
            generation,
            children,
        });
    }

    fn load_node(&self, node: NodeId, generation: u64, object: ObjectRef, scope: Scope) {
        let children = match object.kind() {
            ObjectKind::OrphanedFolder => {
                let mut images = self.orphaned.images();
                sort_by_name(&mut images);
                Arc::new(images)
            }
            _ => self.children_of(&object, &scope.group, &scope.owner),
        };
        self.send(UiEvent::ChildrenLoaded {
            node,
            generation,
            children,
        });
    }

    fn populate_orphaned(&self) {
        if !self.orphaned.begin_loading() {
            return;
        }
        let folder = self.orphaned.object().clone();
        let fetcher = self.fetcher();
        let mut choices = self.choices();
        if choices.groups.is_empty() {
            choices = self.refresh_choices();
        }
        let mut seen = HashSet::new();
        let mut images = Vec::new();
        for (group, owner) in choices.fan_out(&Scope::default()) {
            for image in fetcher.fetch_orphaned_images(&folder, &group, &owner) {
                if seen.insert(image.id()) {
                    images.push(image);
                }
            }
        }

        self.orphaned.set_total(images.len());
        let batch = self.config.orphaned_progress_batch.max(1);
        for (index, image) in images.into_iter().enumerate() {
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            self.orphaned.push(image);
            if (index + 1) % batch == 0 {
                self.send(UiEvent::OrphanedProgress);
            }
        }
        tracing::info!(
            images = self.orphaned.loaded_count(),
            "orphaned images loaded"
        );
        self.send(UiEvent::OrphanedFinished);
    }
}

pub struct BrowseSession<C: RemoteClient + 'static> {
    shared: Arc<Shared<C>>,
    hierarchy: WorkerPool,
    thumbnail_pool: WorkerPool,
    events: Receiver<UiEvent>,
    tree: LazyTree,
    filter: Filter,
    sink: Arc<dyn NotificationSink>,
}

impl<C: RemoteClient + 'static> BrowseSession<C> {
    pub fn new(
        client: C,
        server_uri: &str,
        config: BrowserConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (sender, events) = mpsc::channel();
        let server = RemoteObject::server(server_uri);
        let orphaned = OrphanedFolder::new(&server, &config.orphaned_folder_name);
        let thumbnail_pool = WorkerPool::new("thumbnail", config.thumbnail_workers);
        let shared = Arc::new(Shared {
            client,
            config,
            server: server.clone(),
            cache: ScopedCache::new(),
            orphaned,
            thumbnails: ThumbnailBank::new(),
            choices: Mutex::new(ScopeChoices::default()),
            remote_context: Mutex::new(()),
            queue: QueueSink { events: sender },
            closed: AtomicBool::new(false),
        });
        tracing::info!(server = server_uri, "browse session opened");

        Self {
            shared,
            hierarchy: WorkerPool::new("hierarchy", 1),
            thumbnail_pool,
            events,
            tree: LazyTree::new(server),
            filter: Filter::default(),
            sink,
        }
    }

    pub fn server(&self) -> &ObjectRef {
        &self.shared.server
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.shared.config
    }

    pub fn scope(&self) -> &Scope {
        &self.filter.scope
    }

    pub fn filter_text(&self) -> &str {
        &self.filter.text
    }

    pub fn tree(&self) -> &LazyTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn scope_choices(&self) -> ScopeChoices {
        self.shared.choices()
    }

    pub fn get_children(&self, parent: &ObjectRef, group: &Group, owner: &Owner) -> Children {
        self.shared.children_of(parent, group, owner)
    }

    pub fn is_leaf(&self, object: &RemoteObject) -> bool {
        self.shared.is_leaf(object)
    }

    pub fn orphaned_folder(&self) -> &OrphanedFolder {
        &self.shared.orphaned
    }

    pub fn matches(&self, object: &RemoteObject, group: &Group, owner: &Owner, text: &str) -> bool {
        filter::matches(object, group, owner, text)
    }

    pub fn refresh_groups_and_owners(&self) -> (Vec<Group>, HashMap<Group, Vec<Owner>>) {
        let choices = self.shared.refresh_choices();
        (choices.groups, choices.owners)
    }

    pub fn children(&mut self, node: NodeId) -> Vec<NodeId> {
        let Some(object) = self.tree.object(node).cloned() else {
            return Vec::new();
        };
        if !self.shared.is_leaf(&object) {
            if let Some(generation) = self.tree.begin_load(node) {
                if !self.dispatch_load(node, generation, object) {
                    self.tree.abort_load(node, generation);
                }
            }
        }
        self.tree.visible_children(node, &self.filter)
    }

    pub fn load_state(&self, node: NodeId) -> Option<LoadState> {
        self.tree.state(node)
    }

    fn dispatch_load(&self, node: NodeId, generation: u64, object: ObjectRef) -> bool {
        let shared = Arc::clone(&self.shared);
        let scope = self.filter.scope.clone();
        tracing::debug!(parent_id = object.id(), kind = %object.kind(), "dispatching load");
        if object.kind() == ObjectKind::Server {
            let submitted = self
                .hierarchy
                .submit(move || shared.load_root(node, generation, scope));
            if submitted {
                self.load_orphaned_images();
            }
            submitted
        } else {
            self.hierarchy
                .submit(move || shared.load_node(node, generation, object, scope))
        }
    }

    pub fn load_orphaned_images(&self) -> bool {
        let shared = Arc::clone(&self.shared);
        self.hierarchy.submit(move || shared.populate_orphaned())
    }

    pub fn set_scope(&mut self, group: Group, owner: Owner) {
        let scope = Scope::new(group, owner);
        if scope == self.filter.scope {
            return;
        }
        self.filter.scope = scope;
        let root = self.tree.root();
        self.tree.reset(root);
        self.shared.orphaned.refresh(&self.filter.scope, None);
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter.text = text.to_string();
    }

    pub fn request_thumbnail(&self, image_id: i64) -> Option<Arc<Thumbnail>> {
        if let Some(thumbnail) = self.shared.thumbnails.get(image_id) {
            return Some(thumbnail);
        }
        let shared = Arc::clone(&self.shared);
        let size = shared.config.thumbnail_size;
        self.thumbnail_pool.submit(move || {
            if load_thumbnail(&shared.client, &shared.thumbnails, image_id, size).is_some() {
                shared.send(UiEvent::ThumbnailLoaded(image_id));
            }
        });
        None
    }

    pub fn process_ui_events(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            self.apply(event, &mut updates);
        }
        updates
    }

    pub fn wait_ui_events(&mut self, timeout: Duration) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        if let Ok(event) = self.events.recv_timeout(timeout) {
            self.apply(event, &mut updates);
            updates.extend(self.process_ui_events());
        }
        updates
    }

    fn apply(&mut self, event: UiEvent, updates: &mut Vec<SessionUpdate>) {
        match event {
            UiEvent::ChildrenLoaded {
                node,
                generation,
                children,
            } => {
                if self.tree.install(node, generation, &children) {
                    updates.push(SessionUpdate::ChildrenChanged(node));
                }
            }
            UiEvent::ScopeRefreshed {
                node,
                generation,
                scope,
            } => {
                updates.push(SessionUpdate::ScopeChoicesChanged);
                let current = self.tree.get(node).map(|n| n.state());
                let fresh = current == Some(LoadState::Loading)
                    && self.tree.generation(node) == Some(generation);
                if fresh && scope != self.filter.scope {
                    self.filter.scope = scope.clone();
                    let snapshot = self.shared.orphaned.refresh(&scope, None);
                    updates.push(SessionUpdate::ScopeChanged(scope));
                    updates.push(SessionUpdate::OrphanedChanged(snapshot));
                }
            }
            UiEvent::OrphanedProgress => {
                let snapshot = self.shared.orphaned.refresh(&self.filter.scope, None);
                self.refresh_orphaned_nodes(updates);
                updates.push(SessionUpdate::OrphanedChanged(snapshot));
            }
            UiEvent::OrphanedFinished => {
                let snapshot = self.shared.orphaned.refresh(&self.filter.scope, Some(false));
                self.refresh_orphaned_nodes(updates);
                updates.push(SessionUpdate::OrphanedChanged(snapshot));
            }
            UiEvent::ThumbnailLoaded(image_id) => {
                updates.push(SessionUpdate::ThumbnailReady(image_id));
            }
            UiEvent::Notify(notification) => {
                self.sink.notify(notification.clone());
                updates.push(SessionUpdate::Notified(notification));
            }
        }
    }

    fn refresh_orphaned_nodes(&mut self, updates: &mut Vec<SessionUpdate>) {
        let nodes: Vec<NodeId> = self
            .tree
            .find_kind(ObjectKind::OrphanedFolder)
            .into_iter()
            .filter(|node| self.tree.state(*node) != Some(LoadState::Unexpanded))
            .collect();
        if nodes.is_empty() {
            return;
        }
        let mut images = self.shared.orphaned.images();
        sort_by_name(&mut images);
        for node in nodes {
            self.tree.replace_children(node, &images);
            updates.push(SessionUpdate::ChildrenChanged(node));
        }
    }

    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.hierarchy.shutdown_now();
        self.thumbnail_pool.shutdown_now();
        tracing::info!(server = self.shared.server.name(), "browse session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl<C: RemoteClient + 'static> Drop for BrowseSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}
