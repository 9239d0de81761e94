use std::sync::{Mutex, MutexGuard};

use crate::client::{RemoteClient, RemoteRecord, enter_group};
use crate::domain::{Entity, Group, ObjectKind, ObjectRef, Owner, RemoteObject};
use crate::error::BrowseError;
use crate::notify::{Notification, NotificationSink};

pub struct Fetcher<'a, C: RemoteClient + ?Sized> {
    client: &'a C,
    sink: &'a dyn NotificationSink,
    orphaned_folder: Option<&'a ObjectRef>,
    context: Option<&'a Mutex<()>>,
}

impl<'a, C: RemoteClient + ?Sized> Fetcher<'a, C> {
    pub fn new(client: &'a C, sink: &'a dyn NotificationSink) -> Self {
        Self {
            client,
            sink,
            orphaned_folder: None,
            context: None,
        }
    }

    pub fn with_orphaned_folder(mut self, folder: &'a ObjectRef) -> Self {
        self.orphaned_folder = Some(folder);
        self
    }

    /// Lock held from the group switch until the scope's listings are done.
    /// Callers sharing one client across threads must share this lock.
    pub fn with_context_lock(mut self, context: &'a Mutex<()>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn fetch_children(&self, parent: &ObjectRef, group: &Group, owner: &Owner) -> Vec<ObjectRef> {
        match parent.entity() {
            Entity::Server { .. } => self.fetch_server_children(parent, group, owner),
            _ if parent.child_count() == Some(0) => Vec::new(),
            Entity::Project { .. } => self.guarded(parent, "datasets", || {
                self.client.list_datasets_for_project(parent.id())
            }),
            Entity::Dataset {
                images: Some(links),
                ..
            } => self.attach(parent, links.clone()),
            Entity::Dataset { images: None, .. } => self.guarded(parent, "images", || {
                self.client.list_images_for_dataset(parent.id())
            }),
            Entity::Screen { .. } => self.guarded(parent, "plates", || {
                self.client.list_plates_for_screen(parent.id())
            }),
            Entity::Plate { .. } => self.guarded(parent, "wells", || {
                self.client.list_wells_for_plate(parent.id())
            }),
            Entity::Well {
                images: Some(links),
                ..
            } => self.attach(parent, links.clone()),
            Entity::Well { images: None, .. } => self.guarded(parent, "images", || {
                self.client.list_images_for_well(parent.id())
            }),
            Entity::OrphanedFolder => self.fetch_orphaned_images(parent, group, owner),
            Entity::Image(_) | Entity::PlateAcquisition { .. } | Entity::Unknown => {
                tracing::debug!(kind = %parent.kind(), parent_id = parent.id(), "no children to enumerate");
                Vec::new()
            }
        }
    }

    pub fn fetch_orphaned_images(
        &self,
        folder: &ObjectRef,
        group: &Group,
        owner: &Owner,
    ) -> Vec<ObjectRef> {
        let _context = self.lock_context();
        if let Err(err) = enter_group(self.client, group) {
            self.report(folder, "group", &err);
            return Vec::new();
        }
        let owner_id = owner.id();
        self.guarded(folder, "orphaned images", || {
            self.client.list_orphaned_images_for_owner(owner_id)
        })
    }

    fn fetch_server_children(
        &self,
        server: &ObjectRef,
        group: &Group,
        owner: &Owner,
    ) -> Vec<ObjectRef> {
        let mut children = Vec::new();
        let context = self.lock_context();
        match enter_group(self.client, group) {
            Ok(()) => {
                let owner_id = owner.id();
                children.extend(self.guarded(server, "projects", || {
                    self.client.list_projects_for_owner(owner_id)
                }));
                children.extend(self.guarded(server, "screens", || {
                    self.client.list_screens_for_owner(owner_id)
                }));
                children.extend(self.guarded(server, "orphaned datasets", || {
                    self.client.list_orphaned_datasets_for_owner(owner_id)
                }));
            }
            Err(err) => self.report(server, "group", &err),
        }
        drop(context);
        if let Some(folder) = self.orphaned_folder {
            children.push(folder.clone());
        }
        children
    }

    fn lock_context(&self) -> Option<MutexGuard<'a, ()>> {
        self.context
            .map(|context| context.lock().unwrap_or_else(|err| err.into_inner()))
    }

    fn guarded<F>(&self, parent: &ObjectRef, what: &str, call: F) -> Vec<ObjectRef>
    where
        F: FnOnce() -> Result<Vec<RemoteRecord>, BrowseError>,
    {
        match call() {
            Ok(records) => self.attach(parent, records),
            Err(err) => {
                self.report(parent, what, &err);
                Vec::new()
            }
        }
    }

    fn attach(&self, parent: &ObjectRef, records: Vec<RemoteRecord>) -> Vec<ObjectRef> {
        let parent_kind = parent.kind();
        records
            .into_iter()
            .filter_map(|record| {
                let child_kind = record.entity.kind();
                if parent_kind.accepts_child(child_kind) {
                    Some(RemoteObject::from_record(record, parent))
                } else {
                    let err = BrowseError::MalformedHierarchy {
                        parent: parent_kind,
                        child: child_kind,
                        id: record.id,
                    };
                    tracing::error!(parent_id = parent.id(), "dropping entity: {err}");
                    None
                }
            })
            .collect()
    }

    fn report(&self, parent: &ObjectRef, what: &str, err: &BrowseError) {
        tracing::error!(
            parent_id = parent.id(),
            kind = %parent.kind(),
            error = ?err,
            "failed to load {what} of {}",
            parent.name()
        );
        let title = format!("Unable to load {what}");
        let message = format!("{}: {err}", parent.name());
        self.sink.notify(if err.is_remote() {
            Notification::error(title, message)
        } else {
            Notification::warning(title, message)
        });
    }
}

pub fn sort_by_name(children: &mut [ObjectRef]) {
    children.sort_by(|a, b| {
        let a_folder = a.kind() == ObjectKind::OrphanedFolder;
        let b_folder = b.kind() == ObjectKind::OrphanedFolder;
        a_folder
            .cmp(&b_folder)
            .then_with(|| a.name().cmp(b.name()))
    });
}
