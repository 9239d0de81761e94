use std::sync::Arc;

use crate::domain::{Entity, Group, GroupInfo, OwnerInfo};
use crate::error::BrowseError;

#[derive(Debug, Clone)]
pub struct RemoteRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner: Option<OwnerInfo>,
    pub group: Option<GroupInfo>,
    pub entity: Entity,
}

impl RemoteRecord {
    pub fn new(id: i64, name: &str, entity: Entity) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: None,
            owner: None,
            group: None,
            entity,
        }
    }

    pub fn with_owner(mut self, owner: OwnerInfo) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_group(mut self, group: GroupInfo) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub image_id: i64,
    pub size: u32,
    pub bytes: Vec<u8>,
}

/// Calls into the remote image server.
///
/// Every method may block on network I/O and is only invoked from worker
/// threads. Calls listing objects for an owner act within the active group
/// set by [`RemoteClient::switch_active_group`]; an owner id of `-1` asks for
/// every owner the server is willing to return.
pub trait RemoteClient: Send + Sync {
    fn list_projects_for_owner(&self, owner_id: i64) -> Result<Vec<RemoteRecord>, BrowseError>;
    fn list_screens_for_owner(&self, owner_id: i64) -> Result<Vec<RemoteRecord>, BrowseError>;
    fn list_orphaned_datasets_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<RemoteRecord>, BrowseError>;
    fn list_orphaned_images_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<RemoteRecord>, BrowseError>;
    fn list_datasets_for_project(&self, project_id: i64)
    -> Result<Vec<RemoteRecord>, BrowseError>;
    fn list_images_for_dataset(&self, dataset_id: i64) -> Result<Vec<RemoteRecord>, BrowseError>;
    fn list_plates_for_screen(&self, screen_id: i64) -> Result<Vec<RemoteRecord>, BrowseError>;
    fn list_wells_for_plate(&self, plate_id: i64) -> Result<Vec<RemoteRecord>, BrowseError>;
    fn list_images_for_well(&self, well_id: i64) -> Result<Vec<RemoteRecord>, BrowseError>;
    fn groups_for_current_user(&self) -> Result<Vec<GroupInfo>, BrowseError>;
    fn users_for_group(&self, group_id: i64) -> Result<Vec<OwnerInfo>, BrowseError>;
    fn thumbnail(&self, image_id: i64, size: u32) -> Result<Thumbnail, BrowseError>;
    fn switch_active_group(&self, group_id: i64) -> Result<(), BrowseError>;
}

impl<C: RemoteClient + ?Sized> RemoteClient for Arc<C> {
    fn list_projects_for_owner(&self, owner_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        (**self).list_projects_for_owner(owner_id)
    }

    fn list_screens_for_owner(&self, owner_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        (**self).list_screens_for_owner(owner_id)
    }

    fn list_orphaned_datasets_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<RemoteRecord>, BrowseError> {
        (**self).list_orphaned_datasets_for_owner(owner_id)
    }

    fn list_orphaned_images_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<RemoteRecord>, BrowseError> {
        (**self).list_orphaned_images_for_owner(owner_id)
    }

    fn list_datasets_for_project(&self, project_id: i64)
    -> Result<Vec<RemoteRecord>, BrowseError> {
        (**self).list_datasets_for_project(project_id)
    }

    fn list_images_for_dataset(&self, dataset_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        (**self).list_images_for_dataset(dataset_id)
    }

    fn list_plates_for_screen(&self, screen_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        (**self).list_plates_for_screen(screen_id)
    }

    fn list_wells_for_plate(&self, plate_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        (**self).list_wells_for_plate(plate_id)
    }

    fn list_images_for_well(&self, well_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        (**self).list_images_for_well(well_id)
    }

    fn groups_for_current_user(&self) -> Result<Vec<GroupInfo>, BrowseError> {
        (**self).groups_for_current_user()
    }

    fn users_for_group(&self, group_id: i64) -> Result<Vec<OwnerInfo>, BrowseError> {
        (**self).users_for_group(group_id)
    }

    fn thumbnail(&self, image_id: i64, size: u32) -> Result<Thumbnail, BrowseError> {
        (**self).thumbnail(image_id, size)
    }

    fn switch_active_group(&self, group_id: i64) -> Result<(), BrowseError> {
        (**self).switch_active_group(group_id)
    }
}

pub(crate) fn enter_group<C: RemoteClient + ?Sized>(
    client: &C,
    group: &Group,
) -> Result<(), BrowseError> {
    match group {
        Group::All => Ok(()),
        Group::Known(info) => client.switch_active_group(info.id),
    }
}
