#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use kira_image_browser::client::{RemoteClient, RemoteRecord, Thumbnail};
use kira_image_browser::domain::{
    Entity, GroupInfo, ImageInfo, OwnerInfo, PlateLayout, WellPosition,
};
use kira_image_browser::error::BrowseError;
use kira_image_browser::session::{BrowseSession, SessionUpdate};

pub const ALL: i64 = -1;

/// In-memory image server. Owner listings are keyed by owner id, with `-1`
/// standing for "every owner".
#[derive(Default)]
pub struct MockServer {
    pub groups: Vec<GroupInfo>,
    pub members: HashMap<i64, Vec<OwnerInfo>>,
    pub projects: HashMap<i64, Vec<RemoteRecord>>,
    pub screens: HashMap<i64, Vec<RemoteRecord>>,
    pub orphaned_datasets: HashMap<i64, Vec<RemoteRecord>>,
    pub orphaned_images: HashMap<i64, Vec<RemoteRecord>>,
    pub datasets: HashMap<i64, Vec<RemoteRecord>>,
    pub images: HashMap<i64, Vec<RemoteRecord>>,
    pub plates: HashMap<i64, Vec<RemoteRecord>>,
    pub wells: HashMap<i64, Vec<RemoteRecord>>,
    pub well_images: HashMap<i64, Vec<RemoteRecord>>,
    /// Projects keyed by (active group, owner); consulted when non-empty.
    pub group_projects: HashMap<(i64, i64), Vec<RemoteRecord>>,
    pub switch_delay: Duration,
    pub failing: HashSet<&'static str>,
    calls: Mutex<Vec<String>>,
    active_group: Mutex<Option<i64>>,
}

impl MockServer {
    pub fn fail(mut self, call: &'static str) -> Self {
        self.failing.insert(call);
        self
    }

    /// Number of recorded calls named `call`.
    pub fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|recorded| recorded.as_str() == call)
            .count()
    }

    pub fn active_group(&self) -> Option<i64> {
        *self.active_group.lock().unwrap()
    }

    fn call(&self, name: &'static str) -> Result<(), BrowseError> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.failing.contains(name) {
            return Err(BrowseError::RemoteAccess {
                context: name.to_string(),
                message: "permission denied".to_string(),
            });
        }
        Ok(())
    }

    fn listing(
        &self,
        name: &'static str,
        table: &HashMap<i64, Vec<RemoteRecord>>,
        key: i64,
    ) -> Result<Vec<RemoteRecord>, BrowseError> {
        self.call(name)?;
        Ok(table.get(&key).cloned().unwrap_or_default())
    }
}

impl RemoteClient for MockServer {
    fn list_projects_for_owner(&self, owner_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        if self.group_projects.is_empty() {
            return self.listing("projects", &self.projects, owner_id);
        }
        self.call("projects")?;
        let group = self.active_group().unwrap_or(ALL);
        Ok(self
            .group_projects
            .get(&(group, owner_id))
            .cloned()
            .unwrap_or_default())
    }

    fn list_screens_for_owner(&self, owner_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        self.listing("screens", &self.screens, owner_id)
    }

    fn list_orphaned_datasets_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<RemoteRecord>, BrowseError> {
        self.listing("orphaned datasets", &self.orphaned_datasets, owner_id)
    }

    fn list_orphaned_images_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<RemoteRecord>, BrowseError> {
        self.listing("orphaned images", &self.orphaned_images, owner_id)
    }

    fn list_datasets_for_project(&self, project_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        self.listing("datasets", &self.datasets, project_id)
    }

    fn list_images_for_dataset(&self, dataset_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        self.listing("images", &self.images, dataset_id)
    }

    fn list_plates_for_screen(&self, screen_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        self.listing("plates", &self.plates, screen_id)
    }

    fn list_wells_for_plate(&self, plate_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        self.listing("wells", &self.wells, plate_id)
    }

    fn list_images_for_well(&self, well_id: i64) -> Result<Vec<RemoteRecord>, BrowseError> {
        self.listing("well images", &self.well_images, well_id)
    }

    fn groups_for_current_user(&self) -> Result<Vec<GroupInfo>, BrowseError> {
        self.call("groups")?;
        Ok(self.groups.clone())
    }

    fn users_for_group(&self, group_id: i64) -> Result<Vec<OwnerInfo>, BrowseError> {
        self.call("users")?;
        Ok(self.members.get(&group_id).cloned().unwrap_or_default())
    }

    fn thumbnail(&self, image_id: i64, size: u32) -> Result<Thumbnail, BrowseError> {
        self.call("thumbnail")?;
        Ok(Thumbnail {
            image_id,
            size,
            bytes: vec![0x89, b'P', b'N', b'G'],
        })
    }

    fn switch_active_group(&self, group_id: i64) -> Result<(), BrowseError> {
        self.call("switch")?;
        *self.active_group.lock().unwrap() = Some(group_id);
        if !self.switch_delay.is_zero() {
            std::thread::sleep(self.switch_delay);
        }
        Ok(())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn project(id: i64, name: &str, child_count: u32) -> RemoteRecord {
    RemoteRecord::new(id, name, Entity::Project { child_count })
}

pub fn dataset(id: i64, name: &str, child_count: u32) -> RemoteRecord {
    RemoteRecord::new(
        id,
        name,
        Entity::Dataset {
            child_count,
            images: None,
        },
    )
}

pub fn screen(id: i64, name: &str, child_count: u32) -> RemoteRecord {
    RemoteRecord::new(id, name, Entity::Screen { child_count })
}

pub fn plate(id: i64, name: &str, child_count: u32) -> RemoteRecord {
    RemoteRecord::new(
        id,
        name,
        Entity::Plate {
            child_count,
            layout: PlateLayout { rows: 8, columns: 12 },
        },
    )
}

pub fn well(
    id: i64,
    column: u32,
    child_count: u32,
    images: Option<Vec<RemoteRecord>>,
) -> RemoteRecord {
    let position = WellPosition { row: 0, column };
    RemoteRecord::new(
        id,
        &position.label(),
        Entity::Well {
            child_count,
            position,
            images,
        },
    )
}

pub fn image(id: i64, name: &str) -> RemoteRecord {
    RemoteRecord::new(id, name, Entity::Image(ImageInfo::default()))
}

/// Drains session events until `done` holds, failing after five seconds.
pub fn pump<C, F>(session: &mut BrowseSession<C>, mut done: F) -> Vec<SessionUpdate>
where
    C: RemoteClient + 'static,
    F: FnMut(&mut BrowseSession<C>) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut updates = Vec::new();
    while !done(session) {
        assert!(Instant::now() < deadline, "timed out waiting for session events");
        updates.extend(session.wait_ui_events(Duration::from_millis(50)));
    }
    updates
}
