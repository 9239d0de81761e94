use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};

use crate::client::RemoteRecord;

pub const UNASSIGNED_ID: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Server,
    Project,
    Dataset,
    Image,
    Plate,
    Well,
    Screen,
    PlateAcquisition,
    OrphanedFolder,
    Unknown,
}

impl ObjectKind {
    pub fn accepts_child(self, child: ObjectKind) -> bool {
        use ObjectKind::*;
        matches!(
            (self, child),
            (Server, Project | Screen | Dataset | OrphanedFolder)
                | (Project, Dataset)
                | (Dataset, Image)
                | (Screen, Plate)
                | (Plate, Well)
                | (Well, Image)
                | (OrphanedFolder, Image)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Server => "server",
            ObjectKind::Project => "project",
            ObjectKind::Dataset => "dataset",
            ObjectKind::Image => "image",
            ObjectKind::Plate => "plate",
            ObjectKind::Well => "well",
            ObjectKind::Screen => "screen",
            ObjectKind::PlateAcquisition => "plate acquisition",
            ObjectKind::OrphanedFolder => "orphaned folder",
            ObjectKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default)]
pub struct OwnerInfo {
    pub id: i64,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub username: String,
    pub email: Option<String>,
    pub institution: Option<String>,
}

impl OwnerInfo {
    pub fn new(id: i64, first_name: &str, last_name: &str) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            ..Self::default()
        }
    }

    pub fn full_name(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub enum Owner {
    All,
    User(OwnerInfo),
}

impl Owner {
    pub fn id(&self) -> i64 {
        match self {
            Owner::All => UNASSIGNED_ID,
            Owner::User(info) => info.id,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Owner::All)
    }

    pub fn display_name(&self) -> String {
        match self {
            Owner::All => "All members".to_string(),
            Owner::User(info) => info.full_name(),
        }
    }
}

impl PartialEq for Owner {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Owner::All, Owner::All) => true,
            (Owner::User(a), Owner::User(b)) => a.id == b.id,
            _ => false,
        }
    }
}

impl Eq for Owner {}

impl Hash for Owner {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_all().hash(state);
        self.id().hash(state);
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupInfo {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl GroupInfo {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Group {
    All,
    Known(GroupInfo),
}

impl Group {
    pub fn id(&self) -> i64 {
        match self {
            Group::All => UNASSIGNED_ID,
            Group::Known(info) => info.id,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Group::All)
    }

    pub fn display_name(&self) -> &str {
        match self {
            Group::All => "All groups",
            Group::Known(info) => &info.name,
        }
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Group::All, Group::All) => true,
            (Group::Known(a), Group::Known(b)) => a.id == b.id,
            _ => false,
        }
    }
}

impl Eq for Group {}

impl Hash for Group {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_all().hash(state);
        self.id().hash(state);
    }
}

impl Ord for Group {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        self.display_name()
            .cmp(other.display_name())
            .then_with(|| self.is_all().cmp(&other.is_all()).reverse())
            .then_with(|| self.id().cmp(&other.id()))
    }
}

impl PartialOrd for Group {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub group: Group,
    pub owner: Owner,
}

impl Scope {
    pub fn new(group: Group, owner: Owner) -> Self {
        Self { group, owner }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            group: Group::All,
            owner: Owner::All,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageInfo {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub size_c: u32,
    pub size_t: u32,
    pub pixel_type: String,
    pub physical_size_x: Option<f64>,
    pub physical_size_y: Option<f64>,
    pub acquisition_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlateLayout {
    pub rows: u32,
    pub columns: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WellPosition {
    pub row: u32,
    pub column: u32,
}

impl WellPosition {
    pub fn label(&self) -> String {
        let mut row = String::new();
        let mut index = self.row;
        loop {
            row.insert(0, (b'A' + (index % 26) as u8) as char);
            if index < 26 {
                break;
            }
            index = index / 26 - 1;
        }
        format!("{row}{}", self.column + 1)
    }
}

#[derive(Debug, Clone)]
pub enum Entity {
    Server {
        uri: String,
    },
    Project {
        child_count: u32,
    },
    Dataset {
        child_count: u32,
        images: Option<Vec<RemoteRecord>>,
    },
    Image(ImageInfo),
    Screen {
        child_count: u32,
    },
    Plate {
        child_count: u32,
        layout: PlateLayout,
    },
    PlateAcquisition {
        child_count: u32,
    },
    Well {
        child_count: u32,
        position: WellPosition,
        images: Option<Vec<RemoteRecord>>,
    },
    OrphanedFolder,
    Unknown,
}

impl Entity {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Entity::Server { .. } => ObjectKind::Server,
            Entity::Project { .. } => ObjectKind::Project,
            Entity::Dataset { .. } => ObjectKind::Dataset,
            Entity::Image(_) => ObjectKind::Image,
            Entity::Screen { .. } => ObjectKind::Screen,
            Entity::Plate { .. } => ObjectKind::Plate,
            Entity::PlateAcquisition { .. } => ObjectKind::PlateAcquisition,
            Entity::Well { .. } => ObjectKind::Well,
            Entity::OrphanedFolder => ObjectKind::OrphanedFolder,
            Entity::Unknown => ObjectKind::Unknown,
        }
    }

    pub fn child_count(&self) -> Option<u32> {
        match self {
            Entity::Project { child_count }
            | Entity::Dataset { child_count, .. }
            | Entity::Screen { child_count }
            | Entity::Plate { child_count, .. }
            | Entity::PlateAcquisition { child_count }
            | Entity::Well { child_count, .. } => Some(*child_count),
            Entity::Image(_) | Entity::Unknown => Some(0),
            Entity::Server { .. } | Entity::OrphanedFolder => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        match self {
            Entity::Server { .. } | Entity::OrphanedFolder => false,
            Entity::Image(_) => true,
            other => other.child_count() == Some(0),
        }
    }
}

pub type ObjectRef = Arc<RemoteObject>;

#[derive(Debug)]
pub struct RemoteObject {
    id: i64,
    name: String,
    description: Option<String>,
    owner: Option<OwnerInfo>,
    group: Option<GroupInfo>,
    parent: Option<Weak<RemoteObject>>,
    entity: Entity,
}

impl RemoteObject {
    pub fn server(uri: &str) -> ObjectRef {
        Arc::new(Self {
            id: UNASSIGNED_ID,
            name: uri.to_string(),
            description: None,
            owner: None,
            group: None,
            parent: None,
            entity: Entity::Server {
                uri: uri.to_string(),
            },
        })
    }

    pub fn orphaned_folder(server: &ObjectRef, name: &str) -> ObjectRef {
        Arc::new(Self {
            id: UNASSIGNED_ID,
            name: name.to_string(),
            description: None,
            owner: None,
            group: None,
            parent: Some(Arc::downgrade(server)),
            entity: Entity::OrphanedFolder,
        })
    }

    pub fn from_record(record: RemoteRecord, parent: &ObjectRef) -> ObjectRef {
        Arc::new(Self {
            id: record.id,
            name: record.name,
            description: record.description,
            owner: record.owner,
            group: record.group,
            parent: Some(Arc::downgrade(parent)),
            entity: record.entity,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.entity.kind()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn owner(&self) -> Option<&OwnerInfo> {
        self.owner.as_ref()
    }

    pub fn group(&self) -> Option<&GroupInfo> {
        self.group.as_ref()
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn parent(&self) -> Option<ObjectRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn child_count(&self) -> Option<u32> {
        self.entity.child_count()
    }

    pub fn is_leaf(&self) -> bool {
        self.entity.is_leaf()
    }
}

impl PartialEq for RemoteObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RemoteObject {}

impl Hash for RemoteObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind(), self.name, self.id)
    }
}
