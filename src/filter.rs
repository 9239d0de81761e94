use crate::domain::{Group, ObjectKind, ObjectRef, Owner, RemoteObject, Scope};

pub fn matches(object: &RemoteObject, group: &Group, owner: &Owner, text: &str) -> bool {
    matches_scope(object, group, owner) && matches_text(object, text)
}

pub fn matches_scope(object: &RemoteObject, group: &Group, owner: &Owner) -> bool {
    let group_ok = group.is_all() || object.group().is_none_or(|g| g.id == group.id());
    let owner_ok = owner.is_all() || object.owner().is_none_or(|o| o.id == owner.id());
    group_ok && owner_ok
}

pub fn matches_text(object: &RemoteObject, text: &str) -> bool {
    if object.kind() == ObjectKind::Server || text.is_empty() {
        return true;
    }
    let needle = text.to_lowercase();

    let mut name = object.name().to_lowercase();
    let mut parent = object.parent();
    while let Some(node) = parent {
        if node.kind() == ObjectKind::Server {
            break;
        }
        name = node.name().to_lowercase();
        parent = node.parent();
    }
    name.contains(&needle)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub scope: Scope,
    pub text: String,
}

impl Filter {
    pub fn new(scope: Scope, text: &str) -> Self {
        Self {
            scope,
            text: text.to_string(),
        }
    }

    pub fn accepts(&self, object: &RemoteObject) -> bool {
        matches(object, &self.scope.group, &self.scope.owner, &self.text)
    }

    pub fn apply<'a, I>(&self, objects: I) -> Vec<ObjectRef>
    where
        I: IntoIterator<Item = &'a ObjectRef>,
    {
        objects
            .into_iter()
            .filter(|object| self.accepts(object))
            .cloned()
            .collect()
    }
}
