use std::collections::HashMap;

use crate::domain::{ObjectKind, ObjectRef};
use crate::filter::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unexpanded,
    Loading,
    Loaded,
}

#[derive(Debug)]
pub struct TreeNode {
    object: ObjectRef,
    parent: Option<NodeId>,
    state: LoadState,
    generation: u64,
    children: Vec<NodeId>,
}

impl TreeNode {
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// UI-side tree of remote objects, populated one level at a time.
///
/// Nodes live in an arena and are never removed, so a `NodeId` stays valid
/// for the life of the tree. Every load carries the node's generation; a
/// reset bumps it and results of older loads are ignored.
#[derive(Debug)]
pub struct LazyTree {
    nodes: Vec<TreeNode>,
}

impl LazyTree {
    pub fn new(root: ObjectRef) -> Self {
        Self {
            nodes: vec![TreeNode {
                object: root,
                parent: None,
                state: LoadState::Unexpanded,
                generation: 0,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn object(&self, id: NodeId) -> Option<&ObjectRef> {
        self.get(id).map(TreeNode::object)
    }

    pub fn state(&self, id: NodeId) -> Option<LoadState> {
        self.get(id).map(TreeNode::state)
    }

    pub fn generation(&self, id: NodeId) -> Option<u64> {
        self.get(id).map(TreeNode::generation)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn begin_load(&mut self, id: NodeId) -> Option<u64> {
        let node = self.nodes.get_mut(id.0)?;
        if node.state != LoadState::Unexpanded {
            return None;
        }
        node.state = LoadState::Loading;
        Some(node.generation)
    }

    pub fn abort_load(&mut self, id: NodeId, generation: u64) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            if node.generation == generation && node.state == LoadState::Loading {
                node.state = LoadState::Unexpanded;
            }
        }
    }

    pub fn reset(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.generation += 1;
            node.state = LoadState::Unexpanded;
        }
    }

    pub fn install(&mut self, id: NodeId, generation: u64, objects: &[ObjectRef]) -> bool {
        match self.nodes.get(id.0) {
            Some(node) if node.generation == generation => {}
            _ => return false,
        }
        self.replace_children(id, objects);
        true
    }

    pub fn replace_children(&mut self, id: NodeId, objects: &[ObjectRef]) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        let mut existing: HashMap<(ObjectKind, i64), NodeId> = node
            .children
            .iter()
            .map(|child| {
                let object = &self.nodes[child.0].object;
                ((object.kind(), object.id()), *child)
            })
            .collect();

        let mut children = Vec::with_capacity(objects.len());
        for object in objects {
            let key = (object.kind(), object.id());
            let child = match existing.remove(&key) {
                Some(child) => child,
                None => {
                    self.nodes.push(TreeNode {
                        object: object.clone(),
                        parent: Some(id),
                        state: LoadState::Unexpanded,
                        generation: 0,
                        children: Vec::new(),
                    });
                    NodeId(self.nodes.len() - 1)
                }
            };
            children.push(child);
        }

        let node = &mut self.nodes[id.0];
        node.children = children;
        node.state = LoadState::Loaded;
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn visible_children(&self, id: NodeId, filter: &Filter) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| filter.accepts(&self.nodes[child.0].object))
            .collect()
    }

    pub fn find_kind(&self, kind: ObjectKind) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.object.kind() == kind)
            .map(|(index, _)| NodeId(index))
            .collect()
    }
}
