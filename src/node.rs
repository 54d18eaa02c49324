/*
  Copyright 2017 Takashi Ogura

  Licensed under the Apache License, Version 2.0 (the "License");
  you may not use this file except in compliance with the License.
  You may obtain a copy of the License at

      http://www.apache.org/licenses/LICENSE-2.0

  Unless required by applicable law or agreed to in writing, software
  distributed under the License is distributed on an "AS IS" BASIS,
  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
  See the License for the specific language governing permissions and
  limitations under the License.
*/
//! graph structure for the robot tree
use na::Isometry3;
use nalgebra as na;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt::{self, Display};
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::iterator::*;
use crate::joint::*;
use crate::link::*;

type WeakNode = Weak<RefCell<NodeImpl>>;

/// Payload of a `Node`
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Rigid body frame. Its local transform is identity.
    Link,
    /// Transform between a parent link and its single child link
    Joint(Joint),
    Visual(Visual),
    Collider(Collision),
}

impl NodeKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Link => "link",
            NodeKind::Joint(_) => "joint",
            NodeKind::Visual(_) => "visual",
            NodeKind::Collider(_) => "collider",
        }
    }
}

#[derive(Debug)]
/// Node for robot tree struct
pub struct NodeImpl {
    pub name: String,
    pub parent: Option<WeakNode>,
    pub children: Vec<Node>,
    pub kind: NodeKind,
    /// Joints which follow this joint
    pub mimic_children: Vec<Node>,
    world_transform: Option<Isometry3<f64>>,
}

/// Parts of `Robot`
///
/// It contains the name, the payload (link, joint, visual or collider) and
/// parent/children.
#[derive(Debug)]
pub struct Node(pub(crate) Rc<RefCell<NodeImpl>>);

impl Node {
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Node(Rc::new(RefCell::new(NodeImpl {
            name: name.to_owned(),
            parent: None,
            children: Vec::new(),
            kind,
            mimic_children: Vec::new(),
            world_transform: None,
        })))
    }

    pub fn new_link(name: &str) -> Self {
        Node::new(name, NodeKind::Link)
    }

    /// Return the name of the node
    ///
    /// The return value is `String`, not `&str`.
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn kind(&self) -> KindRefGuard<'_> {
        KindRefGuard {
            guard: self.0.borrow(),
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Link)
    }

    /// Borrow the joint if this node is a joint
    pub fn joint(&self) -> Option<Ref<'_, Joint>> {
        Ref::filter_map(self.0.borrow(), |node| match &node.kind {
            NodeKind::Joint(joint) => Some(joint),
            _ => None,
        })
        .ok()
    }

    /// Mutably borrow the joint if this node is a joint
    ///
    /// Changing the joint through this guard does not propagate to mimic
    /// joints and does not invalidate world transforms.
    pub fn joint_mut(&self) -> Option<RefMut<'_, Joint>> {
        RefMut::filter_map(self.0.borrow_mut(), |node| match &mut node.kind {
            NodeKind::Joint(joint) => Some(joint),
            _ => None,
        })
        .ok()
    }

    pub fn parent(&self) -> Option<Node> {
        self.0
            .borrow()
            .parent
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .map(Node)
    }

    pub fn children(&self) -> ChildrenRefGuard<'_> {
        ChildrenRefGuard {
            guard: self.0.borrow(),
        }
    }

    /// iter from the end to root, it contains the node itself
    #[inline]
    pub fn iter_ancestors(&self) -> Ancestors {
        Ancestors::new(Some(self.clone()))
    }
    /// iter to the end, it contains the node itself
    #[inline]
    pub fn iter_descendants(&self) -> Descendants {
        Descendants::new(vec![self.clone()])
    }

    /// Set parent and child relations at same time
    ///
    /// # Examples
    ///
    /// ```
    /// use kinematic_rig::Node;
    ///
    /// let l0 = Node::new_link("l0");
    /// let l1 = Node::new_link("l1");
    /// l1.set_parent(&l0);
    /// assert!(l0.is_root());
    /// assert!(!l1.is_root());
    /// assert!(l1.is_end());
    /// ```
    pub fn set_parent(&self, parent: &Node) {
        self.0.borrow_mut().parent = Some(Rc::downgrade(&parent.0));
        parent.0.borrow_mut().children.push(self.clone());
    }

    pub fn is_root(&self) -> bool {
        self.0.borrow().parent.is_none()
    }

    pub fn is_end(&self) -> bool {
        self.0.borrow().children.is_empty()
    }

    /// Local transform relative to the parent node
    pub fn local_transform(&self) -> Isometry3<f64> {
        match &self.0.borrow().kind {
            NodeKind::Link => Isometry3::identity(),
            NodeKind::Joint(joint) => *joint.local_transform(),
            NodeKind::Visual(visual) => visual.origin,
            NodeKind::Collider(collision) => collision.origin,
        }
    }

    /// Get the calculated world transform.
    ///
    /// It is `None` after a joint above this node was moved, until
    /// `Robot::update_transforms()` is called.
    #[inline]
    pub fn world_transform(&self) -> Option<Isometry3<f64>> {
        self.0.borrow().world_transform
    }

    #[inline]
    pub(crate) fn set_world_transform(&self, world_transform: Isometry3<f64>) {
        self.0.borrow_mut().world_transform = Some(world_transform);
    }

    /// Mark the world transforms of this node and all descendants as stale
    pub(crate) fn invalidate_world_transforms(&self) {
        for node in self.iter_descendants() {
            node.0.borrow_mut().world_transform = None;
        }
    }

    /// Value of the joint, `None` for non joint node
    pub fn joint_values(&self) -> Option<Vec<f64>> {
        self.joint().map(|joint| joint.values().to_vec())
    }

    /// Set the values of the joint and of all joints which mimic it
    ///
    /// The mimic joints are updated first, then this joint. It returns true
    /// if any joint was changed. Non joint nodes only cascade (nothing).
    ///
    /// # Examples
    ///
    /// ```
    /// use kinematic_rig::{Joint, JointType, Node, NodeKind};
    /// use kinematic_rig::joint::{Mimic, Range};
    ///
    /// let j0 = Node::new("j0", NodeKind::Joint(Joint::new("j0", JointType::Prismatic)));
    /// let mut follower = Joint::new("j1", JointType::Prismatic);
    /// follower.limits = Range::new(0.0, 2.0);
    /// follower.mimic = Some(Mimic::new("j0", 1.5, 0.1));
    /// let j1 = Node::new("j1", NodeKind::Joint(follower));
    /// j1.set_mimic_parent(&j0);
    ///
    /// assert!(j0.set_joint_value(&[1.0]));
    /// assert_eq!(j0.joint().unwrap().value(), Some(1.0));
    /// assert_eq!(j1.joint().unwrap().value(), Some(1.6));
    /// ```
    pub fn set_joint_value(&self, values: &[f64]) -> bool {
        let mimic_children = self.0.borrow().mimic_children.clone();
        let mut changed = false;
        for child in &mimic_children {
            changed = child.update_from_mimicked(values) || changed;
        }
        let own_changed = match self.joint_mut() {
            Some(mut joint) => joint.set_values(values),
            None => false,
        };
        if own_changed {
            self.invalidate_world_transforms();
        }
        own_changed || changed
    }

    /// Apply `value * multiplier + offset` and set it as a usual joint value
    pub fn update_from_mimicked(&self, values: &[f64]) -> bool {
        let mimic = self.joint().and_then(|joint| joint.mimic.clone());
        match mimic {
            Some(mimic) => {
                let mapped = values
                    .iter()
                    .map(|value| mimic.mimic_value(*value))
                    .collect::<Vec<_>>();
                self.set_joint_value(&mapped)
            }
            None => self.set_joint_value(values),
        }
    }

    /// Register this node as a follower of `parent`
    ///
    /// It does not check loops, `Robot` does it while loading.
    pub fn set_mimic_parent(&self, parent: &Node) {
        parent.0.borrow_mut().mimic_children.push(self.clone());
    }

    pub fn mimic_children(&self) -> Vec<Node> {
        self.0.borrow().mimic_children.clone()
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Node(self.0.clone())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.0.borrow();
        match &inner.kind {
            NodeKind::Link => write!(f, "/{}/", inner.name),
            NodeKind::Joint(joint) => joint.fmt(f),
            NodeKind::Visual(visual) => write!(f, "<visual {}>", visual.geometry),
            NodeKind::Collider(collision) => write!(f, "<collision {}>", collision.geometry),
        }
    }
}

macro_rules! def_ref_guard {
    ($guard_struct:ident, $target:ty, $member:ident) => {
        pub struct $guard_struct<'a> {
            guard: Ref<'a, NodeImpl>,
        }

        impl<'a> Deref for $guard_struct<'a> {
            type Target = $target;
            fn deref(&self) -> &Self::Target {
                &self.guard.$member
            }
        }
    };
}

def_ref_guard!(KindRefGuard, NodeKind, kind);
def_ref_guard!(ChildrenRefGuard, Vec<Node>, children);
