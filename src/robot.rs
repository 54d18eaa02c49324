/*
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
use na::Isometry3;
use nalgebra as na;
use std::collections::HashMap;
use std::fmt::{self, Display};

use crate::node::*;

/// Robot tree made of `Node`
///
/// It owns every node of one loaded description and indexes them by name.
/// Name lookup through `frame()` merges colliders, visuals, links and joints;
/// when names collide a joint wins over a link, a link over a visual and a
/// visual over a collider.
///
/// # Examples
///
/// ```
/// use kinematic_rig::{DescriptorResolver, UrdfLoader};
///
/// let text = r#"
///     <robot name="arm">
///         <link name="base"/>
///         <link name="upper"/>
///         <joint name="shoulder" type="revolute">
///             <parent link="base"/>
///             <child link="upper"/>
///             <axis xyz="0 0 1"/>
///             <limit lower="-1.0" upper="1.0"/>
///         </joint>
///     </robot>"#;
/// let robot = UrdfLoader::new()
///     .load_str(text, "", &mut DescriptorResolver::new())
///     .unwrap()
///     .into_robot();
/// assert_eq!(robot.root().unwrap().name(), "base");
/// assert!(robot.set_joint_value("shoulder", &[2.0]));
/// assert_eq!(robot.joint_value("shoulder"), 1.0);
/// assert!(!robot.set_joint_value("elbow", &[2.0]));
/// ```
#[derive(Debug, Default)]
pub struct Robot {
    /// Name of this `Robot`
    pub name: String,
    pub(crate) root: Option<Node>,
    pub(crate) detached_roots: Vec<Node>,
    pub(crate) links: Vec<Node>,
    pub(crate) joints: Vec<Node>,
    pub(crate) visuals: Vec<(String, Node)>,
    pub(crate) colliders: Vec<(String, Node)>,
    link_map: HashMap<String, Node>,
    joint_map: HashMap<String, Node>,
    frames: HashMap<String, Node>,
}

impl Robot {
    pub fn new(name: &str) -> Self {
        Robot {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Rebuild the name indexes from the node lists
    pub(crate) fn index(&mut self) {
        self.link_map = self
            .links
            .iter()
            .map(|link| (link.name(), link.clone()))
            .collect();
        self.joint_map = self
            .joints
            .iter()
            .map(|joint| (joint.name(), joint.clone()))
            .collect();
        let mut frames = HashMap::new();
        frames.extend(self.colliders.iter().cloned());
        frames.extend(self.visuals.iter().cloned());
        frames.extend(self.link_map.iter().map(|(k, v)| (k.clone(), v.clone())));
        frames.extend(self.joint_map.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.frames = frames;
    }

    /// The first link which no joint of the description has as child
    ///
    /// It is `None` if every link is named as a child, even when some of
    /// those joints were skipped.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Other links without parent joint, which are not attached under `root`
    pub fn detached_roots(&self) -> &[Node] {
        &self.detached_roots
    }

    pub fn link(&self, name: &str) -> Option<&Node> {
        self.link_map.get(name)
    }

    pub fn joint(&self, name: &str) -> Option<&Node> {
        self.joint_map.get(name)
    }

    /// Find a collider, visual, link or joint by name
    pub fn frame(&self, name: &str) -> Option<&Node> {
        self.frames.get(name)
    }

    /// Iterate for all links in declaration order
    pub fn iter_links(&self) -> impl Iterator<Item = &Node> {
        self.links.iter()
    }

    /// Iterate for all joints in declaration order
    pub fn iter_joints(&self) -> impl Iterator<Item = &Node> {
        self.joints.iter()
    }

    /// Set the values of the named joint
    ///
    /// It returns true if the joint or one of its mimic joints was changed,
    /// false also if there is no such joint.
    pub fn set_joint_value(&self, name: &str, values: &[f64]) -> bool {
        match self.joint_map.get(name) {
            Some(joint) => joint.set_joint_value(values),
            None => false,
        }
    }

    /// Set the (first) value of several joints
    ///
    /// Unknown names are ignored. It returns true if any joint was changed.
    pub fn set_joint_values<I, K>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut changed = false;
        for (name, value) in values {
            changed = self.set_joint_value(name.as_ref(), &[value]) || changed;
        }
        changed
    }

    /// The first value of the named joint
    ///
    /// `0.0` if there is no such joint or it has no value.
    pub fn joint_value(&self, name: &str) -> f64 {
        self.joint_map
            .get(name)
            .and_then(|joint| joint.joint().and_then(|j| j.value()))
            .unwrap_or(0.0)
    }

    /// Calculate the world transforms of all attached nodes
    ///
    /// The order is the same as `iter_descendants()` of the root, followed by
    /// the detached roots.
    pub fn update_transforms(&self) -> Vec<Isometry3<f64>> {
        self.root
            .iter()
            .chain(self.detached_roots.iter())
            .flat_map(|root| root.iter_descendants())
            .map(|node| {
                let parent_transform = node
                    .parent()
                    .and_then(|parent| parent.world_transform())
                    .unwrap_or_else(Isometry3::identity);
                let world_transform = parent_transform * node.local_transform();
                node.set_world_transform(world_transform);
                world_transform
            })
            .collect()
    }

    /// World transform of the named frame, calculated by `update_transforms()`
    pub fn world_transform(&self, name: &str) -> Option<Isometry3<f64>> {
        self.frame(name).and_then(|node| node.world_transform())
    }

    fn fmt_with_indent_level(node: &Node, level: usize, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}{}", "    ".repeat(level), node)?;
        for c in node.children().iter() {
            Self::fmt_with_indent_level(c, level + 1, f)?
        }
        Ok(())
    }
}

impl Display for Robot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for root in self.root.iter().chain(self.detached_roots.iter()) {
            Self::fmt_with_indent_level(root, 1, f)?;
        }
        Ok(())
    }
}

type NodeKey = *const std::cell::RefCell<NodeImpl>;

fn copy_subtree(node: &Node, parent: Option<&Node>, copies: &mut HashMap<NodeKey, Node>) -> Node {
    let copied = {
        let inner = node.0.borrow();
        Node::new(&inner.name, inner.kind.clone())
    };
    if let Some(world_transform) = node.world_transform() {
        copied.set_world_transform(world_transform);
    }
    if let Some(parent) = parent {
        copied.set_parent(parent);
    }
    copies.insert(std::rc::Rc::as_ptr(&node.0), copied.clone());
    for child in node.children().iter() {
        copy_subtree(child, Some(&copied), copies);
    }
    copied
}

/// Deep copy, the copy shares no node with the original
///
/// Mimic relations are rebuilt between the copied joints.
impl Clone for Robot {
    fn clone(&self) -> Self {
        let mut copies = HashMap::new();
        let root = self
            .root
            .as_ref()
            .map(|root| copy_subtree(root, None, &mut copies));
        let detached_roots = self
            .detached_roots
            .iter()
            .map(|root| copy_subtree(root, None, &mut copies))
            .collect();
        let lookup = |node: &Node, copies: &mut HashMap<NodeKey, Node>| -> Node {
            let key = std::rc::Rc::as_ptr(&node.0);
            copies
                .entry(key)
                .or_insert_with(|| copy_subtree(node, None, &mut HashMap::new()))
                .clone()
        };
        let links = self.links.iter().map(|n| lookup(n, &mut copies)).collect();
        let joints: Vec<Node> = self.joints.iter().map(|n| lookup(n, &mut copies)).collect();
        let visuals = self
            .visuals
            .iter()
            .map(|(name, n)| (name.clone(), lookup(n, &mut copies)))
            .collect();
        let colliders = self
            .colliders
            .iter()
            .map(|(name, n)| (name.clone(), lookup(n, &mut copies)))
            .collect();
        for (original, copied) in self.joints.iter().zip(joints.iter()) {
            for follower in original.mimic_children() {
                lookup(&follower, &mut copies).set_mimic_parent(copied);
            }
        }
        let mut robot = Robot {
            name: self.name.clone(),
            root,
            detached_roots,
            links,
            joints,
            visuals,
            colliders,
            ..Default::default()
        };
        robot.index();
        robot
    }
}
