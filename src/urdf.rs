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
//! # Load [URDF](http://wiki.ros.org/urdf) text and create `Robot`
//!
//! Links are read first, then joints connect them. Problems in a single
//! element (unknown link reference, unknown geometry, failed geometry
//! resolution) are logged and the element is skipped. Only a missing
//! `robot` element, broken markup, duplicated names and loops of mimic
//! joints fail the whole load.
//!
//! # Examples
//!
//! ```
//! use kinematic_rig::{DescriptorResolver, UrdfLoader};
//!
//! let mut resolver = DescriptorResolver::new();
//! let model = UrdfLoader::new()
//!     .parse_collisions(true)
//!     .load_str(include_str!("../urdf/hand.urdf"), "descriptions", &mut resolver)
//!     .unwrap();
//! assert_eq!(model.robot().name, "ronin_hand");
//! assert!(model.joint("index_dip").is_some());
//! ```
mod xml;

use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
use nalgebra as na;
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::path::Path;
use tracing::{debug, warn};

use self::xml::{parse_document, XmlElement};
use crate::errors::*;
use crate::joint::*;
use crate::link::*;
use crate::model::RobotModel;
use crate::node::*;
use crate::resolver::GeometryResolver;
use crate::robot::Robot;

/// Loader of robot descriptions
///
/// Visual elements are read by default, collision elements are not.
#[derive(Debug, Clone, Copy)]
pub struct UrdfLoader {
    parse_visuals: bool,
    parse_collisions: bool,
}

impl Default for UrdfLoader {
    fn default() -> Self {
        Self {
            parse_visuals: true,
            parse_collisions: false,
        }
    }
}

impl UrdfLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_visuals(mut self, parse_visuals: bool) -> Self {
        self.parse_visuals = parse_visuals;
        self
    }

    pub fn parse_collisions(mut self, parse_collisions: bool) -> Self {
        self.parse_collisions = parse_collisions;
        self
    }

    /// Load the description text into a `RobotModel`
    ///
    /// `base_path` is only passed to `resolver` together with the geometry.
    pub fn load_str<R, P>(&self, text: &str, base_path: P, resolver: &mut R) -> Result<RobotModel>
    where
        R: GeometryResolver + ?Sized,
        P: AsRef<Path>,
    {
        Ok(RobotModel::new(self.load_robot(
            text,
            base_path.as_ref(),
            resolver,
        )?))
    }

    /// Load a description file, its directory is used as the base path
    pub fn load_file<R, P>(&self, path: P, resolver: &mut R) -> Result<RobotModel>
    where
        R: GeometryResolver + ?Sized,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let base_path = path.parent().unwrap_or_else(|| Path::new(""));
        self.load_str(&text, base_path, resolver)
    }

    /// Load the description text into a bare `Robot`
    pub fn load_robot<R>(&self, text: &str, base_path: &Path, resolver: &mut R) -> Result<Robot>
    where
        R: GeometryResolver + ?Sized,
    {
        let document = parse_document(text)?;
        let robot_element = document
            .find("robot")
            .ok_or_else(|| Error::malformed("no robot element found"))?;
        let mut robot = Robot::new(robot_element.attr("name").unwrap_or("robot"));

        let materials = robot_element
            .children
            .iter()
            .flat_map(|child| child.find_all("material"))
            .map(parse_material)
            .filter(|m| !m.name.is_empty() && (m.color.is_some() || m.texture.is_some()))
            .fold(HashMap::<String, Material>::new(), |mut materials, m| {
                materials.entry(m.name.clone()).or_insert(m);
                materials
            });

        // first pass: links
        let mut link_map = HashMap::new();
        for link_element in robot_element.children_named("link") {
            let name = link_element
                .attr("name")
                .ok_or_else(|| Error::malformed("link without name"))?;
            if link_map.contains_key(name) {
                return Err(Error::malformed(format!("duplicate link name: {name}")));
            }
            let link = Node::new_link(name);
            if self.parse_visuals {
                for visual_element in link_element.children_named("visual") {
                    if let Some(visual) =
                        parse_visual(visual_element, &materials, base_path, resolver)
                    {
                        let key = visual_element.attr("name").unwrap_or(name);
                        let node = Node::new(key, NodeKind::Visual(visual));
                        node.set_parent(&link);
                        robot.visuals.push((key.to_owned(), node));
                    }
                }
            }
            if self.parse_collisions {
                for collision_element in link_element.children_named("collision") {
                    if let Some(collision) = parse_collision(collision_element, base_path, resolver)
                    {
                        let key = collision_element.attr("name").unwrap_or(name);
                        let node = Node::new(key, NodeKind::Collider(collision));
                        node.set_parent(&link);
                        robot.colliders.push((key.to_owned(), node));
                    }
                }
            }
            link_map.insert(name.to_owned(), link.clone());
            robot.links.push(link);
        }

        // second pass: joints
        let mut joint_map = HashMap::new();
        // children named by the description, including skipped joints
        let mut named_children = HashSet::new();
        for joint_element in robot_element.children_named("joint") {
            let Some(name) = joint_element.attr("name") else {
                warn!("joint without name is skipped");
                continue;
            };
            if joint_map.contains_key(name) {
                return Err(Error::malformed(format!("duplicate joint name: {name}")));
            }
            let parent_name = joint_element.child("parent").and_then(|e| e.attr("link"));
            let child_name = joint_element.child("child").and_then(|e| e.attr("link"));
            let (Some(parent), Some(child)) = (
                parent_name.and_then(|n| link_map.get(n)),
                child_name.and_then(|n| link_map.get(n)),
            ) else {
                warn!(
                    "joint {name} is skipped, parent {parent_name:?} or child {child_name:?} is not found"
                );
                continue;
            };
            named_children.insert(child.name());
            if !child.is_root() {
                warn!("joint {name} is skipped, link {} already has a parent joint", child.name());
                continue;
            }
            if parent.iter_ancestors().any(|ancestor| &ancestor == child) {
                warn!("joint {name} is skipped, it closes a kinematic loop");
                continue;
            }
            let joint = Node::new(name, NodeKind::Joint(parse_joint(name, joint_element)));
            joint.set_parent(parent);
            child.set_parent(&joint);
            joint_map.insert(name.to_owned(), joint.clone());
            robot.joints.push(joint);
        }

        link_mimic_joints(&robot.joints, &joint_map)?;

        robot.root = robot
            .links
            .iter()
            .find(|link| !named_children.contains(&link.name()))
            .cloned();
        robot.detached_roots = robot
            .links
            .iter()
            .filter(|link| link.is_root() && Some(*link) != robot.root.as_ref())
            .cloned()
            .collect();
        for detached in &robot.detached_roots {
            warn!(
                "link {} has no parent joint and is not attached under the root",
                detached.name()
            );
        }
        match &robot.root {
            Some(root) => debug!("robot {} root link = {}", robot.name, root.name()),
            None => warn!("robot {} has no root link", robot.name),
        }
        robot.index();
        Ok(robot)
    }
}

/// Connect every mimic joint to the joint it follows
///
/// The "drives" graph is checked for loops before any node is connected.
fn link_mimic_joints(joints: &[Node], joint_map: &HashMap<String, Node>) -> Result<()> {
    let mut bindings = Vec::new();
    let mut drives = HashMap::<String, Vec<String>>::new();
    for joint in joints {
        let Some(mimic) = joint.joint().and_then(|j| j.mimic.clone()) else {
            continue;
        };
        match joint_map.get(&mimic.joint) {
            Some(driver) => {
                drives
                    .entry(mimic.joint.clone())
                    .or_default()
                    .push(joint.name());
                bindings.push((joint.clone(), driver.clone()));
            }
            None => warn!(
                "joint {} mimics unknown joint {}, it is not linked",
                joint.name(),
                mimic.joint
            ),
        }
    }

    for (joint, _) in &bindings {
        check_mimic_loop(&joint.name(), &drives)?;
    }
    for (joint, driver) in bindings {
        joint.set_mimic_parent(&driver);
    }
    Ok(())
}

/// Depth first search from `start`, a joint must not be seen twice
fn check_mimic_loop(start: &str, drives: &HashMap<String, Vec<String>>) -> Result<()> {
    let mut seen = HashSet::new();
    let mut stack = vec![start];
    while let Some(name) = stack.pop() {
        if !seen.insert(name) {
            return Err(Error::InfiniteMimicLoop {
                joint_name: start.to_owned(),
            });
        }
        if let Some(followers) = drives.get(name) {
            stack.extend(followers.iter().map(String::as_str));
        }
    }
    Ok(())
}

fn parse_joint(name: &str, element: &XmlElement) -> Joint {
    let type_name = element.attr("type").unwrap_or_default();
    let joint_type = JointType::from_name(type_name).unwrap_or_else(|| {
        warn!("joint {name} has unknown type {type_name:?}, it is handled as fixed");
        JointType::Fixed
    });
    let mut joint = Joint::new(name, joint_type);
    joint.set_origin(parse_origin(element.child("origin")));
    if let Some(xyz) = element.child("axis").and_then(|e| e.attr("xyz")) {
        if let Some(axis) = parse_vector3(xyz) {
            joint.set_axis(axis);
        }
    }
    if let Some(limit) = element.child("limit") {
        joint.limits = Range::new(
            parse_float_attr(limit, "lower").unwrap_or(-PI),
            parse_float_attr(limit, "upper").unwrap_or(PI),
        );
    }
    if let Some(mimic) = element.child("mimic") {
        joint.mimic = Some(Mimic::new(
            mimic.attr("joint").unwrap_or_default(),
            parse_float_attr(mimic, "multiplier").unwrap_or(1.0),
            parse_float_attr(mimic, "offset").unwrap_or(0.0),
        ));
    }
    joint
}

fn parse_visual<R>(
    element: &XmlElement,
    materials: &HashMap<String, Material>,
    base_path: &Path,
    resolver: &mut R,
) -> Option<Visual>
where
    R: GeometryResolver + ?Sized,
{
    let geometry = parse_geometry(element.child("geometry")?)?;
    let primitive = resolve(&geometry, base_path, resolver)?;
    let material = element.child("material").map(|material_element| {
        let inline = parse_material(material_element);
        if inline.color.is_none() && inline.texture.is_none() {
            if let Some(named) = materials.get(&inline.name) {
                return named.clone();
            }
        }
        inline
    });
    Some(Visual {
        origin: parse_origin(element.child("origin")),
        geometry,
        material,
        primitive,
    })
}

fn parse_collision<R>(element: &XmlElement, base_path: &Path, resolver: &mut R) -> Option<Collision>
where
    R: GeometryResolver + ?Sized,
{
    let geometry = parse_geometry(element.child("geometry")?)?;
    let primitive = resolve(&geometry, base_path, resolver)?;
    Some(Collision {
        origin: parse_origin(element.child("origin")),
        geometry,
        primitive,
    })
}

fn resolve<R>(
    geometry: &Geometry,
    base_path: &Path,
    resolver: &mut R,
) -> Option<crate::resolver::PrimitiveId>
where
    R: GeometryResolver + ?Sized,
{
    resolver
        .resolve(geometry, base_path)
        .map_err(|e| warn!("geometry {geometry} is omitted: {e}"))
        .ok()
}

fn parse_geometry(element: &XmlElement) -> Option<Geometry> {
    let shape = element.children.first()?;
    match shape.name.as_str() {
        "box" => Some(Geometry::Box {
            size: shape
                .attr("size")
                .and_then(parse_vector3)
                .unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0)),
        }),
        "sphere" => Some(Geometry::Sphere {
            radius: parse_float_attr(shape, "radius").unwrap_or(0.5),
        }),
        "cylinder" => Some(Geometry::Cylinder {
            radius: parse_float_attr(shape, "radius").unwrap_or(0.5),
            length: parse_float_attr(shape, "length").unwrap_or(1.0),
        }),
        "mesh" => {
            let Some(filename) = shape.attr("filename") else {
                warn!("mesh without filename is omitted");
                return None;
            };
            Some(Geometry::Mesh {
                filename: filename.to_owned(),
                scale: shape
                    .attr("scale")
                    .and_then(parse_vector3)
                    .unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0)),
            })
        }
        other => {
            warn!("unknown geometry type: {other}");
            None
        }
    }
}

fn parse_material(element: &XmlElement) -> Material {
    let color = element
        .child("color")
        .map(|color| match color.attr("rgba").map(parse_floats) {
            Some(rgba) if rgba.len() == 4 => Color {
                r: rgba[0],
                g: rgba[1],
                b: rgba[2],
                a: rgba[3],
            },
            _ => Color::default(),
        });
    let texture = element
        .child("texture")
        .and_then(|texture| texture.attr("filename"))
        .map(|filename| Texture {
            filename: filename.to_owned(),
        });
    Material {
        name: element.attr("name").unwrap_or_default().to_owned(),
        color,
        texture,
    }
}

/// `xyz` and `rpy` (extrinsic roll, pitch, yaw) of an `origin` element
fn parse_origin(element: Option<&XmlElement>) -> Isometry3<f64> {
    let Some(element) = element else {
        return Isometry3::identity();
    };
    let xyz = element
        .attr("xyz")
        .and_then(parse_vector3)
        .unwrap_or_else(Vector3::zeros);
    let rpy = element
        .attr("rpy")
        .and_then(parse_vector3)
        .unwrap_or_else(Vector3::zeros);
    Isometry3::from_parts(
        Translation3::from(xyz),
        UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
    )
}

fn parse_floats(s: &str) -> Vec<f64> {
    s.split_whitespace()
        .filter_map(|p| p.parse::<f64>().ok())
        .collect()
}

fn parse_vector3(s: &str) -> Option<Vector3<f64>> {
    match parse_floats(s).as_slice() {
        [x, y, z] => Some(Vector3::new(*x, *y, *z)),
        _ => {
            warn!("expected 3 values, got {s:?}");
            None
        }
    }
}

fn parse_float_attr(e: &XmlElement, name: &str) -> Option<f64> {
    e.attr(name).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DescriptorResolver, PrimitiveId};
    use approx::assert_relative_eq;

    fn load(text: &str) -> Result<Robot> {
        UrdfLoader::new().load_robot(text, Path::new(""), &mut DescriptorResolver::new())
    }

    #[test]
    fn test_missing_robot_element() {
        let err = load(r#"<model name="x"><link name="a"/></model>"#).unwrap_err();
        assert!(matches!(err, Error::MalformedDescription { .. }));
    }

    #[test]
    fn test_duplicate_link() {
        let err = load(r#"<robot name="x"><link name="a"/><link name="a"/></robot>"#).unwrap_err();
        assert!(matches!(err, Error::MalformedDescription { .. }));
    }

    #[test]
    fn test_joint_defaults() {
        let robot = load(
            r#"<robot name="x">
                <joint name="j" type="revolute">
                    <parent link="a"/>
                    <child link="b"/>
                </joint>
                <link name="a"/>
                <link name="b"/>
            </robot>"#,
        )
        .unwrap();
        let node = robot.joint("j").unwrap();
        let joint = node.joint().unwrap();
        assert_eq!(*joint.axis(), Vector3::x());
        assert_relative_eq!(joint.limits.lower, -PI);
        assert_relative_eq!(joint.limits.upper, PI);
        assert!(joint.mimic.is_none());
        assert_eq!(*joint.local_transform(), Isometry3::identity());
    }

    #[test]
    fn test_origin_rpy_order() {
        let robot = load(
            r#"<robot name="x">
                <link name="a"/>
                <link name="b"/>
                <joint name="j" type="fixed">
                    <origin xyz="0 0 0.5" rpy="0 0 1.5707963267948966"/>
                    <parent link="a"/>
                    <child link="b"/>
                </joint>
            </robot>"#,
        )
        .unwrap();
        let transform = robot.joint("j").unwrap().local_transform();
        let p = transform * na::Point3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-10);
        assert_relative_eq!(p.z, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_unresolved_references_are_skipped() {
        let robot = load(
            r#"<robot name="x">
                <link name="a"/>
                <link name="b"/>
                <joint name="ghost" type="revolute">
                    <parent link="a"/>
                    <child link="nowhere"/>
                </joint>
                <joint name="m" type="revolute">
                    <parent link="a"/>
                    <child link="b"/>
                    <mimic joint="missing" multiplier="2"/>
                </joint>
            </robot>"#,
        )
        .unwrap();
        assert!(robot.joint("ghost").is_none());
        assert!(robot.joint("m").is_some());
        assert!(robot.set_joint_value("m", &[0.2]));
        assert_eq!(robot.joint_value("m"), 0.2);
    }

    #[test]
    fn test_self_mimic_is_loop() {
        let err = load(
            r#"<robot name="x">
                <link name="a"/>
                <link name="b"/>
                <joint name="j" type="revolute">
                    <parent link="a"/>
                    <child link="b"/>
                    <mimic joint="j"/>
                </joint>
            </robot>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InfiniteMimicLoop { .. }));
    }

    #[test]
    fn test_failed_geometry_is_omitted() {
        let text = r#"<robot name="x">
            <link name="a">
                <visual><geometry><mesh filename="missing.stl"/></geometry></visual>
                <visual><geometry><box size="1 1 1"/></geometry></visual>
                <visual><geometry><cone radius="1"/></geometry></visual>
                <visual><origin xyz="0 0 1"/></visual>
            </link>
        </robot>"#;
        let mut resolver = |geometry: &Geometry, _: &Path| -> Result<PrimitiveId> {
            match geometry {
                Geometry::Mesh { filename, .. } => {
                    Err(Error::geometry_resolution(filename.clone(), "not found"))
                }
                _ => Ok(PrimitiveId(7)),
            }
        };
        let robot = UrdfLoader::new()
            .load_robot(text, Path::new(""), &mut resolver)
            .unwrap();
        let link = robot.link("a").unwrap();
        assert_eq!(link.children().len(), 1);
        match &*link.children()[0].kind() {
            NodeKind::Visual(visual) => assert_eq!(visual.primitive, PrimitiveId(7)),
            other => panic!("unexpected {}", other.kind_name()),
        };
    }

    #[test]
    fn test_collisions_are_optional() {
        let text = r#"<robot name="x">
            <link name="a">
                <collision name="a_col"><geometry><sphere radius="0.2"/></geometry></collision>
            </link>
        </robot>"#;
        let robot = load(text).unwrap();
        assert!(robot.frame("a_col").is_none());
        let robot = UrdfLoader::new()
            .parse_collisions(true)
            .load_robot(text, Path::new(""), &mut DescriptorResolver::new())
            .unwrap();
        let collider = robot.frame("a_col").unwrap();
        assert_eq!(collider.kind().kind_name(), "collider");
    }

    #[test]
    fn test_named_material() {
        let robot = load(
            r#"<robot name="x">
                <material name="black"><color rgba="0 0 0 1"/></material>
                <link name="palm">
                    <visual>
                        <geometry><box size="0.1 0.1 0.02"/></geometry>
                        <material name="black"/>
                    </visual>
                </link>
            </robot>"#,
        )
        .unwrap();
        let link = robot.link("palm").unwrap();
        let children = link.children();
        let kind = children[0].kind();
        let NodeKind::Visual(visual) = &*kind else {
            panic!("visual expected");
        };
        let material = visual.material.as_ref().unwrap();
        assert_eq!(material.name, "black");
        assert_eq!(material.color.unwrap().r, 0.0);
    }
}
