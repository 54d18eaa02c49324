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
use super::joint_type::*;
use super::mimic::*;
use super::range::*;
use na::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use nalgebra as na;
use std::fmt::{self, Display};
use tracing::warn;

/// Joint with type
///
/// The value vector always has `joint_type().dof()` elements.
#[derive(Debug, Clone)]
pub struct Joint {
    /// Name of this joint
    pub name: String,
    /// Type of this joint, change it by `change_kind`
    joint_type: JointType,
    /// Axis of rotation or translation
    axis: Vector3<f64>,
    /// Limits of this joint, used by `Revolute` and `Prismatic`
    pub limits: Range,
    /// Skip the clamping by `limits`
    pub ignore_limits: bool,
    /// Mimic definition if this joint follows other joint
    pub mimic: Option<Mimic>,
    values: Vec<f64>,
    /// current local transform of joint
    origin: Isometry3<f64>,
    /// local transform before the first value was set
    original: Option<Isometry3<f64>>,
}

impl Joint {
    /// Create new Joint with name and type
    ///
    /// # Examples
    ///
    /// ```
    /// use kinematic_rig::{Joint, JointType};
    ///
    /// // create fixed joint
    /// let fixed = Joint::new("f0", JointType::Fixed);
    /// assert!(fixed.values().is_empty());
    ///
    /// // create rotational joint
    /// let rot = Joint::new("r0", JointType::Revolute);
    /// assert_eq!(rot.value(), Some(0.0));
    /// ```
    pub fn new(name: &str, joint_type: JointType) -> Joint {
        let mut joint = Joint {
            name: name.to_string(),
            joint_type: JointType::Fixed,
            axis: Vector3::x(),
            limits: Range::default(),
            ignore_limits: false,
            mimic: None,
            values: Vec::new(),
            origin: Isometry3::identity(),
            original: None,
        };
        joint.change_kind(joint_type);
        joint
    }

    #[inline]
    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    /// Change the type of the joint
    ///
    /// The values are reset to zero with the length of the new type, and the
    /// cached original pose is cleared. `Planar` resets the axis to +Z.
    ///
    /// # Examples
    ///
    /// ```
    /// use kinematic_rig::{Joint, JointType};
    ///
    /// let mut joint = Joint::new("j", JointType::Revolute);
    /// joint.set_values(&[0.5]);
    /// joint.change_kind(JointType::Planar);
    /// assert_eq!(joint.values(), &[0.0, 0.0, 0.0]);
    /// assert_eq!(joint.axis().z, 1.0);
    /// ```
    pub fn change_kind(&mut self, joint_type: JointType) {
        if self.joint_type == joint_type && self.values.len() == joint_type.dof() {
            return;
        }
        self.joint_type = joint_type;
        self.values = vec![0.0; joint_type.dof()];
        if joint_type == JointType::Planar {
            self.axis = Vector3::z();
        }
        self.original = None;
    }

    #[inline]
    pub fn axis(&self) -> &Vector3<f64> {
        &self.axis
    }

    #[inline]
    pub fn set_axis(&mut self, axis: Vector3<f64>) {
        self.axis = axis;
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the first value (angle or length), `None` for fixed joint
    #[inline]
    pub fn value(&self) -> Option<f64> {
        self.values.first().copied()
    }

    /// Current local transform (origin moved by the joint value)
    #[inline]
    pub fn local_transform(&self) -> &Isometry3<f64> {
        &self.origin
    }

    /// Set the local transform of the joint frame
    ///
    /// The next call of `set_values` captures this pose as the original one.
    #[inline]
    pub fn set_origin(&mut self, origin: Isometry3<f64>) {
        self.origin = origin;
        self.original = None;
    }

    /// The pose captured before the first value was applied
    #[inline]
    pub fn original_transform(&self) -> Option<&Isometry3<f64>> {
        self.original.as_ref()
    }

    #[inline]
    pub fn is_movable(&self) -> bool {
        self.joint_type != JointType::Fixed
    }

    /// Set the values of this joint only, without mimic propagation
    ///
    /// It returns true if the stored value was changed. If the requested value
    /// equals the stored one, nothing happens. `Revolute` and `Prismatic` are
    /// clamped by `limits` unless `ignore_limits` is set.
    ///
    /// # Examples
    ///
    /// ```
    /// use kinematic_rig::{Joint, JointType};
    ///
    /// let mut rot = Joint::new("r0", JointType::Revolute);
    /// rot.limits = (-1.0..=1.0).into();
    /// assert!(rot.set_values(&[2.0]));
    /// assert_eq!(rot.value(), Some(1.0));
    /// // clamped to the same value
    /// assert!(!rot.set_values(&[3.0]));
    /// ```
    pub fn set_values(&mut self, values: &[f64]) -> bool {
        let original = *self.original.get_or_insert(self.origin);
        match self.joint_type {
            JointType::Fixed => false,
            JointType::Continuous | JointType::Revolute => {
                let Some(mut angle) = values.first().copied() else {
                    return false;
                };
                if angle == self.values[0] {
                    return false;
                }
                if !self.ignore_limits && self.joint_type == JointType::Revolute {
                    angle = self.limits.clamp(angle);
                }
                self.origin.rotation =
                    original.rotation * UnitQuaternion::from_axis_angle(&self.unit_axis(), angle);
                self.store_first(angle)
            }
            JointType::Prismatic => {
                let Some(mut position) = values.first().copied() else {
                    return false;
                };
                if position == self.values[0] {
                    return false;
                }
                if !self.ignore_limits {
                    position = self.limits.clamp(position);
                }
                self.origin.translation =
                    Translation3::from(original.translation.vector + self.axis * position);
                self.store_first(position)
            }
            JointType::Planar | JointType::Floating => {
                let mut changed = false;
                for (stored, value) in self.values.iter_mut().zip(values) {
                    if *stored != *value {
                        *stored = *value;
                        changed = true;
                    }
                }
                changed
            }
        }
    }

    fn store_first(&mut self, value: f64) -> bool {
        if self.values[0] != value {
            self.values[0] = value;
            true
        } else {
            false
        }
    }

    fn unit_axis(&self) -> Unit<Vector3<f64>> {
        Unit::try_new(self.axis, f64::EPSILON).unwrap_or_else(|| {
            warn!("joint {} has a zero axis, +X is used", self.name);
            Vector3::x_axis()
        })
    }
}

impl Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.name, self.joint_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_revolute_rotates_from_original() {
        let mut joint = Joint::new("r", JointType::Revolute);
        joint.set_axis(Vector3::z());
        joint.set_origin(Isometry3::translation(0.0, 0.0, 1.0));
        assert!(joint.set_values(&[FRAC_PI_2]));
        let rotated = joint.local_transform() * na::Point3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(rotated.y, 1.0, epsilon = 1e-10);
        assert_relative_eq!(rotated.z, 1.0, epsilon = 1e-10);
        // the original pose is kept, so setting 0 restores it
        assert!(joint.set_values(&[0.0]));
        assert_relative_eq!(
            joint.local_transform().rotation.angle(),
            0.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_continuous_ignores_limits() {
        let mut joint = Joint::new("c", JointType::Continuous);
        joint.limits = Range::new(-0.1, 0.1);
        assert!(joint.set_values(&[3.0]));
        assert_eq!(joint.value(), Some(3.0));
    }

    #[test]
    fn test_prismatic_moves_along_axis() {
        let mut joint = Joint::new("p", JointType::Prismatic);
        joint.set_axis(Vector3::new(0.0, 2.0, 0.0));
        joint.limits = Range::new(-1.0, 1.0);
        joint.set_origin(Isometry3::translation(1.0, 0.0, 0.0));
        assert!(joint.set_values(&[5.0]));
        assert_eq!(joint.value(), Some(1.0));
        let t = joint.local_transform().translation.vector;
        assert_relative_eq!(t.x, 1.0);
        assert_relative_eq!(t.y, 2.0);

        joint.ignore_limits = true;
        assert!(joint.set_values(&[5.0]));
        assert_eq!(joint.value(), Some(5.0));
    }

    #[test]
    fn test_fixed_and_empty_values() {
        let mut fixed = Joint::new("f", JointType::Fixed);
        assert!(!fixed.set_values(&[1.0]));
        assert!(fixed.original_transform().is_some());

        let mut rev = Joint::new("r", JointType::Revolute);
        assert!(!rev.set_values(&[]));
    }

    #[test]
    fn test_floating_stores_without_motion() {
        let mut joint = Joint::new("fl", JointType::Floating);
        assert!(joint.set_values(&[1.0, 2.0, 3.0]));
        assert_eq!(joint.values(), &[1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
        assert!(!joint.set_values(&[1.0, 2.0]));
        assert_eq!(*joint.local_transform(), Isometry3::identity());
    }

    #[test]
    fn test_change_kind_resets() {
        let mut joint = Joint::new("j", JointType::Revolute);
        joint.set_values(&[0.3]);
        assert!(joint.original_transform().is_some());
        joint.change_kind(JointType::Floating);
        assert_eq!(joint.values().len(), 6);
        assert!(joint.original_transform().is_none());
        joint.change_kind(JointType::Fixed);
        assert!(joint.value().is_none());
    }
}
