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
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

use crate::animation::*;
use crate::calibration::*;
use crate::errors::*;
use crate::node::Node;
use crate::resolver::GeometryResolver;
use crate::robot::Robot;
use crate::urdf::UrdfLoader;

/// Duration of servo driven animations when none is given
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(200);

/// Loaded robot with its calibration and animation state
///
/// Joint commands go directly to the `Robot`. Actuator commands are converted
/// through the `CalibrationTable` (with the `ActuatorMap` ranges as fallback)
/// and either applied at once or animated.
///
/// # Examples
///
/// ```
/// use kinematic_rig::{DescriptorResolver, RobotModel};
/// use std::collections::BTreeMap;
///
/// let mut model = RobotModel::load_str(
///     include_str!("../urdf/hand.urdf"),
///     "",
///     &mut DescriptorResolver::new(),
/// )
/// .unwrap();
/// let positions = BTreeMap::from([("servo_6", 500.0)]);
/// assert!(model.set_servo_positions(positions, false, None));
/// // open at the top of the default range
/// assert!(model.joint_value("index_pip").abs() < 1e-9);
/// assert_eq!(model.servo_positions()["servo_6"], 500);
/// ```
#[derive(Debug)]
pub struct RobotModel {
    robot: Robot,
    calibration: CalibrationTable,
    actuators: ActuatorMap,
    animator: Animator,
}

impl RobotModel {
    /// Wrap a robot with an empty calibration and the default actuator map
    pub fn new(robot: Robot) -> Self {
        Self {
            robot,
            calibration: CalibrationTable::default(),
            actuators: ActuatorMap::default(),
            animator: Animator::default(),
        }
    }

    /// Load with the default `UrdfLoader`
    pub fn load_str<R, P>(text: &str, base_path: P, resolver: &mut R) -> Result<Self>
    where
        R: GeometryResolver + ?Sized,
        P: AsRef<Path>,
    {
        UrdfLoader::new().load_str(text, base_path, resolver)
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn into_robot(self) -> Robot {
        self.robot
    }

    pub fn name(&self) -> &str {
        &self.robot.name
    }

    pub fn root(&self) -> Option<&Node> {
        self.robot.root()
    }

    pub fn link(&self, name: &str) -> Option<&Node> {
        self.robot.link(name)
    }

    pub fn joint(&self, name: &str) -> Option<&Node> {
        self.robot.joint(name)
    }

    pub fn frame(&self, name: &str) -> Option<&Node> {
        self.robot.frame(name)
    }

    pub fn joint_value(&self, name: &str) -> f64 {
        self.robot.joint_value(name)
    }

    /// Set one joint, see `Robot::set_joint_value`
    pub fn set_joint_value(&self, name: &str, values: &[f64]) -> bool {
        self.robot.set_joint_value(name, values)
    }

    pub fn set_joint_values<I, K>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        self.robot.set_joint_values(values)
    }

    pub fn update_transforms(&self) -> Vec<Isometry3<f64>> {
        self.robot.update_transforms()
    }

    pub fn world_transform(&self, name: &str) -> Option<Isometry3<f64>> {
        self.robot.world_transform(name)
    }

    /// Replace the whole calibration table
    pub fn set_calibration_data(&mut self, calibration: CalibrationTable) {
        info!(
            "calibration data replaced, {} joints calibrated",
            calibration.len()
        );
        self.calibration = calibration;
    }

    pub fn calibration_data(&self) -> &CalibrationTable {
        &self.calibration
    }

    pub fn set_actuator_map(&mut self, actuators: ActuatorMap) {
        self.actuators = actuators;
    }

    pub fn actuator_map(&self) -> &ActuatorMap {
        &self.actuators
    }

    /// Joint targets for actuator positions
    ///
    /// Every joint of an actuator gets its own conversion. A driven proximal
    /// joint also moves its distal partner to the same angle.
    ///
    /// The targets keep the order in which they were first produced, so a
    /// distal joint is applied after its proximal joint even when it mimics
    /// it. A later value for the same joint replaces the earlier one in place.
    pub fn servo_targets<I, K>(&self, positions: I) -> Vec<(String, f64)>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut targets = Vec::new();
        for (actuator, servo) in positions {
            let actuator = actuator.as_ref();
            for joint_name in self.actuators.joints_for(actuator) {
                let angle =
                    self.calibration
                        .servo_to_angle(&self.actuators, actuator, servo, joint_name);
                set_target(&mut targets, joint_name, angle);
                if let Some(distal) = self.actuators.distal_for(joint_name) {
                    set_target(&mut targets, distal, angle);
                }
            }
        }
        targets
    }

    /// Drive the joints from actuator positions
    ///
    /// With `animate` the joints move in `duration` (200 ms by default) and
    /// the result is whether an animation was started. Otherwise it returns
    /// true if any joint was changed.
    pub fn set_servo_positions<I, K>(
        &mut self,
        positions: I,
        animate: bool,
        duration: Option<Duration>,
    ) -> bool
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        self.set_servo_positions_at(positions, animate, duration, Instant::now())
    }

    pub fn set_servo_positions_at<I, K>(
        &mut self,
        positions: I,
        animate: bool,
        duration: Option<Duration>,
        now: Instant,
    ) -> bool
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let targets = self.servo_targets(positions);
        if animate {
            self.animate_joints_at(
                targets,
                duration.unwrap_or(DEFAULT_ANIMATION_DURATION),
                None,
                now,
            );
            self.animator.is_running()
        } else {
            self.robot.set_joint_values(targets)
        }
    }

    /// Actuator positions read back from the current joint angles
    ///
    /// Actuators whose first joint does not exist are omitted.
    pub fn servo_positions(&self) -> BTreeMap<String, i64> {
        self.actuators
            .actuators()
            .iter()
            .filter_map(|actuator| {
                let joint_name = actuator.joints.first()?;
                self.robot.joint(joint_name)?;
                let angle = self.robot.joint_value(joint_name);
                Some((
                    actuator.name.clone(),
                    self.calibration.angle_to_servo(
                        &self.actuators,
                        &actuator.name,
                        angle,
                        joint_name,
                    ),
                ))
            })
            .collect()
    }

    /// Actuator position for an angle of one of its joints
    pub fn joint_angle_to_servo(&self, actuator: &str, angle: f64, joint_name: &str) -> i64 {
        self.calibration
            .angle_to_servo(&self.actuators, actuator, angle, joint_name)
    }

    /// Start to move the joints to `targets`, see `Animator::start`
    pub fn animate_joints<I, K>(
        &mut self,
        targets: I,
        duration: Duration,
        on_complete: Option<OnComplete>,
    ) where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        self.animate_joints_at(targets, duration, on_complete, Instant::now())
    }

    pub fn animate_joints_at<I, K>(
        &mut self,
        targets: I,
        duration: Duration,
        on_complete: Option<OnComplete>,
        now: Instant,
    ) where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        self.animator
            .start(&self.robot, targets, duration, on_complete, now)
    }

    pub fn stop_animation(&mut self) -> bool {
        self.animator.stop()
    }

    /// Per frame tick, it returns true if any joint changed
    pub fn update_animation(&mut self) -> bool {
        self.update_animation_at(Instant::now())
    }

    pub fn update_animation_at(&mut self, now: Instant) -> bool {
        self.animator.update(&self.robot, now)
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_running()
    }
}

impl From<Robot> for RobotModel {
    fn from(robot: Robot) -> Self {
        Self::new(robot)
    }
}

fn set_target(targets: &mut Vec<(String, f64)>, name: &str, angle: f64) {
    match targets.iter_mut().find(|(n, _)| n == name) {
        Some((_, value)) => *value = angle,
        None => targets.push((name.to_owned(), angle)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DescriptorResolver;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn hand() -> RobotModel {
        RobotModel::load_str(
            include_str!("../urdf/hand.urdf"),
            "",
            &mut DescriptorResolver::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_servo_targets_include_distal() {
        let model = hand();
        let targets = model.servo_targets([("servo_1", 20.0), ("servo_10", 500.0)]);
        let names = targets.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["pinky_pip", "pinky_dip", "thumb_pip", "thumb_dip"]);
        assert_relative_eq!(targets[0].1, FRAC_PI_2);
        assert_relative_eq!(targets[1].1, FRAC_PI_2);
        assert_relative_eq!(targets[2].1, 0.0);
        assert_relative_eq!(targets[3].1, 0.0);
        assert!(model.servo_targets([("servo_42", 100.0)]).is_empty());
    }

    #[test]
    fn test_animated_servo_positions() {
        let mut model = hand();
        let t0 = Instant::now();
        assert!(model.set_servo_positions_at([("servo_8", 260.0)], true, None, t0));
        assert!(model.is_animating());
        assert_eq!(model.joint_value("index_mcp"), 0.0);
        model.update_animation_at(t0 + DEFAULT_ANIMATION_DURATION);
        assert!(!model.is_animating());
        assert_relative_eq!(model.joint_value("index_mcp"), FRAC_PI_2 / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_calibration_changes_conversion() {
        let mut model = hand();
        let mut table = CalibrationTable::new();
        table.insert("index_pip", CalibrationRecord::new(20.0, 500.0, 1.2));
        model.set_calibration_data(table);
        model.set_servo_positions([("servo_6", 260.0)], false, None);
        assert_relative_eq!(model.joint_value("index_pip"), 0.6, epsilon = 1e-9);
        assert_relative_eq!(model.joint_value("index_dip"), 0.6, epsilon = 1e-9);
        assert_eq!(model.servo_positions()["servo_6"], 260);
        assert_eq!(model.joint_angle_to_servo("servo_6", 1.2, "index_pip"), 500);
    }
}
