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
//! Conversion between actuator (servo) positions and joint angles
//!
//! An actuator position is normalized between its open and closed position.
//! With a `CalibrationRecord` for the joint, the normalized value is scaled to
//! the calibrated closed angle. Without a record the default range of the
//! actuator is used and the angle runs from `π/2` (open) to `0` (closed).
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use crate::errors::*;

/// Thumb abduction actuator, the only one whose direction is inverted
pub const ABDUCTION_ACTUATOR: &str = "servo_12";

/// Angle of a fully moved joint without calibration
pub const DEFAULT_MAX_JOINT_ANGLE: f64 = FRAC_PI_2;

/// Clamp to `[0, 1]`, `NaN` becomes `0`
fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Calibration of one joint
///
/// # Examples
///
/// ```
/// use kinematic_rig::CalibrationRecord;
///
/// let record = CalibrationRecord::new(20.0, 500.0, 1.2);
/// assert!((record.servo_to_angle(260.0, false) - 0.6).abs() < 1e-9);
/// assert_eq!(record.angle_to_servo(0.6, false), 260);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    /// Actuator position of the open (zero angle) pose
    pub open_position: f64,
    /// Actuator position of the closed pose
    pub closed_position: f64,
    /// Joint angle of the closed pose [rad]
    pub closed_joint_angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
}

impl CalibrationRecord {
    pub fn new(open_position: f64, closed_position: f64, closed_joint_angle: f64) -> Self {
        Self {
            open_position,
            closed_position,
            closed_joint_angle,
            multiplier: None,
            offset: None,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Multiplier, `1.0` if it is missing or zero
    pub fn multiplier(&self) -> f64 {
        match self.multiplier {
            Some(m) if m != 0.0 => m,
            _ => 1.0,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset.unwrap_or(0.0)
    }

    /// Actuator position to joint angle
    ///
    /// `inverted` mirrors the angle inside `[0, closed_joint_angle]` before
    /// the multiplier and offset are applied.
    pub fn servo_to_angle(&self, servo: f64, inverted: bool) -> f64 {
        let normalized =
            clamp01((servo - self.open_position) / (self.closed_position - self.open_position));
        let mut angle = normalized * self.closed_joint_angle;
        if inverted {
            angle = self.closed_joint_angle - angle;
        }
        angle * self.multiplier() + self.offset()
    }

    /// Joint angle to the nearest actuator position, inverse of `servo_to_angle`
    pub fn angle_to_servo(&self, angle: f64, inverted: bool) -> i64 {
        let mut angle = (angle - self.offset()) / self.multiplier();
        if inverted {
            angle = self.closed_joint_angle - angle;
        }
        let normalized = clamp01(angle / self.closed_joint_angle);
        (self.open_position + normalized * (self.closed_position - self.open_position)).round()
            as i64
    }
}

/// Calibration records by joint name
///
/// The JSON form is an object of camelCase records keyed by joint name. The
/// same object wrapped as `{"calibration": ...}` is also accepted, a `null`
/// there is an empty table.
///
/// ```
/// use kinematic_rig::CalibrationTable;
///
/// let table = CalibrationTable::from_json(
///     r#"{"calibration": {"index_pip": {"openPosition": 20, "closedPosition": 500, "closedJointAngle": 1.4}}}"#,
/// )
/// .unwrap();
/// assert_eq!(table.get("index_pip").unwrap().closed_joint_angle, 1.4);
/// assert!(CalibrationTable::from_json(r#"{"calibration": null}"#).unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationTable {
    records: BTreeMap<String, CalibrationRecord>,
}

impl CalibrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let value = match value {
            serde_json::Value::Object(mut object) if object.contains_key("calibration") => {
                object.remove("calibration").unwrap_or_default()
            }
            other => other,
        };
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn insert(
        &mut self,
        joint_name: &str,
        record: CalibrationRecord,
    ) -> Option<CalibrationRecord> {
        self.records.insert(joint_name.to_owned(), record)
    }

    pub fn remove(&mut self, joint_name: &str) -> Option<CalibrationRecord> {
        self.records.remove(joint_name)
    }

    pub fn get(&self, joint_name: &str) -> Option<&CalibrationRecord> {
        self.records.get(joint_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CalibrationRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Joint angle of `joint_name` for the position of `actuator`
    ///
    /// The record of the joint is used if there is one, otherwise the default
    /// range of the actuator. Unknown actuators without record give `0.0`.
    pub fn servo_to_angle(
        &self,
        actuators: &ActuatorMap,
        actuator: &str,
        servo: f64,
        joint_name: &str,
    ) -> f64 {
        match self.get(joint_name) {
            Some(record) => record.servo_to_angle(servo, actuator == ABDUCTION_ACTUATOR),
            None => actuators.default_servo_to_angle(actuator, servo),
        }
    }

    /// Actuator position for the angle of `joint_name`, inverse of `servo_to_angle`
    pub fn angle_to_servo(
        &self,
        actuators: &ActuatorMap,
        actuator: &str,
        angle: f64,
        joint_name: &str,
    ) -> i64 {
        match self.get(joint_name) {
            Some(record) => record.angle_to_servo(angle, actuator == ABDUCTION_ACTUATOR),
            None => actuators.default_angle_to_servo(actuator, angle),
        }
    }
}

impl FromIterator<(String, CalibrationRecord)> for CalibrationTable {
    fn from_iter<I: IntoIterator<Item = (String, CalibrationRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// One actuator and the joints it drives
#[derive(Debug, Clone, PartialEq)]
pub struct Actuator {
    pub name: String,
    /// Driven joints, the first one is read back by `RobotModel::servo_positions`
    pub joints: Vec<String>,
    /// Raw position of the open pose
    pub min: f64,
    /// Raw position of the closed pose
    pub max: f64,
}

/// Which actuator drives which joints
///
/// `Default` is the table of the five finger hand. Driving a proximal joint
/// of a distal pair moves the distal joint to the same angle.
///
/// ```
/// use kinematic_rig::ActuatorMap;
///
/// let map = ActuatorMap::default();
/// assert_eq!(map.joints_for("servo_10"), &["thumb_pip", "thumb_dip"]);
/// assert_eq!(map.actuator_for_joint("ring_mcp"), Some("servo_3"));
/// assert_eq!(map.distal_for("index_pip"), Some("index_dip"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorMap {
    actuators: Vec<Actuator>,
    distal_pairs: Vec<(String, String)>,
}

impl Default for ActuatorMap {
    fn default() -> Self {
        let mut map = Self::new()
            .with_actuator("servo_1", &["pinky_pip"], 20.0, 500.0)
            .with_actuator("servo_2", &["ring_pip"], 98.0, 500.0)
            .with_actuator("servo_3", &["ring_mcp"], 279.0, 500.0)
            .with_actuator("servo_4", &["middle_mcp"], 20.0, 400.0)
            .with_actuator("servo_5", &["middle_pip"], 20.0, 450.0)
            .with_actuator("servo_6", &["index_pip"], 20.0, 500.0)
            .with_actuator("servo_7", &["pinky_mcp"], 20.0, 400.0)
            .with_actuator("servo_8", &["index_mcp"], 20.0, 500.0)
            .with_actuator("servo_9", &["thumb_mcp"], 20.0, 400.0)
            .with_actuator("servo_10", &["thumb_pip", "thumb_dip"], 20.0, 500.0)
            .with_actuator(ABDUCTION_ACTUATOR, &["thumb_abduction"], 20.0, 520.0);
        for finger in ["pinky", "ring", "middle", "index", "thumb"] {
            map = map.with_distal_pair(&format!("{finger}_pip"), &format!("{finger}_dip"));
        }
        map
    }
}

impl ActuatorMap {
    /// Empty map
    pub fn new() -> Self {
        Self {
            actuators: Vec::new(),
            distal_pairs: Vec::new(),
        }
    }

    /// Add an actuator, an existing one with the same name is replaced
    pub fn with_actuator(mut self, name: &str, joints: &[&str], min: f64, max: f64) -> Self {
        let actuator = Actuator {
            name: name.to_owned(),
            joints: joints.iter().map(|j| (*j).to_owned()).collect(),
            min,
            max,
        };
        match self.actuators.iter_mut().find(|a| a.name == name) {
            Some(existing) => *existing = actuator,
            None => self.actuators.push(actuator),
        }
        self
    }

    pub fn with_distal_pair(mut self, proximal: &str, distal: &str) -> Self {
        self.distal_pairs
            .push((proximal.to_owned(), distal.to_owned()));
        self
    }

    pub fn actuators(&self) -> &[Actuator] {
        &self.actuators
    }

    pub fn actuator(&self, name: &str) -> Option<&Actuator> {
        self.actuators.iter().find(|a| a.name == name)
    }

    /// Joints driven by the actuator, empty for unknown actuators
    pub fn joints_for(&self, actuator: &str) -> &[String] {
        self.actuator(actuator)
            .map(|a| a.joints.as_slice())
            .unwrap_or_default()
    }

    /// Raw `(min, max)` range of the actuator
    pub fn range(&self, actuator: &str) -> Option<(f64, f64)> {
        self.actuator(actuator).map(|a| (a.min, a.max))
    }

    /// First actuator which drives the joint
    pub fn actuator_for_joint(&self, joint_name: &str) -> Option<&str> {
        self.actuators
            .iter()
            .find(|a| a.joints.iter().any(|j| j == joint_name))
            .map(|a| a.name.as_str())
    }

    /// Distal joint which follows the proximal one
    pub fn distal_for(&self, proximal: &str) -> Option<&str> {
        self.distal_pairs
            .iter()
            .find(|(p, _)| p == proximal)
            .map(|(_, d)| d.as_str())
    }

    /// Angle from the default range, `0.0` for unknown actuators
    pub fn default_servo_to_angle(&self, actuator: &str, servo: f64) -> f64 {
        let Some(a) = self.actuator(actuator) else {
            return 0.0;
        };
        let normalized = clamp01((servo - a.min) / (a.max - a.min));
        if actuator == ABDUCTION_ACTUATOR {
            normalized * DEFAULT_MAX_JOINT_ANGLE
        } else {
            (1.0 - normalized) * DEFAULT_MAX_JOINT_ANGLE
        }
    }

    /// Position from the default range, `0` for unknown actuators
    pub fn default_angle_to_servo(&self, actuator: &str, angle: f64) -> i64 {
        let Some(a) = self.actuator(actuator) else {
            return 0;
        };
        let normalized = if actuator == ABDUCTION_ACTUATOR {
            angle / DEFAULT_MAX_JOINT_ANGLE
        } else {
            1.0 - angle / DEFAULT_MAX_JOINT_ANGLE
        };
        (a.min + clamp01(normalized) * (a.max - a.min)).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_record_round_trip() {
        let record = CalibrationRecord::new(20.0, 500.0, 1.2);
        assert_relative_eq!(record.servo_to_angle(260.0, false), 0.6, epsilon = 1e-12);
        assert_eq!(record.angle_to_servo(0.6, false), 260);
        // out of range positions are clamped
        assert_relative_eq!(record.servo_to_angle(0.0, false), 0.0);
        assert_relative_eq!(record.servo_to_angle(900.0, false), 1.2);
        assert_eq!(record.angle_to_servo(10.0, false), 500);
    }

    #[test]
    fn test_record_inverted() {
        let record = CalibrationRecord::new(20.0, 520.0, 1.0);
        assert_relative_eq!(record.servo_to_angle(20.0, true), 1.0);
        assert_relative_eq!(record.servo_to_angle(520.0, true), 0.0);
        assert_relative_eq!(record.servo_to_angle(145.0, true), 0.75, epsilon = 1e-12);
        for servo in [20, 145, 270, 401, 520] {
            let angle = record.servo_to_angle(servo as f64, true);
            assert_eq!(record.angle_to_servo(angle, true), servo);
        }
    }

    #[test]
    fn test_record_multiplier_and_offset() {
        let record = CalibrationRecord::new(100.0, 300.0, 1.0)
            .with_multiplier(2.0)
            .with_offset(0.1);
        assert_relative_eq!(record.servo_to_angle(200.0, false), 1.1, epsilon = 1e-12);
        assert_eq!(record.angle_to_servo(1.1, false), 200);

        let zero = CalibrationRecord::new(100.0, 300.0, 1.0).with_multiplier(0.0);
        assert_relative_eq!(zero.multiplier(), 1.0);
        assert_relative_eq!(zero.servo_to_angle(300.0, false), 1.0);
    }

    #[test]
    fn test_degenerate_record() {
        let record = CalibrationRecord::new(100.0, 100.0, 0.0);
        assert_relative_eq!(record.servo_to_angle(100.0, false), 0.0);
        assert_eq!(record.angle_to_servo(0.5, false), 100);
    }

    #[test]
    fn test_default_table() {
        let map = ActuatorMap::default();
        assert_relative_eq!(map.default_servo_to_angle("servo_1", 20.0), FRAC_PI_2);
        assert_relative_eq!(map.default_servo_to_angle("servo_1", 500.0), 0.0);
        assert_relative_eq!(map.default_servo_to_angle(ABDUCTION_ACTUATOR, 20.0), 0.0);
        assert_relative_eq!(
            map.default_servo_to_angle(ABDUCTION_ACTUATOR, 520.0),
            FRAC_PI_2
        );
        assert_relative_eq!(map.default_servo_to_angle("servo_99", 300.0), 0.0);
        assert_eq!(map.default_angle_to_servo("servo_99", 1.0), 0);

        for (actuator, servo) in [("servo_3", 300), ("servo_5", 77), (ABDUCTION_ACTUATOR, 333)] {
            let angle = map.default_servo_to_angle(actuator, servo as f64);
            assert_eq!(map.default_angle_to_servo(actuator, angle), servo);
        }
    }

    #[test]
    fn test_table_prefers_record() {
        let map = ActuatorMap::default();
        let mut table = CalibrationTable::new();
        table.insert("index_pip", CalibrationRecord::new(20.0, 500.0, 1.2));
        assert_relative_eq!(
            table.servo_to_angle(&map, "servo_6", 260.0, "index_pip"),
            0.6,
            epsilon = 1e-12
        );
        // no record for index_mcp
        assert_relative_eq!(
            table.servo_to_angle(&map, "servo_8", 260.0, "index_mcp"),
            FRAC_PI_2 / 2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_json() {
        let table = CalibrationTable::from_json(
            r#"{
                "thumb_abduction": {
                    "openPosition": 20,
                    "closedPosition": 520,
                    "closedJointAngle": 0.9,
                    "multiplier": 1.5
                }
            }"#,
        )
        .unwrap();
        let record = table.get("thumb_abduction").unwrap();
        assert_relative_eq!(record.multiplier(), 1.5);
        assert_relative_eq!(record.offset(), 0.0);

        let json = table.to_json().unwrap();
        assert!(json.contains("closedJointAngle"));
        assert!(!json.contains("offset"));
        assert_eq!(CalibrationTable::from_json(&json).unwrap(), table);

        let err = CalibrationTable::from_json(r#"{"a": {"openPosition": 1}}"#).unwrap_err();
        assert!(matches!(err, Error::CalibrationFormat(_)));
    }

    #[test]
    fn test_abduction_is_inverted_in_any_map() {
        let map = ActuatorMap::new()
            .with_actuator(ABDUCTION_ACTUATOR, &["thumb_abduction"], 20.0, 520.0)
            .with_actuator("servo_6", &["index_pip"], 20.0, 500.0);
        assert_relative_eq!(map.default_servo_to_angle(ABDUCTION_ACTUATOR, 20.0), 0.0);
        assert_relative_eq!(map.default_servo_to_angle(ABDUCTION_ACTUATOR, 520.0), FRAC_PI_2);
        assert_eq!(map.default_angle_to_servo(ABDUCTION_ACTUATOR, FRAC_PI_2), 520);
        assert_relative_eq!(map.default_servo_to_angle("servo_6", 20.0), FRAC_PI_2);
        assert_eq!(map.default_angle_to_servo("servo_6", FRAC_PI_2), 20);

        let mut table = CalibrationTable::new();
        table.insert("thumb_abduction", CalibrationRecord::new(20.0, 520.0, 1.0));
        table.insert("index_pip", CalibrationRecord::new(20.0, 520.0, 1.0));
        assert_relative_eq!(
            table.servo_to_angle(&map, ABDUCTION_ACTUATOR, 20.0, "thumb_abduction"),
            1.0
        );
        assert_relative_eq!(table.servo_to_angle(&map, "servo_6", 20.0, "index_pip"), 0.0);
    }

    #[test]
    fn test_actuator_map_builder() {
        let map = ActuatorMap::new()
            .with_actuator("wrist", &["wrist_pitch"], 0.0, 1000.0)
            .with_actuator("wrist", &["wrist_roll"], 0.0, 100.0)
            .with_distal_pair("a", "b");
        assert_eq!(map.actuators().len(), 1);
        assert_eq!(map.joints_for("wrist"), &["wrist_roll"]);
        assert_eq!(map.range("wrist"), Some((0.0, 100.0)));
        assert!(map.joints_for("elbow").is_empty());
        assert_eq!(map.actuator_for_joint("wrist_pitch"), None);
        assert_eq!(map.distal_for("a"), Some("b"));
    }
}
