/*
  Copyright 2020 Takashi Ogura

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

/// Information for copying joint state of other joint
///
/// For example, `Mimic` is used to move the distal joint of a finger together
/// with the proximal one. In that case, the code like below will be used.
///
/// ```
/// let mimic_for_dip = kinematic_rig::joint::Mimic::new("index_pip", 1.0, 0.0);
/// ```
///
/// output value (`mimic_value()`) is calculated by `value = driver_value * multiplier + offset`
///
#[derive(Debug, Clone, PartialEq)]
pub struct Mimic {
    /// Name of the joint which drives this joint
    pub joint: String,
    pub multiplier: f64,
    pub offset: f64,
}

impl Mimic {
    /// Create new instance of Mimic
    pub fn new(joint: impl Into<String>, multiplier: f64, offset: f64) -> Self {
        Mimic {
            joint: joint.into(),
            multiplier,
            offset,
        }
    }
    /// Calculate the mimic joint value
    ///
    /// # Examples
    ///
    /// ```
    /// let m = kinematic_rig::joint::Mimic::new("a", 1.0, 0.5);
    /// assert_eq!(m.mimic_value(0.2), 0.7); // 0.2 * 1.0 + 0.5
    /// ```
    ///
    /// ```
    /// let m = kinematic_rig::joint::Mimic::new("a", -2.0, -0.4);
    /// assert_eq!(m.mimic_value(0.2), -0.8); // 0.2 * -2.0 - 0.4
    /// ```
    pub fn mimic_value(&self, from_value: f64) -> f64 {
        from_value * self.multiplier + self.offset
    }
}
