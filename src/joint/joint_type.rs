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
use std::fmt::{self, Display};

/// Type of Joint, as written in the `type` attribute of a description
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum JointType {
    /// Fixed joint. It has no value.
    #[default]
    Fixed,
    /// Rotational joint around axis without limits. It has an angle [rad].
    Continuous,
    /// Rotational joint around axis clamped by its limits. It has an angle [rad].
    Revolute,
    /// Linear joint along axis. The value is length.
    Prismatic,
    /// Planar joint. Three values are stored but it does not move the frame.
    Planar,
    /// Floating joint. Six values are stored but it does not move the frame.
    Floating,
}

impl JointType {
    /// Parse the `type` attribute
    ///
    /// # Examples
    ///
    /// ```
    /// use kinematic_rig::JointType;
    ///
    /// assert_eq!(JointType::from_name("revolute"), Some(JointType::Revolute));
    /// assert_eq!(JointType::from_name("ball"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fixed" => Some(JointType::Fixed),
            "continuous" => Some(JointType::Continuous),
            "revolute" => Some(JointType::Revolute),
            "prismatic" => Some(JointType::Prismatic),
            "planar" => Some(JointType::Planar),
            "floating" => Some(JointType::Floating),
            _ => None,
        }
    }

    /// Number of values the joint accepts
    ///
    /// # Examples
    ///
    /// ```
    /// use kinematic_rig::JointType;
    ///
    /// assert_eq!(JointType::Fixed.dof(), 0);
    /// assert_eq!(JointType::Prismatic.dof(), 1);
    /// assert_eq!(JointType::Floating.dof(), 6);
    /// ```
    pub fn dof(&self) -> usize {
        match self {
            JointType::Fixed => 0,
            JointType::Continuous | JointType::Revolute | JointType::Prismatic => 1,
            JointType::Planar => 3,
            JointType::Floating => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JointType::Fixed => "fixed",
            JointType::Continuous => "continuous",
            JointType::Revolute => "revolute",
            JointType::Prismatic => "prismatic",
            JointType::Planar => "planar",
            JointType::Floating => "floating",
        }
    }
}

impl Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JointType::Fixed => write!(f, "[⚓]"),
            JointType::Continuous => write!(f, "[⟳]"),
            JointType::Revolute => write!(f, "[⚙]"),
            JointType::Prismatic => write!(f, "[↕]"),
            JointType::Planar => write!(f, "[▭]"),
            JointType::Floating => write!(f, "[✥]"),
        }
    }
}
