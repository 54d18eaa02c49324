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
//! # Live kinematic model of robot descriptions using [nalgebra](http://nalgebra.org).
//!
//! `kinematic-rig` has below functionalities
//!
//! 1. URDF loader (links, joints, mimic joints, visuals, collisions)
//! 1. Joint state with limits and mimic propagation
//! 1. Conversion between actuator positions and joint angles
//! 1. Eased joint animation driven by an external tick
//!
//! See `RobotModel` as the top level interface.
//!
pub mod animation;
pub mod calibration;
mod errors;
pub mod iterator;
pub mod joint;
pub mod link;
mod model;
pub mod node;
pub mod prelude;
pub mod resolver;
mod robot;
pub mod urdf;
use nalgebra as na;

pub use self::animation::{Animator, OnComplete};
pub use self::calibration::{ActuatorMap, CalibrationRecord, CalibrationTable};
pub use self::errors::*;
pub use self::joint::{Joint, JointType};
pub use self::link::{Collision, Geometry, Material, Visual};
pub use self::model::*;
pub use self::node::{Node, NodeKind};
pub use self::resolver::{DescriptorResolver, GeometryResolver, PrimitiveId};
pub use self::robot::Robot;
pub use self::urdf::UrdfLoader;

// re-export from nalgebra
pub use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
