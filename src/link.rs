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
//! Geometry descriptors attached to links
//!
//! The core never draws anything. `Visual` and `Collision` keep the
//! descriptor as written in the description and the `PrimitiveId` which the
//! `GeometryResolver` returned for it.
use crate::resolver::PrimitiveId;
use na::{Isometry3, Vector3};
use nalgebra as na;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Box { size: Vector3<f64> },
    Cylinder { radius: f64, length: f64 },
    Sphere { radius: f64 },
    Mesh { filename: String, scale: Vector3<f64> },
}

impl Geometry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Box { .. } => "box",
            Geometry::Cylinder { .. } => "cylinder",
            Geometry::Sphere { .. } => "sphere",
            Geometry::Mesh { .. } => "mesh",
        }
    }
}

impl Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Geometry::Mesh { filename, .. } => write!(f, "mesh({filename})"),
            other => write!(f, "{}", other.kind_name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Default for Color {
    fn default() -> Self {
        Color {
            r: 1.0,
            g: 1.0,
            b: 1.0,
            a: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub filename: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: Option<Color>,
    pub texture: Option<Texture>,
}

#[derive(Debug, Clone)]
pub struct Visual {
    pub origin: Isometry3<f64>,
    pub geometry: Geometry,
    pub material: Option<Material>,
    pub primitive: PrimitiveId,
}

#[derive(Debug, Clone)]
pub struct Collision {
    pub origin: Isometry3<f64>,
    pub geometry: Geometry,
    pub primitive: PrimitiveId,
}
