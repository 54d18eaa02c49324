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
//! Boundary to the renderer which turns geometry descriptors into drawables
use crate::errors::*;
use crate::link::Geometry;
use std::path::{Path, PathBuf};

/// Opaque key of a drawable created by a `GeometryResolver`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(pub u64);

/// Turns a geometry descriptor into a drawable primitive
///
/// The loader calls it once per visual/collision element. When it fails the
/// element is logged and omitted, the rest of the description is still loaded.
///
/// Any closure with the same signature is a resolver.
///
/// ```
/// use kinematic_rig::{Geometry, PrimitiveId, GeometryResolver};
/// use std::path::Path;
///
/// let mut count = 0;
/// let mut resolver = |_: &Geometry, _: &Path| -> kinematic_rig::Result<PrimitiveId> {
///     count += 1;
///     Ok(PrimitiveId(count))
/// };
/// let id = resolver
///     .resolve(&Geometry::Sphere { radius: 0.1 }, Path::new(""))
///     .unwrap();
/// assert_eq!(id, PrimitiveId(1));
/// ```
pub trait GeometryResolver {
    fn resolve(&mut self, geometry: &Geometry, base_path: &Path) -> Result<PrimitiveId>;
}

impl<F> GeometryResolver for F
where
    F: FnMut(&Geometry, &Path) -> Result<PrimitiveId>,
{
    fn resolve(&mut self, geometry: &Geometry, base_path: &Path) -> Result<PrimitiveId> {
        self(geometry, base_path)
    }
}

/// A request the `DescriptorResolver` accepted
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeometry {
    pub id: PrimitiveId,
    pub geometry: Geometry,
    /// `base_path` joined with the mesh filename
    pub asset_path: Option<PathBuf>,
}

/// Resolver which only records the descriptors
///
/// It never fails. The host builds its drawables later from `resolved`.
#[derive(Debug, Default, Clone)]
pub struct DescriptorResolver {
    pub resolved: Vec<ResolvedGeometry>,
}

impl DescriptorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PrimitiveId) -> Option<&ResolvedGeometry> {
        self.resolved.iter().find(|r| r.id == id)
    }
}

impl GeometryResolver for DescriptorResolver {
    fn resolve(&mut self, geometry: &Geometry, base_path: &Path) -> Result<PrimitiveId> {
        let id = PrimitiveId(self.resolved.len() as u64);
        let asset_path = match geometry {
            Geometry::Mesh { filename, .. } => Some(base_path.join(filename)),
            _ => None,
        };
        self.resolved.push(ResolvedGeometry {
            id,
            geometry: geometry.clone(),
            asset_path,
        });
        Ok(id)
    }
}
