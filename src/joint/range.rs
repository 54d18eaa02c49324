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
use std::f64::consts::PI;

/// lower/upper limits of the joint value
#[derive(Copy, Debug, Clone, PartialEq)]
pub struct Range {
    pub lower: f64,
    pub upper: f64,
}

impl Range {
    /// Create new Range instance
    ///
    /// The values are stored as written. If `lower` is greater than `upper`,
    /// `clamp` always returns `lower`.
    ///
    /// # Examples
    ///
    /// ```
    /// let range = kinematic_rig::joint::Range::new(-1.0, 1.0);
    /// assert_eq!(range.lower, -1.0);
    /// ```
    pub fn new(lower: f64, upper: f64) -> Self {
        Range { lower, upper }
    }
    /// Check if the value is in the range
    ///
    /// # Examples
    ///
    /// ```
    /// let range = kinematic_rig::joint::Range::new(-1.0, 1.0);
    /// assert!(range.is_valid(0.0));
    /// assert!(range.is_valid(1.0));
    /// assert!(!range.is_valid(1.5));
    /// ```
    pub fn is_valid(&self, val: f64) -> bool {
        val <= self.upper && val >= self.lower
    }
    /// Clamp the value with the limits
    ///
    /// The upper limit is applied first, then the lower one.
    ///
    /// # Examples
    ///
    /// ```
    /// let range = kinematic_rig::joint::Range::new(-1.0, 1.0);
    /// assert_eq!(range.clamp(0.5), 0.5);
    /// assert_eq!(range.clamp(2.0), 1.0);
    /// assert_eq!(range.clamp(-2.0), -1.0);
    /// ```
    pub fn clamp(&self, val: f64) -> f64 {
        val.min(self.upper).max(self.lower)
    }
}

impl Default for Range {
    /// `(-π, π)`, used when a joint has no `limit` element
    fn default() -> Self {
        Range::new(-PI, PI)
    }
}

impl From<::std::ops::RangeInclusive<f64>> for Range {
    /// # Examples
    ///
    /// ```
    /// let range: kinematic_rig::joint::Range = (-1.0..=1.0).into();
    /// assert!(range.is_valid(0.0));
    /// assert!(!range.is_valid(1.5));
    /// ```
    fn from(range: ::std::ops::RangeInclusive<f64>) -> Self {
        let (lower, upper) = range.into_inner();
        Range::new(lower, upper)
    }
}
