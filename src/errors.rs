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
use thiserror::Error;

/// Error for `kinematic-rig`
///
/// Only the load-time variants are fatal. Runtime commands on unknown
/// joints or actuators never produce an `Error`, they report `false`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed robot description: {message}")]
    MalformedDescription { message: String },
    #[error("infinite loop of mimic joints detected starting at joint: {joint_name}")]
    InfiniteMimicLoop { joint_name: String },
    #[error("failed to resolve geometry {geometry}: {reason}")]
    GeometryResolution { geometry: String, reason: String },
    #[error("invalid calibration data: {0}")]
    CalibrationFormat(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDescription {
            message: message.into(),
        }
    }

    pub fn geometry_resolution(geometry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GeometryResolution {
            geometry: geometry.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for this crate
pub type Result<T> = ::std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::malformed("duplicate link name: palm");
        assert!(err.to_string().contains("palm"));

        let err = Error::InfiniteMimicLoop {
            joint_name: "a".to_owned(),
        };
        assert!(err.to_string().contains("mimic"));
        assert!(err.to_string().ends_with('a'));
    }
}
