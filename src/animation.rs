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
//! Eased transition of joints, driven by an external tick
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::robot::Robot;

/// Callback which runs once when an animation reaches its targets
pub type OnComplete = Box<dyn FnOnce()>;

/// Cubic ease-in-out, `f(0) = 0`, `f(0.5) = 0.5` and `f(1) = 1`
///
/// ```
/// use kinematic_rig::animation::ease_in_out_cubic;
///
/// assert_eq!(ease_in_out_cubic(0.0), 0.0);
/// assert_eq!(ease_in_out_cubic(0.25), 0.0625);
/// assert_eq!(ease_in_out_cubic(1.0), 1.0);
/// ```
pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// One running transition
pub struct AnimationTask {
    start_time: Instant,
    duration: Duration,
    /// name, start value, target value
    joints: Vec<(String, f64, f64)>,
    on_complete: Option<OnComplete>,
}

impl AnimationTask {
    /// Elapsed ratio in `[0, 1]`, always `1` for zero duration
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start_time);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// `(name, start, target)` of the animated joints
    pub fn joints(&self) -> &[(String, f64, f64)] {
        &self.joints
    }
}

impl fmt::Debug for AnimationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationTask")
            .field("start_time", &self.start_time)
            .field("duration", &self.duration)
            .field("joints", &self.joints)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Idle or running with exactly one `AnimationTask`
#[derive(Debug, Default)]
pub struct Animator {
    task: Option<AnimationTask>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn task(&self) -> Option<&AnimationTask> {
        self.task.as_ref()
    }

    /// Start to move the joints from their current values to `targets`
    ///
    /// A running task is replaced without calling its callback. Joints which
    /// are not in `robot` are skipped.
    pub fn start<I, K>(
        &mut self,
        robot: &Robot,
        targets: I,
        duration: Duration,
        on_complete: Option<OnComplete>,
        now: Instant,
    ) where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let joints = targets
            .into_iter()
            .filter_map(|(name, target)| {
                let name = name.as_ref();
                if robot.joint(name).is_none() {
                    warn!("joint {name} is not found, it is not animated");
                    return None;
                }
                Some((name.to_owned(), robot.joint_value(name), target))
            })
            .collect::<Vec<_>>();
        debug!(
            "animation of {} joints started, duration {:?}",
            joints.len(),
            duration
        );
        self.task = Some(AnimationTask {
            start_time: now,
            duration,
            joints,
            on_complete,
        });
    }

    /// Go back to idle without calling the callback
    ///
    /// It returns true if a task was running.
    pub fn stop(&mut self) -> bool {
        self.task.take().is_some()
    }

    /// Apply the eased values for `now`
    ///
    /// When the progress reaches 1 the targets are applied, the task is
    /// cleared and the callback runs. It returns true if any joint changed.
    pub fn update(&mut self, robot: &Robot, now: Instant) -> bool {
        let Some(task) = &self.task else {
            return false;
        };
        let progress = task.progress(now);
        let finished = progress >= 1.0;
        let eased = ease_in_out_cubic(progress);
        let mut changed = false;
        for (name, start, target) in &task.joints {
            // the last tick lands exactly on the target
            let value = if finished {
                *target
            } else {
                start + (target - start) * eased
            };
            changed = robot.set_joint_value(name, &[value]) || changed;
        }
        if finished {
            if let Some(task) = self.task.take() {
                debug!("animation completed");
                if let Some(on_complete) = task.on_complete {
                    on_complete();
                }
            }
        }
        changed
    }
}
