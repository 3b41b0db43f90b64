use crate::config::MotionConfig;
use crate::frame::PoseSample;

use nalgebra::Vector3;
use tracing::debug;

/// Motion state carried between consecutive pose samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionState {
    pub last_position: Option<Vector3<f64>>,
    pub last_timestamp: Option<f64>,
    pub last_warning_timestamp: Option<f64>,
}

/// Events produced by a single call to [`MotionGate::observe`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionEvents {
    /// Camera moved beyond the minimum position delta; carries the new reference position
    pub movement: Option<Vector3<f64>>,
    /// Camera speed exceeded the maximum and the warning cooldown has elapsed
    pub too_fast: bool,
    /// Distance from the reference position to this sample
    pub distance: f64,
    /// Speed over the last interval, when it could be computed
    pub velocity: Option<f64>,
}

impl MotionEvents {
    pub fn is_empty(&self) -> bool {
        self.movement.is_none() && !self.too_fast
    }
}

/// Threshold-and-cooldown gate over consecutive pose samples.
///
/// The reference position only moves when a sample exceeds
/// `min_position_delta`, so sub-threshold jitter never shifts it. Distance is
/// measured from that reference, so small steps in one direction are reported
/// once their cumulative displacement passes the threshold.
#[derive(Debug, Clone)]
pub struct MotionGate {
    config: MotionConfig,
    state: MotionState,
}

impl MotionGate {
    /// Create a new motion gate with the given thresholds
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            state: MotionState::default(),
        }
    }

    /// Feed the next pose sample through the gate
    pub fn observe(&mut self, sample: PoseSample) -> MotionEvents {
        let mut events = MotionEvents::default();

        let (last_position, last_timestamp) =
            match (self.state.last_position, self.state.last_timestamp) {
                (Some(position), Some(timestamp)) => (position, timestamp),
                _ => {
                    debug!("Bootstrapping motion gate at t={:.3}", sample.timestamp);
                    self.state.last_position = Some(sample.position);
                    self.state.last_timestamp = Some(sample.timestamp);
                    return events;
                }
            };

        let distance = (sample.position - last_position).norm();
        events.distance = distance;

        if distance > self.config.min_position_delta {
            events.movement = Some(sample.position);
            self.state.last_position = Some(sample.position);
        }

        let delta_time = sample.timestamp - last_timestamp;
        if delta_time <= 0.0 {
            debug!(
                "Skipping velocity check for non-increasing timestamp ({:.6} -> {:.6})",
                last_timestamp, sample.timestamp
            );
            self.state.last_timestamp = Some(last_timestamp.max(sample.timestamp));
            return events;
        }

        let velocity = distance / delta_time;
        events.velocity = Some(velocity);

        if velocity > self.config.max_velocity {
            let cooled_down = match self.state.last_warning_timestamp {
                Some(last_warning) => {
                    sample.timestamp - last_warning > self.config.velocity_warning_cooldown_seconds
                }
                None => true,
            };

            if cooled_down {
                events.too_fast = true;
                self.state.last_warning_timestamp = Some(sample.timestamp);
            } else {
                debug!(
                    "Velocity {:.3} m/s above limit but warning is cooling down",
                    velocity
                );
            }
        }

        self.state.last_timestamp = Some(sample.timestamp);
        events
    }

    /// Current gate state
    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Forget all history; the next sample bootstraps again
    pub fn reset(&mut self) {
        self.state = MotionState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, x: f64, y: f64, z: f64) -> PoseSample {
        PoseSample::new(t, Vector3::new(x, y, z))
    }

    fn gate() -> MotionGate {
        MotionGate::new(MotionConfig::default())
    }

    #[test]
    fn test_first_sample_bootstraps_silently() {
        let mut gate = gate();
        let events = gate.observe(sample(0.0, 5.0, 5.0, 5.0));

        assert!(events.is_empty());
        assert_eq!(gate.state().last_position, Some(Vector3::new(5.0, 5.0, 5.0)));
        assert_eq!(gate.state().last_timestamp, Some(0.0));
    }

    #[test]
    fn test_reference_scenario() {
        let mut gate = gate();

        assert!(gate.observe(sample(0.0, 0.0, 0.0, 0.0)).is_empty());

        let second = gate.observe(sample(0.1, 0.0, 0.0, 0.2));
        assert_eq!(second.movement, Some(Vector3::new(0.0, 0.0, 0.2)));
        assert!(second.too_fast);
        assert!((second.velocity.unwrap() - 2.0).abs() < 1e-9);

        let third = gate.observe(sample(0.2, 0.0, 0.0, 0.21));
        assert!(third.movement.is_none());
        assert!(!third.too_fast);
        assert!((third.velocity.unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_slow_creep_fires_on_cumulative_displacement() {
        let mut gate = gate();
        gate.observe(sample(0.0, 0.0, 0.0, 0.0));

        let mut moved_at = Vec::new();
        for i in 1..=80 {
            let z = 0.0015 * i as f64;
            if gate.observe(sample(i as f64, 0.0, 0.0, z)).movement.is_some() {
                moved_at.push(i);
            }
        }

        // 34 steps of 1.5 mm pass 5 cm, and the reference restarts from there
        assert_eq!(moved_at, vec![34, 68]);
    }

    #[test]
    fn test_drift_inside_threshold_does_not_move() {
        let mut gate = gate();
        gate.observe(sample(0.0, 0.0, 0.0, 0.0));

        // Slow creep that stays inside the threshold ball around the origin
        let mut movements = 0;
        for i in 1..=100 {
            let z = 0.0004 * i as f64;
            if gate.observe(sample(i as f64, 0.0, 0.0, z)).movement.is_some() {
                movements += 1;
            }
        }
        assert_eq!(movements, 0);
        assert_eq!(gate.state().last_position, Some(Vector3::zeros()));
    }

    #[test]
    fn test_each_step_under_threshold_but_reference_fixed() {
        let mut gate = gate();
        gate.observe(sample(0.0, 0.0, 0.0, 0.0));

        // Oscillating jitter never leaves the threshold ball around the reference.
        for i in 1..50 {
            let x = if i % 2 == 0 { 0.03 } else { -0.03 };
            assert!(gate.observe(sample(i as f64 * 0.1, x, 0.0, 0.0)).movement.is_none());
        }
    }

    #[test]
    fn test_movement_updates_reference_position() {
        let mut gate = gate();
        gate.observe(sample(0.0, 0.0, 0.0, 0.0));

        let events = gate.observe(sample(10.0, 0.1, 0.0, 0.0));
        assert!(events.movement.is_some());
        assert!(!events.too_fast);
        assert_eq!(gate.state().last_position, Some(Vector3::new(0.1, 0.0, 0.0)));

        // 0.04 from the new reference: no movement
        assert!(gate.observe(sample(20.0, 0.14, 0.0, 0.0)).movement.is_none());
    }

    #[test]
    fn test_warning_cooldown() {
        let mut gate = gate();
        gate.observe(sample(0.0, 0.0, 0.0, 0.0));

        assert!(gate.observe(sample(0.1, 0.5, 0.0, 0.0)).too_fast);
        // Fast again 1 second later: suppressed
        assert!(!gate.observe(sample(1.1, 2.5, 0.0, 0.0)).too_fast);
        // Fast again at exactly the cooldown boundary: still suppressed
        assert!(!gate.observe(sample(5.1, 7.0, 0.0, 0.0)).too_fast);
        // Past the cooldown: fires
        assert!(gate.observe(sample(5.2, 8.0, 0.0, 0.0)).too_fast);
        assert_eq!(gate.state().last_warning_timestamp, Some(5.2));
    }

    #[test]
    fn test_duplicate_timestamp_skips_velocity() {
        let mut gate = gate();
        gate.observe(sample(1.0, 0.0, 0.0, 0.0));

        let events = gate.observe(sample(1.0, 1.0, 0.0, 0.0));
        assert!(events.movement.is_some());
        assert!(!events.too_fast);
        assert_eq!(events.velocity, None);
        assert_eq!(gate.state().last_timestamp, Some(1.0));
        assert_eq!(gate.state().last_warning_timestamp, None);
    }

    #[test]
    fn test_backwards_timestamp_does_not_rewind_clock() {
        let mut gate = gate();
        gate.observe(sample(2.0, 0.0, 0.0, 0.0));

        let events = gate.observe(sample(1.5, 0.0, 0.0, 0.0));
        assert!(events.is_empty());
        assert_eq!(gate.state().last_timestamp, Some(2.0));
    }

    #[test]
    fn test_reset_rebootstraps() {
        let mut gate = gate();
        gate.observe(sample(0.0, 0.0, 0.0, 0.0));
        gate.observe(sample(0.1, 1.0, 0.0, 0.0));

        gate.reset();
        assert_eq!(gate.state(), &MotionState::default());
        assert!(gate.observe(sample(0.2, 9.0, 0.0, 0.0)).is_empty());
    }
}
