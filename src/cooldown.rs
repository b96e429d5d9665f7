use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::request::RequestKind;

/// Per-action throttle. The clock is always supplied by the caller so
/// tests can drive it without real timers.
pub struct CooldownGate {
    windows: HashMap<RequestKind, Duration>,
    last_pass: HashMap<RequestKind, Instant>,
}

impl CooldownGate {
    pub fn new() -> Self {
        let mut windows = HashMap::new();
        windows.insert(RequestKind::Simulation, Duration::from_secs(10));
        windows.insert(RequestKind::DiseaseAnalysis, Duration::from_secs(15));
        windows.insert(RequestKind::Chat, Duration::from_secs(2));
        windows.insert(RequestKind::WeatherLookup, Duration::from_secs(5));
        // Variety lookups are debounced instead of gated.
        windows.insert(RequestKind::VarietyLookup, Duration::ZERO);
        CooldownGate {
            windows,
            last_pass: HashMap::new(),
        }
    }

    /// Allows the action and records `now`, or returns the time left in
    /// the window. No two passes of the same kind can succeed within
    /// its window.
    pub fn try_acquire(&mut self, kind: RequestKind, now: Instant) -> Result<(), Duration> {
        let window = self.windows.get(&kind).copied().unwrap_or(Duration::ZERO);
        if let Some(last) = self.last_pass.get(&kind) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < window {
                return Err(window - elapsed);
            }
        }
        self.last_pass.insert(kind, now);
        Ok(())
    }

    #[cfg(test)]
    pub fn window(&self, kind: RequestKind) -> Duration {
        self.windows.get(&kind).copied().unwrap_or(Duration::ZERO)
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_attempt_within_window_is_denied() {
        let mut gate = CooldownGate::new();
        let t0 = Instant::now();
        assert!(gate.try_acquire(RequestKind::Simulation, t0).is_ok());

        let t1 = t0 + Duration::from_secs(3);
        let remaining = gate
            .try_acquire(RequestKind::Simulation, t1)
            .expect_err("second simulation inside 10s must be denied");
        assert_eq!(remaining, Duration::from_secs(7));
    }

    #[test]
    fn attempt_after_window_passes() {
        let mut gate = CooldownGate::new();
        let t0 = Instant::now();
        gate.try_acquire(RequestKind::Chat, t0).unwrap();
        assert!(gate
            .try_acquire(RequestKind::Chat, t0 + Duration::from_secs(2))
            .is_ok());
    }

    #[test]
    fn kinds_are_independent() {
        let mut gate = CooldownGate::new();
        let t0 = Instant::now();
        gate.try_acquire(RequestKind::Simulation, t0).unwrap();
        assert!(gate.try_acquire(RequestKind::DiseaseAnalysis, t0).is_ok());
        assert!(gate.try_acquire(RequestKind::Chat, t0).is_ok());
        assert!(gate.try_acquire(RequestKind::WeatherLookup, t0).is_ok());
    }

    #[test]
    fn denial_does_not_reset_the_window() {
        let mut gate = CooldownGate::new();
        let t0 = Instant::now();
        gate.try_acquire(RequestKind::WeatherLookup, t0).unwrap();
        // A denied attempt must not push the window forward.
        let _ = gate.try_acquire(RequestKind::WeatherLookup, t0 + Duration::from_secs(1));
        assert!(gate
            .try_acquire(RequestKind::WeatherLookup, t0 + Duration::from_secs(5))
            .is_ok());
    }

    #[test]
    fn configured_windows_match_the_actions() {
        let gate = CooldownGate::new();
        assert_eq!(gate.window(RequestKind::Simulation), Duration::from_secs(10));
        assert_eq!(
            gate.window(RequestKind::DiseaseAnalysis),
            Duration::from_secs(15)
        );
        assert_eq!(gate.window(RequestKind::Chat), Duration::from_secs(2));
        assert_eq!(
            gate.window(RequestKind::WeatherLookup),
            Duration::from_secs(5)
        );
        assert_eq!(gate.window(RequestKind::VarietyLookup), Duration::ZERO);
    }
}
