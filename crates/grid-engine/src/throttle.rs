//! Throttle Gate
//!
//! Time-based admission for outgoing catalog requests. A request equal to
//! the last approved one waits longer than a novel one.

/// Minimum gap after the last approval before a different request may go out
pub const NOVEL_REQUEST_WINDOW_MS: u64 = 2000;

/// Minimum gap before the same request may be sent again
pub const REPEAT_REQUEST_WINDOW_MS: u64 = 4000;

#[derive(Debug, Clone)]
pub struct ThrottleGate {
    novel_window_ms: u64,
    repeat_window_ms: u64,
    last_approved_ms: Option<u64>,
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::new(NOVEL_REQUEST_WINDOW_MS, REPEAT_REQUEST_WINDOW_MS)
    }
}

impl ThrottleGate {
    pub fn new(novel_window_ms: u64, repeat_window_ms: u64) -> Self {
        Self {
            novel_window_ms,
            repeat_window_ms,
            last_approved_ms: None,
        }
    }

    /// Decide whether a request may be dispatched at `now_ms`.
    /// Approval moves the baseline to `now_ms`; rejection leaves it alone.
    pub fn admit(&mut self, now_ms: u64, is_repeat_of_last_approved: bool) -> bool {
        let Some(last) = self.last_approved_ms else {
            self.last_approved_ms = Some(now_ms);
            return true;
        };

        let window = if is_repeat_of_last_approved {
            self.repeat_window_ms
        } else {
            self.novel_window_ms
        };

        if now_ms.saturating_sub(last) >= window {
            self.last_approved_ms = Some(now_ms);
            true
        } else {
            false
        }
    }

    /// Record a dispatch that bypassed admission
    pub fn record(&mut self, now_ms: u64) {
        self.last_approved_ms = Some(now_ms);
    }

    /// Time until any request, repeat or not, would be admitted
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        let window = self.novel_window_ms.max(self.repeat_window_ms);
        let elapsed = now_ms.saturating_sub(self.last_approved_ms?);
        (elapsed < window).then(|| window - elapsed)
    }

    pub fn last_approved_ms(&self) -> Option<u64> {
        self.last_approved_ms
    }

    pub fn reset(&mut self) {
        self.last_approved_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_always_admitted() {
        let mut gate = ThrottleGate::default();
        assert!(gate.admit(10, true));
        assert_eq!(gate.last_approved_ms(), Some(10));
    }

    #[test]
    fn test_novel_window() {
        let mut gate = ThrottleGate::default();
        gate.record(1_000);
        assert!(!gate.admit(2_999, false));
        assert!(gate.admit(3_000, false));
        assert_eq!(gate.last_approved_ms(), Some(3_000));
    }

    #[test]
    fn test_repeat_window_is_longer() {
        let mut gate = ThrottleGate::default();
        gate.record(0);
        assert!(!gate.admit(2_500, true));
        assert!(!gate.admit(3_999, true));
        // Rejections do not move the baseline
        assert!(gate.admit(4_000, true));
    }

    #[test]
    fn test_remaining_covers_repeat_window() {
        let mut gate = ThrottleGate::default();
        assert_eq!(gate.remaining_ms(0), None);
        gate.record(1_000);
        assert_eq!(gate.remaining_ms(1_500), Some(3_500));
        // Past the novel window a repeat still waits
        assert_eq!(gate.remaining_ms(3_500), Some(1_500));
        assert!(gate.admit(3_500 + 1_500, true));
        assert_eq!(gate.remaining_ms(9_000), None);
    }

    #[test]
    fn test_custom_windows_and_reset() {
        let mut gate = ThrottleGate::new(100, 300);
        gate.record(0);
        assert!(gate.admit(100, false));
        assert!(!gate.admit(350, true));
        gate.reset();
        assert!(gate.admit(351, true));
    }
}
