//! Bounded percentage arithmetic for directly-set progress fields.

/// A requested change to a progress percentage: a relative step from a +/-
/// button, or an absolute value from a direct edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressChange {
    Delta(i16),
    Absolute(i16),
}

/// Candidate value after applying the change, clamped into `0..=100`.
/// Clamping happens before any remote call, so the wire never carries an
/// out-of-range value.
pub fn next_percent(current: u8, change: ProgressChange) -> u8 {
    let candidate = match change {
        ProgressChange::Delta(delta) => i16::from(current) + delta,
        ProgressChange::Absolute(value) => value,
    };
    candidate.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_clamp_at_both_bounds() {
        assert_eq!(next_percent(98, ProgressChange::Delta(5)), 100);
        assert_eq!(next_percent(3, ProgressChange::Delta(-10)), 0);
        assert_eq!(next_percent(50, ProgressChange::Delta(5)), 55);
        assert_eq!(next_percent(50, ProgressChange::Delta(-5)), 45);
    }

    #[test]
    fn absolute_values_clamp_too() {
        assert_eq!(next_percent(10, ProgressChange::Absolute(120)), 100);
        assert_eq!(next_percent(10, ProgressChange::Absolute(-3)), 0);
        assert_eq!(next_percent(10, ProgressChange::Absolute(64)), 64);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(next_percent(100, ProgressChange::Delta(0)), 100);
        assert_eq!(next_percent(0, ProgressChange::Delta(0)), 0);
        assert_eq!(next_percent(0, ProgressChange::Absolute(100)), 100);
    }
}
