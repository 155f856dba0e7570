//! Wraparound-aware time constants and the `ms()` interval builder.

/// The sentinel "infinity" value returned by [`crate::task::Task::remaining_ms`] for
/// an inactive task, and the maximum legal task interval.
///
/// Set to `u32::MAX`, the full range a 32-bit counter can represent, rather than a
/// narrower packed-bitfield value some drafts of the original scheduler used. The
/// wraparound arithmetic in [`crate::task::Task`] is only
/// correct as long as a task's interval stays below half this range
/// (`2^31 - 1` mS, ~24.8 days); intervals near `SCHED_MS_MAX` itself can alias with
/// elapsed time after a counter wrap.
pub const SCHED_MS_MAX: u32 = u32::MAX;

const MS_PER_SECOND: u32 = 1000;
const MS_PER_MINUTE: u32 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u32 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u32 = 24 * MS_PER_HOUR;

/// Builds a millisecond interval from days/hours/minutes/seconds/milliseconds,
/// wrapping `mod 2^32` rather than panicking on overflow — the `sched_ms()` helper
/// from the original library, minus the overflow footgun of its `uint8_t` day/hour
/// parameters.
pub const fn ms(days: u32, hours: u32, mins: u32, secs: u32, millis: u32) -> u32 {
    days.wrapping_mul(MS_PER_DAY)
        .wrapping_add(hours.wrapping_mul(MS_PER_HOUR))
        .wrapping_add(mins.wrapping_mul(MS_PER_MINUTE))
        .wrapping_add(secs.wrapping_mul(MS_PER_SECOND))
        .wrapping_add(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_intervals() {
        assert_eq!(ms(0, 0, 0, 1, 0), 1000);
        assert_eq!(ms(0, 0, 1, 0, 0), MS_PER_MINUTE);
        assert_eq!(ms(1, 0, 0, 0, 0), MS_PER_DAY);
        assert_eq!(ms(0, 0, 0, 0, 250), 250);
    }
}
