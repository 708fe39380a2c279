use embassy_time::Instant;

/// Monotonic millisecond clock. The value wraps around after ~49 days.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the intended wraparound.
        Instant::now().as_millis() as u32
    }
}

/// `true` if `now` is strictly later than `deadline`, across rollover.
/// Valid while the two are less than 2^31 ms apart.
pub fn is_after(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) > 0
}
