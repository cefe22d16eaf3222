//! Millisecond time source and wraparound-safe arithmetic.
//!
//! Timestamps are `u32` milliseconds since boot and wrap after ~49.7 days.
//! All comparisons go through the signed difference of two timestamps, which
//! stays correct across the wrap as long as the compared instants are less
//! than `i32::MAX` ms (~24.8 days) apart.

/// Monotonic millisecond counter since boot.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Signed distance from `now` to `deadline`; negative once the deadline has passed.
pub fn until(now: u32, deadline: u32) -> i32 {
    deadline.wrapping_sub(now) as i32
}

/// True once `now` has reached or passed `deadline` ("deadline minus now <= 0").
pub fn deadline_reached(now: u32, deadline: u32) -> bool {
    until(now, deadline) <= 0
}

/// Milliseconds left before `deadline`, clamped at zero.
pub fn remaining_ms(now: u32, deadline: u32) -> u32 {
    until(now, deadline).max(0) as u32
}

/// Milliseconds elapsed since `start`.
pub fn elapsed_ms(now: u32, start: u32) -> u32 {
    now.wrapping_sub(start)
}

/// Timestamp `offset_ms` after `now`.
pub fn after(now: u32, offset_ms: u32) -> u32 {
    now.wrapping_add(offset_ms)
}
