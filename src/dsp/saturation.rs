//! # Feedback Saturation
//!
//! With feedback at 100%, every echo is written back into the delay line at
//! full level while fresh input keeps arriving on top of it. The stored
//! signal would grow without bound. A soft clipper on the write path caps
//! it, the way tape or a bucket-brigade chip compresses a hot signal.
//!
//! The curve is linear up to a knee and bends into a `tanh` shoulder above
//! it, approaching the ceiling and never exceeding it. In `f32` the shoulder
//! rounds to exactly `CEILING` for very large inputs:
//!
//! ```text
//!          |x| <= KNEE:  y = x
//!          |x| >  KNEE:  y = sign(x) * (KNEE + R * tanh((|x| - KNEE) / R))
//!                        where R = CEILING - KNEE
//! ```
//!
//! Both value and slope are continuous at the knee, so normal-level echoes
//! pass untouched and decay at exactly the feedback ratio. Only a runaway
//! loop ever reaches the shoulder.

/// Below this magnitude the clipper is transparent.
pub const KNEE: f32 = 1.0;

/// Asymptote of the clipper. The output never exceeds it in magnitude.
pub const CEILING: f32 = 2.0;

/// Soft-clip one sample.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    let magnitude = x.abs();
    if magnitude <= KNEE {
        return x;
    }

    let range = CEILING - KNEE;
    let shaped = KNEE + range * ((magnitude - KNEE) / range).tanh();
    shaped.copysign(x)
}
