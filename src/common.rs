use std::time::Duration;

/// Stream sample rate (samples per second per channel).
pub type SampleRate = u32;

/// Number of channels in a stream.
pub type ChannelCount = u16;

/// Number of microseconds in one second.
pub(crate) const USECS_PER_S: u128 = 1_000_000;

/// Converts a number of MPEG frames into a playback time.
///
/// Returns `None` while the sample rate is unknown (zero).
#[inline]
pub(crate) fn frames_to_duration(
    frames: u64,
    samples_per_frame: u32,
    sample_rate: SampleRate,
) -> Option<Duration> {
    if sample_rate == 0 {
        return None;
    }
    let micros =
        frames as u128 * USECS_PER_S * samples_per_frame as u128 / sample_rate as u128;
    Some(Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX)))
}

/// Compile time check that an error type implements the traits callers rely on
/// (`Send`, `Sync`, `Clone` and `std::error::Error`).
macro_rules! assert_error_traits {
    ($to_test:path) => {
        const _: () = {
            const fn assert_error_traits<
                T: std::error::Error + Send + Sync + Clone + 'static,
            >() {
            }
            assert_error_traits::<$to_test>();
        };
    };
}
pub(crate) use assert_error_traits;
