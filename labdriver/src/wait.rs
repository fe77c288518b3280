//! Bounded polling of an instrument condition.

use std::{
    thread,
    time::{Duration, Instant},
};

use log::debug;

use crate::InstrumentError;

/// Poll `cond` every `interval` until it returns `true`.
///
/// With `max_wait` set, [`InstrumentError::Timeout`] is returned once the condition has not become
/// true within that time. Without it, this waits for as long as it takes. Errors of the condition
/// itself are returned immediately.
///
/// ```
/// use std::time::Duration;
/// use labdriver::wait::poll_until;
///
/// let mut calls = 0;
/// poll_until(Duration::ZERO, Some(Duration::from_secs(1)), || {
///     calls += 1;
///     Ok(calls == 3)
/// })
/// .unwrap();
/// assert_eq!(3, calls);
/// ```
pub fn poll_until<F>(
    interval: Duration,
    max_wait: Option<Duration>,
    mut cond: F,
) -> Result<(), InstrumentError>
where
    F: FnMut() -> Result<bool, InstrumentError>,
{
    let tic = Instant::now();
    loop {
        if cond()? {
            debug!("Condition met after {:?}", tic.elapsed());
            return Ok(());
        }
        if let Some(max_wait) = max_wait {
            if tic.elapsed() >= max_wait {
                return Err(InstrumentError::Timeout(max_wait));
            }
        }
        thread::sleep(interval);
    }
}
