use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until `is_settled` returns true or the timeout expires. Sleeps in
/// small intervals to avoid CPU spinning.
pub fn wait_until_settled_with_timeout(
    mut is_settled: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !is_settled() {
        if Instant::now() >= deadline {
            return Err(HwError::SettleTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
