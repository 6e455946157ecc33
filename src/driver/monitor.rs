//! Polling-based driver monitoring
//!
//! Some clients are only interested in periodically checking where a
//! computation stands, without synchronizing with it, as is the case for
//! example when refreshing progress displays. A driver monitor serves them by
//! reading driver state updates from a triple buffer, which never blocks
//! either the driver or the monitor.

use crate::driver::DriverState;
use triple_buffer::Output;


/// Monitor of a driver's state
pub struct DriverMonitor {
    /// Driver states will be read through this triple buffer
    buf_output: Output<DriverState>,
}
//
impl DriverMonitor {
    /// Wrap the reading side of a triple buffer
    pub(crate) fn new(buf_output: Output<DriverState>) -> Self {
        DriverMonitor { buf_output }
    }

    /// Latest published state of the driver
    pub fn state(&mut self) -> DriverState {
        *self.buf_output.read()
    }
}
