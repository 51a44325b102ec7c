//! Traits for reading sources.

use crate::monitoring::data::Reading;
use crate::monitoring::energy::RenewableGeneration;

/// Something that produces one reading per tick.
///
/// The simulated [`SensorSampler`](crate::monitoring::SensorSampler) is the
/// only implementation shipped here; tests and hardware bridges supply their
/// own. Implementations must not fail: a source that cannot produce a value
/// for a channel leaves the channel out of the reading.
pub trait ReadingSource: Send {
    /// Produce the next reading. The session renumbers `sequence`.
    fn next_reading(&mut self) -> Reading;

    /// Renewable generation observed during the same tick, if metered.
    fn renewables(&mut self) -> Option<RenewableGeneration> {
        None
    }
}

impl<S: ReadingSource + ?Sized> ReadingSource for Box<S> {
    fn next_reading(&mut self) -> Reading {
        (**self).next_reading()
    }

    fn renewables(&mut self) -> Option<RenewableGeneration> {
        (**self).renewables()
    }
}
