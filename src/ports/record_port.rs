//! Record persistence port trait.

use crate::domain::error::PulsetraderError;
use crate::domain::record::{Column, RecordRow};

/// Backing store for one report category's table.
pub trait RecordPort {
    /// Drop any previous run's table and start an empty, schema-typed one.
    fn reset(&mut self, columns: &[Column]) -> Result<(), PulsetraderError>;

    /// Write the full current table. Called after every recorded step.
    fn persist(
        &mut self,
        columns: &[Column],
        rows: &[RecordRow],
    ) -> Result<(), PulsetraderError>;
}
