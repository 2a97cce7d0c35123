//! Formatter capability
//!
//! A sink drives its formatter once per admitted record: `begin`, then
//! `pair` for every field that is not hidden, then `finish`, whose bytes are
//! written to the destination in one call.

use super::record::Field;

pub trait Formatter: Send {
    /// Start a new record, discarding any partial state
    fn begin(&mut self);

    fn pair(&mut self, field: &Field);

    /// Complete the record and hand out its encoded bytes
    fn finish(&mut self) -> Vec<u8>;

    fn name(&self) -> &str;
}

impl<T: Formatter + ?Sized> Formatter for Box<T> {
    fn begin(&mut self) {
        (**self).begin();
    }

    fn pair(&mut self, field: &Field) {
        (**self).pair(field);
    }

    fn finish(&mut self) -> Vec<u8> {
        (**self).finish()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
