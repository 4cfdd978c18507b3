use super::*;
use std::fmt;

// Debug proxy implementation that calls the standalone debug function
impl<Q: InPlace> fmt::Debug for SharedRegion<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_shared_region(self, f)
    }
}
