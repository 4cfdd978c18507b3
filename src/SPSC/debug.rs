use std::fmt;

use crate::Debug::StructDebug;
use crate::SPSC::Fixed::{FixedConsumer, FixedProducer, FixedQueue};
use crate::SPSC::Variable::{VariableConsumer, VariableProducer, VariableQueue};

// Debug proxy implementations that call the standalone debug functions

impl<T: Copy + Default, const N: usize> fmt::Debug for FixedQueue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_fixed_queue(self, f)
    }
}

impl<T: Copy + Default, const N: usize> fmt::Debug for FixedProducer<'_, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_fixed_producer(self, f)
    }
}

impl<T: Copy + Default, const N: usize> fmt::Debug for FixedConsumer<'_, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_fixed_consumer(self, f)
    }
}

impl<const CAP: usize> fmt::Debug for VariableQueue<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_variable_queue(self, f)
    }
}

impl<const CAP: usize> fmt::Debug for VariableProducer<'_, CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_variable_producer(self, f)
    }
}

impl<const CAP: usize> fmt::Debug for VariableConsumer<'_, CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_variable_consumer(self, f)
    }
}
