//! Lock-free single-producer/single-consumer ring-buffer queues.
//!
//! - [`SPSC::Fixed::FixedQueue`] - `N` fixed-size slots of one element type.
//! - [`SPSC::Variable::VariableQueue`] - variable-length, block-aligned messages over a
//!   fixed byte capacity.
//!
//! Both queues follow the same non-blocking protocol: the producer reserves space with
//! `alloc` and publishes it with `push`, the consumer peeks with `front` and releases with
//! `pop`. "Full" and "empty" are reported as `None`, never by waiting.
//!
//! Queues can live on the stack, on the heap, or inside caller-provided memory such as a
//! shared-memory mapping (see [`Core::region::SharedRegion`]).

pub mod trace;

// Module naming follows project convention (SPSC = Single-Producer Single-Consumer)
#[allow(non_snake_case)]
pub mod SPSC;

#[allow(non_snake_case)]
pub mod Core;

#[allow(non_snake_case)]
pub mod Debug;

pub mod ffi;

pub use trace::init_tracing;
