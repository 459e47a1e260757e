//! Broadcast primitive and fault containment.
//!
//! # Fault flow
//!
//! 1. A subscriber of any kind fails -> its [`AsyncEvent`] reports to the
//!    [`ErrorFunnel`], which logs and dispatches a `ClientErrored` occurrence.
//! 2. A subscriber of `ClientErrored` fails -> the [`DoubleFaultGuard`] logs it
//!    and stops. Nothing is re-dispatched.

pub mod async_event;
pub mod fault;
pub mod handler;

pub use async_event::{AsyncEvent, InvokeOutcome};
pub use fault::{DoubleFaultGuard, ErrorFunnel, FaultSink, HandlerFault};
pub use handler::Handler;
