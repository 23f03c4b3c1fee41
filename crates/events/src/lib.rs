//! Execution event bus for the tempero backend.
//!
//! The reconciler and device report handlers publish [`ExecutionEvent`]s
//! here after their database commits; the API layer's router task
//! subscribes and fans each event out to the WebSocket observers of the
//! affected job. Publishing is fire-and-forget: a failure to deliver never
//! rolls back the reconciliation that produced the event.

pub mod bus;

pub use bus::{EventBus, ExecutionEvent, EVENT_EXECUTION_COMPLETE, EVENT_EXECUTION_LOG_ENTRY};
