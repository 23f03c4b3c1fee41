//! Event-to-observer routing.

mod router;

pub use router::JobEventRouter;
