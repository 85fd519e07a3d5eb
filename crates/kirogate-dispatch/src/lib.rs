//! Dispatch: bind a translated request to a selected account, call the
//! upstream, and map failures back onto pool transitions and telemetry.

pub mod dispatcher;
pub mod headers;
pub mod summary;

pub use dispatcher::{DispatchOutcome, Dispatcher};
