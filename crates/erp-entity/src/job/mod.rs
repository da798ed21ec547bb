//! Background job domain entities.

pub mod kind;
pub mod model;
pub mod status;

pub use model::{Job, NewJob};
pub use status::JobStatus;
