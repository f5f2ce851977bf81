//! Core domain of the reserve project lifecycle service: the status state
//! machine, the submission window gate, artifact reference tracking, bulk
//! coordination and status analytics.

pub mod analysis;
pub mod bulk;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod objects;
pub mod pagination;
pub mod reserve;
pub mod store;
pub mod types;
pub mod window;
