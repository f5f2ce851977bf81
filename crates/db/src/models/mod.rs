//! Row types mirroring the database tables.

pub mod object;
pub mod reserve;
pub mod status;
pub mod user;
pub mod window;
