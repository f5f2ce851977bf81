//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! either `&PgPool` or, for statements that must run inside a caller's
//! transaction, `&mut PgConnection`.

pub mod object_repo;
pub mod reserve_repo;
pub mod user_repo;
pub mod window_repo;

pub use object_repo::ObjectRepo;
pub use reserve_repo::ReserveRepo;
pub use user_repo::UserRepo;
pub use window_repo::WindowRepo;
