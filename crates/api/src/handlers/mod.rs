pub mod objects;
pub mod reserve;
pub mod window;
