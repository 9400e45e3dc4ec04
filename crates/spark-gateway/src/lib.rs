pub mod connection;
pub mod presence;
pub mod registry;
pub mod typing;

pub use registry::Registry;
