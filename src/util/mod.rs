pub mod lock;
pub mod paths;
