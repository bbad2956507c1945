pub mod composite;
pub mod export;
pub mod surface;
