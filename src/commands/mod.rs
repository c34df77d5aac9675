pub mod common;
pub mod info;
pub mod me;
pub mod socmat;
pub mod config;
