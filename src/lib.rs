pub mod engine;
pub mod errors;
pub mod flags;
pub mod install;
pub mod operator;
pub mod provider;
pub mod render;
pub mod settings;
pub mod status;
pub mod system;
