pub mod callback;
pub mod error;
pub mod hooks;
pub mod provider;
pub mod session;

pub mod gateway;
