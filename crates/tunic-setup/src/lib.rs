pub mod alias;
pub mod artifacts;
pub mod certbot;
pub mod cmd;
pub mod config;
pub mod error;
pub mod escalate;
pub mod net;
pub mod os;
pub mod port;
pub mod prompt;
pub mod service;
pub mod templates;
pub mod workflow;

#[cfg(test)]
mod testing;
