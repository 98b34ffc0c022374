//! supakit: environment bootstrap and auth/profile API for a Supabase stack.
//!
//! - [`bootstrap`] generates secrets and writes every env file of the stack.
//! - [`api`] serves signup, login, OAuth login and profile endpoints
//!   (`server` feature).

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logger;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod identity;
#[cfg(feature = "server")]
pub mod model;
#[cfg(feature = "server")]
pub mod oauth;
