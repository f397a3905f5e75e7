//! # trolley-auth
//!
//! Bearer token provider for the Smart Trolley backend-for-frontend.
//!
//! The upstream e-commerce API authenticates the BFF itself (never the
//! trolley's shoppers) with a bearer token obtained through an OAuth 2.0
//! `client_credentials` exchange. This crate owns that single token.
//!
//! ## Modules
//!
//! - [`config`] - Token endpoint and client credential settings
//! - [`error`] - Token exchange errors
//! - [`provider`] - The [`TokenProvider`] with single-flight refresh

pub mod config;
pub mod error;
pub mod provider;

pub use config::TokenProviderConfig;
pub use error::AuthError;
pub use provider::{Token, TokenProvider, TokenStatus};
