//! Core logic for the CMS auth gateway: building the GitHub authorize
//! redirect, exchanging authorization codes for tokens, and producing the
//! popup page that hands the result back to the admin window.

pub mod authorization;
pub mod error;
pub mod handshake;

pub mod gateway;
