//! HTTP clients for the external services this gateway talks to.

pub mod github_oauth;
