//! Certificate API Client Library
//!
//! This library provides the HTTP access layer for the vehicle certificate
//! management service: a shared client that injects bearer credentials from a
//! cookie-backed session store, runs pre-send/post-receive hooks around every
//! exchange, classifies failures into a closed error taxonomy, and supports
//! JSON and binary transfers with upload progress reporting.
//!
//! # Architecture
//!
//! - [`client`] - shared HTTP client, interceptor pipeline, error taxonomy
//! - [`session`] - credential storage (cookie jar, file, in-memory)
//! - [`config`] - base address, timeouts, redirect policy
//! - [`account`] - typed auth/user operations
//! - [`certificates`] - typed certificate operations

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod account;
pub mod certificates;
pub mod client;
pub mod config;
pub mod session;

// Re-export commonly used types
pub use account::{AccountService, AuthResponse, LoginRequest, ProfileUpdate, Role, SignupRequest};
pub use certificates::{Certificate, CertificateRequest, CertificateService};
pub use client::{
    ApiClient, ApiError, BinaryPayload, ClientBuildError, LoggingNavigator, Navigator,
    ProgressCallback, UploadFile,
};
pub use config::ClientConfig;
pub use session::{
    CookieSessionStore, FileSessionStore, MemorySessionStore, MirroredSessionStore, SessionStore,
};
