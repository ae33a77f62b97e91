//! kubedock backend library
//!
//! Runs Docker-style containers as Kubernetes Deployments: builds the
//! cluster objects for a container spec, creates them, and resolves the
//! container state by polling its pods.

pub mod config;
pub mod error;
pub mod k8s;
pub mod models;

pub use error::{BackendError, ErrorKind, Result};
