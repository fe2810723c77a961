//! Generation Backend Integration
//!
//! Abstracted access to the code-generation service through a common trait.
//!
//! # Available Backends
//!
//! - **HTTP**: JSON request/response endpoint (default)
//!
//! # Usage
//!
//! ```ignore
//! use forge_core::backend::{GenerationBackend, GenerationOptions, GenerationRequest, HttpBackend};
//!
//! let backend = HttpBackend::new("http://localhost:3000/api/generate", timeout)?;
//! let request = GenerationRequest::new("Build a todo app", GenerationOptions::default());
//! let response = backend.generate(&request).await?;
//! ```

mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::{
    BackendError, GenerationBackend, GenerationOptions, GenerationRequest, GenerationResponse,
    TransportError,
};
