//! Webhook module for feedy.
//!
//! Channel Talk invokes the app's functions (slash commands and autocomplete)
//! through `PUT /channeltalk/function`. This module maps those invocations onto
//! the [`UseCase`](crate::service::UseCase) operations.

pub mod dto;
pub mod function;
pub mod server;

pub use dto::{FunctionRequest, FunctionResponse};
pub use server::{create_router, WebServer};
