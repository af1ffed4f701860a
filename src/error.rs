//! Codec error types
//!
//! [`CodecError`] lives in [`crate::common`] next to the shared stats types;
//! this module is the stable import path. Callers that only need to branch on
//! the broad failure class should match on [`ErrorKind`] via
//! [`CodecError::kind`].

pub use crate::common::{CodecError, ErrorKind, Result};
