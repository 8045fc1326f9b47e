//! Resolution of declared paths onto the mounted target root.

mod sysroot;

pub use sysroot::{ResolveError, Sysroot};
