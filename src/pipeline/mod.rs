pub mod auth;
pub mod compose;
pub mod context;
pub mod validate;

pub use auth::{Authenticate, RequireRole};
pub use compose::{Anonymous, Authenticated, Interceptor, Outcome, Pipeline};
pub use context::RequestContext;
pub use validate::{FieldType, Schema, Validate};
