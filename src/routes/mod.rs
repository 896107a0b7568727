/// Router Module Index
///
/// Routing split by access level. Authentication is applied per module via
/// Axum layers, so a protected endpoint cannot be exposed by accident.

/// Routes open to anonymous callers: reads of public data and sign-in.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;

/// Routes restricted to moderators. The role check runs inside each handler
/// through `policy::can_moderate`.
pub mod admin;
