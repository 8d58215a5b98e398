/// Router Module Index
///
/// Routes are split by who may call them. All three routers are merged under `/api`
/// by `create_router`.

/// Anonymous access: catalog browsing, media by path, login and registration.
pub mod public;

/// Wrapped in the auth middleware; any signed-in user.
pub mod authenticated;

/// Catalog mutations. Every handler takes `AuthUser` and calls `require_staff`.
pub mod admin;
