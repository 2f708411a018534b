/// Router Module Index
///
/// Organizes the application's routing into security-segregated modules so
/// access control is applied explicitly at the module level (via Axum
/// layers) rather than per handler alone.
///
/// The three modules map directly to the access tiers.

/// Routes accessible to all clients (anonymous, read-mostly, plus the auth
/// and newsletter-subscribe entry points).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware. Requires a
/// validated bearer credential.
pub mod authenticated;

/// Routes restricted to users with the admin role. Handlers re-check the
/// role after authentication (defense in depth).
pub mod admin;
