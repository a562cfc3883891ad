//! Router Module Index
//!
//! Splits the HTTP surface by how much of the authorization gate runs in front of the
//! handler. The split only decides whether a session is required; operation checks
//! always happen inside the handlers through `AuthUser::require`.

/// Routes open to anonymous clients: health, login, sign-up and catalogue reads.
pub mod public;

/// Routes behind the session middleware: profile, movies, comments and ratings writes.
pub mod authenticated;

/// User, role and operation administration. Also behind the session middleware.
pub mod admin;
