//! Authentication core and page authorization.
//!
//! # Modules
//!
//! - [`password`] -- bcrypt hashing and verification
//! - [`token`] -- signed session tokens and session rows
//! - [`magic`] -- magic links (URL token + 6-digit code)
//! - [`totp`] -- RFC 6238 one-time passwords and recovery codes
//! - [`invite`] -- invitation tokens
//! - [`limiter`] -- keyed sliding-window rate limiting (fail-open)
//! - [`pages`] -- page-access resolution and custom-role rules

pub mod invite;
pub mod limiter;
pub mod magic;
pub mod pages;
pub mod password;
pub mod token;
pub mod totp;

pub use invite::{Invitation, issue_invitation, verify_invitation};
pub use limiter::KeyedLimiter;
pub use magic::{MagicAnswer, MagicChallenge, issue_magic_link, verify_magic_link};
pub use pages::{may_access, resolve_pages, validate_custom_role_name};
pub use password::{hash_password, verify_password};
pub use token::{
    IssuedSession, SessionClaims, SessionLifetimes, is_mobile_agent, issue_session, verify_token,
};
pub use totp::{TotpEnrollment, code_at, consume_recovery_code, enroll, verify_code};
