//! Request handlers, grouped by path domain.
//!
//! - [`auth`] -- `/auth/*`: login, magic links, TOTP, invitations
//! - [`users`] -- `/users/*`: profile and tenant user management
//! - [`tenants`] -- `/companies/*`: tenant and authorization metadata
//! - [`game`] -- `/game/*`: the playable surface
//! - [`admin`] -- `/admin/*`: master-admin operations

pub mod admin;
pub mod auth;
pub mod game;
pub mod tenants;
pub mod users;
