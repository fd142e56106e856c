//! # MintFiat client
//!
//! Client library for the MintFiat trading platform backend. It covers the
//! account/session surface of the API and the step-up verification flows that
//! gate money-movement actions:
//!
//! - [`gateway`] — HTTP calls against the backend (cookie-based session auth).
//! - [`session`] — cached view of the authenticated identity and balances,
//!   with a single writer path (`login`, `logout`, `check_auth`, `refresh`).
//! - [`stepup`] — the staged-action flow: a sensitive action (fiat transfer,
//!   password change, registration) is held locally while the backend emails a
//!   one-time code; only a validated code finalizes the action server-side.
//! - [`policy`] — local validation applied before any network call.
//!
//! Balances are always a read-through cache of server truth: they are only
//! mutated by gateway responses and re-fetched after any mutating action.

pub mod cli;
pub mod gateway;
pub mod policy;
pub mod session;
pub mod stepup;
