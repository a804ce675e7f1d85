//! # Entryway
//!
//! Client-side flow controllers for a hosted identity provider.
//!
//! The provider owns credential storage, session issuance and the email
//! verification channel. This crate owns the part in front of it: local input
//! validation, the one-shot sign-in submission state machine, and the
//! two-phase sign-up state machine (credential submission, then one-time code
//! verification). Both controllers talk to the provider through the
//! [`provider::IdentityProvider`] trait so tests can inject a fake, and hand
//! off to a [`flow::Navigator`] exactly once after the provider activates a
//! session.
//!
//! The [`db`] module builds the process-wide `PostgreSQL` pool from one
//! required connection string; the rest of the application queries through it.

pub mod cli;
pub mod db;
pub mod flow;
pub mod provider;
