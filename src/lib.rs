/// Account record and its balance rules.
/// State is modified using events, which are created by handling commands
pub mod account;

/// Validated requests that accounts and the ledger execute, plus PIN policy.
pub mod command;

/// Data directory, file names, PIN policy and the bootstrap account.
pub mod config;

/// Per-account append-only transaction logs, read newest first.
pub mod journal;

/// The ledger coordinator. Owns the account table and serializes every
/// mutation, its persistence and its log entry under one lock.
pub mod ledger;

/// Account table and its CSV file codec.
pub mod table;

/// Command line front end. Kept in the library so integration tests can use it.
pub mod bin_utils;
