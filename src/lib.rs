/// Wallet account state. Balance is modified using events, which are
/// created by handling commands.
pub mod account;

/// Typed wallet requests, lenient field coercion and the balance commands
/// executed by [`account`].
pub mod command;

/// Canonical form, digest, signing and verification of wallet messages.
pub mod signature;

/// Request authentication performed before any wallet operation.
pub mod gate;

/// Account lookup interface, plus "in memory" implementation.
///
/// NOTE: the processor only sees the trait, so a store backed by something
/// other than memory can be swapped in without touching the operations.
pub mod store;

/// Balance, credit, debit and refund operations.
pub mod processor;

pub mod config;

/// HTTP surface: routes the four operations through the gate and processor.
pub mod server;
