//! Fieldsync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Record`, `Mutation`, `CachedToken`, `SyncStatus`
//! - **Port definitions** - Traits for adapters: `ILocalStore`, `IRemoteStore`,
//!   `IIdentityProvider`, `IClock`, `IStatusListener`
//! - **Configuration** - Typed config loaded from YAML
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.
//! The sync engine (in `fieldsync-engine`) orchestrates domain entities
//! through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
