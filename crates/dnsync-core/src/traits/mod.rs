//! Core traits for the dnsync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: Read and mutate records at the authoritative provider
//! - [`DnsResolver`]: Query one independent resolver during verification

pub mod dns_provider;
pub mod dns_resolver;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
pub use dns_resolver::{DnsResolver, LookupFailure};
