//! URL handling module for Site-Audit
//!
//! This module provides audit URL validation, DNS pre-flight checks, domain
//! extraction, internal/external link classification, and wildcard matching.

mod domain;
mod matcher;
mod resolve;
mod validate;

// Re-export main functions
pub use domain::{domain_key, domain_key_str, extract_domain, is_internal_url};
pub use matcher::matches_wildcard;
pub use resolve::{BlockingResolver, DnsCheck, DomainResolver, SystemResolver};
pub use validate::validate_audit_url;
