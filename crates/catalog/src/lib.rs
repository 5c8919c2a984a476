//! Upstream catalog access and the link-resolution fallback chain.
//!
//! A [`resolver::LinkResolver`] consults an ordered list of
//! [`resolver::LinkSource`]s — authoritative API, optional legacy client,
//! optional page scrape — and always produces a [`result::CheckResult`]:
//! absence of evidence is reported as a broken link, never as an error.

pub mod error;
pub mod legacy;
pub mod primary;
pub mod resolver;
pub mod result;
pub mod scrape;

pub use error::CatalogError;
pub use resolver::{LinkResolver, LinkSource, RegionRef, ResolverConfig};
pub use result::{CheckResult, LinkEvidence, ResolutionSource};
