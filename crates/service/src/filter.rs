//! Request matcher for server records
//!
//! `Matcher` is compiled once per call from a `ServersRequest` and then
//! evaluated against every record in the scan without further allocation.
//!
//! # Filter Logic
//!
//! - All filters are optional (None = match all)
//! - An empty pattern or an empty datacenter list counts as absent
//! - Multiple datacenters are OR'd (match any)
//! - The name pattern and the datacenter set are AND'd
//!
//! # Example
//!
//! ```
//! use authority_service::{Matcher, ServerRecord};
//! use authority_protocol::ServersRequest;
//!
//! let request = ServersRequest::new()
//!     .with_name_filter(r"server\d+")
//!     .with_datacenters(["ab"]);
//! let matcher = Matcher::compile(&request).unwrap();
//!
//! assert!(matcher.matches(&ServerRecord::new("server40", "ab")));
//! assert!(!matcher.matches(&ServerRecord::new("1server", "ab")));
//! ```

use std::collections::HashSet;

use regex::Regex;

use authority_protocol::ServersRequest;

use crate::error::{Result, StreamError};
use crate::source::ServerRecord;

/// Compiled predicate over a `ServerRecord`
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    /// Name pattern (None = match all names)
    name: Option<Regex>,
    /// Datacenters to match (None = match all datacenters)
    datacenters: Option<HashSet<String>>,
}

impl Matcher {
    /// Create an empty matcher (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the filters of a request
    ///
    /// Fails with `InvalidPattern` if the name filter does not compile. No
    /// I/O happens here, so a bad pattern never opens the dataset.
    pub fn compile(request: &ServersRequest) -> Result<Self> {
        let matcher = Self::new()
            .with_name_pattern(&request.name_filter_re)?
            .with_datacenters(request.datacenter_filter.iter().cloned());
        Ok(matcher)
    }

    /// Add name pattern filter
    ///
    /// The pattern is searched for anywhere in the name; use `^`/`$` to
    /// anchor it. An empty pattern leaves the name dimension unconstrained.
    pub fn with_name_pattern(mut self, pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            self.name = None;
            return Ok(self);
        }

        let regex = Regex::new(pattern).map_err(|source| StreamError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.name = Some(regex);
        Ok(self)
    }

    /// Add datacenter filter
    ///
    /// Duplicates collapse. An empty list leaves the datacenter dimension
    /// unconstrained.
    pub fn with_datacenters<I>(mut self, datacenters: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let set: HashSet<String> = datacenters.into_iter().collect();
        self.datacenters = if set.is_empty() { None } else { Some(set) };
        self
    }

    /// Check if matcher is empty (matches everything)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.datacenters.is_none()
    }

    /// Check if a record matches
    #[inline]
    pub fn matches(&self, record: &ServerRecord) -> bool {
        if let Some(ref name) = self.name
            && !name.is_match(&record.name)
        {
            return false;
        }

        if let Some(ref datacenters) = self.datacenters
            && !datacenters.contains(&record.datacenter)
        {
            return false;
        }

        true
    }

    /// Get the name pattern (for debugging/logging)
    pub fn name_pattern(&self) -> Option<&str> {
        self.name.as_ref().map(Regex::as_str)
    }

    /// Get the datacenter filter (for debugging/logging)
    pub fn datacenters(&self) -> Option<&HashSet<String>> {
        self.datacenters.as_ref()
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
