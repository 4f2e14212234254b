//! Domain name splitting
//!
//! A managed name such as `home.example.com` is addressed at the provider as
//! a record label (`home`) inside a zone (`example.com`). The zone is the last
//! two labels of the name, or the last three when the name ends in a
//! country-code suffix with a generic second level (`example.co.uk`,
//! `example.com.au`). Whatever precedes the zone is the record label and must
//! not be empty.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Second-level labels that registries use under two-letter country codes
const GENERIC_SECOND_LEVELS: &[&str] = &[
    "ac", "co", "com", "edu", "gov", "ltd", "me", "net", "nhs", "org", "plc", "sch",
];

/// A fully qualified domain name split into record label and zone
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainSpec {
    fqdn: String,
    label_len: usize,
}

impl DomainSpec {
    /// Parse a fully qualified name
    ///
    /// Fails with [`Error::InvalidDomainFormat`] when the name has fewer than
    /// three labels, contains an empty label, or consists of a zone only.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        let labels: Vec<&str> = name.split('.').collect();

        if labels.len() < 3 || labels.iter().any(|label| label.is_empty()) {
            return Err(Error::invalid_domain(name));
        }

        let zone_labels = zone_label_count(&labels);
        if zone_labels >= labels.len() {
            return Err(Error::invalid_domain(name));
        }

        let label_len = labels[..labels.len() - zone_labels]
            .iter()
            .map(|label| label.len() + 1)
            .sum::<usize>()
            - 1;

        Ok(Self {
            fqdn: name.to_string(),
            label_len,
        })
    }

    /// The full name as configured (also the provider's display name)
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// The record label, e.g. `sub` for `sub.example.com`
    pub fn record_label(&self) -> &str {
        &self.fqdn[..self.label_len]
    }

    /// The zone, e.g. `example.com` for `sub.example.com`
    pub fn zone(&self) -> &str {
        &self.fqdn[self.label_len + 1..]
    }
}

fn zone_label_count(labels: &[&str]) -> usize {
    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];

    if tld.len() == 2 && GENERIC_SECOND_LEVELS.contains(&second.to_ascii_lowercase().as_str()) {
        3
    } else {
        2
    }
}

impl FromStr for DomainSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DomainSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqdn)
    }
}

/// Parse a comma separated domain list, keeping the configured order
///
/// Blank entries are skipped; any invalid entry fails the whole list.
pub fn parse_domain_list(list: &str) -> Result<Vec<DomainSpec>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(DomainSpec::parse)
        .collect()
}
