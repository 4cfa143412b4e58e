//! Domain parsing and normalization.
//!
//! A `Domain` is the normalized host name every downstream record is keyed
//! by. Input may be a bare host (`Example.COM`), a URL
//! (`https://www.example.com/path`) or carry a trailing dot; all of these
//! normalize to `example.com`.
//!
//! Key functions:
//! - `Domain::parse()` - Validates and normalizes user input
//! - `normalize_domain()` - Same, returning the normalized string

use std::fmt;

use crate::error_handling::ValidationError;

/// Maximum length of a fully qualified host name.
const MAX_DOMAIN_LENGTH: usize = 253;
/// Maximum length of a single label.
const MAX_LABEL_LENGTH: usize = 63;

/// A validated, normalized host name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Domain(String);

impl Domain {
    /// Parses and normalizes a domain string.
    ///
    /// Normalization lowercases the host, converts internationalized names to
    /// punycode, drops scheme, port, path and a trailing dot, and strips a
    /// leading `www.` label.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for empty input, IP addresses, hosts longer
    /// than 253 characters, single-label hosts and labels that are empty, too
    /// long, or contain characters other than letters, digits and hyphens.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyDomain);
        }
        if trimmed.len() > MAX_DOMAIN_LENGTH * 4 {
            return Err(ValidationError::DomainTooLong(trimmed.len()));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let parsed = url::Url::parse(&with_scheme).map_err(|e| invalid(trimmed, e.to_string()))?;
        let host = match parsed.host() {
            Some(url::Host::Domain(host)) => host.to_string(),
            Some(url::Host::Ipv4(ip)) => return Err(ValidationError::IpAddress(ip.to_string())),
            Some(url::Host::Ipv6(ip)) => return Err(ValidationError::IpAddress(ip.to_string())),
            None => return Err(invalid(trimmed, "no host component".to_string())),
        };

        let host = host.trim_end_matches('.').to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

        if host.len() > MAX_DOMAIN_LENGTH {
            return Err(ValidationError::DomainTooLong(host.len()));
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return Err(invalid(trimmed, "missing top-level domain".to_string()));
        }
        for label in &labels {
            validate_label(label).map_err(|reason| invalid(trimmed, reason))?;
        }
        if labels
            .last()
            .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(invalid(trimmed, "numeric top-level domain".to_string()));
        }

        Ok(Domain(host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes a domain string, see [`Domain::parse`].
pub fn normalize_domain(input: &str) -> Result<String, ValidationError> {
    Domain::parse(input).map(|d| d.0)
}

fn validate_label(label: &str) -> Result<(), String> {
    if label.is_empty() {
        return Err("empty label".to_string());
    }
    if label.len() > MAX_LABEL_LENGTH {
        return Err(format!("label '{label}' exceeds {MAX_LABEL_LENGTH} characters"));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(format!("label '{label}' starts or ends with a hyphen"));
    }
    if let Some(c) = label
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
    {
        return Err(format!("label '{label}' contains invalid character '{c}'"));
    }
    Ok(())
}

fn invalid(input: &str, reason: String) -> ValidationError {
    ValidationError::InvalidDomain {
        input: input.to_string(),
        reason,
    }
}
