// Domain module tests.

use super::*;

#[test]
fn test_parse_bare_domain() {
    assert_eq!(Domain::parse("example.com").unwrap().as_str(), "example.com");
}

#[test]
fn test_parse_lowercases_and_trims() {
    assert_eq!(
        Domain::parse("  Example-Test.COM  ").unwrap().as_str(),
        "example-test.com"
    );
}

#[test]
fn test_parse_strips_scheme_path_and_port() {
    assert_eq!(
        Domain::parse("https://example.com:8080/path?q=1#frag")
            .unwrap()
            .as_str(),
        "example.com"
    );
    assert_eq!(
        Domain::parse("http://example.org/").unwrap().as_str(),
        "example.org"
    );
}

#[test]
fn test_parse_strips_www_and_trailing_dot() {
    assert_eq!(Domain::parse("www.example.com").unwrap().as_str(), "example.com");
    assert_eq!(Domain::parse("example.com.").unwrap().as_str(), "example.com");
}

#[test]
fn test_parse_keeps_other_subdomains() {
    assert_eq!(
        Domain::parse("blog.example.co.uk").unwrap().as_str(),
        "blog.example.co.uk"
    );
}

#[test]
fn test_parse_idn_to_punycode() {
    assert_eq!(
        Domain::parse("münchen.de").unwrap().as_str(),
        "xn--mnchen-3ya.de"
    );
}

#[test]
fn test_parse_empty_rejected() {
    assert_eq!(Domain::parse(""), Err(ValidationError::EmptyDomain));
    assert_eq!(Domain::parse("   "), Err(ValidationError::EmptyDomain));
}

#[test]
fn test_parse_ip_rejected() {
    assert!(matches!(
        Domain::parse("192.168.1.1"),
        Err(ValidationError::IpAddress(_))
    ));
    assert!(matches!(
        Domain::parse("http://[2001:db8::1]/"),
        Err(ValidationError::IpAddress(_))
    ));
}

#[test]
fn test_parse_single_label_rejected() {
    assert!(matches!(
        Domain::parse("localhost"),
        Err(ValidationError::InvalidDomain { .. })
    ));
}

#[test]
fn test_parse_invalid_characters_rejected() {
    assert!(Domain::parse("not a domain!!!").is_err());
    assert!(Domain::parse("under_score.com").is_err());
    assert!(Domain::parse("-leading.com").is_err());
}

#[test]
fn test_parse_too_long_rejected() {
    let label = "a".repeat(60);
    let long = format!("{label}.{label}.{label}.{label}.{label}.com");
    assert!(matches!(
        Domain::parse(&long),
        Err(ValidationError::DomainTooLong(_))
    ));
}

#[test]
fn test_parse_long_label_rejected() {
    let long_label = format!("{}.com", "a".repeat(64));
    assert!(matches!(
        Domain::parse(&long_label),
        Err(ValidationError::InvalidDomain { .. })
    ));
}

#[test]
fn test_normalize_domain_matches_parse() {
    assert_eq!(
        normalize_domain("WWW.Example.com").unwrap(),
        "example.com".to_string()
    );
}

#[test]
fn test_display() {
    let domain = Domain::parse("example.net").unwrap();
    assert_eq!(format!("{domain}"), "example.net");
}

// Property-based tests using proptest
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_normalization_is_idempotent(
        name in "d[a-z0-9-]{0,20}[a-z0-9]",
        tld in "(com|org|net|io)"
    ) {
        let input = format!("https://WWW.{}.{}/path", name.to_uppercase(), tld);
        let first = normalize_domain(&input);
        prop_assert!(first.is_ok());
        let first = first.unwrap();
        let second = normalize_domain(&first);
        prop_assert_eq!(Ok(first), second);
    }

    #[test]
    fn test_parse_never_panics(input in ".{0,300}") {
        let _ = Domain::parse(&input);
    }
}
