//! Base Domain derivation (spec §3: "computed by a public-suffix lookup;
//! the dispatcher treats this as an opaque pure function").

/// Returns the registrable (base) domain for `domain` using the public
/// suffix list. Falls back to `domain` itself if it cannot be parsed (e.g.
/// a bare IP literal or an already-minimal name).
pub fn base_domain(domain: &str) -> String {
    let list = psl::List::default();
    match psl::Psl::domain(&list, domain.as_bytes()) {
        Some(found) => String::from_utf8_lossy(found.as_bytes()).into_owned(),
        None => domain.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_subdomains() {
        assert_eq!(base_domain("www.example.com"), "example.com");
        assert_eq!(base_domain("a.b.example.com"), "example.com");
    }

    #[test]
    fn handles_already_base_domain() {
        assert_eq!(base_domain("example.com"), "example.com");
    }

    #[test]
    fn falls_back_on_unparseable_input() {
        assert_eq!(base_domain("localhost"), "localhost");
    }
}
