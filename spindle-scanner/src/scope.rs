//! Link resolution and host scoping.
//!
//! Relative candidates are joined against the *root* of the page they were
//! found on (`scheme://host/` + candidate without leading slashes). This is
//! not RFC 3986 reference resolution: `../x` or `x` found on `/a/b` both land
//! on `/x`-style paths under the root.

use url::Url;

/// Resolves `candidate` against `base`.
///
/// A candidate that parses on its own is returned as parsed. Anything else is
/// joined onto `base`'s scheme and authority with its leading slashes
/// stripped. Both inputs failing to parse is reported as the parse error;
/// callers drop the candidate.
pub fn resolve(base: &str, candidate: &str) -> Result<Url, url::ParseError> {
    let base = Url::parse(base)?;

    if let Ok(absolute) = Url::parse(candidate) {
        return Ok(absolute);
    }

    let authority = host_authority(&base).ok_or(url::ParseError::EmptyHost)?;
    Url::parse(&format!(
        "{}://{}/{}",
        base.scheme(),
        authority,
        candidate.trim_start_matches('/')
    ))
}

/// `host[:port]` of a URL, with the port only present when it is not the
/// scheme's default.
pub fn host_authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Exact, case-sensitive comparison of the URL's authority with the allowed
/// host. No subdomain matching, no scheme constraint.
pub fn in_scope(allowed_host: &str, url: &Url) -> bool {
    host_authority(url).is_some_and(|authority| authority == allowed_host)
}
