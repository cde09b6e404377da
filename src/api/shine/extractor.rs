//! Recovers the login RSA public key from the vendor's front-end bundles.
//!
//! The key is not served from any fixed endpoint. The web app installs it at
//! runtime via a `setPublicKey(…)` call buried in a lazily loaded, versioned
//! chunk, so we scrape the login page, follow the bundle references, and
//! cross-reference the accumulated JavaScript corpus.

use std::sync::LazyLock;

use regex::Regex;

use super::error::ExtractionError;

static HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<head[^>]*>(.*?)</head>").unwrap());

static MAIN_BUNDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:href|src)=["']([^"']*/index\.[^"']*\.js)["']"#).unwrap()
});

static LOGIN_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)path:\s*["']/login["'].*?component:\s*\(\)\s*=>.*?\[(.*?)\]"#).unwrap()
});

static ROUTE_ASSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"']*/index\.[^"']*\.js)["']"#).unwrap());

static SET_PUBLIC_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"setPublicKey\s*\(\s*([a-zA-Z0-9_$]+)\s*\)").unwrap());

/// Corpus-in, PEM-out. The scraping patterns are coupled to the vendor's
/// current front-end build, so the strategy is swappable without touching
/// the login flow.
pub trait PublicKeyExtractor: Send + Sync {
    fn extract(&self, corpus: &str) -> Result<String, ExtractionError>;
}

/// The production strategy: locate the `setPublicKey(…)` call and pick the
/// longest string ever assigned to its argument.
pub struct BundleKeyExtractor;

impl PublicKeyExtractor for BundleKeyExtractor {
    fn extract(&self, corpus: &str) -> Result<String, ExtractionError> {
        let variable = SET_PUBLIC_KEY
            .captures(corpus)
            .and_then(|captures| captures.get(1))
            .ok_or(ExtractionError::MissingSetPublicKeyCall)?
            .as_str();

        // The regex crate has no backreferences, hence one alternative per
        // quote style. The identifier is `[a-zA-Z0-9_$]+`, so the escaped
        // pattern always compiles.
        let assignment = Regex::new(&format!(
            r#"{variable}\s*=\s*(?:"([^"]*)"|'([^']*)'|`([^`]*)`)"#,
            variable = regex::escape(variable),
        ))
        .expect("the assignment pattern is valid for any escaped identifier");

        // Minified bundles shadow and re-assign the identifier. The real key
        // is by far the longest candidate, regardless of source order.
        assignment
            .captures_iter(corpus)
            .filter_map(|captures| {
                captures
                    .iter()
                    .skip(1)
                    .flatten()
                    .next()
                    .map(|capture| capture.as_str())
            })
            .max_by_key(|value| value.len())
            .map(wrap_pem)
            .ok_or_else(|| ExtractionError::MissingKeyAssignment { variable: variable.to_owned() })
    }
}

/// The head section of the login page, used to limit the bundle search scope.
pub(crate) fn head_section(html: &str) -> Option<&str> {
    HEAD.captures(html).and_then(|captures| captures.get(1)).map(|capture| capture.as_str())
}

/// Reference to the versioned main script bundle, e.g. `/assets/index.4f1c2a.js`.
pub(crate) fn main_bundle_path(head: &str) -> Option<&str> {
    MAIN_BUNDLE.captures(head).and_then(|captures| captures.get(1)).map(|capture| capture.as_str())
}

/// JS assets listed in the dependency array of the lazily loaded
/// `/login` route component.
pub(crate) fn login_route_assets(bundle: &str) -> Vec<&str> {
    LOGIN_ROUTE
        .captures(bundle)
        .and_then(|captures| captures.get(1))
        .map(|dependency_list| {
            ROUTE_ASSET
                .captures_iter(dependency_list.as_str())
                .filter_map(|captures| captures.get(1))
                .map(|capture| capture.as_str())
                .collect()
        })
        .unwrap_or_default()
}

/// The bundles carry the base64 SPKI body as one long line; fold it at
/// 64 columns so that strict RFC 7468 parsers accept the block.
fn wrap_pem(body: &str) -> String {
    let mut pem = String::with_capacity(body.len() + body.len() / 64 + 64);
    pem.push_str("-----BEGIN PUBLIC KEY-----\n");
    for chunk in body.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----\n");
    pem
}
