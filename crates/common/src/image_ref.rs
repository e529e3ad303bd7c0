//! Image reference normalization.
//!
//! Stored post image references accumulated several historical shapes: bare
//! filenames, relative media paths, percent-encoded (sometimes doubly
//! encoded) URLs, values with a local media prefix glued in front of an
//! already-absolute URL, and correct CDN URLs. Everything the read path and
//! the repair sweep need to turn those into one absolute `https` URL lives
//! here, as pure functions with no I/O.

use url::Url;

/// Path segment the CDN requires between the cloud name and the asset key.
const DELIVERY_SEGMENT: &str = "/image/upload";

/// Maximum percent-decode passes. Double encoding is the deepest observed
/// in stored data; the bound keeps adversarial input from looping.
const MAX_DECODE_PASSES: usize = 3;

/// Normalize a raw stored image reference into an absolute `https` URL.
///
/// Returns `None` when no URL can be derived. Never fails: malformed input
/// is "no match", not an error. Idempotent on its own successful output.
#[must_use]
pub fn normalize_image_ref(candidate: &str, cdn_host: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    // A relative storage path prepended onto an already-absolute URL leaves
    // "http" in the string twice; only the last occurrence is the real URL.
    let mut current = cut_at_last_http(candidate).to_string();

    // Undo up to two layers of percent-encoding.
    for _ in 0..MAX_DECODE_PASSES {
        match urlencoding::decode(&current) {
            Ok(decoded) => {
                if decoded == current {
                    break;
                }
                current = decoded.into_owned();
            }
            Err(_) => break,
        }
    }

    // Accidental local media prefix: "/media/https://..." or "media/...".
    let mut current = current
        .trim_start()
        .trim_start_matches('/')
        .to_string();
    if let Some(rest) = current.strip_prefix("media/") {
        current = rest.to_string();
    }

    // Repair a collapsed scheme ("https:/host/..." with a single slash).
    current = repair_single_slash_scheme(&current);

    if !has_http_scheme(&current) {
        // Still carrying a local prefix in front of the real URL; keep only
        // the substring from the last "http" onward.
        match current.rfind("http") {
            Some(idx) => current = current[idx..].to_string(),
            None => return None,
        }
        current = repair_single_slash_scheme(&current);
    }

    finalize_absolute(&current, cdn_host)
}

/// Resolve the best absolute URL from a structured image reference.
///
/// `name` is the raw stored value; `resolved` is the storage layer's
/// serving URL for it (if any); `base` is the request's base origin used
/// as a last resort for relative candidates.
#[must_use]
pub fn resolve_image_url(
    name: Option<&str>,
    resolved: Option<&str>,
    base: Option<&Url>,
    cdn_host: &str,
) -> Option<String> {
    let name = name.map(str::trim).filter(|s| !s.is_empty());
    let resolved = resolved.map(str::trim).filter(|s| !s.is_empty());

    // Already-absolute candidates win outright (https upgrade and CDN path
    // repair still apply so the output is canonical).
    for candidate in [name, resolved].into_iter().flatten() {
        if has_http_scheme(candidate) {
            if let Some(url) = finalize_absolute(candidate, cdn_host) {
                return Some(url);
            }
        }
    }

    // Otherwise try full normalization on each.
    for candidate in [name, resolved].into_iter().flatten() {
        if let Some(url) = normalize_image_ref(candidate, cdn_host) {
            return Some(url);
        }
    }

    // Best effort: a relative serving path joined to the request origin.
    if let Some(base) = base {
        for candidate in [resolved, name].into_iter().flatten() {
            if let Ok(joined) = base.join(candidate.trim_start_matches('/')) {
                return Some(joined.to_string());
            }
        }
    }

    None
}

/// Keep only the substring from the last `"http"` occurrence, when the
/// marker appears more than once.
fn cut_at_last_http(s: &str) -> &str {
    let first = s.find("http");
    let last = s.rfind("http");
    match (first, last) {
        (Some(f), Some(l)) if f != l => &s[l..],
        _ => s,
    }
}

/// `"https:/host"` (one slash) becomes `"https://host"`.
fn repair_single_slash_scheme(s: &str) -> String {
    for scheme in ["https", "http"] {
        let broken = format!("{scheme}:/");
        let correct = format!("{scheme}://");
        if s.starts_with(&broken) && !s.starts_with(&correct) {
            return format!("{}{}", correct, &s[broken.len()..]);
        }
    }
    s.to_string()
}

fn has_http_scheme(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Final acceptance and canonicalization of an absolute candidate:
/// https upgrade, CDN delivery-path repair, reassembly with the original
/// query and fragment intact.
fn finalize_absolute(candidate: &str, cdn_host: &str) -> Option<String> {
    if !has_http_scheme(candidate) {
        return None;
    }

    let mut url = Url::parse(candidate).ok()?;
    if url.scheme() == "http" {
        url.set_scheme("https").ok()?;
    }

    if url.host_str() == Some(cdn_host) && !url.path().contains(DELIVERY_SEGMENT) {
        // Stored as bare "cloud/asset-path"; the CDN routes assets through
        // an /image/upload segment right after the cloud name.
        let segments: Vec<String> = url
            .path_segments()
            .map(|parts| {
                parts
                    .filter(|p| !p.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if segments.len() >= 2 {
            let cloud = &segments[0];
            let rest = segments[1..].join("/");
            url.set_path(&format!("/{cloud}{DELIVERY_SEGMENT}/{rest}"));
        }
    }

    Some(url.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CDN: &str = "res.cloudinary.com";

    #[test]
    fn test_canonical_url_unchanged() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1/posts/pic.jpg";
        assert_eq!(normalize_image_ref(url, CDN), Some(url.to_string()));
    }

    #[test]
    fn test_http_upgraded_to_https() {
        assert_eq!(
            normalize_image_ref("http://res.cloudinary.com/demo/image/upload/x.jpg", CDN),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_delivery_path_repair() {
        assert_eq!(
            normalize_image_ref("https://res.cloudinary.com/demo/posts/abc.jpg", CDN),
            Some("https://res.cloudinary.com/demo/image/upload/posts/abc.jpg".to_string())
        );
    }

    #[test]
    fn test_delivery_path_repair_preserves_query() {
        assert_eq!(
            normalize_image_ref("https://res.cloudinary.com/demo/posts/abc.jpg?w=300#top", CDN),
            Some(
                "https://res.cloudinary.com/demo/image/upload/posts/abc.jpg?w=300#top".to_string()
            )
        );
    }

    #[test]
    fn test_no_path_repair_for_other_hosts() {
        assert_eq!(
            normalize_image_ref("https://example.com/demo/posts/abc.jpg", CDN),
            Some("https://example.com/demo/posts/abc.jpg".to_string())
        );
    }

    #[test]
    fn test_media_prefix_stripped() {
        assert_eq!(
            normalize_image_ref("/media/https://res.cloudinary.com/demo/image/upload/x.jpg", CDN),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_single_encoding_collapsed() {
        assert_eq!(
            normalize_image_ref(
                "https%3A%2F%2Fres.cloudinary.com%2Fdemo%2Fimage%2Fupload%2Fx.jpg",
                CDN
            ),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_double_encoding_collapsed() {
        assert_eq!(
            normalize_image_ref(
                "https%253A%252F%252Fres.cloudinary.com%252Fdemo%252Fimage%252Fupload%252Fx.jpg",
                CDN
            ),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_encoded_with_media_prefix() {
        assert_eq!(
            normalize_image_ref(
                "/media/https%3A//res.cloudinary.com/demo/image/upload/x.jpg",
                CDN
            ),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_duplicate_scheme_markers() {
        assert_eq!(
            normalize_image_ref(
                "http://localhost:8000/media/http://res.cloudinary.com/demo/image/upload/x.jpg",
                CDN
            ),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_local_prefix_without_slash() {
        assert_eq!(
            normalize_image_ref(
                "post_images/https://res.cloudinary.com/demo/image/upload/x.jpg",
                CDN
            ),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_single_slash_scheme_repaired() {
        assert_eq!(
            normalize_image_ref("https:/res.cloudinary.com/demo/image/upload/x.jpg", CDN),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_empty_is_unresolvable() {
        assert_eq!(normalize_image_ref("", CDN), None);
        assert_eq!(normalize_image_ref("   ", CDN), None);
    }

    #[test]
    fn test_bare_filename_is_unresolvable() {
        assert_eq!(normalize_image_ref("post_images/photo.jpg", CDN), None);
        assert_eq!(normalize_image_ref("photo.jpg", CDN), None);
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "http://res.cloudinary.com/demo/posts/abc.jpg",
            "/media/https://res.cloudinary.com/demo/image/upload/x.jpg",
            "https%253A%252F%252Fres.cloudinary.com%252Fdemo%252Fimage%252Fupload%252Fx.jpg",
            "https://example.com/a/b.png",
        ];
        for input in inputs {
            let once = normalize_image_ref(input, CDN).unwrap();
            assert_eq!(normalize_image_ref(&once, CDN), Some(once.clone()), "{input}");
        }
    }

    #[test]
    fn test_resolve_prefers_absolute_name() {
        assert_eq!(
            resolve_image_url(
                Some("https://res.cloudinary.com/demo/image/upload/x.jpg"),
                Some("/media/x.jpg"),
                None,
                CDN
            ),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_falls_back_to_resolved_url() {
        assert_eq!(
            resolve_image_url(
                Some("post_images/x.jpg"),
                Some("https%3A%2F%2Fres.cloudinary.com%2Fdemo%2Fimage%2Fupload%2Fx.jpg"),
                None,
                CDN
            ),
            Some("https://res.cloudinary.com/demo/image/upload/x.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_joins_relative_to_base() {
        let base = Url::parse("https://blog.example.com").unwrap();
        assert_eq!(
            resolve_image_url(
                Some("post_images/x.jpg"),
                Some("/media/post_images/x.jpg"),
                Some(&base),
                CDN
            ),
            Some("https://blog.example.com/media/post_images/x.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_nothing() {
        assert_eq!(resolve_image_url(None, None, None, CDN), None);
        assert_eq!(resolve_image_url(Some(""), Some(""), None, CDN), None);
    }
}
