//! Reference Resolver
//!
//! Turns whatever an editor pasted into the music field into a canonical
//! media id. Only the listed shapes are honored; an id buried in some other
//! URL layout resolves to `None`.

use crate::types::{CanonicalId, UrlShape};
use url::Url;

/// Length of a canonical media id
pub const CANONICAL_ID_LEN: usize = 11;

/// URL shapes in the order they are tried
pub const URL_SHAPES: [UrlShape; 4] = [
    UrlShape::Watch,
    UrlShape::Short,
    UrlShape::Embed,
    UrlShape::Shorts,
];

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

const SHORT_LINK_HOSTS: &[&str] = &["youtu.be", "www.youtu.be"];

const NOCOOKIE_HOSTS: &[&str] = &["youtube-nocookie.com", "www.youtube-nocookie.com"];

/// Check whether `token` has the shape of a canonical id
pub fn is_canonical_id(token: &str) -> bool {
    token.len() == CANONICAL_ID_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Resolve a media reference to its canonical id
pub fn resolve(input: &str) -> Option<CanonicalId> {
    resolve_with_shape(input).map(|(id, _)| id)
}

/// Resolve a media reference and report which shape matched
pub fn resolve_with_shape(input: &str) -> Option<(CanonicalId, UrlShape)> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if is_canonical_id(input) {
        return Some((CanonicalId::new(input), UrlShape::BareId));
    }

    let url = parse_reference_url(input)?;
    URL_SHAPES.iter().find_map(|shape| {
        extract(*shape, &url)
            .filter(|token| is_canonical_id(token))
            .map(|token| (CanonicalId::new(token), *shape))
    })
}

/// Parse an http(s) URL, accepting references pasted without a scheme
fn parse_reference_url(input: &str) -> Option<Url> {
    match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(_) => None,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{input}")).ok()
        }
        Err(_) => None,
    }
}

fn extract(shape: UrlShape, url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match shape {
        UrlShape::Watch => {
            if !YOUTUBE_HOSTS.contains(&host) || url.path().trim_end_matches('/') != "/watch" {
                return None;
            }
            url.query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
        }
        UrlShape::Short => {
            if !SHORT_LINK_HOSTS.contains(&host) {
                return None;
            }
            nth_segment(url, 0)
        }
        UrlShape::Embed => {
            if !YOUTUBE_HOSTS.contains(&host) && !NOCOOKIE_HOSTS.contains(&host) {
                return None;
            }
            prefixed_segment(url, "embed")
        }
        UrlShape::Shorts => {
            if !YOUTUBE_HOSTS.contains(&host) {
                return None;
            }
            prefixed_segment(url, "shorts")
        }
        UrlShape::BareId => None,
    }
}

fn nth_segment(url: &Url, n: usize) -> Option<String> {
    url.path_segments()?
        .nth(n)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn prefixed_segment(url: &Url, prefix: &str) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next()? != prefix {
        return None;
    }
    segments
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
