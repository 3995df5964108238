use url::Url;

use crate::SmoothResult;

pub(crate) fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("file://")
        || s.starts_with("ftp://")
}

/// Resolves a chunk url against the manifest url.
///
/// The query of the manifest url is kept unless the chunk url carries its own one:
///
/// merge_chunk_url(https://example.com/live.isml/Manifest?auth=secret, QualityLevels(100)/Fragments(video=0)) =>
///   https://example.com/live.isml/QualityLevels(100)/Fragments(video=0)?auth=secret
pub(crate) fn merge_chunk_url(base: &Url, chunk: &str) -> SmoothResult<Url> {
    if is_absolute_url(chunk) {
        return Ok(Url::parse(chunk)?);
    }

    let mut merged = base.join(chunk)?;
    if merged.query().is_none() {
        merged.set_query(base.query());
    }
    Ok(merged)
}
