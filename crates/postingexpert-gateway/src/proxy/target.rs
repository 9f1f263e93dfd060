//! Target URL construction for the gateway proxy

use url::{form_urlencoded, Url};

/// Ensure the deployment stage segment is present on `base`.
///
/// The stage is appended unless the base already ends with `/<stage>` or
/// contains `/<stage>/`. Trailing slashes are trimmed first.
pub fn base_with_stage(base: &str, stage: &str) -> String {
    let base = base.trim_end_matches('/');
    let stage = stage.trim_matches('/');
    if stage.is_empty() {
        return base.to_string();
    }

    let has_stage =
        base.ends_with(&format!("/{}", stage)) || base.contains(&format!("/{}/", stage));
    if has_stage {
        base.to_string()
    } else {
        format!("{}/{}", base, stage)
    }
}

/// Build the upstream URL for a proxied request.
///
/// `segments` are the path segments after `/api`; `query` is the raw incoming
/// query string. Query parameters are copied with set semantics: a repeated
/// key keeps its last value at the position of its first occurrence.
pub fn build_target_url(
    base: &str,
    stage: &str,
    segments: &[&str],
    query: Option<&str>,
) -> Result<Url, url::ParseError> {
    let target = format!("{}/{}", base_with_stage(base, stage), segments.join("/"));
    let mut url = Url::parse(&target)?;

    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Ok(url);
    };

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for (key, value) in form_urlencoded::parse(query.as_bytes()).into_owned() {
        set_pair(&mut pairs, key, value);
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    Ok(url)
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter().position(|(k, _)| *k == key) {
        Some(first) => {
            pairs[first].1 = value;
            let mut index = 0;
            pairs.retain(|(k, _)| {
                let keep = index <= first || *k != key;
                index += 1;
                keep
            });
        }
        None => pairs.push((key, value)),
    }
}
