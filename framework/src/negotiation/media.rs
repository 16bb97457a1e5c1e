//! Media type matching for Content-Type headers

pub const APPLICATION_JSON: &str = "application/json";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Check whether a Content-Type header value matches a media type
///
/// Parameters such as `charset` or `boundary` are ignored and comparison is
/// case-insensitive. A structured syntax suffix also matches, so
/// `application/hal+json` matches `application/json`.
///
/// ```rust
/// use kit_negotiation::negotiation::media::matches;
///
/// assert!(matches(Some("application/hal+json; charset=utf-8"), "application/json"));
/// assert!(!matches(Some("text/plain"), "application/json"));
/// assert!(!matches(None, "application/json"));
/// ```
pub fn matches(header: Option<&str>, expected: &str) -> bool {
    let Some(header) = header else {
        return false;
    };
    let essence = header.split(';').next().unwrap_or_default().trim();

    let (Some((ty, subtype)), Some((expected_ty, expected_subtype))) =
        (essence.split_once('/'), expected.split_once('/'))
    else {
        return false;
    };

    if !ty.trim().eq_ignore_ascii_case(expected_ty) {
        return false;
    }

    let subtype = subtype.trim();
    if subtype.eq_ignore_ascii_case(expected_subtype) {
        return true;
    }

    subtype
        .rsplit_once('+')
        .is_some_and(|(_, suffix)| suffix.eq_ignore_ascii_case(expected_subtype))
}
