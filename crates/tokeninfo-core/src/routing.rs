//! Bearer extraction for the tokeninfo routing handler (spec §4.8). The
//! match-first-wins dispatch between the JWT validator and the opaque-token
//! proxy is implemented directly in `tokeninfo-api`'s handler, since the
//! proxy path's response shape (status/body/cache headers) doesn't fit a
//! `Result<TokenInfo, OAuthError>`-shaped sub-handler trait; this module
//! keeps only the extraction rule both paths share.

/// Extracts the bearer per spec §4.8: prefer `Authorization: Bearer <token>`
/// (case-insensitive scheme), else the `access_token` form field. Exactly
/// the first match wins — the caller decides which source to check first by
/// passing it as `authorization_header`/`form_access_token` in that order.
pub fn extract_bearer<'a>(
    authorization_header: Option<&'a str>,
    form_access_token: Option<&'a str>,
) -> Option<&'a str> {
    if let Some(header) = authorization_header {
        let mut parts = header.splitn(2, ' ');
        let scheme = parts.next().unwrap_or_default();
        let value = parts.next();
        if scheme.eq_ignore_ascii_case("bearer") {
            if let Some(value) = value {
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }
    form_access_token.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_header_wins_over_form_value() {
        let bearer = extract_bearer(Some("Bearer tok-1"), Some("tok-2"));
        assert_eq!(bearer, Some("tok-1"));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let bearer = extract_bearer(Some("bearer tok-1"), None);
        assert_eq!(bearer, Some("tok-1"));
    }

    #[test]
    fn falls_back_to_form_value_when_header_absent() {
        let bearer = extract_bearer(None, Some("tok-2"));
        assert_eq!(bearer, Some("tok-2"));
    }

    #[test]
    fn non_bearer_scheme_is_ignored() {
        let bearer = extract_bearer(Some("Basic abc123"), Some("tok-2"));
        assert_eq!(bearer, Some("tok-2"));
    }

    #[test]
    fn empty_bearer_value_is_rejected() {
        assert_eq!(extract_bearer(Some("Bearer "), None), None);
    }

    #[test]
    fn no_sources_present_yields_none() {
        assert_eq!(extract_bearer(None, None), None);
    }
}
