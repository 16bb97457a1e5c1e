//! Body decoding strategy selection
//!
//! The method × content-type dispatch is an ordered table. Rules are evaluated
//! top to bottom and the first match wins; requests matching no rule get an
//! empty body.

use super::media::{self, APPLICATION_JSON, MULTIPART_FORM_DATA};
use http::Method;
use std::str::FromStr;

/// How the request body is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Decode the body as JSON; the result is final
    Json,
    /// Use the host's conventional form fields
    Form,
    /// Run the multipart parser; the result is final
    Multipart,
    /// Try JSON if the body looks like it, otherwise URL-decode the body
    Sniff,
    /// The method carries no body
    Empty,
}

/// What happens when a sniffed JSON body fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SniffFallback {
    /// URL-decode the same bytes and use that instead
    #[default]
    Form,
    /// Report the JSON decoding error
    Error,
}

impl FromStr for SniffFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" => Ok(Self::Form),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown sniff fallback '{}'", other)),
        }
    }
}

struct Rule {
    method: fn(&Method) -> bool,
    content_type: fn(Option<&str>) -> bool,
    strategy: Strategy,
}

const RULES: &[Rule] = &[
    Rule {
        method: is_post,
        content_type: is_json,
        strategy: Strategy::Json,
    },
    Rule {
        method: is_post,
        content_type: any,
        strategy: Strategy::Form,
    },
    Rule {
        method: is_put_patch_delete,
        content_type: is_multipart,
        strategy: Strategy::Multipart,
    },
    Rule {
        method: is_put_patch_delete,
        content_type: is_json,
        strategy: Strategy::Json,
    },
    Rule {
        method: is_put_patch_delete,
        content_type: any,
        strategy: Strategy::Sniff,
    },
];

/// Pick the decoding strategy for a method and Content-Type header
pub fn select_strategy(method: &Method, content_type: Option<&str>) -> Strategy {
    RULES
        .iter()
        .find(|rule| (rule.method)(method) && (rule.content_type)(content_type))
        .map(|rule| rule.strategy)
        .unwrap_or(Strategy::Empty)
}

fn is_post(method: &Method) -> bool {
    *method == Method::POST
}

fn is_put_patch_delete(method: &Method) -> bool {
    *method == Method::PUT || *method == Method::PATCH || *method == Method::DELETE
}

fn is_json(content_type: Option<&str>) -> bool {
    media::matches(content_type, APPLICATION_JSON)
}

fn is_multipart(content_type: Option<&str>) -> bool {
    media::matches(content_type, MULTIPART_FORM_DATA)
}

fn any(_: Option<&str>) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: Option<&str> = Some("application/json");
    const MULTIPART: Option<&str> = Some("multipart/form-data; boundary=x");
    const FORM: Option<&str> = Some("application/x-www-form-urlencoded");

    #[test]
    fn test_post_rules() {
        assert_eq!(select_strategy(&Method::POST, JSON), Strategy::Json);
        assert_eq!(select_strategy(&Method::POST, FORM), Strategy::Form);
        assert_eq!(select_strategy(&Method::POST, MULTIPART), Strategy::Form);
        assert_eq!(select_strategy(&Method::POST, None), Strategy::Form);
    }

    #[test]
    fn test_put_patch_delete_rules() {
        for method in [Method::PUT, Method::PATCH, Method::DELETE] {
            assert_eq!(select_strategy(&method, MULTIPART), Strategy::Multipart);
            assert_eq!(select_strategy(&method, JSON), Strategy::Json);
            assert_eq!(select_strategy(&method, FORM), Strategy::Sniff);
            assert_eq!(select_strategy(&method, None), Strategy::Sniff);
            assert_eq!(
                select_strategy(&method, Some("text/plain")),
                Strategy::Sniff
            );
        }
    }

    #[test]
    fn test_bodyless_methods() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE] {
            assert_eq!(select_strategy(&method, JSON), Strategy::Empty);
            assert_eq!(select_strategy(&method, None), Strategy::Empty);
        }
    }

    #[test]
    fn test_sniff_fallback_parsing() {
        assert_eq!("form".parse::<SniffFallback>(), Ok(SniffFallback::Form));
        assert_eq!(" ERROR ".parse::<SniffFallback>(), Ok(SniffFallback::Error));
        assert!("strict".parse::<SniffFallback>().is_err());
    }
}
