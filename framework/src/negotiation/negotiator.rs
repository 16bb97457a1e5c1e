use super::cleanup;
use super::error::DecodeError;
use super::json;
use super::media::{self, MULTIPART_FORM_DATA};
use super::multipart::{MulterParser, MultipartError, MultipartParser, ParsedMultipart};
use super::params::{route_params, ParameterContainer, Params};
use super::strategy::{select_strategy, SniffFallback, Strategy};
use crate::config::NegotiationConfig;
use crate::http::{parse_params, Request, RequestContext, RequestLifecycle};
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

impl From<MultipartError> for DecodeError {
    fn from(e: MultipartError) -> Self {
        DecodeError::multipart(e.to_string())
    }
}

/// Decodes request bodies into a [`ParameterContainer`]
///
/// One negotiator is shared by every connection. All per-request state, such
/// as where uploads were written, travels through the [`RequestLifecycle`]
/// passed to [`Negotiator::negotiate`].
///
/// # Example
///
/// ```rust,ignore
/// let negotiator = Negotiator::from_config(&NegotiationConfig::from_env());
/// let mut lifecycle = RequestLifecycle::new();
///
/// match negotiator.negotiate(&request, request.params(), &mut lifecycle).await {
///     Ok(Some(params)) => { /* hand params to the handler */ }
///     Ok(None) => { /* not an HTTP request */ }
///     Err(err) => return HttpResponse::from(err),
/// }
/// lifecycle.finish();
/// ```
#[derive(Clone)]
pub struct Negotiator {
    parser: Arc<dyn MultipartParser>,
    sniff_fallback: SniffFallback,
}

impl Negotiator {
    pub fn new(parser: impl MultipartParser + 'static) -> Self {
        Self {
            parser: Arc::new(parser),
            sniff_fallback: SniffFallback::default(),
        }
    }

    pub fn from_config(config: &NegotiationConfig) -> Self {
        Self::new(MulterParser::from_config(config)).sniff_fallback(config.sniff_fallback)
    }

    /// Set what happens when a sniffed JSON body fails to decode
    pub fn sniff_fallback(mut self, policy: SniffFallback) -> Self {
        self.sniff_fallback = policy;
        self
    }

    /// Negotiate the parameters for one request
    ///
    /// Returns `Ok(None)` when the context has no HTTP semantics. A decode
    /// failure is returned as-is and no container is produced.
    pub async fn negotiate<C>(
        &self,
        context: &C,
        route: &HashMap<String, String>,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<Option<ParameterContainer>, DecodeError>
    where
        C: RequestContext + ?Sized,
    {
        let Some(request) = context.http() else {
            return Ok(None);
        };

        let route = route_params(route);
        let query = request.query_params();

        let strategy = select_strategy(request.method(), request.content_type());
        tracing::debug!(
            method = %request.method(),
            content_type = request.content_type().unwrap_or_default(),
            ?strategy,
            "negotiating request body"
        );

        let body = self
            .decode_body(strategy, request, lifecycle)
            .await
            .inspect_err(|err| tracing::debug!(error = %err, ?strategy, "request body rejected"))?;

        Ok(Some(ParameterContainer::new(route, query, body)))
    }

    /// Decode the conventional form fields of a multipart POST
    ///
    /// This is the host side of POST handling: the fields returned are meant
    /// for [`Request::with_form`], and any files are recorded on the
    /// lifecycle with cleanup armed, as for multipart PUT. Returns `Ok(None)`
    /// for every other request.
    pub async fn decode_host_form(
        &self,
        request: &Request,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<Option<Params>, DecodeError> {
        let is_multipart_post = *request.method() == Method::POST
            && media::matches(request.content_type(), MULTIPART_FORM_DATA);
        if !is_multipart_post {
            return Ok(None);
        }

        self.decode_multipart(request, lifecycle).await.map(Some)
    }

    async fn decode_body(
        &self,
        strategy: Strategy,
        request: &Request,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<Params, DecodeError> {
        match strategy {
            Strategy::Json => json::decode_bytes(request.body()),
            Strategy::Form => Ok(request.form_params()),
            Strategy::Multipart => self.decode_multipart(request, lifecycle).await,
            Strategy::Sniff => self.sniff(request.body()),
            Strategy::Empty => Ok(Params::new()),
        }
    }

    async fn decode_multipart(
        &self,
        request: &Request,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<Params, DecodeError> {
        let content_type = request.content_type().unwrap_or_default();
        let parsed = self.parser.parse(content_type, request.body().clone()).await?;

        let context = parsed.cleanup_context();
        let ParsedMultipart { fields, files, .. } = parsed;

        if !files.is_empty() {
            lifecycle.record_uploads(files);
            cleanup::arm(context, lifecycle);
        }

        Ok(fields)
    }

    /// Decode a body without a recognised content type
    ///
    /// A body starting with `{` or `[` is tried as JSON. If that yields no
    /// parameters or fails, the bytes are URL-decoded instead, unless the
    /// fallback policy says to report the JSON error.
    fn sniff(&self, body: &[u8]) -> Result<Params, DecodeError> {
        let sniffed = match body.first() {
            Some(b'{') | Some(b'[') => Some(json::decode_bytes(body)),
            _ => None,
        };

        match sniffed {
            Some(Ok(params)) if !params.is_empty() => Ok(params),
            Some(Err(err)) if self.sniff_fallback == SniffFallback::Error => Err(err),
            _ => Ok(parse_params(body)),
        }
    }
}

impl std::fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("sniff_fallback", &self.sniff_fallback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::{DecodeErrorKind, JsonErrorKind};
    use async_trait::async_trait;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Parser double that records calls and returns a canned result
    struct StubParser {
        calls: Arc<AtomicUsize>,
        result: fn() -> Result<ParsedMultipart, MultipartError>,
    }

    #[async_trait]
    impl MultipartParser for StubParser {
        async fn parse(
            &self,
            _content_type: &str,
            _body: Bytes,
        ) -> Result<ParsedMultipart, MultipartError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn stub(result: fn() -> Result<ParsedMultipart, MultipartError>) -> (Negotiator, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let parser = StubParser {
            calls: calls.clone(),
            result,
        };
        (Negotiator::new(parser), calls)
    }

    fn negotiator() -> Negotiator {
        stub(|| Err(MultipartError::Malformed("unused".to_string()))).0
    }

    fn request(method: &str, content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = http::Request::builder()
            .method(method)
            .uri("/articles/42?page=2");
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        Request::new(builder.body(Bytes::from_static(body.as_bytes())).unwrap())
    }

    fn object(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    async fn run(negotiator: &Negotiator, request: &Request) -> Result<ParameterContainer, DecodeError> {
        let route = HashMap::from([("id".to_string(), "42".to_string())]);
        let mut lifecycle = RequestLifecycle::new();
        negotiator
            .negotiate(request, &route, &mut lifecycle)
            .await
            .map(|params| params.expect("HTTP request yields parameters"))
    }

    #[tokio::test]
    async fn test_non_http_context_is_a_no_op() {
        struct ConsoleCommand;
        impl RequestContext for ConsoleCommand {
            fn http(&self) -> Option<&Request> {
                None
            }
        }

        let mut lifecycle = RequestLifecycle::new();
        let result = negotiator()
            .negotiate(&ConsoleCommand, &HashMap::new(), &mut lifecycle)
            .await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_route_and_query_are_copied() {
        let params = run(&negotiator(), &request("GET", None, "")).await.unwrap();
        assert_eq!(params.route_params(), &object(json!({"id": "42"})));
        assert_eq!(params.query_params(), &object(json!({"page": "2"})));
    }

    #[tokio::test]
    async fn test_bodyless_methods_have_empty_body() {
        for method in ["GET", "HEAD", "OPTIONS"] {
            let req = request(method, Some("application/json"), r#"{"x":1}"#);
            let params = run(&negotiator(), &req).await.unwrap();
            assert!(params.body_params().is_empty(), "{method} should ignore the body");
        }
    }

    #[tokio::test]
    async fn test_post_json() {
        let req = request("POST", Some("application/json"), r#"{"x":1}"#);
        let params = run(&negotiator(), &req).await.unwrap();
        assert_eq!(params.body_params(), &object(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_post_json_error_is_terminal() {
        let req = request("POST", Some("application/json"), "x=1");
        let err = run(&negotiator(), &req).await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::MalformedJson(JsonErrorKind::Syntax)
        );
    }

    #[tokio::test]
    async fn test_post_form_uses_conventional_fields() {
        let req = request(
            "POST",
            Some("application/x-www-form-urlencoded"),
            "x=1&y=2",
        );
        let params = run(&negotiator(), &req).await.unwrap();
        assert_eq!(params.body_params(), &object(json!({"x": "1", "y": "2"})));

        let req = request("POST", None, r#"{"x":1}"#);
        let params = run(&negotiator(), &req).await.unwrap();
        assert!(params.body_params().is_empty());
    }

    #[tokio::test]
    async fn test_put_hal_json_is_flattened() {
        let req = request(
            "PATCH",
            Some("application/hal+json"),
            r#"{"a":1,"_embedded":{"b":2,"a":9}}"#,
        );
        let params = run(&negotiator(), &req).await.unwrap();
        assert_eq!(params.body_params(), &object(json!({"a": 9, "b": 2})));
    }

    #[tokio::test]
    async fn test_declared_json_error_does_not_fall_back() {
        let req = request("PUT", Some("application/json"), "x=1");
        let err = run(&negotiator(), &req).await.unwrap_err();
        assert_eq!(
            err.message(),
            "JSON decoding error: Syntax error, malformed JSON"
        );
    }

    #[tokio::test]
    async fn test_sniffed_json() {
        let req = request("DELETE", None, r#"[{"id":1}]"#);
        let params = run(&negotiator(), &req).await.unwrap();
        assert_eq!(params.body_params(), &object(json!({"0": {"id": 1}})));
    }

    #[tokio::test]
    async fn test_unsniffable_body_is_url_decoded() {
        let req = request("PUT", Some("text/plain"), "x=1&y=2");
        let params = run(&negotiator(), &req).await.unwrap();
        assert_eq!(params.body_params(), &object(json!({"x": "1", "y": "2"})));

        let req = request("PUT", None, "");
        let params = run(&negotiator(), &req).await.unwrap();
        assert!(params.body_params().is_empty());
    }

    #[tokio::test]
    async fn test_empty_sniffed_json_falls_back_to_form() {
        let req = request("PUT", None, "{}");
        let params = run(&negotiator(), &req).await.unwrap();
        assert_eq!(params.body_params(), &object(json!({"{}": ""})));
    }

    #[tokio::test]
    async fn test_failed_sniff_with_form_fallback() {
        let req = request("PUT", None, "{bad json");
        let params = run(&negotiator(), &req).await.unwrap();
        assert_eq!(params.body_params(), &object(json!({"{bad json": ""})));
    }

    #[tokio::test]
    async fn test_failed_sniff_with_error_fallback() {
        let negotiator = negotiator().sniff_fallback(SniffFallback::Error);
        let req = request("PUT", None, "{bad json");
        let err = run(&negotiator, &req).await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(
            err.message(),
            "JSON decoding error: Syntax error, malformed JSON"
        );

        // Bodies that don't look like JSON still URL-decode
        let req = request("PUT", None, "x=1");
        let params = run(&negotiator, &req).await.unwrap();
        assert_eq!(params.body_params(), &object(json!({"x": "1"})));
    }

    #[tokio::test]
    async fn test_multipart_failure_is_terminal() {
        let (negotiator, calls) =
            stub(|| Err(MultipartError::Malformed("incomplete stream".to_string())));
        let req = request("PUT", Some("multipart/form-data; boundary=x"), r#"{"x":1}"#);

        let err = run(&negotiator, &req).await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.status(), 400);
        assert_eq!(err.kind(), &DecodeErrorKind::MalformedMultipart);
        assert_eq!(err.message(), "Malformed multipart body: incomplete stream");
    }

    #[tokio::test]
    async fn test_multipart_without_files_arms_nothing() {
        let (negotiator, calls) = stub(|| {
            let mut parsed = ParsedMultipart::new("/tmp/uploads", "kit_upload_");
            parsed.fields.insert("title".to_string(), "draft".into());
            Ok(parsed)
        });
        let req = request("PUT", Some("multipart/form-data; boundary=x"), "");
        let mut lifecycle = RequestLifecycle::new();

        let params = negotiator
            .negotiate(&req, &HashMap::new(), &mut lifecycle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(params.body_params(), &object(json!({"title": "draft"})));
        assert_eq!(lifecycle.pending_hooks(), 0);
        assert!(lifecycle.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_multipart_with_files_arms_cleanup() {
        let (negotiator, _) = stub(|| {
            let mut parsed = ParsedMultipart::new("/tmp/uploads", "kit_upload_");
            parsed.files.push(crate::http::UploadedFile {
                field: "avatar".to_string(),
                original_name: "me.png".to_string(),
                temp_path: "/tmp/uploads/kit_upload_abc".into(),
                size: 10,
                content_type: Some("image/png".to_string()),
            });
            Ok(parsed)
        });
        let req = request("PATCH", Some("multipart/form-data; boundary=x"), "");
        let mut lifecycle = RequestLifecycle::new();

        negotiator
            .negotiate(&req, &HashMap::new(), &mut lifecycle)
            .await
            .unwrap();

        assert_eq!(lifecycle.pending_hooks(), 1);
        assert_eq!(lifecycle.uploads()[0].field, "avatar");
    }

    #[tokio::test]
    async fn test_multipart_post_fields_come_from_the_host_form() {
        let (negotiator, calls) = stub(|| {
            let mut parsed = ParsedMultipart::new("/tmp/uploads", "kit_upload_");
            parsed.fields.insert("title".to_string(), "draft".into());
            parsed.files.push(crate::http::UploadedFile {
                field: "cover".to_string(),
                original_name: "cover.jpg".to_string(),
                temp_path: "/tmp/uploads/kit_upload_xyz".into(),
                size: 3,
                content_type: None,
            });
            Ok(parsed)
        });
        let req = request("POST", Some("multipart/form-data; boundary=x"), "");
        let mut lifecycle = RequestLifecycle::new();

        let fields = negotiator
            .decode_host_form(&req, &mut lifecycle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lifecycle.pending_hooks(), 1);
        assert_eq!(lifecycle.uploads()[0].field, "cover");

        let req = req.with_form(fields);
        let params = negotiator
            .negotiate(&req, &HashMap::new(), &mut lifecycle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(params.body_params(), &object(json!({"title": "draft"})));
    }

    #[tokio::test]
    async fn test_host_form_ignores_other_requests() {
        let (negotiator, calls) = stub(|| Ok(ParsedMultipart::new("/tmp", "kit_upload_")));
        let mut lifecycle = RequestLifecycle::new();

        for req in [
            request("POST", Some("application/x-www-form-urlencoded"), "x=1"),
            request("PUT", Some("multipart/form-data; boundary=x"), ""),
            request("GET", None, ""),
        ] {
            let fields = negotiator.decode_host_form(&req, &mut lifecycle).await;
            assert_eq!(fields, Ok(None));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_multipart_post_is_rejected() {
        let (negotiator, _) = stub(|| Err(MultipartError::Boundary("missing".to_string())));
        let req = request("POST", Some("multipart/form-data"), "");
        let mut lifecycle = RequestLifecycle::new();

        let err = negotiator
            .decode_host_form(&req, &mut lifecycle)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(lifecycle.pending_hooks(), 0);
    }
}
