//! S3 object repository.
//!
//! Artifacts are fetched with `GetObject`, forwarding the client's
//! conditional headers. S3 reports an unmet `If-None-Match` or
//! `If-Modified-Since` as a 304 error response, which surfaces here as
//! [`ObjectError::NotModified`].

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
use aws_sdk_s3::primitives::{DateTime, DateTimeFormat};
use aws_sdk_s3::Client;
use preview_storage::{ConditionalHeaders, ObjectError, ObjectMetadata, ObjectRepository, StoredObject};

/// Object repository backed by an S3 client.
#[derive(Debug, Clone)]
pub struct S3Objects {
    client: Client,
}

impl S3Objects {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the standard AWS environment (credentials chain,
    /// `AWS_REGION`, profile files).
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(Client::new(&config))
    }
}

fn parse_http_date(value: Option<&str>) -> Option<DateTime> {
    value.and_then(|v| DateTime::from_str(v, DateTimeFormat::HttpDate).ok())
}

fn format_http_date(value: Option<&DateTime>) -> Option<String> {
    value.and_then(|v| v.fmt(DateTimeFormat::HttpDate).ok())
}

/// Classify a failed `GetObject` by error code, then by raw status.
fn classify(err: &SdkError<GetObjectError, HttpResponse>, key: &str) -> ObjectError {
    match err.code() {
        Some("AccessDenied") => return ObjectError::AccessDenied,
        Some("NotModified") => return ObjectError::NotModified,
        Some("NoSuchKey") => {
            return ObjectError::NotFound {
                key: key.to_string(),
            }
        }
        _ => {}
    }

    match err.raw_response().map(|r| r.status().as_u16()) {
        Some(304) => ObjectError::NotModified,
        Some(403) => ObjectError::AccessDenied,
        Some(404) => ObjectError::NotFound {
            key: key.to_string(),
        },
        _ => ObjectError::Backend(
            err.message()
                .map(str::to_owned)
                .unwrap_or_else(|| aws_sdk_s3::error::DisplayErrorContext(err).to_string()),
        ),
    }
}

fn metadata(output: &GetObjectOutput) -> ObjectMetadata {
    ObjectMetadata {
        last_modified: format_http_date(output.last_modified()),
        etag: output.e_tag().map(str::to_owned),
        cache_control: output.cache_control().map(str::to_owned),
        expires: output.expires_string().map(str::to_owned),
        content_disposition: output.content_disposition().map(str::to_owned),
        content_encoding: output.content_encoding().map(str::to_owned),
        content_language: output.content_language().map(str::to_owned),
        content_type: output.content_type().map(str::to_owned),
    }
}

#[async_trait]
impl ObjectRepository for S3Objects {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        conditions: &ConditionalHeaders,
    ) -> Result<StoredObject, ObjectError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_if_match(conditions.if_match.clone())
            .set_if_none_match(conditions.if_none_match.clone())
            .set_if_modified_since(parse_http_date(conditions.if_modified_since.as_deref()))
            .set_if_unmodified_since(parse_http_date(
                conditions.if_unmodified_since.as_deref(),
            ))
            .send()
            .await
            .map_err(|e| classify(&e, key))?;

        let metadata = metadata(&output);
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectError::Backend(e.to_string()))?
            .into_bytes()
            .to_vec();

        tracing::debug!(bucket, key, bytes = body.len(), "Fetched object");
        Ok(StoredObject { metadata, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_date_round_trip() {
        let parsed = parse_http_date(Some("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert!(parsed.is_some());
        assert_eq!(
            format_http_date(parsed.as_ref()).as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
    }

    #[test]
    fn test_unparseable_date_is_dropped() {
        assert!(parse_http_date(Some("yesterday")).is_none());
        assert!(parse_http_date(None).is_none());
    }

    #[test]
    fn test_metadata_from_output() {
        let output = GetObjectOutput::builder()
            .e_tag("\"abc\"")
            .content_type("text/html")
            .cache_control("max-age=60")
            .build();
        let meta = metadata(&output);

        assert_eq!(meta.etag.as_deref(), Some("\"abc\""));
        assert_eq!(meta.content_type.as_deref(), Some("text/html"));
        assert_eq!(meta.cache_control.as_deref(), Some("max-age=60"));
        assert!(meta.last_modified.is_none());
    }
}
