use aws_sdk_s3::config::interceptors::{
    AfterDeserializationInterceptorContextRef, BeforeTransmitInterceptorContextRef,
};
use aws_sdk_s3::config::{ConfigBag, Interceptor, RuntimeComponents};
use aws_sdk_s3::error::BoxError;
use http::HeaderMap;

/// Traces store traffic for one bucket.
///
/// Responses are tagged with the store's request id so a failed part can be matched against the
/// provider's logs. R2 answers with `cf-ray`, AWS and MinIO with `x-amz-request-id`.
#[derive(Debug)]
pub(crate) struct LoggingInterceptor {
    bucket: String,
}

impl LoggingInterceptor {
    pub(crate) fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
        }
    }
}

pub(crate) fn request_id(headers: &HeaderMap) -> Option<&str> {
    ["x-amz-request-id", "cf-ray"]
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "LoggingInterceptor"
    }

    fn read_after_serialization(
        &self,
        context: &BeforeTransmitInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let request = context.request();
        let content_length = request
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok());
        tracing::trace!(
            bucket = %self.bucket,
            method = %request.method(),
            uri = %request.uri(),
            content_length,
            "store request"
        );
        Ok(())
    }

    fn read_after_deserialization(
        &self,
        context: &AfterDeserializationInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let response = context.response();
        let status = response.status();
        let request_id = request_id(response.headers());
        if status.is_success() {
            tracing::trace!(bucket = %self.bucket, %status, request_id, "store response");
        } else {
            tracing::debug!(bucket = %self.bucket, %status, request_id, "store rejected request");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use http::HeaderValue;

    use super::*;

    #[test]
    fn request_id_prefers_amz_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), None);

        headers.insert("cf-ray", HeaderValue::from_static("8a1b2c3d4e5f-SJC"));
        assert_eq!(request_id(&headers), Some("8a1b2c3d4e5f-SJC"));

        headers.insert("x-amz-request-id", HeaderValue::from_static("4442587FB7D0A2F9"));
        assert_eq!(request_id(&headers), Some("4442587FB7D0A2F9"));
    }
}
