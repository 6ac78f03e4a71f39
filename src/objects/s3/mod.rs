use async_trait::async_trait;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use http::Uri;
use hyper::body::Body;
use serde::Deserialize;

pub(crate) mod logging;
use super::errors::{Error, Result};
use super::s3::logging::LoggingInterceptor;
use super::{MultipartUpload, ObjectStore, ObjectSummary, Part};

/// Connection parameters for an S3-compatible store (AWS S3, Cloudflare R2, MinIO, ...).
#[derive(Clone, Deserialize)]
pub struct S3Config {
    secret_key: String,
    access_key: String,
    hostname: String,
    bucket_name: String,
    #[serde(default = "default_region")]
    region: String,
}

// R2 accepts "auto" and ignores the region otherwise.
fn default_region() -> String {
    String::from("auto")
}

impl S3Config {
    /// Store endpoint. A bare `hostname` such as `<account>.r2.cloudflarestorage.com` is reached
    /// over https; a full URL such as `http://127.0.0.1:9000` is used as given.
    fn endpoint(&self) -> Result<Uri> {
        let invalid = |reason: String| Error::InvalidEndpoint {
            hostname: self.hostname.clone(),
            reason,
        };
        if self.hostname.contains("://") {
            let uri: Uri = self.hostname.parse().map_err(|e| invalid(format!("{e}")))?;
            if uri.authority().is_none() {
                return Err(invalid(String::from("missing host")));
            }
            return Ok(uri);
        }
        Uri::builder()
            .scheme("https")
            .authority(self.hostname.as_str())
            .path_and_query("/")
            .build()
            .map_err(|e| invalid(format!("{e}")))
    }

    pub async fn new_objects(&self) -> Result<S3> {
        let endpoint = self.endpoint()?;
        let credentials = SharedCredentialsProvider::new(Credentials::new(
            self.access_key.clone(),
            self.secret_key.clone(),
            None,
            None,
            "multipart-uploads",
        ));

        let sdk_config = aws_config::load_from_env().await;
        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(endpoint.to_string())
            // R2 and MinIO do not serve virtual-hosted bucket names on custom endpoints
            .force_path_style(true)
            .interceptor(LoggingInterceptor::new(&self.bucket_name))
            .build();

        tracing::info!(
            %endpoint,
            bucket = %self.bucket_name,
            region = %self.region,
            "using S3 store"
        );
        Ok(S3 {
            bucket_name: self.bucket_name.clone(),
            client: Client::from_conf(config),
        })
    }
}

#[derive(Clone)]
pub struct S3 {
    bucket_name: String,
    client: Client,
}

#[async_trait]
impl ObjectStore for S3 {
    async fn create_upload(&self, key: &str) -> Result<MultipartUpload> {
        let create_multipart_upload_output = self
            .client
            .create_multipart_upload()
            .key(key)
            .bucket(&self.bucket_name)
            .send()
            .await?;

        let upload_id = create_multipart_upload_output
            .upload_id
            .ok_or(Error::FailedToInitiateUpload("missing upload id"))?;

        Ok(MultipartUpload {
            key: create_multipart_upload_output
                .key
                .unwrap_or_else(|| key.to_string()),
            upload_id,
        })
    }

    async fn put_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        content_length: Option<u64>,
        body: Body,
    ) -> Result<Part> {
        let upload_part_output = self
            .client
            .upload_part()
            .upload_id(upload_id)
            .part_number(part_number)
            .key(key)
            .body(body.into())
            .set_content_length(content_length.map(|l| l as i64))
            .bucket(&self.bucket_name)
            .send()
            .await?;

        let e_tag = upload_part_output
            .e_tag
            .ok_or(Error::MissingETag(part_number))?;

        Ok(Part { part_number, e_tag })
    }

    async fn complete_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<Part>,
    ) -> Result<String> {
        let mut mpu = CompletedMultipartUpload::builder();
        for part in parts {
            mpu = mpu.parts(
                CompletedPart::builder()
                    .e_tag(part.e_tag)
                    .part_number(part.part_number)
                    .build(),
            );
        }
        let complete_multipart_upload_output = self
            .client
            .complete_multipart_upload()
            .multipart_upload(mpu.build())
            .upload_id(upload_id)
            .key(key)
            .bucket(&self.bucket_name)
            .send()
            .await?;

        Ok(complete_multipart_upload_output
            .key
            .unwrap_or_else(|| key.to_string()))
    }

    async fn abort_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        let _abort_multipart_upload_output = self
            .client
            .abort_multipart_upload()
            .upload_id(upload_id)
            .key(key)
            .bucket(&self.bucket_name)
            .send()
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ObjectSummary>> {
        let mut summaries = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let list_objects_output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket_name)
                .set_continuation_token(continuation_token.take())
                .send()
                .await?;

            for object in list_objects_output.contents.unwrap_or_default() {
                let key = match object.key {
                    Some(k) => k,
                    None => continue,
                };
                let uploaded = object
                    .last_modified
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
                    .unwrap_or_default();
                summaries.push(ObjectSummary {
                    key,
                    size: object.size.max(0) as u64,
                    uploaded,
                });
            }

            match list_objects_output.next_continuation_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    fn config(hostname: &str) -> S3Config {
        S3Config {
            secret_key: String::from("secret"),
            access_key: String::from("access"),
            hostname: hostname.to_string(),
            bucket_name: String::from("uploads"),
            region: default_region(),
        }
    }

    #[rstest]
    #[case::r2("acct.r2.cloudflarestorage.com", "https", "acct.r2.cloudflarestorage.com")]
    #[case::explicit_https("https://s3.example.com", "https", "s3.example.com")]
    #[case::local_minio("http://127.0.0.1:9000", "http", "127.0.0.1:9000")]
    fn endpoint(#[case] hostname: &str, #[case] scheme: &str, #[case] authority: &str) {
        let uri = config(hostname).endpoint().unwrap();
        assert_eq!(uri.scheme_str(), Some(scheme));
        assert_eq!(uri.authority().map(|a| a.as_str()), Some(authority));
    }

    #[rstest]
    #[case::space_in_host("not a host")]
    #[case::space_in_url("http://bad host:9000")]
    fn invalid_endpoint(#[case] hostname: &str) {
        let err = config(hostname).endpoint().unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }), "{err}");
    }

    #[test]
    fn region_defaults_to_auto() {
        let config: S3Config = serde_yaml::from_str(
            r#"
hostname: acct.r2.cloudflarestorage.com
bucket_name: uploads
access_key: a
secret_key: s
"#,
        )
        .unwrap();
        assert_eq!(config.region, "auto");
    }
}
