use std::fmt;
use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Body, Certificate, Client, Identity, Url};
use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, oneshot};

use crate::config::Configuration;
use crate::constants::{EVENT_QUEUE_DEPTH, HTTP_KIND_TAG, HTTP_SUCCESS_STATUS};
use crate::models::{DestinationStatistics, HttpStatistics, UploadData, UploadStatus};
use crate::output::events::read_events;
use crate::output::pipe::{body_pipe, PipeReader};
use crate::output::template::EventTemplates;
use crate::output::DestinationBehavior;

/// Streams bundles to an HTTP endpoint, one POST per bundle.
///
/// The request body is rendered while it is being sent: a reader task turns
/// the bundle into events, a writer task renders them through the envelope
/// templates into a bounded pipe, and reqwest drains the pipe. Memory use
/// stays flat regardless of bundle size.
#[derive(Default)]
pub struct HttpBehavior {
    dest: String,
    headers: HeaderMap,
    client: Option<Client>,
    templates: Option<Arc<EventTemplates>>,
}

impl HttpBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these templates instead of the ones in the configuration.
    pub fn with_templates(mut self, templates: EventTemplates) -> Self {
        self.templates = Some(Arc::new(templates));
        self
    }
}

/// Build the shared client from the TLS and timeout settings
fn build_client(config: &Configuration) -> Result<Client> {
    let mut builder = Client::builder().danger_accept_invalid_certs(!config.tls.verify);

    if let Some(path) = &config.tls.ca_cert {
        let pem = fs::read(path)
            .context(format!("Failed to read CA certificate {}", path.display()))?;
        let certificate = Certificate::from_pem(&pem)
            .context(format!("Invalid CA certificate {}", path.display()))?;
        builder = builder.add_root_certificate(certificate);
    }

    if let Some(path) = &config.tls.client_identity {
        let pem = fs::read(path)
            .context(format!("Failed to read client identity {}", path.display()))?;
        let identity = Identity::from_pem(&pem)
            .context(format!("Invalid client identity {}", path.display()))?;
        builder = builder.identity(identity);
    }

    if let Some(secs) = config.http.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = config.http.connect_timeout_secs {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }

    builder.build().context("Failed to build HTTP client")
}

fn build_headers(config: &Configuration) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(token) = config.http.authorization_token.as_deref().filter(|t| !t.is_empty()) {
        let mut value = HeaderValue::from_str(token)
            .map_err(|_| anyhow!("Authorization token contains characters not allowed in a header"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    let content_type = HeaderValue::from_str(&config.http.content_type)
        .context(format!("Invalid content type '{}'", config.http.content_type))?;
    headers.insert(CONTENT_TYPE, content_type);

    Ok(headers)
}

/// Start the reader and writer tasks for one upload and return the body
/// stream they feed.
///
/// If either stage fails locally, the failure is sent on the returned
/// oneshot before the pipe is aborted, so the caller can tell a local fault
/// from a remote one once the request errors out.
pub(crate) fn spawn_body_stream<R>(
    templates: Arc<EventTemplates>,
    file_name: &str,
    file_size: u64,
    source: R,
) -> (PipeReader, oneshot::Receiver<io::Error>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (event_sender, event_receiver) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let (body_writer, body_reader) = body_pipe();
    let (fault_sender, fault_receiver) = oneshot::channel();

    tokio::spawn(read_events(source, event_sender));

    let data = UploadData {
        file_name: file_name.to_string(),
        file_size,
        events: event_receiver,
    };
    let name = data.file_name.clone();
    tokio::spawn(async move {
        match templates.render(data, &body_writer).await {
            Ok(summary) => {
                debug!("Rendered {} events ({} bytes) for {}", summary.events, summary.bytes, name);
            },
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("HTTP client stopped reading the request body");
            },
            Err(e) => {
                let abort = io::Error::new(e.kind(), e.to_string());
                let _ = fault_sender.send(e);
                body_writer.close_with_error(abort).await;
            },
        }
    });

    (body_reader, fault_receiver)
}

#[async_trait]
impl DestinationBehavior for HttpBehavior {
    async fn initialize(&mut self, connection: &str, config: &Configuration) -> Result<()> {
        Url::parse(connection)
            .context(format!("Invalid HTTP destination '{}'", connection))?;

        if self.templates.is_none() {
            let templates = EventTemplates::from_config(&config.http)?;
            self.templates = Some(Arc::new(templates));
        }

        self.headers = build_headers(config)?;
        self.client = Some(build_client(config)?);
        self.dest = connection.to_string();

        Ok(())
    }

    async fn upload(&self, file_name: &str, file: File) -> UploadStatus {
        let (client, templates) = match (&self.client, &self.templates) {
            (Some(client), Some(templates)) => (client, Arc::clone(templates)),
            _ => {
                return UploadStatus::failure(
                    file_name,
                    anyhow!("HTTP destination used before initialization"),
                    0,
                );
            },
        };

        let file_size = match file.metadata().await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                debug!("Could not determine size of {}: {}", file_name, e);
                0
            },
        };

        debug!("Posting {} ({} bytes) to {}", file_name, file_size, self.dest);

        let (body, mut local_fault) = spawn_body_stream(templates, file_name, file_size, file);

        let response = client
            .post(self.dest.as_str())
            .headers(self.headers.clone())
            .body(Body::wrap_stream(body))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let error = match local_fault.try_recv() {
                    Ok(fault) => anyhow!(fault)
                        .context(format!("Bundle stream for {} failed while posting to {}", file_name, self.dest)),
                    Err(_) => anyhow!(e).context(format!("HTTP request to {} failed", self.dest)),
                };
                warn!("Upload of {} failed: {:#}", file_name, error);
                return UploadStatus::failure(file_name, error, 0);
            },
        };

        let status = response.status();
        if status.as_u16() != HTTP_SUCCESS_STATUS {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("[failed to read response body: {}]", e),
            };
            let error = anyhow!("HTTP request failed: Error code {}\n{}", status, body);
            warn!("Upload of {} to {} rejected with {}", file_name, self.dest, status);
            return UploadStatus::failure(file_name, error, status.as_u16());
        }

        debug!("Delivered {} to {}", file_name, self.dest);
        UploadStatus::success(file_name, HTTP_SUCCESS_STATUS)
    }

    fn key(&self) -> String {
        self.dest.clone()
    }

    fn statistics(&self) -> DestinationStatistics {
        DestinationStatistics::Http(HttpStatistics {
            destination: self.dest.clone(),
        })
    }
}

impl fmt::Display for HttpBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", HTTP_KIND_TAG, self.key())
    }
}
