//! A [`ContainerRuntime`] backed by the Docker Engine API on its unix socket.
mod error;
mod models;
mod stats;

use std::path::PathBuf;

use http::Request;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;

pub use error::{Error, Result};
pub use models::split_reference;
pub use stats::ContainerStats;

use crate::provider::{
    self, ContainerInfo, ContainerMemory, ContainerRuntime, ContainerUsage, ImageInfo,
    RuntimeVersion,
};

pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

#[derive(Debug, Clone)]
pub struct DockerClient {
    socket_path: PathBuf,
}

impl DockerClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Issues `GET endpoint` on a fresh connection and decodes the JSON body.
    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        log::trace!(
            "Requesting {} from {}...",
            endpoint,
            self.socket_path.display()
        );
        let stream = tokio::net::UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| Error::SocketConnect {
                path: self.socket_path.clone(),
                source,
            })?;
        let http_err = |source| Error::Http {
            endpoint: endpoint.to_owned(),
            source,
        };

        let (mut sender, connection) =
            hyper::client::conn::http1::handshake::<_, Empty<Bytes>>(TokioIo::new(stream))
                .await
                .map_err(http_err)?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                log::debug!("Docker connection closed with error: {}", err);
            }
        });

        let request = Request::get(endpoint)
            .header(http::header::HOST, "docker")
            .body(Empty::<Bytes>::new())
            .map_err(|source| Error::Request {
                endpoint: endpoint.to_owned(),
                source,
            })?;
        let response = sender.send_request(request).await.map_err(http_err)?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(http_err)?
            .to_bytes();

        if !status.is_success() {
            return Err(Error::Status {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            endpoint: endpoint.to_owned(),
            source,
        })
    }

    /// One stats snapshot; the engine takes about a second to answer.
    pub async fn container_stats(&self, id: &str) -> Result<ContainerStats> {
        self.get(&format!("/containers/{}/stats?stream=false", id))
            .await
    }
}

/// Extracts `message` from an engine error body, falling back to the raw text.
fn error_message(body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_owned())
}

impl ContainerRuntime for DockerClient {
    async fn list_containers(&self) -> provider::Result<Vec<ContainerInfo>> {
        let containers: Vec<models::ContainerSummary> = self.get("/containers/json").await?;
        Ok(containers.into_iter().map(ContainerInfo::from).collect())
    }

    async fn container_cpu(&self, id: &str) -> provider::Result<f64> {
        Ok(self.container_stats(id).await?.cpu_percent())
    }

    async fn container_memory(&self, id: &str) -> provider::Result<ContainerMemory> {
        Ok(self.container_stats(id).await?.memory())
    }

    async fn container_usage(&self, id: &str) -> provider::Result<ContainerUsage> {
        let stats = self.container_stats(id).await?;
        Ok(ContainerUsage {
            cpu_percent: stats.cpu_percent(),
            memory: stats.memory(),
        })
    }

    async fn version(&self) -> provider::Result<RuntimeVersion> {
        let version: models::Version = self.get("/version").await?;
        Ok(version.into())
    }

    async fn list_images(&self) -> provider::Result<Vec<ImageInfo>> {
        let images: Vec<models::ImageSummary> = self.get("/images/json").await?;
        Ok(images
            .into_iter()
            .flat_map(models::ImageSummary::into_images)
            .collect())
    }
}
