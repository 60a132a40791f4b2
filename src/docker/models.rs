//! The subset of Docker Engine API responses the client decodes.

use std::collections::HashMap;

use serde::Deserialize;

use crate::provider::{ContainerInfo, ImageInfo, RuntimeVersion};

/// An entry of `GET /containers/json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub network_settings: Option<NetworkSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkSettings {
    #[serde(default)]
    pub networks: HashMap<String, EndpointSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndpointSettings {
    #[serde(rename = "IPAddress", default)]
    pub ip_address: String,
}

impl From<ContainerSummary> for ContainerInfo {
    fn from(value: ContainerSummary) -> Self {
        let name = value
            .names
            .first()
            .map(|n| n.trim_start_matches('/').to_owned())
            .unwrap_or_default();
        // Networks is a map; pick the lexicographically first address so the
        // reported ip does not change between rounds.
        let ip = value
            .network_settings
            .map(|settings| {
                let mut networks: Vec<_> = settings.networks.into_iter().collect();
                networks.sort_by(|a, b| a.0.cmp(&b.0));
                networks
                    .into_iter()
                    .map(|(_, endpoint)| endpoint.ip_address)
                    .find(|ip| !ip.is_empty())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        Self {
            id: value.id,
            name,
            image: value.image,
            state: value.state,
            status: value.status,
            ip,
        }
    }
}

/// The response of `GET /version`.
#[derive(Debug, Deserialize)]
pub struct Version {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "ApiVersion", default)]
    pub api_version: String,
    #[serde(rename = "MinAPIVersion", default)]
    pub min_api_version: String,
    #[serde(rename = "GitCommit", default)]
    pub git_commit: String,
    #[serde(rename = "GoVersion", default)]
    pub go_version: String,
    #[serde(rename = "Os", default)]
    pub os: String,
    #[serde(rename = "Arch", default)]
    pub arch: String,
}

impl From<Version> for RuntimeVersion {
    fn from(value: Version) -> Self {
        Self {
            version: value.version,
            api_version: value.api_version,
            min_api_version: value.min_api_version,
            git_commit: value.git_commit,
            go_version: value.go_version,
            os: value.os,
            arch: value.arch,
        }
    }
}

/// An entry of `GET /images/json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSummary {
    pub id: String,
    #[serde(default)]
    pub repo_tags: Option<Vec<String>>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub size: i64,
}

/// Splits `registry:5000/app:1.0` into `("registry:5000/app", "1.0")`.
///
/// A reference without a tag yields an empty tag.
pub fn split_reference(reference: &str) -> (&str, &str) {
    match reference.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (reference, ""),
    }
}

impl ImageSummary {
    /// One [`ImageInfo`] per repo tag; untagged images become `<none>:<none>`.
    pub fn into_images(self) -> Vec<ImageInfo> {
        let tags = match self.repo_tags {
            Some(tags) if !tags.is_empty() => tags,
            _ => vec!["<none>:<none>".to_owned()],
        };
        tags.iter()
            .map(|reference| {
                let (name, tag) = split_reference(reference);
                ImageInfo {
                    id: self.id.clone(),
                    name: name.to_owned(),
                    tag: tag.to_owned(),
                    created: self.created,
                    size: self.size,
                }
            })
            .collect()
    }
}
