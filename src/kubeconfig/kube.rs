// src/kubeconfig/kube.rs
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use url::Url;

use super::KubeconfigError;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

#[derive(Debug, Deserialize)]
pub struct KubeConfig {
    #[serde(rename = "current-context", default)]
    pub current_context: Option<String>,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
}

#[derive(Debug, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterConfig {
    pub server: String,
    pub certificate_authority: Option<String>,
    pub certificate_authority_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: UserConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserConfig {
    pub token: Option<String>,
    pub token_file: Option<String>,
    pub client_certificate: Option<String>,
    pub client_certificate_data: Option<String>,
    pub client_key: Option<String>,
    pub client_key_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextConfig,
}

#[derive(Debug, Deserialize)]
pub struct ContextConfig {
    pub cluster: String,
    pub user: String,
}

/// Everything needed to talk to one API server.
#[derive(Clone)]
pub struct ClusterConnection {
    pub server: Url,
    pub ca_pem: Option<Vec<u8>>,
    pub token: Option<String>,
    /// PEM client certificate and PEM private key.
    pub client_identity: Option<(Vec<u8>, Vec<u8>)>,
}

impl std::fmt::Debug for ClusterConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConnection")
            .field("server", &self.server.as_str())
            .field("ca_pem", &self.ca_pem.is_some())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("client_identity", &self.client_identity.is_some())
            .finish()
    }
}

impl ClusterConnection {
    /// Service account credentials mounted into every pod.
    pub fn in_cluster() -> Result<Self, KubeconfigError> {
        let host = env::var("KUBERNETES_SERVICE_HOST").map_err(|_| KubeconfigError::NotInCluster)?;
        let port = env::var("KUBERNETES_SERVICE_PORT").map_err(|_| KubeconfigError::NotInCluster)?;
        Self::from_service_account(&host, &port, Path::new(SERVICE_ACCOUNT_DIR))
    }

    pub fn from_service_account(host: &str, port: &str, dir: &Path) -> Result<Self, KubeconfigError> {
        // IPv6 service hosts need brackets
        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };
        let server = parse_server(&format!("https://{}:{}", host, port))?;

        let token = read_file(&dir.join("token"))?;
        let ca_pem = read_file(&dir.join("ca.crt"))?;

        Ok(Self {
            server,
            ca_pem: Some(ca_pem),
            token: Some(String::from_utf8_lossy(&token).trim().to_string()),
            client_identity: None,
        })
    }

    /// Connection for the current context of a kubeconfig file.
    pub fn from_kubeconfig(path: &Path) -> Result<Self, KubeconfigError> {
        let contents = read_file(path)?;
        let config: KubeConfig = serde_yaml::from_slice(&contents)
            .map_err(|e| KubeconfigError::Parse(format!("{}: {}", path.display(), e)))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.connection(base)
    }
}

impl KubeConfig {
    /// Resolve the current context. Relative file references are taken
    /// relative to `base`, the kubeconfig's own directory.
    pub fn connection(&self, base: &Path) -> Result<ClusterConnection, KubeconfigError> {
        let context_name = self
            .current_context
            .as_deref()
            .ok_or_else(|| KubeconfigError::Parse("no current-context set".to_string()))?;

        let context = self
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| KubeconfigError::Missing(format!("context {}", context_name)))?;

        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| KubeconfigError::Missing(format!("cluster {}", context.cluster)))?;

        let user = self
            .users
            .iter()
            .find(|u| u.name == context.user)
            .map(|u| &u.user)
            .ok_or_else(|| KubeconfigError::Missing(format!("user {}", context.user)))?;

        let ca_pem = inline_or_file(
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
            base,
        )?;

        let token = match (&user.token, &user.token_file) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(file)) => {
                let data = read_file(&base.join(file))?;
                Some(String::from_utf8_lossy(&data).trim().to_string())
            }
            (None, None) => None,
        };

        let cert = inline_or_file(
            user.client_certificate_data.as_deref(),
            user.client_certificate.as_deref(),
            base,
        )?;
        let key = inline_or_file(
            user.client_key_data.as_deref(),
            user.client_key.as_deref(),
            base,
        )?;
        let client_identity = match (cert, key) {
            (Some(cert), Some(key)) => Some((cert, key)),
            (None, None) => None,
            _ => {
                return Err(KubeconfigError::Parse(format!(
                    "user {} has a client certificate or key but not both",
                    context.user
                )))
            }
        };

        Ok(ClusterConnection {
            server: parse_server(&cluster.server)?,
            ca_pem,
            token,
            client_identity,
        })
    }
}

fn parse_server(server: &str) -> Result<Url, KubeconfigError> {
    let mut url = Url::parse(server).map_err(|e| KubeconfigError::Parse(format!("server {}: {}", server, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn inline_or_file(data: Option<&str>, file: Option<&str>, base: &Path) -> Result<Option<Vec<u8>>, KubeconfigError> {
    if let Some(data) = data {
        return general_purpose::STANDARD
            .decode(data.trim())
            .map(Some)
            .map_err(|e| KubeconfigError::Parse(format!("bad base64 data: {}", e)));
    }
    match file {
        Some(file) => read_file(&base.join(file)).map(Some),
        None => Ok(None),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, KubeconfigError> {
    fs::read(path).map_err(|e| KubeconfigError::Io(format!("{}: {}", path.display(), e)))
}
