mod kube;

pub use kube::ClusterConnection;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KubeconfigError {
    #[error("not running in-cluster and no kubeconfig specified")]
    NotInCluster,

    #[error("couldn't read {0}")]
    Io(String),

    #[error("bad kubeconfig: {0}")]
    Parse(String),

    #[error("kubeconfig has no {0}")]
    Missing(String),
}
