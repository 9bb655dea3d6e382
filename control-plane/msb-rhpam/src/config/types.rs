use envconfig::Envconfig;
use std::str::FromStr;
use std::time::Duration;

use crate::cluster::RetryConfig;
use crate::templates::TemplateConfig;

#[derive(Envconfig, Clone, Debug)]
pub struct BrokerConfig {
    #[envconfig(from = "BROKER_HTTP_PORT", default = "8080")]
    pub http_port: u16,

    /// Namespace prefix; an instance lives in `<prefix>-<instance id>`.
    #[envconfig(from = "BROKER_SERVICE_PREFIX", default = "rhpam")]
    pub service_prefix: String,

    /// kube | memory
    #[envconfig(from = "BROKER_CLUSTER_BACKEND", default = "kube")]
    pub cluster_backend: ClusterBackend,

    /// standard | dev-only
    #[envconfig(from = "BROKER_PLAN", default = "standard")]
    pub plan: ProvisionPlan,

    /// Deadline for a single pipeline step.
    #[envconfig(from = "BROKER_STEP_TIMEOUT_SECS", default = "30")]
    pub step_timeout_secs: u64,

    #[envconfig(nested)]
    pub retry: RetrySettings,

    #[envconfig(nested)]
    pub templates: TemplateSettings,
}

#[derive(Envconfig, Clone, Debug)]
pub struct RetrySettings {
    /// Total attempts per cluster call, including the first one.
    #[envconfig(from = "BROKER_CLUSTER_RETRY_ATTEMPTS", default = "3")]
    pub attempts: u32,
    #[envconfig(from = "BROKER_CLUSTER_RETRY_INITIAL_MS", default = "100")]
    pub initial_delay_ms: u64,
    #[envconfig(from = "BROKER_CLUSTER_RETRY_MAX_MS", default = "5000")]
    pub max_delay_ms: u64,
}

/// Values handed through to rendered resources without interpretation.
#[derive(Envconfig, Clone, Debug, Default)]
pub struct TemplateSettings {
    #[envconfig(from = "ROUTE_SUFFIX")]
    pub route_suffix: Option<String>,
    #[envconfig(from = "SSO_NAMESPACE")]
    pub sso_namespace: Option<String>,
    #[envconfig(from = "SSO_ADMIN_CREDENTIALS_SECRET")]
    pub sso_admin_credentials_secret: Option<String>,
    #[envconfig(from = "BROKER_OPERATOR_IMAGE")]
    pub operator_image: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterBackend {
    Kube,
    Memory,
}

impl FromStr for ClusterBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kube" | "k8s" | "kubernetes" => Ok(ClusterBackend::Kube),
            "memory" | "mem" => Ok(ClusterBackend::Memory),
            other => Err(format!("unknown cluster backend '{other}'")),
        }
    }
}

/// Which provisioning step list to run. The two lists are never mixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProvisionPlan {
    /// Operator plus `RhpamDev` and `RhpamUser` resources, with the user role
    /// and user bindings.
    #[default]
    Standard,
    /// Operator plus a single `RhpamDev` resource.
    DevOnly,
}

impl ProvisionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionPlan::Standard => "standard",
            ProvisionPlan::DevOnly => "dev-only",
        }
    }
}

impl FromStr for ProvisionPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "full" => Ok(ProvisionPlan::Standard),
            "dev-only" | "dev_only" | "simple" => Ok(ProvisionPlan::DevOnly),
            other => Err(format!("unknown provision plan '{other}'")),
        }
    }
}

impl BrokerConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs.max(1))
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.attempts.max(1),
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(
                self.retry.max_delay_ms.max(self.retry.initial_delay_ms),
            ),
            backoff_multiplier: 2.0,
        }
    }

    pub fn template_config(&self) -> TemplateConfig {
        let mut cfg = TemplateConfig::new(&self.service_prefix);
        cfg.route_suffix = self
            .templates
            .route_suffix
            .clone()
            .filter(|s| !s.is_empty());
        cfg.sso_namespace =
            self.templates.sso_namespace.clone().unwrap_or_default();
        cfg.sso_admin_credentials_secret = self
            .templates
            .sso_admin_credentials_secret
            .clone()
            .unwrap_or_default();
        if let Some(img) = self.templates.operator_image.as_ref() {
            cfg.operator_image = img.clone();
        }
        cfg
    }
}
