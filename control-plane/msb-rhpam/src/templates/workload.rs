use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, ExecAction,
    ObjectFieldSelector, PodSpec, PodTemplateSpec, Probe,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::{OPERATOR_NAME, TemplateConfig, named, operator_labels};

pub const METRICS_PORT: i32 = 60000;
const READY_FILE: &str = "/tmp/operator-sdk-ready";

fn literal(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn from_field(name: &str, path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The rhpam-dev operator, watching only its own namespace.
pub fn operator_deployment(cfg: &TemplateConfig, namespace: &str) -> Deployment {
    let labels = operator_labels();

    let container = Container {
        name: OPERATOR_NAME.to_string(),
        image: Some(cfg.operator_image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: Some(vec![OPERATOR_NAME.to_string()]),
        env: Some(vec![
            from_field("WATCH_NAMESPACE", "metadata.namespace"),
            from_field("POD_NAME", "metadata.name"),
            literal("OPERATOR_NAME", OPERATOR_NAME),
            literal("SSO_NAMESPACE", &cfg.sso_namespace),
            literal(
                "SSO_ADMIN_CREDENTIALS_SECRET",
                &cfg.sso_admin_credentials_secret,
            ),
        ]),
        ports: Some(vec![ContainerPort {
            name: Some("metrics".to_string()),
            container_port: METRICS_PORT,
            ..Default::default()
        }]),
        readiness_probe: Some(Probe {
            exec: Some(ExecAction {
                command: Some(vec!["stat".to_string(), READY_FILE.to_string()]),
            }),
            initial_delay_seconds: Some(4),
            period_seconds: Some(10),
            failure_threshold: Some(1),
            ..Default::default()
        }),
        ..Default::default()
    };

    Deployment {
        metadata: named(OPERATOR_NAME, Some(namespace)),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            strategy: Some(DeploymentStrategy {
                type_: Some("Recreate".to_string()),
                ..Default::default()
            }),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(OPERATOR_NAME.to_string()),
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
