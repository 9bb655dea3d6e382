use super::{TemplateConfig, generated};
use crate::cluster::CustomResourceRecord;
use crate::crd::{
    RhpamDev, RhpamDevSpec, RhpamRole, RhpamUser, RhpamUserEntry,
    RhpamUserSpec,
};
use crate::errors::ClusterResult;

pub const RHPAM_DEV_PREFIX: &str = "rhpamdev-";
pub const RHPAM_USER_PREFIX: &str = "rhpamuser-";

const DEMO_PASSWORD: &str = "password";

pub fn rhpam_dev(cfg: &TemplateConfig, namespace: &str) -> RhpamDev {
    RhpamDev {
        metadata: generated(RHPAM_DEV_PREFIX, namespace),
        spec: RhpamDevSpec {
            domain: cfg.route_suffix.clone().unwrap_or_default(),
            config: None,
        },
        status: None,
    }
}

/// Two groups with one demo user each.
pub fn rhpam_user(namespace: &str) -> RhpamUser {
    let groups = ["group1", "group2"];
    RhpamUser {
        metadata: generated(RHPAM_USER_PREFIX, namespace),
        spec: RhpamUserSpec {
            roles: groups
                .iter()
                .map(|g| RhpamRole {
                    name: g.to_string(),
                })
                .collect(),
            users: groups
                .iter()
                .enumerate()
                .map(|(i, g)| RhpamUserEntry {
                    username: format!("user{}", i + 1),
                    password: DEMO_PASSWORD.to_string(),
                    roles: vec![
                        "user".to_string(),
                        "kie-server".to_string(),
                        g.to_string(),
                    ],
                })
                .collect(),
        },
        status: None,
    }
}

pub fn rhpam_dev_record(
    cfg: &TemplateConfig,
    namespace: &str,
) -> ClusterResult<CustomResourceRecord> {
    CustomResourceRecord::from_resource(&rhpam_dev(cfg, namespace))
}

pub fn rhpam_user_record(namespace: &str) -> ClusterResult<CustomResourceRecord> {
    CustomResourceRecord::from_resource(&rhpam_user(namespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_record_carries_route_domain() {
        let mut cfg = TemplateConfig::default();
        cfg.route_suffix = Some("apps.example.com".into());
        let rec = rhpam_dev_record(&cfg, "rhpam-abc123").unwrap();
        assert_eq!(rec.kind.kind, "RhpamDev");
        assert_eq!(rec.generate_name.as_deref(), Some("rhpamdev-"));
        assert_eq!(rec.fields["spec"]["domain"], "apps.example.com");
        assert!(rec.fields.get("status").is_none());
    }

    #[test]
    fn user_record_seeds_two_groups() {
        let rec = rhpam_user_record("rhpam-abc123").unwrap();
        let spec = &rec.fields["spec"];
        assert_eq!(spec["roles"][1]["name"], "group2");
        assert_eq!(spec["users"][0]["username"], "user1");
        assert_eq!(
            spec["users"][0]["roles"],
            serde_json::json!(["user", "kie-server", "group1"])
        );
    }
}
