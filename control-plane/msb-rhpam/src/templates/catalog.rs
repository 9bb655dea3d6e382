use std::collections::BTreeMap;

use msb_models::{
    CatalogResponse, InputParametersSchema, Schemas, Service,
    ServiceBindingSchema, ServiceInstanceSchema, ServicePlan,
};

pub const SERVICE_NAME: &str = "rhpam-dev";
pub const SERVICE_ID: &str = "rhpam-service-id";
pub const PLAN_ID: &str = "default-rhpam";

/// The single service this broker offers.
pub fn broker_catalog() -> CatalogResponse {
    let metadata = BTreeMap::from([
        ("serviceName".to_string(), SERVICE_NAME.to_string()),
        ("serviceType".to_string(), SERVICE_NAME.to_string()),
    ]);
    CatalogResponse {
        services: vec![Service {
            name: SERVICE_NAME.to_string(),
            id: SERVICE_ID.to_string(),
            description: SERVICE_NAME.to_string(),
            bindable: false,
            plan_updateable: false,
            tags: Vec::new(),
            metadata,
            plans: vec![ServicePlan {
                id: PLAN_ID.to_string(),
                name: PLAN_ID.to_string(),
                description: "default rhpam plan".to_string(),
                free: Some(true),
                schemas: Some(Schemas {
                    service_instance: Some(ServiceInstanceSchema {
                        create: Some(InputParametersSchema::default()),
                    }),
                    service_binding: Some(ServiceBindingSchema {
                        create: Some(InputParametersSchema::default()),
                    }),
                }),
            }],
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_rhpam_dev() {
        let catalog = broker_catalog();
        let svc = catalog.find_service(SERVICE_ID).unwrap();
        assert_eq!(svc.name, "rhpam-dev");
        assert!(!svc.bindable);
        let plan = svc.find_plan("default-rhpam").unwrap();
        assert_eq!(plan.free, Some(true));
        assert_eq!(svc.metadata["serviceType"], "rhpam-dev");
    }
}
