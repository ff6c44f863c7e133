use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Settings, Zone};

/// Body of an OCI `LaunchInstance` call (`LaunchInstanceDetails`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub availability_domain: String,
    pub compartment_id: String,
    pub shape: String,
    pub create_vnic_details: VnicDetails,
    pub display_name: String,
    pub metadata: BTreeMap<String, String>,
    pub shape_config: ShapeConfig,
    pub source_details: SourceDetails,
    pub is_pv_encryption_in_transit_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VnicDetails {
    pub assign_public_ip: bool,
    pub subnet_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShapeConfig {
    pub ocpus: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceDetails {
    /// Always `"image"`; the API uses it as the polymorphic discriminator.
    pub source_type: String,
    pub image_id: String,
    #[serde(rename = "bootVolumeSizeInGBs")]
    pub boot_volume_size_in_gbs: u64,
}

pub const SSH_AUTHORIZED_KEYS: &str = "ssh_authorized_keys";

impl LaunchRequest {
    /// Build the launch body for one zone. Settings are trusted as validated.
    pub fn for_zone(settings: &Settings, zone: &Zone) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(SSH_AUTHORIZED_KEYS.to_string(), settings.ssh_key.clone());

        Self {
            availability_domain: zone.name.clone(),
            compartment_id: settings.tenancy_id.clone(),
            shape: settings.shape.clone(),
            create_vnic_details: VnicDetails {
                assign_public_ip: true,
                subnet_id: settings.subnet_id.clone(),
            },
            display_name: settings.display_name.clone(),
            metadata,
            shape_config: ShapeConfig {
                ocpus: settings.cpus as f32,
            },
            source_details: SourceDetails {
                source_type: "image".to_string(),
                image_id: settings.image_id.clone(),
                boot_volume_size_in_gbs: settings.volume_size_gb,
            },
            is_pv_encryption_in_transit_enabled: true,
        }
    }
}
