//! Stored document shapes as they come out of the document store.
//!
//! Every field is optional here; the assembler decides the fallbacks.
use crate::error::AssemblyError;
use crate::shipment::{Container, Locations, Package, TransitionKind, TypeDetails};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Decode a JSON document, naming the collection it came from on failure.
pub fn decode_document<T: DeserializeOwned>(
    collection: &'static str,
    bytes: &[u8],
) -> Result<T, AssemblyError> {
    serde_json::from_slice(bytes).map_err(|e| AssemblyError::MalformedDocument {
        collection,
        reason: e.to_string(),
    })
}

/// The primary order document. Native (v2) documents use the structured
/// fields, legacy documents the flat quotation fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawOrder {
    pub id: String,
    pub schema_version: Option<u32>,
    pub order_type: Option<String>,
    #[serde(alias = "transactionType")]
    pub transaction_direction: Option<String>,
    pub incoterm: Option<String>,
    pub status: Option<i64>,
    pub status_history: Vec<RawHistoryEntry>,
    pub exception: Option<RawException>,
    pub issued_invoice: Option<bool>,
    pub cargo: Option<RawCargo>,
    pub parties: Option<RawParties>,
    pub locations: Option<Locations>,
    pub type_details: Option<TypeDetails>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,

    // legacy quotation fields
    pub quotation_type: Option<String>,
    pub quotation_category: Option<String>,
    pub shipper_name: Option<String>,
    pub shipper_address: Option<String>,
    pub consignee_name: Option<String>,
    pub consignee_address: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    #[serde(alias = "pol")]
    pub port_of_loading: Option<String>,
    #[serde(alias = "pod")]
    pub port_of_discharge: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawHistoryEntry {
    pub status: Option<i64>,
    pub label: Option<String>,
    pub timestamp: Option<String>,
    pub changed_by: Option<String>,
    pub note: Option<String>,
    pub reverted: bool,
    pub reverted_from: Option<i64>,
    pub kind: Option<TransitionKind>,
    pub undone_steps: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawException {
    pub flagged: bool,
    pub raised_at: Option<String>,
    pub raised_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawParty {
    pub name: Option<String>,
    pub company_id: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawParties {
    pub shipper: Option<RawParty>,
    pub consignee: Option<RawParty>,
    pub notify_party: Option<RawParty>,
}

impl RawParties {
    pub fn company_ids(&self) -> Vec<String> {
        [&self.shipper, &self.consignee, &self.notify_party]
            .into_iter()
            .flatten()
            .filter_map(|party| party.company_id.clone())
            .filter(|id| !id.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCargo {
    pub description: Option<String>,
    pub commodity: Option<String>,
    pub packages: Vec<Package>,
    pub containers: Vec<Container>,
    #[serde(alias = "weight")]
    pub gross_weight_kg: Option<f64>,
    #[serde(alias = "volume")]
    pub volume_cbm: Option<f64>,
    pub hs_codes: Vec<String>,
}

/// The shipment sub-entity of a legacy order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyShipment {
    pub status: Option<i64>,
    pub parties: Option<RawParties>,
    pub shipper_name: Option<String>,
    pub shipper_address: Option<String>,
    pub consignee_name: Option<String>,
    pub consignee_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyTypeDetails {
    pub carrier: Option<String>,
    pub vessel_name: Option<String>,
    #[serde(alias = "voyageNo")]
    pub voyage_number: Option<String>,
    #[serde(alias = "flightNo")]
    pub flight_number: Option<String>,
    #[serde(alias = "truckPlate")]
    pub vehicle_plate: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyCustoms {
    pub required: Option<bool>,
    pub cleared: Option<bool>,
    #[serde(alias = "brokerName")]
    pub broker: Option<String>,
    pub entry_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCompany {
    #[serde(alias = "companyName")]
    pub name: Option<String>,
}

/// Already fetched auxiliary entities for a legacy order, keyed by the same id.
#[derive(Debug, Clone, Default)]
pub struct LegacyAuxiliaries {
    pub shipment: Option<LegacyShipment>,
    pub cargo: Option<RawCargo>,
    pub type_details: Option<LegacyTypeDetails>,
    pub customs: Option<LegacyCustoms>,
    /// Company id to display name.
    pub company_names: HashMap<String, String>,
}
