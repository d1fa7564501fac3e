//! Canonical shipment order record
//!
//! Every record handed to the path resolver and the transition engine has this
//! shape, whether it was stored natively or assembled from legacy documents.
use crate::error::ParseCodeError;
use crate::path::{self, StatusPath};
use crate::status::StatusCode;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const LEGACY_SCHEMA: u32 = 1;
pub const NATIVE_SCHEMA: u32 = 2;
pub const DEFAULT_CARGO_DESCRIPTION: &str = "General Cargo";

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(TimeStamp)
    }
    pub fn epoch() -> Self {
        Self(DateTime::UNIX_EPOCH)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

fn normalise_code(value: &str) -> String {
    value.trim().to_ascii_uppercase().replace(['-', ' '], "_")
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[n(0)]
    SeaFcl,
    #[n(1)]
    SeaLcl,
    #[n(2)]
    Air,
    #[n(3)]
    CrossBorder,
    #[n(4)]
    Ground,
}

impl FromStr for OrderType {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise_code(s).as_str() {
            "SEA_FCL" => Ok(OrderType::SeaFcl),
            "SEA_LCL" => Ok(OrderType::SeaLcl),
            "AIR" => Ok(OrderType::Air),
            "CROSS_BORDER" => Ok(OrderType::CrossBorder),
            "GROUND" => Ok(OrderType::Ground),
            _ => Err(ParseCodeError {
                kind: "order type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionDirection {
    #[n(0)]
    Import,
    #[n(1)]
    Export,
    #[n(2)]
    Domestic,
}

impl FromStr for TransactionDirection {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise_code(s).as_str() {
            "IMPORT" => Ok(TransactionDirection::Import),
            "EXPORT" => Ok(TransactionDirection::Export),
            "DOMESTIC" => Ok(TransactionDirection::Domestic),
            _ => Err(ParseCodeError {
                kind: "transaction direction",
                value: s.to_string(),
            }),
        }
    }
}

/// The intent recorded with a history entry.
#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionKind {
    #[n(0)]
    Created,
    #[n(1)]
    Advance,
    #[n(2)]
    Jump,
    #[n(3)]
    Revert,
    #[n(4)]
    Cancel,
    /// Entry carried over from a stored document that did not record intent.
    #[n(5)]
    Recorded,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[n(0)]
    pub status: StatusCode,
    #[n(1)]
    pub label: String,
    #[n(2)]
    pub timestamp: TimeStamp,
    #[n(3)]
    pub changed_by: String,
    #[n(4)]
    pub note: Option<String>,
    #[n(5)]
    pub reverted: bool,
    #[n(6)]
    pub reverted_from: Option<StatusCode>,
    #[n(7)]
    pub kind: TransitionKind,
    #[n(8)]
    pub undone_steps: Vec<StatusCode>, // path order, oldest first
}

impl HistoryEntry {
    pub fn new(
        status: StatusCode,
        kind: TransitionKind,
        timestamp: TimeStamp,
        changed_by: String,
        note: Option<String>,
    ) -> Self {
        Self {
            status,
            label: status.label().to_string(),
            timestamp,
            changed_by,
            note,
            reverted: false,
            reverted_from: None,
            kind,
            undone_steps: vec![],
        }
    }
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionFlag {
    #[n(0)]
    pub flagged: bool,
    #[n(1)]
    pub raised_at: Option<TimeStamp>,
    #[n(2)]
    pub raised_by: Option<String>,
    #[n(3)]
    pub notes: Option<String>,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub address: Option<String>,
    #[n(2)]
    pub company_id: Option<String>,
    #[n(3)]
    pub contact: Option<String>,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Parties {
    #[n(0)]
    pub shipper: Option<Party>,
    #[n(1)]
    pub consignee: Option<Party>,
    #[n(2)]
    pub notify_party: Option<Party>,
}

impl Parties {
    /// True when no party carries a usable name.
    pub fn is_empty(&self) -> bool {
        [&self.shipper, &self.consignee, &self.notify_party]
            .into_iter()
            .flatten()
            .all(|party| party.name.trim().is_empty())
    }
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase", default)]
pub struct Package {
    #[n(0)]
    pub kind: String,
    #[n(1)]
    pub quantity: u32,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    #[n(0)]
    pub size: String, // ISO size-type, e.g. 40HC
    #[n(1)]
    pub number: Option<String>,
    #[n(2)]
    pub seal: Option<String>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cargo {
    #[n(0)]
    pub description: String,
    #[n(1)]
    pub packages: Vec<Package>,
    #[n(2)]
    pub containers: Vec<Container>,
    #[n(3)]
    pub gross_weight_kg: Option<f64>,
    #[n(4)]
    pub volume_cbm: Option<f64>,
    #[n(5)]
    pub hs_codes: Vec<String>,
}

impl Default for Cargo {
    fn default() -> Self {
        Self {
            description: DEFAULT_CARGO_DESCRIPTION.to_string(),
            packages: vec![],
            containers: vec![],
            gross_weight_kg: None,
            volume_cbm: None,
            hs_codes: vec![],
        }
    }
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase", default)]
pub struct Locations {
    #[n(0)]
    pub origin: Option<String>,
    #[n(1)]
    pub destination: Option<String>,
    #[n(2)]
    pub port_of_loading: Option<String>,
    #[n(3)]
    pub port_of_discharge: Option<String>,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomsClearance {
    #[n(0)]
    pub required: bool,
    #[n(1)]
    pub cleared: bool,
    #[n(2)]
    pub broker: Option<String>,
    #[n(3)]
    pub entry_number: Option<String>,
}

// Mode specific details. Only the fields relevant to the order type are set.
#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeDetails {
    #[n(0)]
    pub carrier: Option<String>,
    #[n(1)]
    pub vessel_name: Option<String>,
    #[n(2)]
    pub voyage_number: Option<String>,
    #[n(3)]
    pub flight_number: Option<String>,
    #[n(4)]
    pub vehicle_plate: Option<String>,
    #[n(5)]
    pub customs: CustomsClearance,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentOrder {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub schema_version: u32,
    #[n(2)]
    pub order_type: OrderType,
    #[n(3)]
    pub transaction_direction: Option<TransactionDirection>,
    #[n(4)]
    pub incoterm: Option<String>,
    #[n(5)]
    pub status: StatusCode,
    #[n(6)]
    pub status_history: Vec<HistoryEntry>, // chronological, append only
    #[n(7)]
    pub exception: ExceptionFlag,
    #[n(8)]
    pub issued_invoice: bool,
    #[n(9)]
    pub cargo: Cargo,
    #[n(10)]
    pub parties: Parties,
    #[n(11)]
    pub locations: Locations,
    #[n(12)]
    pub type_details: TypeDetails,
    #[n(13)]
    pub created_at: Option<TimeStamp>,
    #[n(14)]
    pub updated_at: Option<TimeStamp>,
}

impl ShipmentOrder {
    /// Construct a native Draft order with its creation entry in the history.
    pub fn new_draft(
        id: String,
        order_type: OrderType,
        transaction_direction: Option<TransactionDirection>,
        incoterm: Option<String>,
        at: TimeStamp,
        created_by: String,
    ) -> Self {
        let created = HistoryEntry::new(
            StatusCode::Draft,
            TransitionKind::Created,
            at.clone(),
            created_by,
            None,
        );

        Self {
            id,
            schema_version: NATIVE_SCHEMA,
            order_type,
            transaction_direction,
            incoterm,
            status: StatusCode::Draft,
            status_history: vec![created],
            exception: ExceptionFlag::default(),
            issued_invoice: false,
            cargo: Cargo::default(),
            parties: Parties::default(),
            locations: Locations::default(),
            type_details: TypeDetails::default(),
            created_at: Some(at.clone()),
            updated_at: Some(at),
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.schema_version < NATIVE_SCHEMA
    }

    /// The path for the record's current incoterm and direction.
    pub fn path(&self) -> StatusPath {
        path::resolve_for(self)
    }

    pub fn current_position(&self) -> usize {
        path::current_position(self)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == StatusCode::Cancelled
    }

    pub fn is_completed(&self) -> bool {
        self.status == StatusCode::Completed
    }

    /// Serialise into CBOR, returning the digest of the encoding alongside it.
    pub fn encode_snapshot(&self) -> anyhow::Result<(String, Vec<u8>)> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }

    pub fn decode_snapshot(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(minicbor::decode(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ShipmentOrder {
        ShipmentOrder::new_draft(
            "shp_test".to_string(),
            OrderType::SeaFcl,
            Some(TransactionDirection::Export),
            Some("CIF".to_string()),
            TimeStamp::new_with(2024, 6, 1, 9, 0, 0).unwrap(),
            "ops@forwarder".to_string(),
        )
    }

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn new_draft_starts_with_a_created_entry() {
        let order = draft();

        assert_eq!(order.status, StatusCode::Draft);
        assert_eq!(order.schema_version, NATIVE_SCHEMA);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.status_history[0].kind, TransitionKind::Created);
        assert_eq!(order.status_history[0].label, "Draft");
        assert_eq!(order.cargo.description, DEFAULT_CARGO_DESCRIPTION);
        assert!(order.parties.is_empty());
    }

    #[test]
    fn snapshot_preserves_record() {
        let mut order = draft();
        order.cargo.gross_weight_kg = Some(1250.5);
        order.parties.shipper = Some(Party {
            name: "Acme Exports".to_string(),
            ..Party::default()
        });

        let (hash, cbor) = order.encode_snapshot().unwrap();
        let decoded = ShipmentOrder::decode_snapshot(&cbor).unwrap();

        assert_eq!(order, decoded);
        assert_eq!(hash, sha256::digest(&cbor));
    }

    #[test]
    fn codes_parse_regardless_of_case_and_separator() {
        assert_eq!(" sea-fcl ".parse::<OrderType>(), Ok(OrderType::SeaFcl));
        assert_eq!("Cross Border".parse::<OrderType>(), Ok(OrderType::CrossBorder));
        assert_eq!(
            "export".parse::<TransactionDirection>(),
            Ok(TransactionDirection::Export)
        );
        assert!("rail".parse::<OrderType>().is_err());
    }

    #[test]
    fn parties_with_blank_names_are_empty() {
        let parties = Parties {
            shipper: Some(Party {
                name: "  ".to_string(),
                ..Party::default()
            }),
            ..Parties::default()
        };
        assert!(parties.is_empty());
    }
}
