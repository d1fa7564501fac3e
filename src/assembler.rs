//! Record assembler
//!
//! Builds a [`ShipmentOrder`] from a stored order document. Native documents
//! (schema version 2 and later) are copied field by field. Legacy documents
//! are split across the order document and auxiliary entities, and are
//! stitched together here. The inputs are never modified.
//!
//! Missing optional data never fails assembly, it falls back to a documented
//! default and at most logs a warning.
use crate::error::AssemblyError;
use crate::raw::{LegacyAuxiliaries, RawCargo, RawHistoryEntry, RawOrder, RawParties, RawParty};
use crate::shipment::{
    Cargo, CustomsClearance, ExceptionFlag, HistoryEntry, LEGACY_SCHEMA, Locations, NATIVE_SCHEMA,
    OrderType, Parties, Party, ShipmentOrder, TimeStamp, TransactionDirection, TransitionKind,
    TypeDetails,
};
use crate::status::{self, StatusCode};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

// (quotationType, quotationCategory, order type). A `None` category matches
// any category; exact rows precede wildcard rows of the same type.
const ORDER_TYPES: &[(&str, Option<&str>, OrderType)] = &[
    ("sea", Some("fcl"), OrderType::SeaFcl),
    ("sea", Some("lcl"), OrderType::SeaLcl),
    ("ocean", Some("fcl"), OrderType::SeaFcl),
    ("ocean", Some("lcl"), OrderType::SeaLcl),
    ("air", None, OrderType::Air),
    ("land", Some("cross_border"), OrderType::CrossBorder),
    ("land", Some("ftl"), OrderType::Ground),
    ("land", Some("ltl"), OrderType::Ground),
    ("land", Some("domestic"), OrderType::Ground),
    ("cross_border", None, OrderType::CrossBorder),
    ("trucking", None, OrderType::Ground),
];

fn normalise(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Looks up the order type of a legacy quotation, `None` for unknown pairs.
pub fn legacy_order_type(
    quotation_type: Option<&str>,
    quotation_category: Option<&str>,
) -> Option<OrderType> {
    let kind = normalise(quotation_type?);
    let category = quotation_category.map(normalise);

    ORDER_TYPES
        .iter()
        .find(|(t, c, _)| {
            *t == kind
                && match c {
                    Some(c) => category.as_deref() == Some(*c),
                    None => true,
                }
        })
        .map(|(_, _, order_type)| *order_type)
}

/// Where the parties of an assembled record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartySource {
    /// Structured parties on the order document.
    Native(Parties),
    /// Structured parties on the legacy shipment entity.
    LegacyStructured(Parties),
    /// Flat shipper/consignee fields on the legacy shipment entity.
    LegacyFlat(Parties),
    /// Flat shipper/consignee fields on the order document.
    PrimaryFlat(Parties),
    None,
}

impl PartySource {
    pub fn name(&self) -> &'static str {
        match self {
            PartySource::Native(_) => "native",
            PartySource::LegacyStructured(_) => "legacy_structured",
            PartySource::LegacyFlat(_) => "legacy_flat",
            PartySource::PrimaryFlat(_) => "primary_flat",
            PartySource::None => "none",
        }
    }

    pub fn parties(&self) -> Option<&Parties> {
        match self {
            PartySource::Native(p)
            | PartySource::LegacyStructured(p)
            | PartySource::LegacyFlat(p)
            | PartySource::PrimaryFlat(p) => Some(p),
            PartySource::None => None,
        }
    }

    pub fn into_parties(self) -> Parties {
        match self {
            PartySource::Native(p)
            | PartySource::LegacyStructured(p)
            | PartySource::LegacyFlat(p)
            | PartySource::PrimaryFlat(p) => p,
            PartySource::None => Parties::default(),
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn convert_party(raw: &RawParty, company_names: &HashMap<String, String>) -> Option<Party> {
    let company_id = non_blank(raw.company_id.as_ref());
    let name = non_blank(raw.name.as_ref()).or_else(|| {
        company_id
            .as_ref()
            .and_then(|id| company_names.get(id))
            .cloned()
    });

    if name.is_none() && company_id.is_none() && raw.address.is_none() {
        return None;
    }

    Some(Party {
        name: name.unwrap_or_default(),
        address: non_blank(raw.address.as_ref()),
        company_id,
        contact: non_blank(raw.contact.as_ref()),
    })
}

fn convert_parties(raw: &RawParties, company_names: &HashMap<String, String>) -> Parties {
    let convert = |party: &Option<RawParty>| {
        party
            .as_ref()
            .and_then(|p| convert_party(p, company_names))
    };

    Parties {
        shipper: convert(&raw.shipper),
        consignee: convert(&raw.consignee),
        notify_party: convert(&raw.notify_party),
    }
}

fn flat_parties(
    shipper_name: Option<&String>,
    shipper_address: Option<&String>,
    consignee_name: Option<&String>,
    consignee_address: Option<&String>,
) -> Parties {
    let party = |name: Option<&String>, address: Option<&String>| {
        non_blank(name).map(|name| Party {
            name,
            address: non_blank(address),
            ..Party::default()
        })
    };

    Parties {
        shipper: party(shipper_name, shipper_address),
        consignee: party(consignee_name, consignee_address),
        notify_party: None,
    }
}

/// Picks the first non-empty party source, in precedence order. Sources are
/// never merged.
pub fn resolve_party_source(primary: &RawOrder, aux: &LegacyAuxiliaries) -> PartySource {
    let names = &aux.company_names;
    let shipment = aux.shipment.as_ref();

    let candidates = [
        primary
            .parties
            .as_ref()
            .map(|p| PartySource::Native(convert_parties(p, names))),
        shipment
            .and_then(|s| s.parties.as_ref())
            .map(|p| PartySource::LegacyStructured(convert_parties(p, names))),
        shipment.map(|s| {
            PartySource::LegacyFlat(flat_parties(
                s.shipper_name.as_ref(),
                s.shipper_address.as_ref(),
                s.consignee_name.as_ref(),
                s.consignee_address.as_ref(),
            ))
        }),
        Some(PartySource::PrimaryFlat(flat_parties(
            primary.shipper_name.as_ref(),
            primary.shipper_address.as_ref(),
            primary.consignee_name.as_ref(),
            primary.consignee_address.as_ref(),
        ))),
    ];

    let source = candidates
        .into_iter()
        .flatten()
        .find(|source| source.parties().is_some_and(|p| !p.is_empty()))
        .unwrap_or(PartySource::None);

    tracing::debug!(shipment_id = %primary.id, source = source.name(), "resolved party source");
    source
}

// Snapshots store nanoseconds since the epoch, so dates outside that range
// (sentinels such as 0001-01-01) are dropped here.
fn parse_timestamp(value: Option<&String>) -> Option<TimeStamp> {
    let value = value?;
    match DateTime::parse_from_rfc3339(value.trim()) {
        Ok(dt) if dt.timestamp_nanos_opt().is_some() => Some(dt.with_timezone(&Utc).into()),
        Ok(_) => {
            tracing::warn!(value = %value, "timestamp out of storable range, ignoring");
            None
        }
        Err(e) => {
            tracing::warn!(value = %value, error = %e, "unparseable timestamp, ignoring");
            None
        }
    }
}

fn convert_history(
    id: &str,
    entries: &[RawHistoryEntry],
    map_status: impl Fn(i64) -> Option<StatusCode>,
    fallback_time: &TimeStamp,
) -> Vec<HistoryEntry> {
    entries
        .iter()
        .filter_map(|raw| {
            let Some(status) = raw.status.and_then(&map_status) else {
                tracing::warn!(shipment_id = %id, code = ?raw.status, "dropping history entry with unknown status code");
                return None;
            };

            let timestamp = parse_timestamp(raw.timestamp.as_ref()).unwrap_or_else(|| {
                tracing::warn!(shipment_id = %id, "history entry without timestamp");
                fallback_time.clone()
            });

            Some(HistoryEntry {
                status,
                label: non_blank(raw.label.as_ref()).unwrap_or_else(|| status.label().to_string()),
                timestamp,
                changed_by: non_blank(raw.changed_by.as_ref()).unwrap_or_else(|| "system".to_string()),
                note: raw.note.clone(),
                reverted: raw.reverted,
                reverted_from: raw.reverted_from.and_then(&map_status),
                kind: raw.kind.unwrap_or(TransitionKind::Recorded),
                undone_steps: raw.undone_steps.iter().filter_map(|c| map_status(*c)).collect(),
            })
        })
        .collect()
}

fn convert_cargo(raw: Option<&RawCargo>) -> Cargo {
    let Some(raw) = raw else {
        return Cargo::default();
    };
    let defaults = Cargo::default();

    Cargo {
        description: non_blank(raw.description.as_ref())
            .or_else(|| non_blank(raw.commodity.as_ref()))
            .unwrap_or(defaults.description),
        packages: raw.packages.clone(),
        containers: raw.containers.clone(),
        gross_weight_kg: raw.gross_weight_kg,
        volume_cbm: raw.volume_cbm,
        hs_codes: raw.hs_codes.clone(),
    }
}

fn convert_exception(primary: &RawOrder) -> ExceptionFlag {
    match &primary.exception {
        Some(raw) if raw.flagged => ExceptionFlag {
            flagged: true,
            raised_at: parse_timestamp(raw.raised_at.as_ref()),
            raised_by: raw.raised_by.clone(),
            notes: raw.notes.clone(),
        },
        _ => ExceptionFlag::default(),
    }
}

fn parse_direction(primary: &RawOrder) -> Option<TransactionDirection> {
    let raw = non_blank(primary.transaction_direction.as_ref())?;
    match raw.parse::<TransactionDirection>() {
        Ok(direction) => Some(direction),
        Err(e) => {
            tracing::warn!(shipment_id = %primary.id, error = %e, "ignoring transaction direction");
            None
        }
    }
}

/// Assembles the canonical record. `aux` is only consulted for legacy documents.
pub fn assemble(primary: &RawOrder, aux: &LegacyAuxiliaries) -> Result<ShipmentOrder, AssemblyError> {
    if primary.id.trim().is_empty() {
        return Err(AssemblyError::MissingIdentifier);
    }

    let order = match primary.schema_version {
        Some(version) if version >= NATIVE_SCHEMA => assemble_native(primary, version),
        _ => assemble_legacy(primary, aux),
    };
    Ok(order)
}

fn assemble_native(primary: &RawOrder, version: u32) -> ShipmentOrder {
    let id = primary.id.trim().to_string();

    let order_type = match non_blank(primary.order_type.as_ref()) {
        Some(code) => code.parse::<OrderType>().unwrap_or_else(|e| {
            tracing::warn!(shipment_id = %id, error = %e, "falling back to SEA_FCL");
            OrderType::SeaFcl
        }),
        None => OrderType::SeaFcl,
    };

    let status = match primary.status {
        Some(code) => StatusCode::from_code(code).unwrap_or_else(|| {
            tracing::warn!(shipment_id = %id, code, "unknown status code, using Draft");
            StatusCode::Draft
        }),
        None => StatusCode::Draft,
    };

    let created_at = parse_timestamp(primary.created_at.as_ref());
    let fallback_time = created_at.clone().unwrap_or_else(TimeStamp::epoch);

    ShipmentOrder {
        status_history: convert_history(
            &id,
            &primary.status_history,
            StatusCode::from_code,
            &fallback_time,
        ),
        schema_version: version,
        order_type,
        transaction_direction: parse_direction(primary),
        incoterm: primary.incoterm.clone(),
        status,
        exception: convert_exception(primary),
        issued_invoice: primary.issued_invoice.unwrap_or(false),
        cargo: convert_cargo(primary.cargo.as_ref()),
        parties: primary
            .parties
            .as_ref()
            .map(|p| convert_parties(p, &HashMap::new()))
            .unwrap_or_default(),
        locations: primary.locations.clone().unwrap_or_default(),
        type_details: primary.type_details.clone().unwrap_or_default(),
        created_at,
        updated_at: parse_timestamp(primary.updated_at.as_ref()),
        id,
    }
}

/// Shipment entity status wins over the quotation status when present.
fn legacy_status(primary: &RawOrder, aux: &LegacyAuxiliaries) -> StatusCode {
    if let Some(code) = aux.shipment.as_ref().and_then(|s| s.status) {
        return status::legacy_shipment_status(code).unwrap_or_else(|| {
            tracing::warn!(shipment_id = %primary.id, code, "unknown legacy shipment status, using Confirmed");
            StatusCode::Confirmed
        });
    }

    match primary.status {
        Some(code) => status::legacy_quotation_status(code).unwrap_or_else(|| {
            tracing::warn!(shipment_id = %primary.id, code, "unknown legacy quotation status, using Draft");
            StatusCode::Draft
        }),
        None => StatusCode::Draft,
    }
}

fn legacy_type_details(primary: &RawOrder, aux: &LegacyAuxiliaries) -> TypeDetails {
    let mut details = match &aux.type_details {
        Some(legacy) => TypeDetails {
            carrier: legacy.carrier.clone(),
            vessel_name: legacy.vessel_name.clone(),
            voyage_number: legacy.voyage_number.clone(),
            flight_number: legacy.flight_number.clone(),
            vehicle_plate: legacy.vehicle_plate.clone(),
            customs: CustomsClearance::default(),
        },
        None => primary.type_details.clone().unwrap_or_default(),
    };

    if let Some(customs) = &aux.customs {
        details.customs = CustomsClearance {
            required: customs.required.unwrap_or(false),
            cleared: customs.cleared.unwrap_or(false),
            broker: customs.broker.clone(),
            entry_number: customs.entry_number.clone(),
        };
    }
    details
}

fn assemble_legacy(primary: &RawOrder, aux: &LegacyAuxiliaries) -> ShipmentOrder {
    let id = primary.id.trim().to_string();

    let order_type = legacy_order_type(
        primary.quotation_type.as_deref(),
        primary.quotation_category.as_deref(),
    )
    .unwrap_or_else(|| {
        tracing::warn!(
            shipment_id = %id,
            quotation_type = ?primary.quotation_type,
            quotation_category = ?primary.quotation_category,
            "unknown quotation type, falling back to SEA_FCL"
        );
        OrderType::SeaFcl
    });

    let created_at = parse_timestamp(primary.created_at.as_ref());
    let fallback_time = created_at.clone().unwrap_or_else(TimeStamp::epoch);
    let history = convert_history(
        &id,
        &primary.status_history,
        |code| {
            StatusCode::from_code(code)
                .or_else(|| status::legacy_quotation_status(code))
                .or_else(|| status::legacy_shipment_status(code))
        },
        &fallback_time,
    );

    let cargo = convert_cargo(aux.cargo.as_ref().or(primary.cargo.as_ref()));
    let locations = primary.locations.clone().unwrap_or_else(|| Locations {
        origin: primary.origin.clone(),
        destination: primary.destination.clone(),
        port_of_loading: primary.port_of_loading.clone(),
        port_of_discharge: primary.port_of_discharge.clone(),
    });

    ShipmentOrder {
        schema_version: LEGACY_SCHEMA,
        order_type,
        transaction_direction: parse_direction(primary),
        incoterm: primary.incoterm.clone(),
        status: legacy_status(primary, aux),
        status_history: history,
        exception: convert_exception(primary),
        issued_invoice: primary.issued_invoice.unwrap_or(false),
        cargo,
        parties: resolve_party_source(primary, aux).into_parties(),
        locations,
        type_details: legacy_type_details(primary, aux),
        created_at,
        updated_at: parse_timestamp(primary.updated_at.as_ref()),
        id,
    }
}
