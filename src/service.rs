//! Service layer API for shipment workflow operations
//!
//! Loads a record (a stored canonical snapshot, or one assembled from the raw
//! documents), applies one of the pure operations and saves the result with a
//! compare-and-swap against the snapshot that was loaded. A writer that lost
//! the race gets [`StoreError::ConcurrentModification`] and must reload.
use super::assembler::assemble;
use super::config::StoreConfig;
use super::error::{AssemblyError, StoreError, TransitionError};
use super::exception;
use super::raw::{
    LegacyAuxiliaries, LegacyCustoms, LegacyShipment, LegacyTypeDetails, RawCargo, RawCompany,
    RawOrder, decode_document,
};
use super::shipment::{
    HistoryEntry, NATIVE_SCHEMA, OrderType, ShipmentOrder, TimeStamp, TransactionDirection,
};
use super::status::StatusCode;
use super::transition::{self, Transition, TransitionContext};
use super::utils;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Orders,
    LegacyShipments,
    LegacyCargo,
    LegacyTypeDetails,
    LegacyCustoms,
    Companies,
    /// Snapshots written by this service.
    Canonical,
}

impl Collection {
    pub fn tree_name(&self) -> &'static str {
        match self {
            Collection::Orders => "orders",
            Collection::LegacyShipments => "legacy_shipments",
            Collection::LegacyCargo => "legacy_cargo",
            Collection::LegacyTypeDetails => "legacy_type_details",
            Collection::LegacyCustoms => "legacy_customs",
            Collection::Companies => "companies",
            Collection::Canonical => "canonical",
        }
    }
}

/// A record together with the snapshot it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedShipment {
    pub record: ShipmentOrder,
    snapshot: Option<Vec<u8>>,
}

impl LoadedShipment {
    /// Digest of the stored snapshot, `None` when the record has never been saved.
    pub fn revision(&self) -> Option<String> {
        self.snapshot.as_ref().map(|bytes| sha256::digest(bytes))
    }

    pub fn snapshot(&self) -> Option<&[u8]> {
        self.snapshot.as_deref()
    }
}

pub struct ShipmentService {
    instance: Arc<sled::Db>,
    flush_on_write: bool,
}

impl ShipmentService {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self {
            instance,
            flush_on_write: false,
        }
    }

    pub fn open(config: &StoreConfig) -> anyhow::Result<Self> {
        let db = config.sled_config().open()?;
        Ok(Self {
            instance: Arc::new(db),
            flush_on_write: config.flush_on_write,
        })
    }

    fn tree(&self, collection: Collection) -> anyhow::Result<sled::Tree> {
        Ok(self.instance.open_tree(collection.tree_name())?)
    }

    fn get_document<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> anyhow::Result<Option<T>> {
        match self.tree(collection)?.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode_document(collection.tree_name(), &bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a raw JSON document, as the document store would hold it.
    pub fn store_raw(
        &self,
        collection: Collection,
        id: &str,
        document: &serde_json::Value,
    ) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(document)?;
        self.tree(collection)?.insert(id.as_bytes(), bytes)?;
        Ok(())
    }

    fn load_auxiliaries(&self, id: &str, primary: &RawOrder) -> anyhow::Result<LegacyAuxiliaries> {
        let shipment: Option<LegacyShipment> = self.get_document(Collection::LegacyShipments, id)?;
        let cargo: Option<RawCargo> = self.get_document(Collection::LegacyCargo, id)?;
        let type_details: Option<LegacyTypeDetails> =
            self.get_document(Collection::LegacyTypeDetails, id)?;
        let customs: Option<LegacyCustoms> = self.get_document(Collection::LegacyCustoms, id)?;

        let mut company_ids: Vec<String> = vec![];
        if let Some(parties) = &primary.parties {
            company_ids.extend(parties.company_ids());
        }
        if let Some(parties) = shipment.as_ref().and_then(|s| s.parties.as_ref()) {
            company_ids.extend(parties.company_ids());
        }

        let mut company_names = HashMap::new();
        for company_id in company_ids {
            let company: Option<RawCompany> =
                self.get_document(Collection::Companies, &company_id)?;
            if let Some(name) = company.and_then(|c| c.name) {
                company_names.insert(company_id, name);
            }
        }

        Ok(LegacyAuxiliaries {
            shipment,
            cargo,
            type_details,
            customs,
            company_names,
        })
    }

    /// Load a shipment, preferring the latest saved snapshot over the raw documents.
    pub fn load(&self, id: &str) -> anyhow::Result<LoadedShipment> {
        // Saved snapshot first
        if let Some(bytes) = self.tree(Collection::Canonical)?.get(id.as_bytes())? {
            let record = ShipmentOrder::decode_snapshot(&bytes)
                .map_err(|e| StoreError::Decoding(e.to_string()))?;
            return Ok(LoadedShipment {
                record,
                snapshot: Some(bytes.to_vec()),
            });
        }

        // Otherwise assemble from the raw documents
        let Some(mut primary) = self.get_document::<RawOrder>(Collection::Orders, id)? else {
            return Err(AssemblyError::PrimaryNotFound(id.to_string()).into());
        };
        if primary.id.trim().is_empty() {
            primary.id = id.to_string();
        }

        // Native documents carry everything themselves
        let aux = match primary.schema_version {
            Some(version) if version >= NATIVE_SCHEMA => LegacyAuxiliaries::default(),
            _ => self.load_auxiliaries(id, &primary)?,
        };

        Ok(LoadedShipment {
            record: assemble(&primary, &aux)?,
            snapshot: None,
        })
    }

    /// Save `record` if the stored snapshot still equals `expected`.
    pub fn save(
        &self,
        record: &ShipmentOrder,
        expected: Option<&[u8]>,
    ) -> anyhow::Result<LoadedShipment> {
        let (hash, cbor) = record
            .encode_snapshot()
            .map_err(|e| StoreError::Encoding(e.to_string()))?;

        // Only swap if nobody wrote since `expected` was read
        let swapped = self.tree(Collection::Canonical)?.compare_and_swap(
            record.id.as_bytes(),
            expected,
            Some(cbor.clone()),
        )?;

        if swapped.is_err() {
            tracing::warn!(shipment_id = %record.id, "concurrent modification rejected");
            return Err(StoreError::ConcurrentModification {
                id: record.id.clone(),
            }
            .into());
        }

        // Persist to disk
        if self.flush_on_write {
            self.instance.flush()?;
        }
        tracing::info!(shipment_id = %record.id, revision = %hash, "shipment saved");

        Ok(LoadedShipment {
            record: record.clone(),
            snapshot: Some(cbor),
        })
    }

    fn update(
        &self,
        id: &str,
        op: impl FnOnce(&ShipmentOrder) -> Result<ShipmentOrder, TransitionError>,
    ) -> anyhow::Result<ShipmentOrder> {
        let loaded = self.load(id)?;
        // Rejected operations leave the store untouched
        let next = op(&loaded.record)?;
        let saved = self.save(&next, loaded.snapshot())?;
        Ok(saved.record)
    }

    /// Create a new native order in Draft.
    pub fn create_draft(
        &self,
        order_type: OrderType,
        transaction_direction: Option<TransactionDirection>,
        incoterm: Option<String>,
        ctx: &TransitionContext,
    ) -> anyhow::Result<ShipmentOrder> {
        let order = ShipmentOrder::new_draft(
            utils::new_shipment_id()?,
            order_type,
            transaction_direction,
            incoterm,
            ctx.at.clone(),
            ctx.actor.clone(),
        );

        Ok(self.save(&order, None)?.record)
    }

    pub fn transition(
        &self,
        id: &str,
        transition: Transition,
        ctx: &TransitionContext,
    ) -> anyhow::Result<ShipmentOrder> {
        self.update(id, |order| transition::apply_transition(order, transition, ctx))
    }

    pub fn advance(&self, id: &str, ctx: &TransitionContext) -> anyhow::Result<ShipmentOrder> {
        self.transition(id, Transition::Advance, ctx)
    }

    pub fn jump(
        &self,
        id: &str,
        target: StatusCode,
        ctx: &TransitionContext,
    ) -> anyhow::Result<ShipmentOrder> {
        self.transition(id, Transition::Jump { target }, ctx)
    }

    pub fn revert(
        &self,
        id: &str,
        target: StatusCode,
        ctx: &TransitionContext,
    ) -> anyhow::Result<ShipmentOrder> {
        self.transition(id, Transition::Revert { target }, ctx)
    }

    pub fn cancel(&self, id: &str, ctx: &TransitionContext) -> anyhow::Result<ShipmentOrder> {
        self.transition(id, Transition::Cancel, ctx)
    }

    /// Move to `target`, choosing the operation from where the shipment stands.
    pub fn request_status(
        &self,
        id: &str,
        target: StatusCode,
        allow_jump: bool,
        ctx: &TransitionContext,
    ) -> anyhow::Result<ShipmentOrder> {
        self.update(id, |order| {
            let transition = Transition::towards(order, target, allow_jump)?;
            transition::apply_transition(order, transition, ctx)
        })
    }

    pub fn set_exception(
        &self,
        id: &str,
        flagged: bool,
        notes: Option<String>,
        at: &TimeStamp,
        actor: &str,
    ) -> anyhow::Result<ShipmentOrder> {
        self.update(id, |order| {
            Ok(exception::set_exception(order, flagged, notes, at, actor))
        })
    }

    pub fn set_issued_invoice(
        &self,
        id: &str,
        issued: bool,
        at: &TimeStamp,
    ) -> anyhow::Result<ShipmentOrder> {
        self.update(id, |order| transition::set_issued_invoice(order, issued, at))
    }

    pub fn history(&self, id: &str) -> anyhow::Result<Vec<HistoryEntry>> {
        Ok(self.load(id)?.record.status_history)
    }

    pub fn available_transitions(&self, id: &str) -> anyhow::Result<Vec<Transition>> {
        Ok(transition::available_transitions(&self.load(id)?.record))
    }
}
