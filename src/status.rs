//! Closed set of shipment status codes and the tables that map historical
//! code spaces onto it.
//!
//! Declaration order of [`StatusCode`] is the canonical progression order;
//! the two side statuses sort after every path status.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Draft,
    PendingReview,
    Confirmed,
    BookingPending,
    BookingConfirmed,
    Departed,
    Arrived,
    Completed,
    Cancelled,
    Exception,
}

impl StatusCode {
    pub const ALL: [StatusCode; 10] = [
        StatusCode::Draft,
        StatusCode::PendingReview,
        StatusCode::Confirmed,
        StatusCode::BookingPending,
        StatusCode::BookingConfirmed,
        StatusCode::Departed,
        StatusCode::Arrived,
        StatusCode::Completed,
        StatusCode::Cancelled,
        StatusCode::Exception,
    ];

    /// Integer persisted in the `status` field of native records.
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Draft => 1001,
            StatusCode::PendingReview => 1002,
            StatusCode::Confirmed => 2001,
            StatusCode::BookingPending => 3001,
            StatusCode::BookingConfirmed => 3002,
            StatusCode::Departed => 4001,
            StatusCode::Arrived => 4002,
            StatusCode::Completed => 5001,
            StatusCode::Cancelled => 9001,
            StatusCode::Exception => 9002,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| i64::from(s.code()) == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusCode::Draft => "Draft",
            StatusCode::PendingReview => "Pending Review",
            StatusCode::Confirmed => "Confirmed",
            StatusCode::BookingPending => "Booking Pending",
            StatusCode::BookingConfirmed => "Booking Confirmed",
            StatusCode::Departed => "Departed",
            StatusCode::Arrived => "Arrived",
            StatusCode::Completed => "Completed",
            StatusCode::Cancelled => "Cancelled",
            StatusCode::Exception => "Exception",
        }
    }

    /// Cancelled and Exception live outside every path.
    pub fn is_side_status(self) -> bool {
        matches!(self, StatusCode::Cancelled | StatusCode::Exception)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<C> minicbor::Encode<C> for StatusCode {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.u16(self.code())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for StatusCode {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let code = d.u16()?;

        StatusCode::from_code(i64::from(code)).ok_or(minicbor::decode::Error::message(
            "unknown status code in shipment snapshot",
        ))
    }
}

// Status codes found on the old shipment sub-entity. The first block is the
// original shipment code set, the second block covers records whose shipment
// entity was later written with current codes.
const LEGACY_SHIPMENT_STATUS: &[(i64, StatusCode)] = &[
    (4000, StatusCode::Confirmed),
    (4050, StatusCode::Confirmed),
    (4100, StatusCode::BookingPending),
    (4105, StatusCode::BookingConfirmed),
    (4110, StatusCode::Departed),
    (4120, StatusCode::Arrived),
    (4130, StatusCode::Completed),
    (4190, StatusCode::Cancelled),
    (4199, StatusCode::Exception),
    (1001, StatusCode::Draft),
    (1002, StatusCode::PendingReview),
    (2001, StatusCode::Confirmed),
    (3001, StatusCode::BookingPending),
    (3002, StatusCode::BookingConfirmed),
    (4001, StatusCode::Departed),
    (4002, StatusCode::Arrived),
    (5001, StatusCode::Completed),
    (9001, StatusCode::Cancelled),
    (9002, StatusCode::Exception),
];

// Status codes found on the top-level legacy quotation document.
const LEGACY_QUOTATION_STATUS: &[(i64, StatusCode)] = &[
    (0, StatusCode::Draft),
    (10, StatusCode::PendingReview),
    (20, StatusCode::Confirmed),
    (25, StatusCode::Confirmed),
    (30, StatusCode::Cancelled),
    (40, StatusCode::Cancelled),
    (50, StatusCode::Completed),
    (1001, StatusCode::Draft),
    (1002, StatusCode::PendingReview),
    (2001, StatusCode::Confirmed),
    (3001, StatusCode::BookingPending),
    (3002, StatusCode::BookingConfirmed),
    (4001, StatusCode::Departed),
    (4002, StatusCode::Arrived),
    (5001, StatusCode::Completed),
    (9001, StatusCode::Cancelled),
    (9002, StatusCode::Exception),
];

fn lookup(table: &[(i64, StatusCode)], code: i64) -> Option<StatusCode> {
    table
        .iter()
        .find(|(legacy, _)| *legacy == code)
        .map(|(_, status)| *status)
}

/// Maps a shipment sub-entity status code, `None` when the code is unknown.
pub fn legacy_shipment_status(code: i64) -> Option<StatusCode> {
    lookup(LEGACY_SHIPMENT_STATUS, code)
}

/// Maps a top-level legacy quotation status code, `None` when the code is unknown.
pub fn legacy_quotation_status(code: i64) -> Option<StatusCode> {
    lookup(LEGACY_QUOTATION_STATUS, code)
}
