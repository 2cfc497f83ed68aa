use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BoardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Applied,
    Rejected,
    OnlineAssessment,
    Interview,
    Offer,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Applied,
        Status::Rejected,
        Status::OnlineAssessment,
        Status::Interview,
        Status::Offer,
    ];

    /// Symbolic spelling used on the client side and as drop-zone ids.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Applied => "APPLIED",
            Status::Rejected => "REJECTED",
            Status::OnlineAssessment => "ONLINE_ASSESSMENT",
            Status::Interview => "INTERVIEW",
            Status::Offer => "OFFER",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Rejected => "Rejected",
            Status::OnlineAssessment => "Online Assessment",
            Status::Interview => "Interview",
            Status::Offer => "Offer",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|s| s.as_str() == symbol)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient parse for user input: case-insensitive, `-` and spaces count as `_`.
impl FromStr for Status {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match normalized.as_str() {
            "OA" => Ok(Status::OnlineAssessment),
            other => Status::from_symbol(other).ok_or_else(|| {
                BoardError::validation(
                    "status",
                    format!(
                        "'{}' is not a status (expected one of: {})",
                        s,
                        Status::ALL.map(Status::as_str).join(", ")
                    ),
                )
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vocabulary {
    /// Applied, Interview, Offer, Rejected.
    V1,
    /// Applied, Rejected, OnlineAssessment, Interview, Offer.
    V2,
}

impl Vocabulary {
    pub const CURRENT: Vocabulary = Vocabulary::V2;

    fn table(self) -> &'static [Status] {
        match self {
            Vocabulary::V1 => &V1_TABLE,
            Vocabulary::V2 => &V2_TABLE,
        }
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vocabulary::V1 => f.write_str("v1"),
            Vocabulary::V2 => f.write_str("v2"),
        }
    }
}

// Index is the wire ordinal. Never reorder without a migration.
const V1_TABLE: [Status; 4] = [
    Status::Applied,
    Status::Interview,
    Status::Offer,
    Status::Rejected,
];

const V2_TABLE: [Status; 5] = [
    Status::Applied,
    Status::Rejected,
    Status::OnlineAssessment,
    Status::Interview,
    Status::Offer,
];

pub fn encode(status: Status) -> i64 {
    match status {
        Status::Applied => 0,
        Status::Rejected => 1,
        Status::OnlineAssessment => 2,
        Status::Interview => 3,
        Status::Offer => 4,
    }
}

/// Decode a canonical ordinal. Out-of-range ordinals are an error, never a default.
pub fn decode(ordinal: i64) -> Result<Status> {
    decode_versioned(ordinal, Vocabulary::CURRENT)
}

pub fn encode_versioned(status: Status, vocabulary: Vocabulary) -> Result<i64> {
    vocabulary
        .table()
        .iter()
        .position(|s| *s == status)
        .map(|idx| idx as i64)
        .ok_or(BoardError::UnmappedStatus { status, vocabulary })
}

pub fn decode_versioned(ordinal: i64, vocabulary: Vocabulary) -> Result<Status> {
    usize::try_from(ordinal)
        .ok()
        .and_then(|idx| vocabulary.table().get(idx).copied())
        .ok_or_else(|| {
            tracing::warn!(ordinal, %vocabulary, "rejecting unknown status ordinal");
            BoardError::UnknownStatusOrdinal { ordinal, vocabulary }
        })
}

pub fn migrate_ordinal(ordinal: i64, from: Vocabulary, to: Vocabulary) -> Result<i64> {
    let status = decode_versioned(ordinal, from)?;
    encode_versioned(status, to)
}
