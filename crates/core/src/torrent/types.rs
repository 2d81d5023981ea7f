//! Types for torrent records and delivery destinations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A download daemon kind that magnets can be delivered to.
///
/// Each variant owns exactly one delivery flag column in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Transmission daemon (session-handshake RPC).
    Transmission,
    /// aria2 daemon (token JSON-RPC).
    Aria2,
}

impl Destination {
    /// Every known destination, in dispatch order.
    pub const ALL: [Destination; 2] = [Destination::Transmission, Destination::Aria2];

    /// Returns the string representation used in logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Transmission => "transmission",
            Destination::Aria2 => "aria2",
        }
    }

    /// Storage column holding the delivery flag for this destination.
    pub fn column(&self) -> &'static str {
        match self {
            Destination::Transmission => "delivered_transmission",
            Destination::Aria2 => "delivered_aria2",
        }
    }

    /// Column name used by databases written before the rename.
    pub(crate) fn legacy_column(&self) -> &'static str {
        match self {
            Destination::Transmission => "pushed_to_transmission",
            Destination::Aria2 => "pushed_to_aria2",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "transmission" => Ok(Destination::Transmission),
            "aria2" => Ok(Destination::Aria2),
            other => Err(format!("unknown destination: {}", other)),
        }
    }
}

/// Per-destination delivery flags for a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryState {
    pub transmission: bool,
    pub aria2: bool,
}

impl DeliveryState {
    /// Whether the record has been handed to `destination`.
    pub fn is_delivered(&self, destination: Destination) -> bool {
        match destination {
            Destination::Transmission => self.transmission,
            Destination::Aria2 => self.aria2,
        }
    }

    /// Flag the record as delivered to `destination`. There is no way back.
    pub fn mark(&mut self, destination: Destination) {
        match destination {
            Destination::Transmission => self.transmission = true,
            Destination::Aria2 => self.aria2 = true,
        }
    }
}

/// One torrent listing entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Torrent {
    /// Index-assigned identifier (from `/view/<id>`). Zero means "not parsed".
    pub id: u64,
    /// Display title.
    pub name: String,
    /// Magnet URI, empty when the listing had none.
    pub magnet: String,
    /// Category label, possibly empty.
    pub category: String,
    /// Human-readable size, as shown by the index.
    pub size: String,
    /// Publication date, as shown by the index.
    pub date: String,
    /// Delivery flags.
    #[serde(default)]
    pub delivered: DeliveryState,
}

impl Torrent {
    /// Create a record with the given id and name and everything else empty.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the magnet URI.
    pub fn with_magnet(mut self, magnet: impl Into<String>) -> Self {
        self.magnet = magnet.into();
        self
    }

    /// Set the category label.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the size and date columns.
    pub fn with_size_and_date(mut self, size: impl Into<String>, date: impl Into<String>) -> Self {
        self.size = size.into();
        self.date = date.into();
        self
    }

    /// Largest id the store can key on (SQLite INTEGER is signed 64-bit).
    pub const MAX_ID: u64 = i64::MAX as u64;

    /// A record is only worth storing if the index id was parsed and fits
    /// the store's key.
    pub fn is_valid(&self) -> bool {
        (1..=Self::MAX_ID).contains(&self.id)
    }

    pub fn has_magnet(&self) -> bool {
        !self.magnet.is_empty()
    }

    /// Whether this record should be sent to `destination`.
    pub fn is_pending_for(&self, destination: Destination) -> bool {
        self.has_magnet() && !self.delivered.is_delivered(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_as_str_and_column() {
        assert_eq!(Destination::Transmission.as_str(), "transmission");
        assert_eq!(Destination::Aria2.as_str(), "aria2");
        assert_eq!(Destination::Transmission.column(), "delivered_transmission");
        assert_eq!(Destination::Aria2.column(), "delivered_aria2");
    }

    #[test]
    fn test_destination_from_str() {
        assert_eq!("Transmission".parse::<Destination>(), Ok(Destination::Transmission));
        assert_eq!("aria2".parse::<Destination>(), Ok(Destination::Aria2));
        assert!("qbittorrent".parse::<Destination>().is_err());
    }

    #[test]
    fn test_destination_serialization() {
        assert_eq!(
            serde_json::to_string(&Destination::Transmission).unwrap(),
            "\"transmission\""
        );
    }

    #[test]
    fn test_delivery_state_mark() {
        let mut state = DeliveryState::default();
        assert!(!state.is_delivered(Destination::Transmission));

        state.mark(Destination::Transmission);
        assert!(state.is_delivered(Destination::Transmission));
        assert!(!state.is_delivered(Destination::Aria2));
    }

    #[test]
    fn test_torrent_validity() {
        assert!(Torrent::new(1, "ok").is_valid());
        assert!(!Torrent::new(0, "no id").is_valid());
        assert!(Torrent::new(Torrent::MAX_ID, "largest").is_valid());
        assert!(!Torrent::new(Torrent::MAX_ID + 1, "too big").is_valid());
        assert!(!Torrent::new(u64::MAX, "too big").is_valid());
    }

    #[test]
    fn test_pending_requires_magnet() {
        let without = Torrent::new(10, "No magnet");
        assert!(!without.is_pending_for(Destination::Transmission));
        assert!(!without.is_pending_for(Destination::Aria2));

        let mut with = Torrent::new(11, "Magnet").with_magnet("magnet:?xt=urn:btih:abc");
        assert!(with.is_pending_for(Destination::Transmission));

        with.delivered.mark(Destination::Transmission);
        assert!(!with.is_pending_for(Destination::Transmission));
        assert!(with.is_pending_for(Destination::Aria2));
    }
}
