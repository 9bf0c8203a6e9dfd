//! Transmitter catalog

use std::collections::{BTreeMap, HashMap};

use jap_protocol::TransmitterId;

/// A video source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmitter {
    pub id: TransmitterId,
    pub name: String,
    /// Carries USB over IP
    pub usb: bool,
    /// Static preview image
    pub image_url: Option<String>,
}

/// Fixed set of transmitters, looked up by id or display name
#[derive(Debug, Clone, Default)]
pub struct TransmitterCatalog {
    by_id: BTreeMap<TransmitterId, Transmitter>,
    by_name: HashMap<String, TransmitterId>,
}

impl TransmitterCatalog {
    /// Build a catalog; a later transmitter with a duplicate name shadows the earlier one
    pub fn new(transmitters: impl IntoIterator<Item = Transmitter>) -> Self {
        let mut catalog = Self::default();
        for tx in transmitters {
            catalog.by_name.insert(tx.name.clone(), tx.id);
            catalog.by_id.insert(tx.id, tx);
        }
        catalog
    }

    pub fn get(&self, id: TransmitterId) -> Option<&Transmitter> {
        self.by_id.get(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Transmitter> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    pub fn contains(&self, id: TransmitterId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Transmitter names ordered by transmitter id
    pub fn source_list(&self) -> Vec<&str> {
        self.by_id
            .values()
            .filter(|tx| self.by_name.get(&tx.name) == Some(&tx.id))
            .map(|tx| tx.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transmitter> {
        self.by_id.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: u16, name: &str) -> Transmitter {
        Transmitter {
            id: TransmitterId(id),
            name: name.to_string(),
            usb: false,
            image_url: None,
        }
    }

    #[test]
    fn test_source_list_sorted_by_id() {
        let catalog = TransmitterCatalog::new([tx(3, "Apple TV"), tx(1, "Cable 1"), tx(2, "Blu-ray")]);
        assert_eq!(catalog.source_list(), vec!["Cable 1", "Blu-ray", "Apple TV"]);
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = TransmitterCatalog::new([tx(1, "Cable 1"), tx(2, "Cable 2")]);
        assert_eq!(catalog.by_name("Cable 2").map(|t| t.id), Some(TransmitterId(2)));
        assert!(catalog.by_name("Cable 3").is_none());
    }

    #[test]
    fn test_duplicate_name_listed_once() {
        let catalog = TransmitterCatalog::new([tx(1, "Cable"), tx(2, "Cable")]);
        assert_eq!(catalog.source_list(), vec!["Cable"]);
        assert_eq!(catalog.by_name("Cable").map(|t| t.id), Some(TransmitterId(2)));
        assert_eq!(catalog.len(), 2);
    }
}
