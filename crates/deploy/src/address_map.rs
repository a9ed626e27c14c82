//! Run-scoped, append-only mapping from logical names to deployed addresses.

use std::fmt;

use alloy_core::primitives::{Address, B256};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

use crate::{abi::ArgValue, error::LookupError};

/// A contract instantiated during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    pub logical_name: String,
    pub address: Address,
    /// Hash of the confirmed creation transaction.
    pub tx_hash: B256,
    pub block_number: u64,
    /// Constructor arguments after reference resolution.
    pub constructor_args: Vec<ArgValue>,
}

/// Addresses produced by the deployment phase, in deployment order.
///
/// Entries can only be appended; an existing name is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressMap {
    entries: Vec<(String, Address)>,
}

impl AddressMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the address of a freshly deployed contract.
    ///
    /// Returns `false` and leaves the map untouched if the name is already present.
    pub fn insert(&mut self, logical_name: impl Into<String>, address: Address) -> bool {
        let logical_name = logical_name.into();
        if self.contains(&logical_name) {
            return false;
        }
        self.entries.push((logical_name, address));
        true
    }

    pub fn get(&self, logical_name: &str) -> Result<Address, LookupError> {
        self.entries
            .iter()
            .find(|(name, _)| name == logical_name)
            .map(|(_, address)| *address)
            .ok_or_else(|| LookupError(logical_name.to_string()))
    }

    pub fn contains(&self, logical_name: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == logical_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(logical_name, address)` in deployment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.entries
            .iter()
            .map(|(name, address)| (name.as_str(), *address))
    }
}

impl Serialize for AddressMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, address) in &self.entries {
            map.serialize_entry(name, address)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AddressMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AddressMapVisitor;

        impl<'de> Visitor<'de> for AddressMapVisitor {
            type Value = AddressMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of logical names to addresses")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = AddressMap::new();
                while let Some((name, address)) = access.next_entry::<String, Address>()? {
                    if !map.insert(name.clone(), address) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate logical name `{}`",
                            name
                        )));
                    }
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(AddressMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_append_only() {
        let mut map = AddressMap::new();
        assert!(map.insert("UserRegistry", Address::with_last_byte(1)));
        assert!(!map.insert("UserRegistry", Address::with_last_byte(2)));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("UserRegistry").unwrap(), Address::with_last_byte(1));
    }

    #[test]
    fn test_get_missing_is_lookup_error() {
        let map = AddressMap::new();
        assert_eq!(
            map.get("SkillToken"),
            Err(LookupError("SkillToken".to_string()))
        );
    }

    #[test]
    fn test_serialization_keeps_deployment_order() {
        let mut map = AddressMap::new();
        map.insert("SkillToken", Address::with_last_byte(3));
        map.insert("ReputationToken", Address::with_last_byte(4));
        map.insert("ProjectEscrow", Address::with_last_byte(5));

        let json = serde_json::to_string(&map).unwrap();
        let token = json.find("SkillToken").unwrap();
        let reputation = json.find("ReputationToken").unwrap();
        let escrow = json.find("ProjectEscrow").unwrap();
        assert!(token < reputation && reputation < escrow);

        let parsed: AddressMap = serde_json::from_str(&json).unwrap();
        let names: Vec<_> = parsed.iter().map(|(name, _)| name.to_string()).collect();
        assert_eq!(names, ["SkillToken", "ReputationToken", "ProjectEscrow"]);
    }
}
