//! Local secp256k1 signer for EIP-155 legacy transactions.

use alloy_core::{
    primitives::{Address, B256, Bytes, U256, keccak256},
    rlp::{EMPTY_STRING_CODE, Encodable, Header},
};
use anyhow::Context;
use k256::ecdsa::SigningKey;

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    /// `None` creates a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

impl LegacyTransaction {
    fn encode_fields(&self, out: &mut Vec<u8>) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        match self.to {
            Some(to) => to.encode(out),
            None => out.push(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.input.encode(out);
    }

    /// RLP list of the transaction fields followed by `tail`.
    fn rlp_with_tail(&self, tail: &[&dyn Encodable]) -> Vec<u8> {
        let mut payload = Vec::new();
        self.encode_fields(&mut payload);
        for field in tail {
            field.encode(&mut payload);
        }

        let mut out = Vec::with_capacity(payload.len() + 9);
        Header {
            list: true,
            payload_length: payload.len(),
        }
        .encode(&mut out);
        out.extend_from_slice(&payload);
        out
    }

    /// The EIP-155 signing hash for `chain_id`.
    pub fn signing_hash(&self, chain_id: u64) -> B256 {
        keccak256(self.rlp_with_tail(&[&chain_id, &0u8, &0u8]))
    }
}

/// Holds the deployer key and signs transactions with it.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalSigner {
    /// Parse a hex-encoded private key, with or without `0x` prefix.
    pub fn from_hex(private_key: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(private_key.trim().trim_start_matches("0x"))
            .context("Private key is not valid hex")?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Private key must be exactly 32 bytes"))?;

        let key = SigningKey::from_bytes(&bytes.into())
            .map_err(|e| anyhow::anyhow!("Invalid secp256k1 private key: {}", e))?;
        let address = address_of(&key);

        Ok(Self { key, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign `tx` for `chain_id` and return the raw transaction bytes.
    pub fn sign_legacy(&self, tx: &LegacyTransaction, chain_id: u64) -> anyhow::Result<Bytes> {
        let hash = tx.signing_hash(chain_id);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .context("Failed to sign transaction")?;

        let signature = signature.to_bytes();
        let r = U256::from_be_slice(&signature[..32]);
        let s = U256::from_be_slice(&signature[32..]);
        let v = u64::from(recovery_id.to_byte()) + chain_id * 2 + 35;

        Ok(Bytes::from(tx.rlp_with_tail(&[&v, &r, &s])))
    }
}

/// Ethereum address of a secp256k1 key: last 20 bytes of keccak256(uncompressed pubkey).
fn address_of(key: &SigningKey) -> Address {
    let public_key = key.verifying_key().to_encoded_point(false);
    // Skip the 0x04 uncompressed marker.
    let hash = keccak256(&public_key.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_address_derivation() {
        let signer = LocalSigner::from_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        assert_eq!(
            signer.address(),
            Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );
    }

    #[test]
    fn test_invalid_keys() {
        assert!(LocalSigner::from_hex("0x1234").is_err());
        assert!(LocalSigner::from_hex("not hex at all").is_err());
        assert!(LocalSigner::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = LocalSigner::from_hex(&"46".repeat(32)).unwrap();
        let debug = format!("{:?}", signer);
        assert!(debug.contains("address"));
        assert!(!debug.contains(&"46".repeat(32)));
    }

    /// The example transaction from EIP-155.
    #[test]
    fn test_eip155_example() {
        let signer = LocalSigner::from_hex(&"46".repeat(32)).unwrap();
        let tx = LegacyTransaction {
            nonce: U256::from(9u64),
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: U256::from(21_000u64),
            to: Some(Address::repeat_byte(0x35)),
            value: U256::from(1_000_000_000_000_000_000u64),
            input: Bytes::new(),
        };

        assert_eq!(
            hex::encode(tx.signing_hash(1)),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );

        let raw = signer.sign_legacy(&tx, 1).unwrap();
        assert_eq!(
            hex::encode(raw),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_contract_creation_encodes_empty_to() {
        let tx = LegacyTransaction {
            nonce: U256::ZERO,
            gas_price: U256::from(1u64),
            gas_limit: U256::from(100_000u64),
            to: None,
            value: U256::ZERO,
            input: Bytes::from(vec![0x60, 0x80]),
        };
        let mut fields = Vec::new();
        tx.encode_fields(&mut fields);
        // nonce (0x80), gas price (0x01), gas limit (0x83 + 3 bytes), to (0x80)
        assert_eq!(&fields[..7], &[0x80, 0x01, 0x83, 0x01, 0x86, 0xa0, 0x80]);
    }
}
