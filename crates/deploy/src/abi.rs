//! ABI helpers for constructor arguments and contract calls.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256, keccak256},
};
use serde::{Deserialize, Serialize};

/// A concrete ABI value passed to a constructor or a contract method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
    Bytes32(B256),
}

impl ArgValue {
    /// Convert into the dynamic ABI representation.
    pub fn to_sol_value(&self) -> DynSolValue {
        match self {
            Self::Address(address) => DynSolValue::Address(*address),
            Self::Uint(value) => DynSolValue::Uint(*value, 256),
            Self::Bool(value) => DynSolValue::Bool(*value),
            Self::String(value) => DynSolValue::String(value.clone()),
            Self::Bytes32(value) => DynSolValue::FixedBytes(*value, 32),
        }
    }

    /// The address carried by this value, if any.
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(address) => Some(*address),
            _ => None,
        }
    }
}

impl From<Address> for ArgValue {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

/// ABI-encode a list of arguments as a parameter tuple (no selector).
pub fn encode_args(args: &[ArgValue]) -> Vec<u8> {
    if args.is_empty() {
        return Vec::new();
    }
    DynSolValue::Tuple(args.iter().map(ArgValue::to_sol_value).collect()).abi_encode_params()
}

/// The 4-byte selector of a canonical signature such as `grantRole(bytes32,address)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode calldata for a method call: selector followed by the encoded arguments.
pub fn encode_call(signature: &str, args: &[ArgValue]) -> Vec<u8> {
    let mut calldata = selector(signature).to_vec();
    calldata.extend(encode_args(args));
    calldata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_grant_role() {
        assert_eq!(selector("grantRole(bytes32,address)"), [0x2f, 0x2f, 0xf1, 0x5d]);
    }

    #[test]
    fn test_encode_call_pads_arguments() {
        let grantee = Address::repeat_byte(0x11);
        let role = B256::repeat_byte(0xab);
        let calldata = encode_call(
            "grantRole(bytes32,address)",
            &[ArgValue::Bytes32(role), ArgValue::Address(grantee)],
        );

        // selector + two static words
        assert_eq!(calldata.len(), 4 + 64);
        assert_eq!(&calldata[4..36], role.as_slice());
        assert_eq!(&calldata[36..48], &[0u8; 12]);
        assert_eq!(&calldata[48..68], grantee.as_slice());
    }

    #[test]
    fn test_encode_args_empty() {
        assert!(encode_args(&[]).is_empty());
        assert_eq!(encode_call("MINTER_ROLE()", &[]).len(), 4);
    }

    #[test]
    fn test_arg_value_serde_shape() {
        let value = ArgValue::Uint(U256::from(42u64));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "uint");

        let parsed: ArgValue = serde_json::from_str(
            r#"{"type":"address","value":"0x0000000000000000000000000000000000000001"}"#,
        )
        .unwrap();
        assert_eq!(parsed.as_address(), Some(Address::with_last_byte(1)));
    }
}
