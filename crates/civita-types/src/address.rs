//! Participant identity.

use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Bech32m human-readable prefix for rendered identities.
const HRP: &str = "civ";

/// 20-byte participant identity.
///
/// Rendered as Bech32m (`civ1...`). Hex with a `0x` prefix is accepted on
/// parse, for fixtures and config files.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const LEN: usize = 20;
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, TypesError> {
        let bytes: [u8; Self::LEN] = slice
            .try_into()
            .map_err(|_| TypesError::InvalidAddressLength(slice.len()))?;
        Ok(Self(bytes))
    }

    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; Self::LEN]
    }

    /// Hex rendering without the `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn decode_bech32(s: &str) -> Result<Self, TypesError> {
        let (hrp, data) =
            bech32::decode(s).map_err(|e| TypesError::Bech32Error(e.to_string()))?;
        if hrp != bech32::Hrp::parse_unchecked(HRP) {
            return Err(TypesError::InvalidAddressFormat(format!(
                "expected '{}' prefix, got '{}'",
                HRP, hrp
            )));
        }
        Self::from_slice(&data)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = bech32::Hrp::parse_unchecked(HRP);
        let encoded =
            bech32::encode::<bech32::Bech32m>(hrp, &self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.to_hex())
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let bytes = hex::decode(stripped)?;
            return Self::from_slice(&bytes);
        }
        if s.starts_with(HRP) {
            return Self::decode_bech32(s);
        }
        Err(TypesError::InvalidAddressFormat(s.to_string()))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_bytes([9u8; 20]).is_zero());
    }

    #[test]
    fn test_slice_length_checked() {
        assert!(Address::from_slice(&[5u8; 20]).is_ok());
        for wrong in [0usize, 19, 21, 32] {
            let err = Address::from_slice(&vec![0u8; wrong]).unwrap_err();
            assert_eq!(err, TypesError::InvalidAddressLength(wrong));
        }
    }

    #[test]
    fn test_bech32m_display_roundtrip() {
        let mut bytes = [0u8; 20];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i * 7) as u8;
        }
        let addr = Address::from_bytes(bytes);

        let rendered = addr.to_string();
        assert!(rendered.starts_with("civ1"));
        assert_eq!(rendered.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_hex_parse_roundtrip() {
        let addr = Address::from_bytes([0xcd; 20]);
        assert_eq!(format!("{:x}", addr), format!("0x{}", "cd".repeat(20)));
        assert_eq!(format!("{:x}", addr).parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_rejects_malformed_input() {
        // No recognized prefix
        assert!(Address::from_str("hello").is_err());
        // Wrong Bech32 prefix
        assert!(Address::from_str("merk1qqqq").is_err());
        // Hex of the wrong width
        assert!(Address::from_str("0xabcd").is_err());
        // Non-hex payload
        assert!(Address::from_str("0xzz").is_err());
    }
}
