use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::ValidationError;

pub const PIN_LENGTH: usize = 4;
pub const SALT_LEN: usize = 16;
pub const DIGEST_LEN: usize = 32;

#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if input.len() == PIN_LENGTH && input.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Pin(input.to_owned()))
        } else {
            Err(ValidationError::InvalidPin)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Pin {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Pin::parse(value)
    }
}

// Never print the digits.
impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PinHash {
    salt: [u8; SALT_LEN],
    digest: [u8; DIGEST_LEN],
}

impl PinHash {
    pub fn new(pin: &Pin) -> Self {
        Self::with_salt(rand::random(), pin)
    }

    pub fn with_salt(salt: [u8; SALT_LEN], pin: &Pin) -> Self {
        PinHash {
            salt,
            digest: digest(&salt, pin.as_str()),
        }
    }

    pub fn from_parts(salt: [u8; SALT_LEN], digest: [u8; DIGEST_LEN]) -> Self {
        PinHash { salt, digest }
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    // Malformed input is simply a mismatch. The compare does not short-circuit.
    pub fn verify(&self, supplied: &str) -> bool {
        let candidate = digest(&self.salt, supplied);
        candidate
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for PinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinHash").finish_non_exhaustive()
    }
}

fn digest(salt: &[u8; SALT_LEN], pin: &str) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(pin.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_pin() {
        assert_eq!(Pin::parse("0420").unwrap().as_str(), "0420");
    }

    #[test]
    fn test_parse_rejects_malformed_pins() {
        for input in ["", "123", "12345", "12a4", " 123", "１２３４"] {
            assert_eq!(
                Pin::parse(input),
                Err(ValidationError::InvalidPin),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_verify() {
        let pin = Pin::parse("1234").unwrap();
        let hash = PinHash::new(&pin);

        assert!(hash.verify("1234"));
        assert!(!hash.verify("4321"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn test_salt_changes_digest() {
        let pin = Pin::parse("1234").unwrap();
        let a = PinHash::with_salt([1; SALT_LEN], &pin);
        let b = PinHash::with_salt([2; SALT_LEN], &pin);

        assert_ne!(a.digest(), b.digest());
        assert!(a.verify("1234"));
        assert!(b.verify("1234"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let pin = Pin::parse("9876").unwrap();
        assert!(!format!("{:?}", pin).contains("9876"));
    }
}
