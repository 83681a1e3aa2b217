//! One-time codes and opaque tokens
//!
//! Codes are short decimal strings meant to be typed by a human after being
//! delivered over a second channel. Tokens are hex-encoded random bytes used
//! as temp-token handles, session identifiers and request ids.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{Result, SecurityError};

/// Largest multiple of 10 that fits in a byte; bytes at or above it are
/// rejected so every digit is equally likely.
const DIGIT_REJECTION_BOUND: u8 = 250;

/// Upper bound on requested lengths, guarding against accidental huge allocations.
const MAX_LENGTH: usize = 1024;

/// Generator for numeric codes and hex tokens backed by the OS CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureCodeGenerator;

impl SecureCodeGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self
    }

    /// Generate a numeric code of exactly `length` digits.
    ///
    /// Leading zeros are allowed, so the result is always a string.
    pub fn generate_code(&self, length: usize) -> Result<String> {
        Self::check_length(length)?;

        let mut code = String::with_capacity(length);
        let mut buf = [0u8; 32];
        while code.len() < length {
            OsRng.fill_bytes(&mut buf);
            for byte in buf {
                if byte >= DIGIT_REJECTION_BOUND {
                    continue;
                }
                code.push(char::from(b'0' + byte % 10));
                if code.len() == length {
                    break;
                }
            }
        }

        Ok(code)
    }

    /// Generate `byte_length` random bytes, hex-encoded (two characters per byte).
    pub fn generate_token(&self, byte_length: usize) -> Result<String> {
        Self::check_length(byte_length)?;

        let mut bytes = vec![0u8; byte_length];
        OsRng.fill_bytes(&mut bytes);
        Ok(hex::encode(bytes))
    }

    /// Generate raw random bytes.
    pub fn generate_bytes<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }

    fn check_length(length: usize) -> Result<()> {
        if length == 0 || length > MAX_LENGTH {
            return Err(SecurityError::Validation {
                message: format!("Length must be between 1 and {}, got {}", MAX_LENGTH, length),
            });
        }
        Ok(())
    }
}

/// SHA-256 digest of `value`, hex-encoded.
///
/// Used wherever a high-entropy secret (token, code) has to be stored or
/// compared without keeping it in clear form.
pub fn digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Compare two strings without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_six_digits() {
        let generator = SecureCodeGenerator::new();
        let code = generator.generate_code(6).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_code_eight_digits() {
        let code = SecureCodeGenerator::new().generate_code(8).unwrap();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_code_rejects_zero_length() {
        let result = SecureCodeGenerator::new().generate_code(0);
        assert!(matches!(result, Err(SecurityError::Validation { .. })));
    }

    #[test]
    fn test_generate_token_is_hex_of_requested_size() {
        let token = SecureCodeGenerator::new().generate_token(32).unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let generator = SecureCodeGenerator::new();
        let a = generator.generate_token(32).unwrap();
        let b = generator.generate_token(32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_digits_cover_full_range() {
        let generator = SecureCodeGenerator::new();
        let code = generator.generate_code(1000).unwrap();
        for digit in '0'..='9' {
            assert!(code.contains(digit), "digit {} never generated", digit);
        }
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(digest("123456"), digest("123456"));
        assert_ne!(digest("123456"), digest("123457"));
        assert_eq!(digest("abc").len(), 64);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }
}
