//! Property-based tests for code and token generation
//!
//! These tests verify the format guarantees that callers rely on when
//! delivering codes to a human and storing tokens as identifiers.

use proptest::prelude::*;
use regex::Regex;
use rootguard_security::{constant_time_eq, digest, SecureCodeGenerator};

#[test]
fn test_six_and_eight_digit_codes_match_format() {
    let generator = SecureCodeGenerator::new();
    let six = Regex::new(r"^\d{6}$").unwrap();
    let eight = Regex::new(r"^\d{8}$").unwrap();

    for _ in 0..100 {
        assert!(six.is_match(&generator.generate_code(6).unwrap()));
        assert!(eight.is_match(&generator.generate_code(8).unwrap()));
    }
}

proptest! {
    /// Every generated code has exactly the requested number of ASCII digits.
    #[test]
    fn prop_code_length_and_alphabet(length in 1usize..64) {
        let code = SecureCodeGenerator::new().generate_code(length).unwrap();
        prop_assert_eq!(code.len(), length);
        prop_assert!(code.bytes().all(|b| b.is_ascii_digit()));
    }

    /// Tokens are lowercase hex, two characters per requested byte.
    #[test]
    fn prop_token_is_hex(byte_length in 1usize..128) {
        let token = SecureCodeGenerator::new().generate_token(byte_length).unwrap();
        prop_assert_eq!(token.len(), byte_length * 2);
        prop_assert!(token.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    /// Equal digests imply equal inputs for the values we hash (codes, tokens).
    #[test]
    fn prop_digest_distinguishes_codes(a in r"\d{6}", b in r"\d{6}") {
        prop_assert_eq!(digest(&a) == digest(&b), a == b);
        prop_assert_eq!(constant_time_eq(&a, &b), a == b);
    }
}
