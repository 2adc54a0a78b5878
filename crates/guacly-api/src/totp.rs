//! HOTP (RFC 4226) and TOTP (RFC 6238) code generation for the
//! `guac-totp` login field.
//!
//! [`hotp`] is pure: the same secret and counter always yield the same
//! code. Wall-clock time enters only through a [`Clock`], so tests can pin
//! the time step with [`FixedClock`].

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::Error;

/// TOTP time-step length in seconds.
pub const TOTP_PERIOD_SECS: u64 = 30;

/// Number of digits in a generated code.
pub const CODE_DIGITS: usize = 6;

const CODE_MODULUS: u32 = 1_000_000;

// ── Clock ───────────────────────────────────────────────────────────

/// Source of the current Unix time.
pub trait Clock: Send + Sync {
    fn unix_time(&self) -> u64;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_time(&self) -> u64 {
        // Clocks set before 1970 collapse to the first time step.
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock frozen at a fixed Unix timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn unix_time(&self) -> u64 {
        self.0
    }
}

// ── Secret decoding ─────────────────────────────────────────────────

/// Decode a base32 (RFC 4648) secret.
///
/// Case-insensitive, ignores whitespace, and accepts the secret with or
/// without `=` padding. Anything that is not exact base32 is rejected.
pub fn decode_secret(secret: &str) -> Result<Vec<u8>, Error> {
    let cleaned: String = secret
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let unpadded = cleaned.trim_end_matches('=');

    if unpadded.is_empty() {
        return Err(Error::InvalidSecret("secret is empty".into()));
    }

    if let Some(bad) = unpadded
        .chars()
        .find(|c| !matches!(c, 'A'..='Z' | '2'..='7'))
    {
        return Err(Error::InvalidSecret(format!(
            "character {bad:?} is not in the base32 alphabet"
        )));
    }

    // Unpadded base32 groups end on 2, 4, 5, 7 or 8 characters; anything
    // else would drop bits.
    if matches!(unpadded.len() % 8, 1 | 3 | 6) {
        return Err(Error::InvalidSecret(format!(
            "length {} is not a valid base32 length",
            unpadded.len()
        )));
    }

    base32::decode(base32::Alphabet::Rfc4648 { padding: false }, unpadded)
        .ok_or_else(|| Error::InvalidSecret("base32 decoding failed".into()))
}

// ── HOTP / TOTP ─────────────────────────────────────────────────────

/// Compute the 6-digit HOTP code for a base32 secret and counter.
pub fn hotp(secret: &str, counter: u64) -> Result<String, Error> {
    let key = decode_secret(secret)?;
    hotp_raw(&key, counter)
}

/// Compute the 6-digit HOTP code for raw key bytes.
pub fn hotp_raw(key: &[u8], counter: u64) -> Result<String, Error> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key)
        .map_err(|e| Error::InvalidSecret(format!("unusable HMAC key: {e}")))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation, RFC 4226 §5.3.
    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    let mut word = [0u8; 4];
    word.copy_from_slice(&digest[offset..offset + 4]);
    let code = (u32::from_be_bytes(word) & 0x7fff_ffff) % CODE_MODULUS;

    Ok(format!("{code:0width$}", width = CODE_DIGITS))
}

/// The TOTP counter for a Unix timestamp.
pub fn time_step(unix_seconds: u64) -> u64 {
    unix_seconds / TOTP_PERIOD_SECS
}

/// TOTP code for the current system time.
pub fn totp(secret: &str) -> Result<String, Error> {
    totp_with(secret, &SystemClock)
}

/// TOTP code at an explicit Unix timestamp.
pub fn totp_at(secret: &str, unix_seconds: u64) -> Result<String, Error> {
    hotp(secret, time_step(unix_seconds))
}

/// TOTP code using the supplied clock.
pub fn totp_with(secret: &str, clock: &dyn Clock) -> Result<String, Error> {
    totp_at(secret, clock.unix_time())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    /// Base32 of the ASCII key "12345678901234567890" from RFC 4226 Appendix D.
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn rfc4226_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, code) in (0u64..).zip(expected) {
            assert_eq!(hotp(RFC_SECRET, counter).unwrap(), code, "counter {counter}");
        }
    }

    #[test]
    fn rfc6238_sha1_vectors_truncated_to_six_digits() {
        let cases = [
            (59, "287082"),
            (1_111_111_109, "081804"),
            (1_111_111_111, "050471"),
            (1_234_567_890, "005924"),
            (2_000_000_000, "279037"),
        ];
        for (time, code) in cases {
            assert_eq!(totp_at(RFC_SECRET, time).unwrap(), code, "time {time}");
        }
    }

    #[test]
    fn codes_are_zero_padded() {
        let code = totp_at(RFC_SECRET, 1_234_567_890).unwrap();
        assert_eq!(code.len(), CODE_DIGITS);
        assert!(code.starts_with("00"));
    }

    #[test]
    fn hotp_is_deterministic() {
        let a = hotp("JBSWY3DPEHPK3PXP", 42).unwrap();
        let b = hotp("JBSWY3DPEHPK3PXP", 42).unwrap();
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn same_window_same_code() {
        let start = 1_700_000_010;
        let window_start = start - start % TOTP_PERIOD_SECS;
        let a = totp_with(RFC_SECRET, &FixedClock(window_start)).unwrap();
        let b = totp_with(RFC_SECRET, &FixedClock(window_start + TOTP_PERIOD_SECS - 1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn next_window_uses_next_counter() {
        let t = 1_700_000_010;
        let next = t - t % TOTP_PERIOD_SECS + TOTP_PERIOD_SECS;
        assert_eq!(time_step(next), time_step(t) + 1);
        assert_eq!(
            totp_at(RFC_SECRET, next).unwrap(),
            hotp(RFC_SECRET, time_step(t) + 1).unwrap()
        );
    }

    #[test]
    fn secret_decoding_is_loose() {
        let upper = decode_secret("JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(decode_secret("jbswy3dpehpk3pxp").unwrap(), upper);
        assert_eq!(decode_secret("JBSW Y3DP EHPK 3PXP").unwrap(), upper);
        // "MZXQ" needs padding in strict base32.
        assert_eq!(decode_secret("MZXQ").unwrap(), b"fo");
        assert_eq!(decode_secret("MZXQ====").unwrap(), b"fo");
    }

    #[test]
    fn invalid_secrets_fail() {
        assert!(matches!(decode_secret(""), Err(Error::InvalidSecret(_))));
        assert!(matches!(decode_secret("===="), Err(Error::InvalidSecret(_))));
        assert!(matches!(decode_secret("JBSWY3DP1"), Err(Error::InvalidSecret(_))));
        assert!(matches!(decode_secret("ABC"), Err(Error::InvalidSecret(_))));
        assert!(matches!(hotp("not-base32!", 0), Err(Error::InvalidSecret(_))));
    }
}
