//! Second-factor verification against a per-user base32 TOTP secret.

use totp_rs::{Algorithm, Secret, TOTP};

/// Code length and time step are fixed by the authenticator contract.
const DIGITS: usize = 6;
const STEP_SECONDS: u64 = 30;
/// Accept the previous/next window to tolerate clock skew.
const SKEW: u8 = 1;

/// A submitted code must be exactly six ASCII digits; anything else is
/// rejected before the secret is even consulted.
#[must_use]
pub fn code_is_well_formed(code: &str) -> bool {
    code.len() == DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

/// Verify `code` against a base32-encoded shared secret for the current
/// time window (±[`SKEW`]). Malformed codes, undecodable secrets, and
/// secrets too short for TOTP all fail closed.
#[must_use]
pub fn verify_code(secret_base32: &str, code: &str) -> bool {
    if !code_is_well_formed(code) {
        return false;
    }

    let Ok(secret_bytes) = Secret::Encoded(secret_base32.to_string()).to_bytes() else {
        return false;
    };

    let Ok(totp) = TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP_SECONDS,
        secret_bytes,
        None,
        String::new(),
    ) else {
        return false;
    };

    totp.check_current(code).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "LXBSMDTMSP2I5XFXIYRGFVWSFI";

    fn current_code(secret: &str) -> String {
        let secret_bytes = Secret::Encoded(secret.to_string()).to_bytes().unwrap();
        let totp = TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP_SECONDS,
            secret_bytes,
            None,
            String::new(),
        )
        .unwrap();
        totp.generate_current().unwrap()
    }

    #[test]
    fn accepts_code_for_current_window() {
        let code = current_code(SECRET);
        assert!(verify_code(SECRET, &code));
    }

    #[test]
    fn rejects_wrong_code() {
        let code = current_code(SECRET);
        // Flip one digit.
        let wrong: String = code
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if i == 0 {
                    char::from_digit((c.to_digit(10).unwrap() + 1) % 10, 10).unwrap()
                } else {
                    c
                }
            })
            .collect();
        assert!(!verify_code(SECRET, &wrong));
    }

    #[test]
    fn rejects_malformed_codes_without_consulting_secret() {
        for code in ["", "12345", "1234567", "12345a", "abcdef", "12 456"] {
            assert!(!code_is_well_formed(code));
            assert!(!verify_code(SECRET, code));
        }
    }

    #[test]
    fn empty_secret_always_fails() {
        assert!(!verify_code("", "000000"));
        let code = current_code(SECRET);
        assert!(!verify_code("", &code));
    }

    #[test]
    fn undecodable_secret_fails() {
        assert!(!verify_code("not base32!!", "123456"));
    }
}
