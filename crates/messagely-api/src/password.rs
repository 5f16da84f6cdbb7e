use anyhow::{Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString},
};
use rand_core::OsRng;

/// Hash a password with Argon2id. `work_factor` is the Argon2 time cost
/// (number of passes over memory); memory and parallelism stay at the defaults.
pub fn hash_password(password: &str, work_factor: u32) -> Result<String> {
    let params = Params::new(
        Params::DEFAULT_M_COST,
        work_factor,
        Params::DEFAULT_P_COST,
        None,
    )
    .map_err(|e| anyhow!("Invalid work factor {}: {}", work_factor, e))?;

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();

    Ok(hash)
}

/// Check a password against a PHC-formatted hash. The hash carries its own
/// parameters, so hashes made under an older work factor still verify.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow!("Stored password hash is malformed: {}", e))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("Password verification failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("hunter2", 1).unwrap();
        assert_ne!(hash, "hunter2");
        assert!(hash.starts_with("$argon2id$"));

        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_fresh_salt() {
        let a = hash_password("same", 1).unwrap();
        let b = hash_password("same", 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_work_factor_is_rejected() {
        assert!(hash_password("pw", 0).is_err());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("pw", "plaintext").is_err());
    }
}
