use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, RngCore};
use tracing::{error, warn};

/// New hashes are always Argon2id PHC strings.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

fn is_bcrypt(stored: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| stored.starts_with(prefix))
}

/// Accepts Argon2 PHC strings and legacy bcrypt (`$2a$`/`$2b$`/`$2y$`) hashes.
/// A stored value that parses as neither never matches.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    if is_bcrypt(stored) {
        return bcrypt::verify(plain, stored).unwrap_or_else(|e| {
            warn!(error = %e, "stored bcrypt hash is unreadable");
            false
        });
    }

    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

/// Hash of random material nobody ever sees, for accounts created through OAuth.
pub fn unusable_password_hash() -> anyhow::Result<String> {
    let mut material = [0u8; 32];
    OsRng.fill_bytes(&mut material);
    let secret: String = material.iter().map(|b| format!("{b:02x}")).collect();
    hash_password(&secret)
}
