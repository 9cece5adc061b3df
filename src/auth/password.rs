use crate::error::StoreResult;

/// Cost bounds bcrypt accepts.
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// Hash a plaintext password with a fresh bcrypt salt.
pub fn hash(plaintext: &str, cost: u32) -> StoreResult<String> {
    Ok(bcrypt::hash(plaintext, cost)?)
}

/// Verify plaintext against a stored hash.
/// A malformed hash never verifies.
pub fn verify(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}
