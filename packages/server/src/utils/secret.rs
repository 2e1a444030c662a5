use rand::RngCore;

/// Length of apikey secrets and object tokens.
pub const SECRET_LEN: usize = 32;

/// 32 lowercase hex characters from the thread-local CSPRNG.
pub fn generate() -> String {
    let mut bytes = [0u8; SECRET_LEN / 2];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
