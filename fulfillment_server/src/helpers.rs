use fulfillment_engine::db_types::{Actor, Role};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Base64 encoded HMAC-SHA256 of `data` under `secret`.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::default(),
    };
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

/// The message the identity provider signs for an actor: `"{id}:{role}"`.
pub fn identity_message(id: i64, role: Role) -> String {
    format!("{id}:{role}")
}

pub fn sign_identity(secret: &str, actor: &Actor) -> String {
    calculate_hmac(secret, identity_message(actor.id, actor.role).as_bytes())
}

/// Constant-time comparison of the expected signature for `actor` with `signature`.
pub fn verify_identity(secret: &str, actor: &Actor, signature: &str) -> bool {
    let Ok(expected) = base64::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(identity_message(actor.id, actor.role).as_bytes());
    mac.verify_slice(&expected).is_ok()
}
