use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the base64-encoded HMAC-SHA256 of the given data, as the processor computes it over
/// webhook bodies.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod test {
    use super::calculate_hmac;

    #[test]
    fn hmac_is_deterministic_and_key_sensitive() {
        let a = calculate_hmac("secret", b"payload");
        let b = calculate_hmac("secret", b"payload");
        let c = calculate_hmac("other", b"payload");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
