use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const CACHE_KEY_SEED: u64 = 0x636f_7669_6431_3968;

/// Hash whatever `f` feeds into a fresh hasher.
///
/// Stable within one process, which is all the result cache needs.
pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

/// Short digest of a string under `seed`.
pub fn stable_hash_str(seed: u64, value: &str) -> u64 {
    stable_hash_with(|hasher| {
        seed.hash(hasher);
        value.hash(hasher);
    })
}

/// Digest of a canonical cache key, used to correlate log lines.
///
/// The key text is already unambiguous, so hashing it whole keeps distinct
/// keys apart up to 64-bit collisions.
pub fn cache_key_digest(canonical: &str) -> u64 {
    stable_hash_str(CACHE_KEY_SEED, canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_seed_and_value() {
        assert_eq!(stable_hash_str(0, "ITA|1"), stable_hash_str(0, "ITA|1"));
        assert_ne!(stable_hash_str(0, "ITA|1"), stable_hash_str(1, "ITA|1"));
        assert_ne!(stable_hash_str(0, "ITA|1"), stable_hash_str(0, "ITA|2"));
    }

    #[test]
    fn cache_key_digest_separates_escaped_keys() {
        let split = r#"{"country":["FRA","ITA"]}"#;
        let joined = r#"{"country":["FRA,ITA"]}"#;
        assert_eq!(cache_key_digest(split), cache_key_digest(split));
        assert_ne!(cache_key_digest(split), cache_key_digest(joined));
    }
}
