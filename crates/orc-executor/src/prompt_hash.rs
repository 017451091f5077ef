use sha2::{Digest, Sha256};

/// First 12 hex chars of SHA-256(systemPrompt ‖ userMessage) (§4.5.2).
pub fn prompt_hash(system_prompt: &str, user_message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(system_prompt.as_bytes());
    hasher.update(user_message.as_bytes());
    let digest = hasher.finalize();
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    hex[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_hash_is_twelve_hex_chars() {
        let hash = prompt_hash("system", "user");
        assert_eq!(hash.len(), 12);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn prompt_hash_is_deterministic() {
        assert_eq!(prompt_hash("a", "b"), prompt_hash("a", "b"));
        assert_ne!(prompt_hash("a", "b"), prompt_hash("a", "c"));
    }
}
