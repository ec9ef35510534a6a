use rand::Rng;

/// No 0/O or 1/I, guests read these codes over the phone
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 8;

/// Human-readable reservation reference, e.g. `SL-7KQ4MZ2P`
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("SL-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reference_format() {
        let code = generate();
        assert!(code.starts_with("SL-"));
        assert_eq!(code.len(), 3 + CODE_LENGTH);
        assert!(code[3..].bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_references_are_not_repeated() {
        let codes: HashSet<String> = (0..1000).map(|_| generate()).collect();
        assert_eq!(codes.len(), 1000);
    }
}
