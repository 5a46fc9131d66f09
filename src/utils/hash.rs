use sha2::{Digest, Sha256};

pub fn sha256sum(data: &[u8]) -> [u8; 32] {
    sha256sum_concat(&[data])
}

/// SHA-256 over the concatenation of `parts`, without materializing it.
pub fn sha256sum_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0; 32];
    output.copy_from_slice(&result);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_matches_single_buffer() {
        let joined = sha256sum(b"headerbody");
        assert_eq!(sha256sum_concat(&[&b"header"[..], &b"body"[..]]), joined);
        assert_eq!(
            hex::encode(sha256sum(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
