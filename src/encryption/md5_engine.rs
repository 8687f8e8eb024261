use md5::{Digest, Md5};

pub struct Md5Engine;

impl Md5Engine {
    pub fn compute(data: &[u8]) -> [u8; 16] {
        let digest = Md5::digest(data);
        let mut hash = [0u8; 16];
        hash.copy_from_slice(&digest);
        hash
    }

    /// Lowercase hex digest, the form game catalogs are keyed by.
    pub fn hex_digest(data: &[u8]) -> String {
        Self::compute(data)
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_digest() {
        assert_eq!(Md5Engine::hex_digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            Md5Engine::hex_digest(b"hello world"),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }
}
