//! Incremental HMAC-SHA256 over ciphertext

use crate::crypto::envelope::MacKey;
use crate::crypto::MAC_TAG_SIZE;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Running MAC state for one container.
///
/// Fed ciphertext chunks in order; never shared between operations.
pub struct PayloadMac {
    inner: HmacSha256,
}

impl PayloadMac {
    pub fn new(key: &MacKey) -> Self {
        let Ok(inner) = HmacSha256::new_from_slice(key.as_bytes()) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        PayloadMac { inner }
    }

    pub fn update(&mut self, ciphertext: &[u8]) {
        self.inner.update(ciphertext);
    }

    pub fn finish(self) -> [u8; MAC_TAG_SIZE] {
        self.inner.finalize().into_bytes().into()
    }
}

/// Compare two tags without branching on their contents
pub fn verify_tag(expected: &[u8; MAC_TAG_SIZE], computed: &[u8; MAC_TAG_SIZE]) -> bool {
    expected.ct_eq(computed).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretBundle;

    #[test]
    fn test_incremental_matches_oneshot() {
        let (_, key) = SecretBundle::generate().into_parts();
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 31) as u8).collect();

        let mut oneshot = PayloadMac::new(&key);
        oneshot.update(&data);
        let expected = oneshot.finish();

        let mut chunked = PayloadMac::new(&key);
        for chunk in data.chunks(333) {
            chunked.update(chunk);
        }

        assert_eq!(chunked.finish(), expected);
    }

    #[test]
    fn test_different_keys_differ() {
        let (_, a) = SecretBundle::generate().into_parts();
        let (_, b) = SecretBundle::generate().into_parts();

        let mut mac_a = PayloadMac::new(&a);
        let mut mac_b = PayloadMac::new(&b);
        mac_a.update(b"same data");
        mac_b.update(b"same data");

        assert_ne!(mac_a.finish(), mac_b.finish());
    }

    #[test]
    fn test_matches_plain_hmac() {
        let (_, key) = SecretBundle::generate().into_parts();
        let mut ours = PayloadMac::new(&key);
        ours.update(b"what do ya want for nothing?");

        let mut reference = HmacSha256::new_from_slice(key.as_bytes()).unwrap();
        reference.update(b"what do ya want for nothing?");

        assert_eq!(&ours.finish()[..], &reference.finalize().into_bytes()[..]);
    }

    #[test]
    fn test_verify_tag() {
        let tag = [0x42u8; MAC_TAG_SIZE];
        assert!(verify_tag(&tag, &tag));

        for index in [0, 15, MAC_TAG_SIZE - 1] {
            let mut other = tag;
            other[index] ^= 0x80;
            assert!(!verify_tag(&tag, &other));
        }
    }
}
