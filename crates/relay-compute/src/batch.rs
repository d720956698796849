//! Column-major batch buffers.
//!
//! Fields are stored as `Vec<[u8; N]>`, which is already the contiguous
//! `count * N` byte layout the accelerator expects; `as_flattened` exposes it
//! without copying.

/// Record id width (content hash)
pub const ID_LEN: usize = 32;
/// Compact `r || s` signature width
pub const SIGNATURE_LEN: usize = 64;
/// x-only public key width
pub const PUBKEY_LEN: usize = 32;

/// An owned batch laid out for a single accelerator call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchColumns {
    ids: Vec<[u8; ID_LEN]>,
    signatures: Vec<[u8; SIGNATURE_LEN]>,
    pubkeys: Vec<[u8; PUBKEY_LEN]>,
}

impl BatchColumns {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            signatures: Vec::with_capacity(capacity),
            pubkeys: Vec::with_capacity(capacity),
        }
    }

    pub fn push(
        &mut self,
        id: [u8; ID_LEN],
        signature: [u8; SIGNATURE_LEN],
        pubkey: [u8; PUBKEY_LEN],
    ) {
        self.ids.push(id);
        self.signatures.push(signature);
        self.pubkeys.push(pubkey);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[[u8; ID_LEN]] {
        &self.ids
    }

    pub fn signatures(&self) -> &[[u8; SIGNATURE_LEN]] {
        &self.signatures
    }

    pub fn pubkeys(&self) -> &[[u8; PUBKEY_LEN]] {
        &self.pubkeys
    }

    /// `count * 32` contiguous id bytes
    pub fn id_bytes(&self) -> &[u8] {
        self.ids.as_flattened()
    }

    /// `count * 64` contiguous signature bytes
    pub fn signature_bytes(&self) -> &[u8] {
        self.signatures.as_flattened()
    }

    /// `count * 32` contiguous public key bytes
    pub fn pubkey_bytes(&self) -> &[u8] {
        self.pubkeys.as_flattened()
    }

    /// Iterate rows in batch order.
    pub fn rows(
        &self,
    ) -> impl Iterator<Item = (&[u8; ID_LEN], &[u8; SIGNATURE_LEN], &[u8; PUBKEY_LEN])> {
        self.ids
            .iter()
            .zip(&self.signatures)
            .zip(&self.pubkeys)
            .map(|((id, signature), pubkey)| (id, signature, pubkey))
    }
}

impl FromIterator<([u8; ID_LEN], [u8; SIGNATURE_LEN], [u8; PUBKEY_LEN])> for BatchColumns {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = ([u8; ID_LEN], [u8; SIGNATURE_LEN], [u8; PUBKEY_LEN])>,
    {
        let iter = iter.into_iter();
        let mut columns = Self::with_capacity(iter.size_hint().0);
        for (id, signature, pubkey) in iter {
            columns.push(id, signature, pubkey);
        }
        columns
    }
}
