//! Perceptual-hash primitive: 64-bit pHash (8×8 grid, DCT preprocessing)
//! over raw image bytes. The similarity formula depends on the fixed bit
//! width; swapping the algorithm means updating `HASH_BITS` with it.

use std::sync::OnceLock;

use image_hasher::{HashAlg, Hasher, HasherConfig, ImageHash};

/// Bit width of the hash grid. Also the maximum Hamming distance.
pub const HASH_BITS: u32 = 64;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Process-wide hasher, initialized once on first use.
fn hasher() -> &'static Hasher {
    static HASHER: OnceLock<Hasher> = OnceLock::new();
    HASHER.get_or_init(|| {
        HasherConfig::new()
            .hash_size(8, 8)
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .to_hasher()
    })
}

/// An opaque 64-bit perceptual hash. Comparable only via Hamming distance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverHash(ImageHash);

impl CoverHash {
    pub fn distance(&self, other: &CoverHash) -> u32 {
        self.0.dist(&other.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }
}

/// Decodes image bytes and computes their perceptual hash.
pub fn hash_bytes(data: &[u8]) -> Result<CoverHash, HashError> {
    let image = image::load_from_memory(data)?;
    Ok(CoverHash(hasher().hash_image(&image)))
}

/// `(1 − distance/HASH_BITS) × 100`, rounded half-up to two decimals.
pub fn similarity(distance: u32) -> f64 {
    let percent = (1.0 - f64::from(distance) / f64::from(HASH_BITS)) * 100.0;
    (percent * 100.0).round() / 100.0
}
