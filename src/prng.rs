use rand::{RngCore, SeedableRng};

/// Increment applied to the state before every draw
const GOLDEN_GAMMA: u32 = 0x6D2B_79F5;

/// 2^32 as a float, used to normalise a mixed 32-bit word into [0, 1)
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Mulberry32: a tiny, deterministic 32-bit generator.
///
/// The same seed yields the same sequence on every platform. All arithmetic
/// wraps at 32 bits, which is what makes the output line up bit-for-bit with
/// other Mulberry32 implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Build a generator from a wider signed seed, truncating to 32 bits
    /// (two's complement) the same way `seed | 0` does.
    pub fn from_i64(seed: i64) -> Self {
        Self::new(seed as u32)
    }

    /// Next value in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.next_word() as f64 / TWO_POW_32
    }

    fn next_word(&mut self) -> u32 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let s = self.state;

        let mut t = (s ^ (s >> 15)).wrapping_mul(1 | s);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        t ^ (t >> 14)
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_word() as u64;
        let hi = self.next_word() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_word().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state as u32)
    }
}
