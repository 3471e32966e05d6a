//! Adler-32 with the concatenation law.

/// Largest prime below 2^16.
const BASE: u32 = 65_521;
/// Largest `n` such that `255 * n * (n + 1) / 2 + (n + 1) * (BASE - 1)` fits in a u32,
/// i.e. how many bytes can be summed before a modulo reduction is needed.
const NMAX: usize = 5552;

pub const SEED: u32 = 1;

/// Continue `adler` over `data`.
pub fn update(adler: u32, data: &[u8]) -> u32 {
    let mut a = adler & 0xFFFF;
    let mut b = adler >> 16;
    for chunk in data.chunks(NMAX) {
        for &byte in chunk {
            a += u32::from(byte);
            b += a;
        }
        a %= BASE;
        b %= BASE;
    }
    (b << 16) | a
}

/// Adler-32 of `A ++ B` given `adler(A)`, `adler(B)` and `len(B)`.
pub fn combine(adler1: u32, adler2: u32, len2: u64) -> u32 {
    let rem = (len2 % u64::from(BASE)) as u32;
    let mut sum1 = adler1 & 0xFFFF;
    let mut sum2 = (rem * sum1) % BASE;
    sum1 += (adler2 & 0xFFFF) + BASE - 1;
    sum2 += (adler1 >> 16) + (adler2 >> 16) + BASE - rem;
    if sum1 >= BASE {
        sum1 -= BASE;
    }
    if sum1 >= BASE {
        sum1 -= BASE;
    }
    if sum2 >= BASE << 1 {
        sum2 -= BASE << 1;
    }
    if sum2 >= BASE {
        sum2 -= BASE;
    }
    sum1 | (sum2 << 16)
}
