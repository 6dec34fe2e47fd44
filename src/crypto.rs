//! The archive cipher: crypt table, name hashing, and the table stream cipher.
//!
//! Everything here derives from one 0x500-word table built from a fixed
//! linear-congruential seed. The table is computed once per process on
//! first use and never mutated afterwards, so it is shared freely.
//!
//! - [`hash_string`] hashes member names for table lookups. Four
//!   [`HashType`]s select different 0x100-word slices of the table.
//! - [`Decrypter`] wraps any `io::Read` and decrypts it as a stream of
//!   little-endian 32-bit words. It is how the hash and block tables are
//!   read.
//!
//! # Example
//!
//! ```
//! use blizzard_replay::crypto::{hash_string, HashType};
//!
//! // Table keys are hashes of fixed names.
//! assert_eq!(hash_string("(hash table)", HashType::FileKey), 0xC3AF3770);
//! assert_eq!(
//!     hash_string("replay.details", HashType::NameA),
//!     hash_string("REPLAY.DETAILS", HashType::NameA),
//! );
//! ```

use std::io::{self, Read};
use std::sync::OnceLock;

/// Number of words in the crypt table.
pub const CRYPT_TABLE_SIZE: usize = 0x500;

/// Initial seed of the table expansion.
const TABLE_SEED: u32 = 0x0010_0001;

/// Initial value of the decryption seed.
pub const DECRYPT_SEED: u32 = 0xEEEE_EEEE;

const HASH_SEED_1: u32 = 0x7FED_7FED;
const HASH_SEED_2: u32 = 0xEEEE_EEEE;

/// Offset of the table slice mixed into the cipher seed.
const KEY_MIX_OFFSET: usize = 0x400;

static CRYPT_TABLE: OnceLock<[u32; CRYPT_TABLE_SIZE]> = OnceLock::new();

/// Returns the process-wide crypt table, building it on first call.
pub fn crypt_table() -> &'static [u32; CRYPT_TABLE_SIZE] {
    CRYPT_TABLE.get_or_init(build_crypt_table)
}

fn build_crypt_table() -> [u32; CRYPT_TABLE_SIZE] {
    let mut table = [0u32; CRYPT_TABLE_SIZE];
    let mut seed = TABLE_SEED;

    for index in 0..0x100 {
        let mut offset = index;
        for _ in 0..5 {
            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let high = (seed & 0xFFFF) << 0x10;
            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let low = seed & 0xFFFF;

            table[offset] = high | low;
            offset += 0x100;
        }
    }

    table
}

/// Selects which slice of the crypt table a hash uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    /// Starting probe position in the hash table.
    TableOffset = 0,
    /// First verification hash stored in a hash table entry.
    NameA = 1,
    /// Second verification hash stored in a hash table entry.
    NameB = 2,
    /// Key used to decrypt tables and encrypted members.
    FileKey = 3,
}

impl HashType {
    /// All four hash types, in table order.
    pub const ALL: [HashType; 4] = [
        HashType::TableOffset,
        HashType::NameA,
        HashType::NameB,
        HashType::FileKey,
    ];
}

/// Hashes a name with the archive hash function.
///
/// Case folding is ASCII-only: `a`-`z` become `A`-`Z` and every other byte,
/// including non-ASCII bytes, is hashed unchanged.
#[must_use]
pub fn hash_string(name: &str, hash_type: HashType) -> u32 {
    let table = crypt_table();
    let slice = (hash_type as usize) * 0x100;
    let mut seed1 = HASH_SEED_1;
    let mut seed2 = HASH_SEED_2;

    for &byte in name.as_bytes() {
        let c = byte.to_ascii_uppercase();
        seed1 = table[slice + c as usize] ^ seed1.wrapping_add(seed2);
        seed2 = u32::from(c)
            .wrapping_add(seed1)
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }

    seed1
}

/// Running key and seed of one cipher pass.
#[derive(Debug, Clone, Copy)]
struct CipherState {
    key: u32,
    seed: u32,
}

impl CipherState {
    fn new(key: u32) -> Self {
        Self {
            key,
            seed: DECRYPT_SEED,
        }
    }

    /// Mixes the key into the seed and returns the keystream word.
    fn keystream(&mut self) -> u32 {
        self.seed = self
            .seed
            .wrapping_add(crypt_table()[KEY_MIX_OFFSET + (self.key & 0xFF) as usize]);
        self.key.wrapping_add(self.seed)
    }

    /// Advances the state; `plain` is the decrypted word of this step.
    fn advance(&mut self, plain: u32) {
        self.key = ((!self.key) << 0x15).wrapping_add(0x1111_1111) | (self.key >> 0x0B);
        self.seed = plain
            .wrapping_add(self.seed)
            .wrapping_add(self.seed << 5)
            .wrapping_add(3);
    }

    fn decrypt_word(&mut self, word: u32) -> u32 {
        let plain = word ^ self.keystream();
        self.advance(plain);
        plain
    }

    fn encrypt_word(&mut self, plain: u32) -> u32 {
        let word = plain ^ self.keystream();
        self.advance(plain);
        word
    }
}

/// Decrypts a buffer of whole little-endian words in place.
///
/// Trailing bytes that do not fill a word are left untouched.
pub fn decrypt_block(data: &mut [u8], key: u32) {
    let mut state = CipherState::new(key);
    for chunk in data.chunks_exact_mut(4) {
        let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&state.decrypt_word(word).to_le_bytes());
    }
}

/// Encrypts a buffer of whole little-endian words in place.
///
/// This is the inverse of [`decrypt_block`] for the same key.
pub fn encrypt_block(data: &mut [u8], key: u32) {
    let mut state = CipherState::new(key);
    for chunk in data.chunks_exact_mut(4) {
        let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&state.encrypt_word(word).to_le_bytes());
    }
}

/// A reader that decrypts its source as a forward-only word stream.
///
/// The cipher has no partial-word step: reading fewer than four bytes
/// still decrypts a whole word and keeps the rest for the next call. The
/// stream cannot be entered mid-word; decrypting from an arbitrary offset
/// requires replaying from the start with the original key.
#[derive(Debug)]
pub struct Decrypter<R> {
    inner: R,
    state: CipherState,
    carry: [u8; 4],
    carry_len: usize,
}

impl<R: Read> Decrypter<R> {
    /// Creates a decrypter over `inner` keyed with `key`.
    pub fn new(inner: R, key: u32) -> Self {
        Self {
            inner,
            state: CipherState::new(key),
            carry: [0; 4],
            carry_len: 0,
        }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn take_carry(&mut self, buf: &mut [u8]) -> usize {
        let start = 4 - self.carry_len;
        let n = self.carry_len.min(buf.len());
        buf[..n].copy_from_slice(&self.carry[start..start + n]);
        self.carry_len -= n;
        n
    }
}

impl<R: Read> Read for Decrypter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            if self.carry_len > 0 {
                n += self.take_carry(&mut buf[n..]);
                continue;
            }

            let mut word = [0u8; 4];
            match self.inner.read_exact(&mut word) {
                Ok(()) => {}
                // Bytes already produced in this call are still valid.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && n > 0 => break,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(0),
                Err(e) => return Err(e),
            }

            let plain = self.state.decrypt_word(u32::from_le_bytes(word));
            self.carry = plain.to_le_bytes();
            self.carry_len = 4;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypt_table_golden_values() {
        let table = crypt_table();
        assert_eq!(table[0x000], 0x55C6_36E2);
        assert_eq!(table[0x001], 0x02BE_0170);
        assert_eq!(table[0x100], 0x76F8_C1B1);
        assert_eq!(table[0x4FF], 0x7303_286C);
    }

    #[test]
    fn test_crypt_table_is_shared() {
        assert!(std::ptr::eq(crypt_table(), crypt_table()));
    }

    #[test]
    fn test_table_keys() {
        assert_eq!(hash_string("(hash table)", HashType::FileKey), 0xC3AF_3770);
        assert_eq!(hash_string("(block table)", HashType::FileKey), 0xEC83_B3A3);
    }

    #[test]
    fn test_hash_known_name() {
        assert_eq!(hash_string("test.txt", HashType::TableOffset), 0x6B02_2F7B);
        assert_eq!(hash_string("test.txt", HashType::NameA), 0x7D9A_A20D);
        assert_eq!(hash_string("test.txt", HashType::NameB), 0x9FEE_7CA0);
    }

    #[test]
    fn test_hash_case_insensitive() {
        for hash_type in HashType::ALL {
            assert_eq!(
                hash_string("file.txt", hash_type),
                hash_string("FILE.TXT", hash_type)
            );
            assert_eq!(
                hash_string("file.txt", hash_type),
                hash_string("file.txt", hash_type)
            );
        }
    }

    #[test]
    fn test_hash_non_ascii_passthrough() {
        // Only ASCII letters fold; 'é' (0xC3 0xA9) and 'É' (0xC3 0x89) differ.
        assert_ne!(
            hash_string("\u{e9}", HashType::NameA),
            hash_string("\u{c9}", HashType::NameA)
        );
    }

    #[test]
    fn test_hash_types_differ() {
        let a = hash_string("replay.details", HashType::NameA);
        let b = hash_string("replay.details", HashType::NameB);
        assert_ne!(a, b);
    }

    #[test]
    fn test_block_round_trip() {
        let original: Vec<u8> = (0u8..64).collect();
        let mut data = original.clone();
        let key = hash_string("(block table)", HashType::FileKey);

        encrypt_block(&mut data, key);
        assert_ne!(data, original);
        decrypt_block(&mut data, key);
        assert_eq!(data, original);
    }

    #[test]
    fn test_decrypter_matches_block_decrypt() {
        let original: Vec<u8> = (0u8..32).map(|b| b.wrapping_mul(7)).collect();
        let mut encrypted = original.clone();
        encrypt_block(&mut encrypted, 0x1234_5678);

        let mut out = Vec::new();
        Decrypter::new(encrypted.as_slice(), 0x1234_5678)
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_decrypter_sub_word_reads_use_carry() {
        let original: Vec<u8> = (10u8..22).collect();
        let mut encrypted = original.clone();
        encrypt_block(&mut encrypted, 42);

        let mut d = Decrypter::new(encrypted.as_slice(), 42);
        let mut out = Vec::new();
        for size in [1usize, 2, 3, 1, 5] {
            let mut buf = vec![0u8; size];
            d.read_exact(&mut buf).unwrap();
            out.extend_from_slice(&buf);
        }
        assert_eq!(out, original);

        let mut rest = [0u8; 1];
        assert_eq!(d.read(&mut rest).unwrap(), 0);
    }

    #[test]
    fn test_decrypter_truncated_word() {
        let mut d = Decrypter::new(&[0x01u8, 0x02][..], 7);
        let mut buf = [0u8; 4];
        let err = d.read_exact(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
