//! Builds small synthetic archives for integration tests.

#![allow(dead_code)]

use std::io::Write;

use blizzard_replay::archive::{tables, BlockFlags, HashTableEntry};
use blizzard_replay::crypto::{encrypt_block, hash_string, HashType};
use blizzard_replay::format::{HEADER_MAGIC, USER_DATA_MAGIC};
use bzip2::write::BzEncoder;
use bzip2::Compression;

/// How a member is stored.
#[derive(Clone, Copy)]
pub enum Storage {
    /// Method byte 0x10 followed by a bzip2 stream.
    Bzip2,
    /// Compressed flag with an arbitrary method byte before the raw payload.
    Method(u8),
    /// No compression flags.
    Plain,
    /// Imploded flag only.
    Imploded,
}

struct Member {
    name: String,
    payload: Vec<u8>,
    storage: Storage,
}

/// Assembles an archive in memory.
pub struct ArchiveBuilder {
    members: Vec<Member>,
    hash_slots: usize,
    user_data: Option<(u32, Vec<u8>)>,
    format_version: u16,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            hash_slots: 16,
            user_data: None,
            format_version: 1,
        }
    }

    pub fn member(mut self, name: &str, payload: &[u8], storage: Storage) -> Self {
        self.members.push(Member {
            name: name.to_string(),
            payload: payload.to_vec(),
            storage,
        });
        self
    }

    pub fn bzip2(self, name: &str, payload: &[u8]) -> Self {
        self.member(name, payload, Storage::Bzip2)
    }

    pub fn hash_slots(mut self, slots: usize) -> Self {
        self.hash_slots = slots;
        self
    }

    /// Places the archive header at `header_offset` behind a user data preamble.
    pub fn user_data(mut self, header_offset: u32, content: &[u8]) -> Self {
        self.user_data = Some((header_offset, content.to_vec()));
        self
    }

    pub fn format_version(mut self, version: u16) -> Self {
        self.format_version = version;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();

        let header_offset = match &self.user_data {
            Some((offset, content)) => {
                out.extend_from_slice(USER_DATA_MAGIC);
                out.extend_from_slice(&(*offset).to_le_bytes());
                out.extend_from_slice(&offset.to_le_bytes());
                out.extend_from_slice(&(content.len() as u32).to_le_bytes());
                out.extend_from_slice(content);
                assert!(out.len() <= *offset as usize, "user data overlaps header");
                out.resize(*offset as usize, 0);
                *offset as usize
            }
            None => 0,
        };

        let header_size = if self.format_version >= 2 { 0x2C } else { 0x20 };
        let mut body = vec![0u8; header_size];

        let mut blocks = Vec::new();
        for member in &self.members {
            let stored = stored_bytes(member);
            let flags = match member.storage {
                Storage::Bzip2 | Storage::Method(_) => BlockFlags::FILE | BlockFlags::COMPRESSED,
                Storage::Plain => BlockFlags::FILE,
                Storage::Imploded => BlockFlags::FILE | BlockFlags::IMPLODED,
            };
            blocks.push([
                body.len() as u32,
                stored.len() as u32,
                member.payload.len() as u32,
                flags,
            ]);
            body.extend_from_slice(&stored);
        }

        let empty = [u32::MAX, u32::MAX, u32::MAX, HashTableEntry::EMPTY_NEVER_USED];
        let mut hash_table = vec![empty; self.hash_slots];
        for (index, member) in self.members.iter().enumerate() {
            let start = hash_string(&member.name, HashType::TableOffset) as usize;
            let mut slot = start % self.hash_slots;
            while hash_table[slot][3] != HashTableEntry::EMPTY_NEVER_USED {
                slot = (slot + 1) % self.hash_slots;
            }
            hash_table[slot] = [
                hash_string(&member.name, HashType::NameA),
                hash_string(&member.name, HashType::NameB),
                0,
                index as u32,
            ];
        }

        let hash_offset = body.len() as u32;
        body.extend(encrypted(&hash_table, tables::HASH_TABLE_KEY_NAME));
        let block_offset = body.len() as u32;
        body.extend(encrypted(&blocks, tables::BLOCK_TABLE_KEY_NAME));

        let archive_size = body.len() as u32;
        body[0x00..0x04].copy_from_slice(HEADER_MAGIC);
        body[0x04..0x08].copy_from_slice(&(header_size as u32).to_le_bytes());
        body[0x08..0x0C].copy_from_slice(&archive_size.to_le_bytes());
        body[0x0C..0x0E].copy_from_slice(&self.format_version.to_le_bytes());
        body[0x0E..0x10].copy_from_slice(&3u16.to_le_bytes());
        body[0x10..0x14].copy_from_slice(&hash_offset.to_le_bytes());
        body[0x14..0x18].copy_from_slice(&block_offset.to_le_bytes());
        body[0x18..0x1C].copy_from_slice(&(self.hash_slots as u32).to_le_bytes());
        body[0x1C..0x20].copy_from_slice(&(blocks.len() as u32).to_le_bytes());

        assert_eq!(out.len(), header_offset);
        out.extend(body);
        out
    }
}

fn stored_bytes(member: &Member) -> Vec<u8> {
    match member.storage {
        Storage::Bzip2 => {
            let mut encoder = BzEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(&member.payload).unwrap();
            let mut stored = vec![0x10];
            stored.extend(encoder.finish().unwrap());
            stored
        }
        Storage::Method(method) => {
            let mut stored = vec![method];
            stored.extend_from_slice(&member.payload);
            stored
        }
        Storage::Plain | Storage::Imploded => member.payload.clone(),
    }
}

fn encrypted(entries: &[[u32; 4]], key_name: &str) -> Vec<u8> {
    let mut raw: Vec<u8> = entries
        .iter()
        .flatten()
        .flat_map(|word| word.to_le_bytes())
        .collect();
    encrypt_block(&mut raw, hash_string(key_name, HashType::FileKey));
    raw
}
