//! Integration tests for opening synthetic archives and reading members.

mod common;

use std::io::{Cursor, Read};

use blizzard_replay::archive::{Archive, ArchiveIndex, LISTFILE};
use blizzard_replay::error::ParserError;
use blizzard_replay::format::FormatVersion;

use common::{ArchiveBuilder, Storage};

fn open(data: Vec<u8>) -> Archive<Cursor<Vec<u8>>> {
    Archive::open(Cursor::new(data)).unwrap_or_else(|e| panic!("Failed to open archive: {e}"))
}

// ============================================================================
// Member lookup
// ============================================================================

#[test]
fn test_open_member_round_trip() {
    let content = b"The quick brown fox jumps over the lazy dog.\n".repeat(20);
    let mut archive = open(ArchiveBuilder::new().bzip2("test.txt", &content).build());

    let mut member = archive.open_member("test.txt").unwrap();
    let mut out = Vec::new();
    member.read_to_end(&mut out).unwrap();
    assert_eq!(out, content);
}

#[test]
fn test_missing_member() {
    let mut archive = open(ArchiveBuilder::new().bzip2("test.txt", b"hello").build());

    assert!(matches!(
        archive.open_member("missing.txt"),
        Err(ParserError::MemberNotFound { ref name }) if name == "missing.txt"
    ));
    assert!(!archive.contains("missing.txt").unwrap());
    assert!(archive.contains("TEST.TXT").unwrap());
}

#[test]
fn test_many_members_in_small_table() {
    let names: Vec<String> = (0..8).map(|i| format!("member{i}.dat")).collect();
    let mut builder = ArchiveBuilder::new().hash_slots(8);
    for name in &names {
        builder = builder.bzip2(name, name.as_bytes());
    }
    let mut archive = open(builder.build());

    for name in &names {
        assert_eq!(archive.read_member(name).unwrap(), name.as_bytes());
    }
    assert!(!archive.contains("absent.dat").unwrap());
}

#[test]
fn test_block_entry_fields() {
    let archive = open(ArchiveBuilder::new().bzip2("a.bin", &[7u8; 300]).build());
    let entry = archive.find("a.bin").unwrap().unwrap();

    assert_eq!(entry.block.file_size, 300);
    assert!(entry.block.flags.is_compressed());
    assert_eq!(entry.block.flags.describe(), "file, compressed");
}

// ============================================================================
// Listfile
// ============================================================================

#[test]
fn test_list_members() {
    let data = ArchiveBuilder::new()
        .bzip2("replay.details", b"d")
        .bzip2("replay.game.events", b"g")
        .bzip2(LISTFILE, b"replay.details\r\nreplay.game.events\r\n")
        .build();
    let mut archive = open(data);

    assert_eq!(
        archive.list().unwrap(),
        vec!["replay.details", "replay.game.events"]
    );
}

#[test]
fn test_list_without_listfile_is_empty() {
    let mut archive = open(ArchiveBuilder::new().bzip2("x", b"y").build());
    assert!(archive.list().unwrap().is_empty());
}

// ============================================================================
// Unsupported storage
// ============================================================================

#[test]
fn test_unsupported_compression_method() {
    let data = ArchiveBuilder::new()
        .member("zlib.bin", b"payload", Storage::Method(0x02))
        .build();
    let mut archive = open(data);

    assert!(matches!(
        archive.open_member("zlib.bin"),
        Err(ParserError::UnsupportedCompression { method: 0x02 })
    ));
}

#[test]
fn test_uncompressed_and_imploded_members() {
    let data = ArchiveBuilder::new()
        .member("plain.bin", b"payload", Storage::Plain)
        .member("imploded.bin", b"payload", Storage::Imploded)
        .build();
    let mut archive = open(data);

    for name in ["plain.bin", "imploded.bin"] {
        assert!(matches!(
            archive.open_member(name),
            Err(ParserError::UnimplementedFeature { .. })
        ));
    }
}

// ============================================================================
// Headers
// ============================================================================

#[test]
fn test_archive_behind_user_data() {
    let data = ArchiveBuilder::new()
        .user_data(0x400, &[0x06, 0x2A])
        .bzip2("test.txt", b"relative offsets")
        .build();
    let mut archive = open(data);

    let user_data = archive.user_data().unwrap();
    assert_eq!(user_data.header_offset, 0x400);
    assert_eq!(user_data.content, vec![0x06, 0x2A]);
    assert_eq!(archive.read_member("test.txt").unwrap(), b"relative offsets");
}

#[test]
fn test_archive_size_covers_header_and_tables() {
    let data = ArchiveBuilder::new().bzip2("test.txt", b"sized").build();
    let total = data.len();
    let archive = open(data);

    assert_eq!(archive.header().archive_size as usize, total);
    assert_eq!(archive.header().header_size, 0x20);
}

#[test]
fn test_version_two_header() {
    let data = ArchiveBuilder::new()
        .format_version(2)
        .bzip2("test.txt", b"v2")
        .build();
    let mut archive = open(data);

    assert_eq!(archive.header().format_version, FormatVersion::V2);
    assert_eq!(archive.read_member("test.txt").unwrap(), b"v2");
}

#[test]
fn test_version_four_rejected() {
    let data = ArchiveBuilder::new().format_version(4).build();
    assert!(matches!(
        Archive::open(Cursor::new(data)),
        Err(ParserError::MalformedHeader { .. })
    ));
}

#[test]
fn test_truncated_tables_are_not_member_errors() {
    let mut data = ArchiveBuilder::new().bzip2("test.txt", b"hello").build();
    data.truncate(data.len() - 8);

    assert!(matches!(
        Archive::open(Cursor::new(data)),
        Err(ParserError::TableDecryptFailure { .. })
    ));
}

// ============================================================================
// Shared index
// ============================================================================

#[test]
fn test_index_shared_across_threads() {
    let data = ArchiveBuilder::new()
        .bzip2("one", b"first member")
        .bzip2("two", b"second member")
        .build();
    let index = ArchiveIndex::read(&mut Cursor::new(data.clone())).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = [("one", &b"first member"[..]), ("two", &b"second member"[..])]
            .into_iter()
            .map(|(name, expected)| {
                let index = &index;
                let data = &data;
                scope.spawn(move || {
                    let mut source = Cursor::new(data.as_slice());
                    assert_eq!(index.read_member(&mut source, name).unwrap(), expected);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });
}
