// ============================================================================
// src/io/acpi/tables.rs - ACPI Table Views
// ============================================================================
//!
//! ACPI テーブルのシグネチャ・オフセット定義と、範囲チェック付きの読み取りビュー。
//!
//! ファームウェアが申告する長さは信用せず、すべてのフィールド読み取りを
//! マップ済みバイト列の長さと照合する。

use crate::error::AcpiError;

// ============================================================================
// Constants and Signatures
// ============================================================================

/// RSDP signature "RSD PTR "
pub const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// チェックサム対象となる RSDP の先頭バイト数（ACPI 1.0 構造体）
pub const RSDP_CHECKSUM_LEN: usize = 20;

/// RSDP 内の RSDT 物理アドレス
pub const RSDP_RSDT_ADDRESS: usize = 16;

/// ACPI table signatures
pub mod signature {
    pub const RSDT: [u8; 4] = *b"RSDT";
    pub const MADT: [u8; 4] = *b"APIC";
}

/// SDT ヘッダのレイアウト
pub mod sdt {
    /// シグネチャ + 長さ（長さを知るためにまずマップする分）
    pub const PREFIX_LEN: usize = 8;
    pub const LENGTH: usize = 4;
    /// ヘッダ全体（RSDT のエントリはここから）
    pub const HEADER_LEN: usize = 36;
}

/// MADT のレイアウト
pub mod madt {
    /// Local APIC アドレス
    pub const LOCAL_APIC_ADDRESS: usize = 36;
    /// エントリリストの開始
    pub const ENTRIES: usize = 44;

    /// Processor Local APIC
    pub const ENTRY_LOCAL_APIC: u8 = 0;
    /// I/O APIC
    pub const ENTRY_IO_APIC: u8 = 1;

    /// Local APIC エントリ内のフラグ
    pub const LOCAL_APIC_FLAGS: usize = 4;
    /// 有効ビット
    pub const LOCAL_APIC_ENABLED: u32 = 1 << 0;
    /// I/O APIC エントリ内のアドレス
    pub const IO_APIC_ADDRESS: usize = 4;

    /// 種類ごとの最小エントリ長（フィールドがエントリ内に収まる長さ）
    pub const fn min_entry_len(entry_type: u8) -> usize {
        match entry_type {
            ENTRY_LOCAL_APIC => 8,
            ENTRY_IO_APIC => 12,
            _ => 2,
        }
    }
}

// ============================================================================
// Checksum
// ============================================================================

/// 全バイトの和が 0 (mod 256) かどうか
pub fn checksum_ok(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
}

// ============================================================================
// Table View
// ============================================================================

/// 範囲チェック付きのバイト列ビュー
#[derive(Clone, Copy, Debug)]
pub struct TableView<'a> {
    bytes: &'a [u8],
}

impl<'a> TableView<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// `offset` から `len` バイトを切り出す
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], AcpiError> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(AcpiError::Truncated { offset, len })
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, AcpiError> {
        self.slice(offset, 1).map(|b| b[0])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, AcpiError> {
        self.slice(offset, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, AcpiError> {
        self.slice(offset, 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// 先頭4バイトのシグネチャ
    pub fn signature(&self) -> Result<[u8; 4], AcpiError> {
        self.slice(0, 4).map(|b| [b[0], b[1], b[2], b[3]])
    }

    /// SDT ヘッダが申告する長さ
    pub fn declared_length(&self) -> Result<usize, AcpiError> {
        self.read_u32(sdt::LENGTH).map(|len| len as usize)
    }

    /// 先頭 `len` バイトのチェックサムを検証
    pub fn checksum_ok(&self, len: usize) -> Result<bool, AcpiError> {
        self.slice(0, len).map(checksum_ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_little_endian() {
        let bytes = [0x41, 0x50, 0x49, 0x43, 0x78, 0x56, 0x34, 0x12];
        let view = TableView::new(&bytes);
        assert_eq!(view.signature(), Ok(signature::MADT));
        assert_eq!(view.read_u32(4), Ok(0x1234_5678));
        assert_eq!(view.read_u16(6), Ok(0x1234));
        assert_eq!(view.read_u8(7), Ok(0x12));
    }

    #[test]
    fn test_out_of_bounds_reads_rejected() {
        let bytes = [0u8; 8];
        let view = TableView::new(&bytes);
        assert_eq!(view.read_u32(5), Err(AcpiError::Truncated { offset: 5, len: 4 }));
        assert_eq!(view.read_u8(8), Err(AcpiError::Truncated { offset: 8, len: 1 }));
        assert_eq!(
            view.slice(usize::MAX, 2),
            Err(AcpiError::Truncated { offset: usize::MAX, len: 2 })
        );
        assert_eq!(view.checksum_ok(9), Err(AcpiError::Truncated { offset: 0, len: 9 }));
    }

    #[test]
    fn test_checksum() {
        assert!(checksum_ok(&[0x10, 0xF0]));
        assert!(!checksum_ok(&[0x10, 0xEF]));
        assert!(checksum_ok(&[]));
    }
}
