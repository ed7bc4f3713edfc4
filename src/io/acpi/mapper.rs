// ============================================================================
// src/io/acpi/mapper.rs - Physical Memory Mapping
// ============================================================================
//!
//! ファームウェアテーブルを読むための物理メモリマップ。
//!
//! パーサは [`PhysicalMapper`] だけに依存する。カーネルが物理メモリ全体を
//! 固定オフセットにマップしている場合は [`OffsetMapper`] を使う。

use crate::error::AcpiError;

/// 物理アドレス + 長さ → 読み取り可能なバイト列
pub trait PhysicalMapper {
    fn map_physical(&self, address: u64, length: usize) -> Result<&[u8], AcpiError>;
}

/// 物理メモリ全体が `offset` から直接マップされている場合のマッパ
#[derive(Clone, Copy, Debug)]
pub struct OffsetMapper {
    offset: u64,
}

impl OffsetMapper {
    /// # Safety
    /// 物理アドレス `p` が仮想アドレス `offset + p` から読み取り可能で、
    /// マッパの生存期間中その対応が変わらないこと。
    pub const unsafe fn new(offset: u64) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl PhysicalMapper for OffsetMapper {
    fn map_physical(&self, address: u64, length: usize) -> Result<&[u8], AcpiError> {
        let virt = self
            .offset
            .checked_add(address)
            .filter(|v| v.checked_add(length as u64).is_some())
            .ok_or(AcpiError::MappingFailed { address, length })?;
        // SAFETY: OffsetMapper::new の契約により、この範囲は読み取り可能
        Ok(unsafe { core::slice::from_raw_parts(virt as *const u8, length) })
    }
}
