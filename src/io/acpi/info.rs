// ============================================================================
// src/io/acpi/info.rs - ACPI Information Structures
// ============================================================================
//!
//! MADT エントリと、パース結果として残す CPU トポロジ情報。

use alloc::vec::Vec;

use super::tables::{madt, TableView};
use crate::error::AcpiError;

// ============================================================================
// MADT Entries
// ============================================================================

/// MADT エントリ（必要な種類のみ解釈）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MadtEntry {
    /// Processor Local APIC
    LocalApic { enabled: bool },
    /// I/O APIC
    IoApic { address: u32 },
    /// その他（長さだけ使ってスキップ）
    Other { entry_type: u8 },
}

/// MADT エントリリストのイテレータ
///
/// 各エントリは 1バイトの種類と 1バイトの長さで始まる。
/// 長さが 2 未満のエントリは破損として扱い、そこで停止する。
pub struct MadtEntries<'a> {
    view: TableView<'a>,
    offset: usize,
    end: usize,
    failed: bool,
}

impl<'a> MadtEntries<'a> {
    /// `view` は MADT 全体（申告長でマップ済み）
    pub fn new(view: TableView<'a>) -> Self {
        Self {
            view,
            offset: madt::ENTRIES,
            end: view.len(),
            failed: false,
        }
    }

    fn parse_at(&self, offset: usize) -> Result<(MadtEntry, usize), AcpiError> {
        let entry_type = self.view.read_u8(offset)?;
        let length = usize::from(self.view.read_u8(offset + 1)?);
        if length < 2 {
            return Err(AcpiError::FirmwareCorrupt { table: "APIC" });
        }
        // エントリ全体がテーブル内に収まっていること
        self.view.slice(offset, length)?;

        let entry = match entry_type {
            madt::ENTRY_LOCAL_APIC | madt::ENTRY_IO_APIC
                if length < madt::min_entry_len(entry_type) =>
            {
                return Err(AcpiError::FirmwareCorrupt { table: "APIC" });
            }
            madt::ENTRY_LOCAL_APIC => {
                let flags = self.view.read_u32(offset + madt::LOCAL_APIC_FLAGS)?;
                MadtEntry::LocalApic {
                    enabled: flags & madt::LOCAL_APIC_ENABLED != 0,
                }
            }
            madt::ENTRY_IO_APIC => MadtEntry::IoApic {
                address: self.view.read_u32(offset + madt::IO_APIC_ADDRESS)?,
            },
            entry_type => MadtEntry::Other { entry_type },
        };
        Ok((entry, length))
    }
}

impl Iterator for MadtEntries<'_> {
    type Item = Result<MadtEntry, AcpiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.end {
            return None;
        }
        match self.parse_at(self.offset) {
            Ok((entry, length)) => {
                self.offset += length;
                Some(Ok(entry))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

// ============================================================================
// CPU Topology
// ============================================================================

/// ブート後も保持する CPU トポロジ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuTopology {
    /// 有効な Local APIC の数（= 使用可能な CPU 数）
    pub cpu_count: usize,
    /// 無効なものも含めた Local APIC エントリ数
    pub local_apic_entries: usize,
    /// I/O APIC のアドレス
    pub io_apics: Vec<u32>,
    /// Local APIC アドレス
    pub local_apic_address: u32,
}

impl CpuTopology {
    pub fn io_apic_count(&self) -> usize {
        self.io_apics.len()
    }
}
