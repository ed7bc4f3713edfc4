// ============================================================================
// src/io/acpi/parser.rs - ACPI Table Parser
// ============================================================================
//!
//! ACPI テーブルパーサー
//!
//! RSDP検索 → RSDT検証 → MADT走査で CPU 数と I/O APIC を求める。
//! ブート時に一度だけ呼ばれ、テーブルのビューは保持しない。
//!
//! XSDT（64ビットポインタ）は使わず、RSDT のみを辿る。

use core::ops::Range;

use super::info::{CpuTopology, MadtEntries, MadtEntry};
use super::mapper::PhysicalMapper;
use super::tables::{
    madt, sdt, signature, TableView, RSDP_CHECKSUM_LEN, RSDP_RSDT_ADDRESS, RSDP_SIGNATURE,
};
use crate::error::AcpiError;

/// BIOS データ領域内の EBDA セグメントポインタ
pub const BDA_EBDA_SEGMENT: u64 = 0x40E;
/// EBDA の探索範囲（先頭 1KB）
const EBDA_SEARCH_LEN: u64 = 1 << 10;
/// BIOS 読み取り専用領域
const BIOS_ROM: Range<u64> = 0xE0000..0xFFFFF;
/// RSDP は16バイト境界に置かれる
const RSDP_ALIGN: usize = 16;

/// RSDP の候補かどうか（シグネチャ + 20バイトのチェックサム）
fn is_rsdp(candidate: &[u8]) -> bool {
    if !candidate.starts_with(RSDP_SIGNATURE) {
        return false;
    }
    let view = TableView::new(candidate);
    match view.checksum_ok(RSDP_CHECKSUM_LEN) {
        Ok(true) => true,
        _ => {
            log::debug!("RSDP signature with bad checksum");
            false
        }
    }
}

// ============================================================================
// ACPI Parser
// ============================================================================

/// ACPI table parser
pub struct AcpiParser<'m, M: ?Sized> {
    mapper: &'m M,
}

impl<'m, M: PhysicalMapper + ?Sized> AcpiParser<'m, M> {
    pub fn new(mapper: &'m M) -> Self {
        Self { mapper }
    }

    fn map(&self, address: u64, length: usize) -> Result<TableView<'m>, AcpiError> {
        self.mapper.map_physical(address, length).map(TableView::new)
    }

    /// EBDA と BIOS ROM 領域から RSDP を探す（最初に見つかったもの）
    pub fn find_rsdp(&self) -> Result<u64, AcpiError> {
        let ebda = u64::from(self.map(BDA_EBDA_SEGMENT, 2)?.read_u16(0)?) << 4;

        if let Some(address) = self.search_region(ebda..ebda + EBDA_SEARCH_LEN)? {
            return Ok(address);
        }
        self.search_region(BIOS_ROM)?
            .ok_or(AcpiError::FirmwareNotFound)
    }

    /// Search for RSDP signature in a memory region
    fn search_region(&self, region: Range<u64>) -> Result<Option<u64>, AcpiError> {
        for address in region.step_by(RSDP_ALIGN) {
            let candidate = self.mapper.map_physical(address, RSDP_CHECKSUM_LEN)?;
            if is_rsdp(candidate) {
                log::debug!("RSDP at {:#x}", address);
                return Ok(Some(address));
            }
        }
        Ok(None)
    }

    /// RSDP が指す RSDT をマップして検証
    pub fn rsdt(&self, rsdp_address: u64) -> Result<TableView<'m>, AcpiError> {
        let rsdp = self.map(rsdp_address, RSDP_CHECKSUM_LEN)?;
        let address = u64::from(rsdp.read_u32(RSDP_RSDT_ADDRESS)?);
        let bad_rsdt = AcpiError::FirmwareCorrupt { table: "RSDT" };
        if address == 0 {
            log::error!("no RSDT");
            return Err(bad_rsdt);
        }

        let prefix = self.map(address, sdt::PREFIX_LEN)?;
        if prefix.signature()? != signature::RSDT {
            log::error!("no RSDT");
            return Err(bad_rsdt);
        }
        let length = prefix.declared_length()?;
        if length < sdt::HEADER_LEN {
            log::error!("bad RSDT length {}", length);
            return Err(bad_rsdt);
        }

        let rsdt = self.map(address, length)?;
        if !rsdt.checksum_ok(length)? {
            log::error!("bad RSDT");
            return Err(bad_rsdt);
        }
        Ok(rsdt)
    }

    /// RSDT のポインタ配列から MADT を探して検証
    pub fn madt(&self, rsdt: TableView<'_>) -> Result<TableView<'m>, AcpiError> {
        let mut offset = sdt::HEADER_LEN;
        while offset + 4 <= rsdt.len() {
            let address = u64::from(rsdt.read_u32(offset)?);
            offset += 4;

            let prefix = self.map(address, sdt::PREFIX_LEN)?;
            if prefix.signature()? != signature::MADT {
                continue;
            }
            let length = prefix.declared_length()?;
            let table = self.map(address, length)?;
            if length < madt::ENTRIES || !table.checksum_ok(length)? {
                log::error!("MADT checksum fail");
                return Err(AcpiError::FirmwareCorrupt { table: "APIC" });
            }
            return Ok(table);
        }

        log::error!("no MADT");
        Err(AcpiError::NoCpuTopology)
    }

    /// MADT のエントリを数える
    pub fn topology(&self, madt_view: TableView<'_>) -> Result<CpuTopology, AcpiError> {
        let mut topology = CpuTopology {
            local_apic_address: madt_view.read_u32(madt::LOCAL_APIC_ADDRESS)?,
            ..CpuTopology::default()
        };

        for entry in MadtEntries::new(madt_view) {
            match entry? {
                MadtEntry::LocalApic { enabled } => {
                    topology.local_apic_entries += 1;
                    if enabled {
                        topology.cpu_count += 1;
                    }
                }
                MadtEntry::IoApic { address } => {
                    log::info!("IO APIC addr: {:#x}", address);
                    topology.io_apics.push(address);
                }
                MadtEntry::Other { .. } => {}
            }
        }

        if topology.cpu_count == 0 {
            log::error!("no cpu count");
            return Err(AcpiError::NoCpuTopology);
        }
        Ok(topology)
    }

    /// Parse ACPI tables
    pub fn parse(&self) -> Result<CpuTopology, AcpiError> {
        let rsdp = self.find_rsdp()?;
        let rsdt = self.rsdt(rsdp)?;
        let madt = self.madt(rsdt)?;
        self.topology(madt)
    }
}

/// ACPI を初期化して CPU トポロジを返す
///
/// 失敗はすべてブート継続不可（[`crate::error::HwError::is_fatal`]）。
pub fn init_acpi<M: PhysicalMapper + ?Sized>(mapper: &M) -> Result<CpuTopology, AcpiError> {
    let topology = AcpiParser::new(mapper).parse()?;
    log::info!(
        "ACPI: {} CPUs ({} LAPIC entries), {} IO APICs",
        topology.cpu_count,
        topology.local_apic_entries,
        topology.io_apic_count()
    );
    Ok(topology)
}
