// ============================================================================
// src/lib.rs - Hardware Discovery and Disk I/O Core
// ============================================================================
//!
//! # hwcore
//!
//! カーネルのハードウェア検出とディスクI/Oの中核。
//!
//! - PCIコンフィグ空間の列挙と、(vendor, device) テーブルによるアタッチ
//! - ATA/IDE ディスク（レガシー / PCIネイティブ）のポートI/Oドライバ
//! - ACPI テーブル（RSDP → RSDT → MADT）からの CPU トポロジ取得
//!
//! ## ブートシーケンスからの利用
//! ```ignore
//! let ports = unsafe { X86PortIo::new() };
//! let pci = LegacyPciAccessor::new(ports);
//! let config = HwConfig::default();
//! let mut disks = DiskRegistry::new();
//! scan_and_attach(&pci, ports, &config, &mut disks)?;
//! let cpus = init_acpi(&unsafe { OffsetMapper::new(PHYS_OFFSET) })?.cpu_count;
//! ```
//!
//! 致命的なエラーも `Err` として返す。停止するかどうかは呼び出し側が
//! [`HwError::is_fatal`] で判断する。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod io;

pub use config::{HwConfig, SpinBudget};
pub use error::{AcpiError, DiskError, HwError, HwResult, PciError};
pub use io::acpi::{init_acpi, CpuTopology, OffsetMapper, PhysicalMapper};
pub use io::ide::{DiskBuffer, DiskDriver, InstalledDisk, SharedDisk};
pub use io::pci::{scan_and_attach, DiskRegistry, LegacyPciAccessor, PciBusScanner};

/// 全バスのPCIファンクションをログに出す（診断用）
pub fn dump_bus(accessor: &dyn io::pci::ConfigSpaceAccessor) -> alloc::vec::Vec<io::pci::PciFunction> {
    PciBusScanner::new(accessor).dump_bus()
}
