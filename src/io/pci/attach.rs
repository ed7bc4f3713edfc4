// ============================================================================
// src/io/pci/attach.rs - PCI Device Attach
// ============================================================================
//!
//! # PCIデバイスのアタッチ
//!
//! (ベンダーID, デバイスID) をキーにした静的テーブルでハンドラを選ぶ。
//! テーブルにないデバイスは黙って無視する。
//!
//! 対応するのはIDEディスク1台のみ。2台目のアタッチは
//! [`PciError::DuplicateDevice`] で失敗し、ブートを止める。

use core::fmt;

use super::bus::{PciBusScanner, PciFunction};
use super::traits::ConfigSpaceAccessor;
use super::types::PciTag;
use crate::config::HwConfig;
use crate::error::{DiskError, HwResult, PciError};
use crate::io::ide::disk::{InstalledDisk, LegacyDisk, PciNativeDisk, SharedDisk};
use crate::io::ide::engine::DiskPresence;
use crate::io::pin::ExecutionPin;
use crate::io::port::PortIo;

/// Intel
pub const PCI_VENDOR_INTEL: u16 = 0x8086;
/// PIIX3 ISA/IDE (QEMU i440FX)
pub const PCI_DEVICE_PIIX3: u16 = 0x7000;
/// 5 Series/3400 SATA (IDEモード)
pub const PCI_DEVICE_3400_IDE: u16 = 0x3B20;

// ============================================================================
// Attach Table
// ============================================================================

/// アタッチハンドラの種類
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachHandler {
    /// レガシーポート固定のIDE
    LegacyIde,
    /// BARとINTERRUPT_LINEからポートを得るIDE
    PciNativeIde,
}

/// テーブルのエントリ
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachEntry {
    pub vendor: u16,
    pub device: u16,
    pub name: &'static str,
    pub handler: AttachHandler,
}

/// 組み込みのアタッチテーブル
pub static ATTACH_TABLE: &[AttachEntry] = &[
    AttachEntry {
        vendor: PCI_VENDOR_INTEL,
        device: PCI_DEVICE_PIIX3,
        name: "PIIX3",
        handler: AttachHandler::LegacyIde,
    },
    AttachEntry {
        vendor: PCI_VENDOR_INTEL,
        device: PCI_DEVICE_3400_IDE,
        name: "3400",
        handler: AttachHandler::PciNativeIde,
    },
];

/// (vendor, device) → ハンドラの平坦なレジストリ
#[derive(Clone, Copy, Debug)]
pub struct AttachRegistry {
    entries: &'static [AttachEntry],
}

impl AttachRegistry {
    /// 組み込みテーブルを使う
    pub const fn builtin() -> Self {
        Self {
            entries: ATTACH_TABLE,
        }
    }

    pub const fn with_entries(entries: &'static [AttachEntry]) -> Self {
        Self { entries }
    }

    /// ハンドラを検索（見つからなくてもエラーではない）
    pub fn lookup(&self, vendor: u16, device: u16) -> Option<&'static AttachEntry> {
        self.entries
            .iter()
            .find(|e| e.vendor == vendor && e.device == device)
    }

    pub fn entries(&self) -> &'static [AttachEntry] {
        self.entries
    }
}

impl Default for AttachRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Disk Registry
// ============================================================================

/// システムで唯一のディスク
///
/// ブート時に作り、アタッチ後は読み取り専用としてブロックI/O層へ渡す。
pub struct DiskRegistry<P> {
    disk: Option<InstalledDisk<P>>,
    presence: Option<DiskPresence>,
}

impl<P: PortIo> DiskRegistry<P> {
    pub const fn new() -> Self {
        Self {
            disk: None,
            presence: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.disk.is_some()
    }

    /// アタッチ済みのディスク
    pub fn disk(&self) -> Option<&InstalledDisk<P>> {
        self.disk.as_ref()
    }

    /// アタッチ時のプローブ結果
    pub fn presence(&self) -> Option<DiskPresence> {
        self.presence
    }

    /// プローブで応答したディスク（なければ `DiskError::Absent`）
    pub fn usable(&self) -> Result<&InstalledDisk<P>, DiskError> {
        match (&self.disk, self.presence) {
            (Some(disk), Some(DiskPresence::Present)) => Ok(disk),
            _ => Err(DiskError::Absent),
        }
    }

    /// まだ空いているか確認
    fn ensure_vacant(&self, vendor: u16, device: u16) -> Result<(), PciError> {
        if self.disk.is_some() {
            log::error!("second IDE disk {:04x}:{:04x}", vendor, device);
            return Err(PciError::DuplicateDevice { vendor, device });
        }
        Ok(())
    }

    /// ディスクを登録（プローブ結果に関わらず登録する）
    fn install(&mut self, disk: InstalledDisk<P>, presence: DiskPresence) {
        self.disk = Some(disk);
        self.presence = Some(presence);
    }

    /// ロック付きの共有ディスクに変換
    ///
    /// プローブで応答しなかったディスクは `DiskError::Absent`。
    pub fn into_shared<X: ExecutionPin>(self, pin: X) -> Result<SharedDisk<P, X>, DiskError>
    where
        P: Clone,
    {
        match (self.disk, self.presence) {
            (Some(disk), Some(DiskPresence::Present)) => Ok(SharedDisk::new(disk, pin)),
            _ => Err(DiskError::Absent),
        }
    }
}

impl<P: PortIo> Default for DiskRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for DiskRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskRegistry")
            .field("installed", &self.disk.is_some())
            .field("presence", &self.presence)
            .finish()
    }
}

// ============================================================================
// Attacher
// ============================================================================

/// アタッチスキャンの実行コンテキスト
pub struct PciAttacher<'a, P> {
    accessor: &'a dyn ConfigSpaceAccessor,
    ports: P,
    registry: AttachRegistry,
    config: &'a HwConfig,
}

impl<'a, P: PortIo + Clone> PciAttacher<'a, P> {
    pub fn new(
        accessor: &'a dyn ConfigSpaceAccessor,
        ports: P,
        registry: AttachRegistry,
        config: &'a HwConfig,
    ) -> Self {
        Self {
            accessor,
            ports,
            registry,
            config,
        }
    }

    /// 設定範囲のバスを走査し、テーブルに合うファンクションをアタッチ
    ///
    /// アタッチしたファンクション数を返す。
    pub fn scan_and_attach(&self, disks: &mut DiskRegistry<P>) -> HwResult<usize> {
        let scanner = PciBusScanner::new(self.accessor);
        let mut attached = 0;
        scanner.for_each_function(self.config.attach_buses.clone(), |info| {
            if self.attach(info, disks)? {
                attached += 1;
            }
            HwResult::Ok(())
        })?;
        Ok(attached)
    }

    /// 1ファンクション分のアタッチ（テーブルにないなら `Ok(false)`）
    pub fn attach(&self, info: &PciFunction, disks: &mut DiskRegistry<P>) -> HwResult<bool> {
        let Some(entry) = self.registry.lookup(info.vendor_id, info.device_id) else {
            return Ok(false);
        };
        log::debug!("{}: attaching {}", info.tag, entry.name);

        disks.ensure_vacant(entry.vendor, entry.device)?;
        let disk = match entry.handler {
            AttachHandler::LegacyIde => self.legacy_ide(),
            AttachHandler::PciNativeIde => self.pci_native_ide(info.tag)?,
        };
        let presence = disk.probe();
        disks.install(disk, presence);
        Ok(true)
    }

    fn legacy_ide(&self) -> InstalledDisk<P> {
        let disk = LegacyDisk::new(self.ports.clone(), self.config);
        log::info!(
            "legacy disk: base {:#x}, cntrl: {:#x}, irq: {}",
            disk.engine().command_base(),
            disk.engine().control_base(),
            crate::io::ide::disk::LEGACY_IRQ
        );
        InstalledDisk::Legacy(disk)
    }

    fn pci_native_ide(&self, tag: PciTag) -> Result<InstalledDisk<P>, PciError> {
        let irq = self.accessor.read_interrupt_line(tag);
        let command_base = self.accessor.read_io_bar(tag, 0)?;
        let control_base = self.accessor.read_io_bar(tag, 1)?;
        let busmaster_base = self.accessor.read_io_bar(tag, 4)?;
        log::info!(
            "3400: base {:#x}, cntrl: {:#x}, bm: {:#x}, irq: {}",
            command_base,
            control_base,
            busmaster_base,
            irq
        );
        Ok(InstalledDisk::PciNative(PciNativeDisk::new(
            self.ports.clone(),
            command_base,
            control_base,
            busmaster_base,
            irq,
            self.config,
        )))
    }
}

/// 組み込みテーブルでアタッチスキャンを実行
pub fn scan_and_attach<P: PortIo + Clone>(
    accessor: &dyn ConfigSpaceAccessor,
    ports: P,
    config: &HwConfig,
    disks: &mut DiskRegistry<P>,
) -> HwResult<usize> {
    PciAttacher::new(accessor, ports, AttachRegistry::builtin(), config).scan_and_attach(disks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpinBudget;
    use crate::error::HwError;
    use crate::io::ide::disk::DiskDriver;
    use crate::io::pci::legacy::LegacyPciAccessor;
    use crate::io::sim::SimPorts;

    fn config() -> HwConfig {
        HwConfig {
            wait: SpinBudget::bounded(16),
            drq: SpinBudget::bounded(16),
            probe_attempts: 8,
            ..HwConfig::default()
        }
    }

    #[test]
    fn test_lookup() {
        let registry = AttachRegistry::builtin();
        assert_eq!(
            registry.lookup(0x8086, 0x7000).map(|e| e.handler),
            Some(AttachHandler::LegacyIde)
        );
        assert_eq!(
            registry.lookup(0x8086, 0x3B20).map(|e| e.handler),
            Some(AttachHandler::PciNativeIde)
        );
        assert!(registry.lookup(0x8086, 0x7010).is_none());
        assert!(registry.lookup(0x1AF4, 0x7000).is_none());
    }

    #[test]
    fn test_unknown_devices_skipped() {
        let ports = SimPorts::new();
        ports.add_function(PciTag::new(0, 0, 0), 0x8086, 0x1237, 0x06, 0x00, 0x00);
        ports.add_function(PciTag::new(0, 3, 0), 0x1AF4, 0x1001, 0x01, 0x00, 0x00);
        let pci = LegacyPciAccessor::new(ports.clone());
        let mut disks = DiskRegistry::new();

        let attached = scan_and_attach(&pci, ports, &config(), &mut disks).unwrap();
        assert_eq!(attached, 0);
        assert!(!disks.is_installed());
        assert_eq!(disks.presence(), None);
    }

    #[test]
    fn test_attach_legacy_piix3() {
        let ports = SimPorts::new();
        ports.add_function(PciTag::new(0, 1, 0), 0x8086, 0x7000, 0x06, 0x01, 0x80);
        ports.set_default8(0x1F7, 0x50);
        let pci = LegacyPciAccessor::new(ports.clone());
        let mut disks = DiskRegistry::new();

        assert_eq!(scan_and_attach(&pci, ports, &config(), &mut disks), Ok(1));
        let disk = disks.disk().unwrap();
        assert!(matches!(disk, InstalledDisk::Legacy(_)));
        assert_eq!(disk.engine().command_base(), 0x1F0);
        assert_eq!(disk.engine().control_base(), 0x3F6);
        assert_eq!(disk.irq(), 14);
        assert_eq!(disks.presence(), Some(DiskPresence::Present));
        assert!(disks.usable().is_ok());
    }

    #[test]
    fn test_attach_pci_native() {
        let ports = SimPorts::new();
        let tag = PciTag::new(2, 31, 2);
        ports.add_function(PciTag::new(2, 31, 0), 0x8086, 0x3B09, 0x06, 0x01, 0x80);
        ports.add_function(tag, 0x8086, 0x3B20, 0x01, 0x01, 0x00);
        ports.set_config(tag, 0x10, 0x0000_C001);
        ports.set_config(tag, 0x14, 0x0000_C00B);
        ports.set_config(tag, 0x20, 0x0001_C021);
        ports.set_config(tag, 0x3C, 0x0000_0113);
        ports.set_default8(0xC007, 0x50);
        let pci = LegacyPciAccessor::new(ports.clone());
        let mut disks = DiskRegistry::new();

        assert_eq!(scan_and_attach(&pci, ports, &config(), &mut disks), Ok(1));
        let Some(InstalledDisk::PciNative(disk)) = disks.disk() else {
            panic!("expected a PCI-native disk");
        };
        assert_eq!(disk.engine().command_base(), 0xC000);
        assert_eq!(disk.engine().control_base(), 0xC008);
        assert_eq!(disk.busmaster_base(), 0xC020);
        assert_eq!(disk.irq(), 0x13);
        assert_eq!(disk.vector(), 32 + 0x13);
    }

    #[test]
    fn test_absent_disk_still_installed() {
        let ports = SimPorts::new();
        ports.add_function(PciTag::new(0, 1, 0), 0x8086, 0x7000, 0x06, 0x01, 0x00);
        ports.script8(0x1F7, &[0x40]);
        ports.set_default8(0x1F7, 0x00);
        let pci = LegacyPciAccessor::new(ports.clone());
        let mut disks = DiskRegistry::new();

        assert_eq!(scan_and_attach(&pci, ports, &config(), &mut disks), Ok(1));
        assert!(disks.is_installed());
        assert_eq!(disks.presence(), Some(DiskPresence::Absent));
        assert!(matches!(disks.usable(), Err(DiskError::Absent)));
        assert!(matches!(
            disks.into_shared(crate::io::pin::NoPin),
            Err(DiskError::Absent)
        ));
    }

    #[test]
    fn test_second_disk_rejected() {
        let ports = SimPorts::new();
        ports.add_function(PciTag::new(0, 1, 0), 0x8086, 0x7000, 0x06, 0x01, 0x00);
        ports.add_function(PciTag::new(1, 0, 0), 0x8086, 0x3B20, 0x01, 0x01, 0x00);
        ports.set_default8(0x1F7, 0x50);
        let pci = LegacyPciAccessor::new(ports.clone());
        let mut disks = DiskRegistry::new();

        let err = scan_and_attach(&pci, ports, &config(), &mut disks).unwrap_err();
        assert_eq!(
            err,
            HwError::Pci(PciError::DuplicateDevice { vendor: 0x8086, device: 0x3B20 })
        );
        assert!(err.is_fatal());
        assert!(matches!(disks.disk(), Some(InstalledDisk::Legacy(_))));
    }

    #[test]
    fn test_bus_outside_attach_range_ignored() {
        let ports = SimPorts::new();
        ports.add_function(PciTag::new(3, 0, 0), 0x8086, 0x7000, 0x06, 0x01, 0x00);
        let pci = LegacyPciAccessor::new(ports.clone());
        let mut disks = DiskRegistry::new();
        assert_eq!(scan_and_attach(&pci, ports, &config(), &mut disks), Ok(0));
    }

    #[test]
    fn test_into_shared() {
        let ports = SimPorts::new();
        ports.add_function(PciTag::new(0, 1, 0), 0x8086, 0x7000, 0x06, 0x01, 0x00);
        ports.set_default8(0x1F7, 0x50);
        let pci = LegacyPciAccessor::new(ports.clone());
        let mut disks = DiskRegistry::new();
        scan_and_attach(&pci, ports, &config(), &mut disks).unwrap();

        let shared = disks.into_shared(crate::io::pin::NoPin).unwrap();
        assert_eq!(shared.vector(), 46);
    }

    #[test]
    fn test_into_shared_requires_attached_disk() {
        let disks: DiskRegistry<SimPorts> = DiskRegistry::new();
        assert!(matches!(
            disks.into_shared(crate::io::pin::NoPin),
            Err(DiskError::Absent)
        ));
    }

    #[test]
    fn test_floating_bus_disk_not_shared() {
        let ports = SimPorts::new();
        ports.add_function(PciTag::new(0, 1, 0), 0x8086, 0x7000, 0x06, 0x01, 0x00);
        ports.script8(0x1F7, &[0x40, 0xFF]);
        let pci = LegacyPciAccessor::new(ports.clone());
        let mut disks = DiskRegistry::new();
        scan_and_attach(&pci, ports, &config(), &mut disks).unwrap();

        assert_eq!(disks.presence(), Some(DiskPresence::FloatingBus));
        assert!(matches!(
            disks.into_shared(crate::io::pin::NoPin),
            Err(DiskError::Absent)
        ));
    }
}
