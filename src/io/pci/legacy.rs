// ============================================================================
// src/io/pci/legacy.rs - Legacy PCI I/O Port Access
// ============================================================================
//!
//! Legacy PCI Configuration Space アクセス (I/O ポートベース)
//!
//! 従来の PCI 2.x 方式の CF8h/CFCh ポートを使用した Configuration Space アクセス。
//! アドレス/データの2ポートはマシン全体で共有されるため、1回のシーケンスを
//! スピンロックで直列化し、最後にアドレスポートへ 0 を書いて閉じる。

use super::traits::ConfigSpaceAccessor;
use super::types::{ConfigWidth, PciTag};
use crate::error::PciError;
use crate::io::port::PortIo;
use spin::Mutex;

// ============================================================================
// Constants
// ============================================================================

/// PCI configuration address port
pub const PCI_CONFIG_ADDRESS: u16 = 0xCF8;
/// PCI configuration data port
pub const PCI_CONFIG_DATA: u16 = 0xCFC;
/// コンフィグサイクル有効ビット
const CONFIG_ENABLE: u32 = 1 << 31;

// ============================================================================
// Legacy PCI Accessor
// ============================================================================

/// Legacy PCI Configuration Space アクセサ
///
/// I/O ポート 0xCF8/0xCFC を使用した従来の PCI アクセス方式。
pub struct LegacyPciAccessor<P> {
    ports: Mutex<P>,
}

impl<P: PortIo> LegacyPciAccessor<P> {
    /// 新しいアクセサを作成
    pub const fn new(ports: P) -> Self {
        Self {
            ports: Mutex::new(ports),
        }
    }

    /// PCI アドレスを作成
    fn make_address(tag: PciTag, reg: u8) -> u32 {
        CONFIG_ENABLE | tag.raw() | u32::from(reg & 0xFC)
    }

    /// 32ビット読み取り（内部）
    fn read_dword(&self, tag: PciTag, reg: u8) -> u32 {
        let address = Self::make_address(tag, reg);
        let ports = self.ports.lock();
        ports.write32(PCI_CONFIG_ADDRESS, address);
        let value = ports.read32(PCI_CONFIG_DATA);
        ports.write32(PCI_CONFIG_ADDRESS, 0);
        value
    }

    /// 32ビット書き込み（内部）
    fn write_dword(&self, tag: PciTag, reg: u8, value: u32) {
        let address = Self::make_address(tag, reg);
        let ports = self.ports.lock();
        ports.write32(PCI_CONFIG_ADDRESS, address);
        ports.write32(PCI_CONFIG_DATA, value);
        ports.write32(PCI_CONFIG_ADDRESS, 0);
    }
}

impl<P: PortIo> ConfigSpaceAccessor for LegacyPciAccessor<P> {
    fn read_config(&self, tag: PciTag, reg: u8, width: ConfigWidth) -> u32 {
        let dword = self.read_dword(tag, reg);
        let shift = u32::from(reg & 3) * 8;
        (dword >> shift) & width.mask()
    }

    fn write_config(&self, tag: PciTag, reg: u8, value: u32) -> Result<(), PciError> {
        if reg & 3 != 0 {
            return Err(PciError::MisalignedWrite { reg });
        }
        self.write_dword(tag, reg, value);
        Ok(())
    }
}
