// ============================================================================
// src/io/pci/traits.rs - PCI Configuration Space Accessor Trait
// ============================================================================
//!
//! PCI コンフィグ空間アクセストレイト
//!
//! 実装は生の読み書き（`read_config` / `write_config`）だけを提供し、
//! ベンダーID・ヘッダタイプ・BAR などの便利メソッドはデフォルト実装で共有する。

use super::types::{
    config_regs, decode_io_bar, ConfigWidth, PciTag, HEADER_MULTIFUNCTION, MAX_DECODED_BAR,
};
use crate::error::PciError;

// ============================================================================
// Configuration Space Accessor Trait
// ============================================================================

/// PCI Configuration Space アクセサトレイト
pub trait ConfigSpaceAccessor {
    /// `reg` から `width` バイト読み取り
    ///
    /// 4バイト境界に切り下げたダブルワードを読み、`8 * (reg % 4)` ビット
    /// 右シフトして幅でマスクする。
    fn read_config(&self, tag: PciTag, reg: u8, width: ConfigWidth) -> u32;

    /// `reg` へダブルワードを書き込み（`reg` は4の倍数でなければならない）
    fn write_config(&self, tag: PciTag, reg: u8, value: u32) -> Result<(), PciError>;

    // ========================================================================
    // Convenience methods with default implementations
    // ========================================================================

    /// 8ビット読み取り
    fn read8(&self, tag: PciTag, reg: u8) -> u8 {
        self.read_config(tag, reg, ConfigWidth::Byte) as u8
    }

    /// 16ビット読み取り
    fn read16(&self, tag: PciTag, reg: u8) -> u16 {
        self.read_config(tag, reg, ConfigWidth::Word) as u16
    }

    /// 32ビット読み取り
    fn read32(&self, tag: PciTag, reg: u8) -> u32 {
        self.read_config(tag, reg, ConfigWidth::Dword)
    }

    /// ベンダーIDを読み取り
    fn read_vendor_id(&self, tag: PciTag) -> u16 {
        self.read16(tag, config_regs::VENDOR_ID)
    }

    /// デバイスIDを読み取り
    fn read_device_id(&self, tag: PciTag) -> u16 {
        self.read16(tag, config_regs::DEVICE_ID)
    }

    /// ヘッダータイプを読み取り
    fn read_header_type(&self, tag: PciTag) -> u8 {
        self.read8(tag, config_regs::HEADER_TYPE)
    }

    /// マルチファンクションデバイスかどうか
    fn is_multifunction(&self, tag: PciTag) -> bool {
        (self.read_header_type(tag) & HEADER_MULTIFUNCTION) != 0
    }

    /// クラスコードを読み取り (class, subclass)
    fn read_class(&self, tag: PciTag) -> (u8, u8) {
        let class = self.read8(tag, config_regs::CLASS_CODE);
        let subclass = self.read8(tag, config_regs::SUBCLASS);
        (class, subclass)
    }

    /// 割り込みラインを読み取り
    fn read_interrupt_line(&self, tag: PciTag) -> u8 {
        self.read8(tag, config_regs::INTERRUPT_LINE)
    }

    // ========================================================================
    // BAR Access
    // ========================================================================

    /// BAR を読み取り（生の値）
    fn read_bar_raw(&self, tag: PciTag, bar_index: u8) -> Result<u32, PciError> {
        if bar_index > MAX_DECODED_BAR {
            return Err(PciError::InvalidBar { index: bar_index });
        }
        Ok(self.read32(tag, config_regs::BAR0 + bar_index * 4))
    }

    /// I/O BAR のベースポートを読み取り（16ビット簡易デコード）
    fn read_io_bar(&self, tag: PciTag, bar_index: u8) -> Result<u16, PciError> {
        self.read_bar_raw(tag, bar_index).map(decode_io_bar)
    }
}
