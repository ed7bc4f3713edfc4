// ============================================================================
// src/io/pci/types.rs - PCI Type Definitions
// ============================================================================
//!
//! PCI 型定義
//!
//! Newtype パターンによる型安全な PCI タグとレジスタ定義。

use core::fmt;

// ============================================================================
// PCI Tag (Bus/Device/Function)
// ============================================================================

/// コンフィグアドレスレジスタ形式の BDF タグ
///
/// `bus << 16 | device << 11 | function << 8`。有効ビットとレジスタ番号は含まない。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PciTag(u32);

impl PciTag {
    /// 最大デバイス番号
    pub const MAX_DEVICE: u8 = 31;
    /// 最大ファンクション番号
    pub const MAX_FUNCTION: u8 = 7;

    /// タグを作成（範囲外のデバイス/ファンクションはマスク）
    pub const fn new(bus: u8, device: u8, function: u8) -> Self {
        Self(
            ((bus as u32) << 16)
                | (((device & 0x1F) as u32) << 11)
                | (((function & 0x07) as u32) << 8),
        )
    }

    /// 範囲チェック付きでタグを作成
    pub const fn try_new(bus: u8, device: u8, function: u8) -> Option<Self> {
        if device > Self::MAX_DEVICE || function > Self::MAX_FUNCTION {
            return None;
        }
        Some(Self::new(bus, device, function))
    }

    /// バス番号 (0-255)
    pub const fn bus(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// デバイス番号 (0-31)
    pub const fn device(self) -> u8 {
        ((self.0 >> 11) & 0x1F) as u8
    }

    /// ファンクション番号 (0-7)
    pub const fn function(self) -> u8 {
        ((self.0 >> 8) & 0x07) as u8
    }

    /// (bus, device, function) に分解
    pub const fn parts(self) -> (u8, u8, u8) {
        (self.bus(), self.device(), self.function())
    }

    /// 同じデバイスの別ファンクション
    pub const fn with_function(self, function: u8) -> Self {
        Self::new(self.bus(), self.device(), function)
    }

    /// コンフィグアドレスレジスタに載せる生の値
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PciTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}.{:x}",
            self.bus(),
            self.device(),
            self.function()
        )
    }
}

// ============================================================================
// Access Width
// ============================================================================

/// コンフィグ読み取り幅
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfigWidth {
    Byte = 1,
    Word = 2,
    Dword = 4,
}

impl ConfigWidth {
    /// バイト数
    pub const fn bytes(self) -> u32 {
        self as u32
    }

    /// 値マスク
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
            Self::Dword => 0xFFFF_FFFF,
        }
    }
}

// ============================================================================
// Configuration Space Registers
// ============================================================================

/// 標準PCI Configuration Space レジスタオフセット
pub mod config_regs {
    pub const VENDOR_ID: u8 = 0x00;
    pub const DEVICE_ID: u8 = 0x02;
    pub const COMMAND: u8 = 0x04;
    pub const STATUS: u8 = 0x06;
    pub const PROG_IF: u8 = 0x09;
    pub const SUBCLASS: u8 = 0x0A;
    pub const CLASS_CODE: u8 = 0x0B;
    pub const HEADER_TYPE: u8 = 0x0E;
    pub const BAR0: u8 = 0x10;
    pub const BAR1: u8 = 0x14;
    pub const BAR2: u8 = 0x18;
    pub const BAR3: u8 = 0x1C;
    pub const BAR4: u8 = 0x20;
    pub const INTERRUPT_LINE: u8 = 0x3C;
    pub const INTERRUPT_PIN: u8 = 0x3D;
}

/// ヘッダタイプのマルチファンクションビット
pub const HEADER_MULTIFUNCTION: u8 = 0x80;

/// ベンダーID読み取りで「デバイスなし」を示す値
pub const VENDOR_NONE: u16 = 0xFFFF;

/// デコード可能な最大BAR番号（BAR0-BAR4）
pub const MAX_DECODED_BAR: u8 = 4;

// ============================================================================
// BAR Decoding
// ============================================================================

/// I/O BAR を簡易デコード
///
/// 下位3ビットのフラグを落とし、16ビットに切り詰める。
/// 64KB を超えるベースや 64ビット BAR は扱えない。
#[inline]
pub const fn decode_io_bar(raw: u32) -> u16 {
    (raw & 0xFFFF & !0x7) as u16
}
