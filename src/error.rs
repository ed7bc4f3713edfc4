//! 統一エラーハンドリングモジュール
//!
//! ハードウェア検出・ディスクI/Oで使用される統一エラー型を定義し、
//! 各サブシステム（PCI / ATA / ACPI）のエラーから変換を提供します。
//!
//! 致命的なエラー（ブート継続不可）もパニックではなく `Err` として
//! ブートシーケンサへ返し、判定は [`HwError::is_fatal`] で行う。

use core::fmt;

/// サブシステム全体の統一エラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwError {
    /// PCI関連エラー
    Pci(PciError),
    /// ディスク関連エラー
    Disk(DiskError),
    /// ACPI関連エラー
    Acpi(AcpiError),
}

/// PCI関連エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PciError {
    /// 4バイト境界に揃っていないレジスタへの書き込み（呼び出し側のバグ）
    MisalignedWrite { reg: u8 },
    /// 存在しないBAR番号（0-4のみ有効）
    InvalidBar { index: u8 },
    /// 2台目のディスクをアタッチしようとした
    DuplicateDevice { vendor: u16, device: u16 },
}

/// ポーリング待機の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStage {
    /// BSY解除かつDRDY待ち
    Ready,
    /// DRQ待ち（書き込みデータ投入前）
    DataRequest,
}

/// ディスク関連エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// プローブで応答するコントローラが見つからなかった
    Absent,
    /// 読み込み完了時に ERR / DF ビットが立っていた
    MediaError { status: u8 },
    /// バスマスタステータスのエラービット（割り込み応答中に検出）
    MediaFatal { status: u8 },
    /// スピン予算を使い切った
    TimedOut { stage: WaitStage },
    /// 28ビットLBAの範囲外
    LbaOutOfRange { block: u32 },
    /// ディスクユニットは 0 か 1 のみ
    InvalidUnit { unit: u8 },
}

/// ACPI関連エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcpiError {
    /// RSDP が EBDA / BIOS ROM 領域に見つからない
    FirmwareNotFound,
    /// シグネチャまたはチェックサム不正
    FirmwareCorrupt { table: &'static str },
    /// MADT がない、または有効な Local APIC が 0 個
    NoCpuTopology,
    /// マップ済みビューの範囲外フィールド
    Truncated { offset: usize, len: usize },
    /// 物理メモリのマップに失敗
    MappingFailed { address: u64, length: usize },
}

impl HwError {
    /// ブートを停止すべきエラーかどうか
    ///
    /// `MisalignedWrite` / `InvalidBar` は呼び出し側のバグとして即座に報告されるが、
    /// ここでは致命扱いしない。
    pub fn is_fatal(&self) -> bool {
        match self {
            HwError::Pci(PciError::DuplicateDevice { .. }) => true,
            HwError::Pci(_) => false,
            HwError::Disk(DiskError::MediaFatal { .. }) => true,
            HwError::Disk(_) => false,
            HwError::Acpi(_) => true,
        }
    }
}

// ===== Display implementations =====

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HwError::Pci(e) => write!(f, "PCI error: {}", e),
            HwError::Disk(e) => write!(f, "Disk error: {}", e),
            HwError::Acpi(e) => write!(f, "ACPI error: {}", e),
        }
    }
}

impl fmt::Display for PciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PciError::MisalignedWrite { reg } => {
                write!(f, "config write to {:#04x} is not 32-bit aligned", reg)
            }
            PciError::InvalidBar { index } => write!(f, "bad BAR index {}", index),
            PciError::DuplicateDevice { vendor, device } => {
                write!(f, "second disk {:04x}:{:04x} attached", vendor, device)
            }
        }
    }
}

impl fmt::Display for WaitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitStage::Ready => write!(f, "ready"),
            WaitStage::DataRequest => write!(f, "data request"),
        }
    }
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskError::Absent => write!(f, "no IDE disk"),
            DiskError::MediaError { status } => write!(f, "media error (status {:#04x})", status),
            DiskError::MediaFatal { status } => {
                write!(f, "busmaster error (status {:#04x})", status)
            }
            DiskError::TimedOut { stage } => write!(f, "timed out waiting for {}", stage),
            DiskError::LbaOutOfRange { block } => write!(f, "LBA {:#x} exceeds 28 bits", block),
            DiskError::InvalidUnit { unit } => write!(f, "invalid disk unit {}", unit),
        }
    }
}

impl fmt::Display for AcpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcpiError::FirmwareNotFound => write!(f, "no RSDP"),
            AcpiError::FirmwareCorrupt { table } => write!(f, "bad {}", table),
            AcpiError::NoCpuTopology => write!(f, "no cpu count"),
            AcpiError::Truncated { offset, len } => {
                write!(f, "read of {} bytes at {:#x} out of table bounds", len, offset)
            }
            AcpiError::MappingFailed { address, length } => {
                write!(f, "cannot map {:#x} bytes at {:#x}", length, address)
            }
        }
    }
}

// ===== From implementations for sub-errors =====

impl From<PciError> for HwError {
    fn from(e: PciError) -> Self {
        HwError::Pci(e)
    }
}

impl From<DiskError> for HwError {
    fn from(e: DiskError) -> Self {
        HwError::Disk(e)
    }
}

impl From<AcpiError> for HwError {
    fn from(e: AcpiError) -> Self {
        HwError::Acpi(e)
    }
}

// ===== Result type alias =====

/// 結果型エイリアス
pub type HwResult<T> = Result<T, HwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: HwError = DiskError::Absent.into();
        assert!(matches!(err, HwError::Disk(DiskError::Absent)));
    }

    #[test]
    fn test_error_display() {
        let err = HwError::Pci(PciError::MisalignedWrite { reg: 0x3d });
        assert_eq!(
            format!("{}", err),
            "PCI error: config write to 0x3d is not 32-bit aligned"
        );
        let err = HwError::Acpi(AcpiError::FirmwareCorrupt { table: "RSDT" });
        assert_eq!(format!("{}", err), "ACPI error: bad RSDT");
    }

    #[test]
    fn test_fatality_classification() {
        assert!(HwError::from(PciError::DuplicateDevice { vendor: 0x8086, device: 0x7000 }).is_fatal());
        assert!(HwError::from(DiskError::MediaFatal { status: 0x02 }).is_fatal());
        assert!(HwError::from(AcpiError::NoCpuTopology).is_fatal());
        assert!(!HwError::from(DiskError::Absent).is_fatal());
        assert!(!HwError::from(DiskError::MediaError { status: 0x41 }).is_fatal());
        assert!(!HwError::from(DiskError::TimedOut { stage: WaitStage::Ready }).is_fatal());
        assert!(!HwError::from(PciError::MisalignedWrite { reg: 2 }).is_fatal());
    }
}
