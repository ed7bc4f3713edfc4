// ============================================================================
// src/io/pci/bus.rs - PCI Bus Enumeration
// ============================================================================
//!
//! # PCIバス列挙
//!
//! バス/デバイス/ファンクション空間を総当たりで走査する。
//! ブリッジの再帰探索は行わず、走査するバス範囲は呼び出し側が決める。
//!
//! - [`PciBusScanner::dump_bus`]: 全256バスを走査してログ出力（診断用）
//! - [`PciBusScanner::for_each_function`]: アタッチ用の限定走査

use alloc::vec::Vec;
use core::convert::Infallible;
use core::ops::Range;

use super::traits::ConfigSpaceAccessor;
use super::types::{PciTag, HEADER_MULTIFUNCTION, VENDOR_NONE};

/// 全バス
pub const ALL_BUSES: Range<u16> = 0..256;
/// バスあたりのデバイス数
const DEVICES_PER_BUS: u8 = 32;
/// デバイスあたりのファンクション数
const FUNCTIONS_PER_DEVICE: u8 = 8;

// ============================================================================
// PCI Function Information
// ============================================================================

/// 検出したPCIファンクション
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PciFunction {
    /// タグ
    pub tag: PciTag,
    /// ベンダーID
    pub vendor_id: u16,
    /// デバイスID
    pub device_id: u16,
    /// ヘッダタイプ
    pub header_type: u8,
    /// クラスコード
    pub class: u8,
    /// サブクラス
    pub subclass: u8,
}

impl PciFunction {
    /// マルチファンクションデバイスかどうか
    pub fn is_multifunction(&self) -> bool {
        (self.header_type & HEADER_MULTIFUNCTION) != 0
    }
}

// ============================================================================
// PCI Bus Scanner
// ============================================================================

/// PCIバススキャナ
///
/// ConfigSpaceAccessorトレイトを使用してPCIバスをスキャンし、
/// ファンクションを列挙します。
pub struct PciBusScanner<'a> {
    accessor: &'a dyn ConfigSpaceAccessor,
}

impl<'a> PciBusScanner<'a> {
    /// 新しいスキャナを作成
    pub fn new(accessor: &'a dyn ConfigSpaceAccessor) -> Self {
        Self { accessor }
    }

    /// アクセサを取得
    pub fn accessor(&self) -> &'a dyn ConfigSpaceAccessor {
        self.accessor
    }

    /// 指定したタグのファンクションを読み取り
    ///
    /// ベンダーIDが 0xFFFF なら存在しない。
    pub fn probe(&self, tag: PciTag) -> Option<PciFunction> {
        let vendor_id = self.accessor.read_vendor_id(tag);
        if vendor_id == VENDOR_NONE {
            return None;
        }
        let device_id = self.accessor.read_device_id(tag);
        let header_type = self.accessor.read_header_type(tag);
        let (class, subclass) = self.accessor.read_class(tag);

        Some(PciFunction {
            tag,
            vendor_id,
            device_id,
            header_type,
            class,
            subclass,
        })
    }

    /// 1デバイス分のファンクションを走査
    ///
    /// ファンクション0がなければ何もしない。マルチファンクションなら 1-7 も調べる。
    fn scan_device<E>(
        &self,
        bus: u8,
        device: u8,
        visit: &mut impl FnMut(&PciFunction) -> Result<(), E>,
    ) -> Result<(), E> {
        let Some(fn0) = self.probe(PciTag::new(bus, device, 0)) else {
            return Ok(());
        };
        visit(&fn0)?;
        if !fn0.is_multifunction() {
            return Ok(());
        }
        for function in 1..FUNCTIONS_PER_DEVICE {
            if let Some(info) = self.probe(fn0.tag.with_function(function)) {
                visit(&info)?;
            }
        }
        Ok(())
    }

    /// バス範囲内の全ファンクションを訪問（エラーで即中断）
    pub fn for_each_function<E>(
        &self,
        buses: Range<u16>,
        mut visit: impl FnMut(&PciFunction) -> Result<(), E>,
    ) -> Result<(), E> {
        for bus in buses.start..buses.end.min(ALL_BUSES.end) {
            for device in 0..DEVICES_PER_BUS {
                self.scan_device(bus as u8, device, &mut visit)?;
            }
        }
        Ok(())
    }

    /// バス範囲内の全ファンクションを収集
    pub fn functions(&self, buses: Range<u16>) -> Vec<PciFunction> {
        let mut found = Vec::new();
        let Ok(()) = self.for_each_function(buses, |info| -> Result<(), Infallible> {
            found.push(*info);
            Ok(())
        });
        found
    }

    /// 全バスを走査してログに出力（診断用、アタッチはしない）
    pub fn dump_bus(&self) -> Vec<PciFunction> {
        log::info!("PCI dump:");
        let found = self.functions(ALL_BUSES);
        for info in &found {
            let indent = if info.tag.function() != 0 { "    " } else { "" };
            log::info!(
                "{}{}: {:#06x} {:#06x} ({:#04x} {:#04x})",
                indent,
                info.tag,
                info.vendor_id,
                info.device_id,
                info.class,
                info.subclass
            );
        }
        found
    }
}
