// ============================================================================
// src/io/sim.rs - Simulated Port Space (test only)
// ============================================================================
//!
//! テスト用のシミュレートしたポート空間。
//!
//! - 0xCF8/0xCFC: `(tag | aligned reg)` をキーにした PCI コンフィグ空間
//! - その他の8ビットポート: スクリプト化した読み取りキュー、尽きたら既定値
//! - 32ビットデータポート: 読み取りキュー
//! - すべてのアクセスをジャーナルに記録

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::vec::Vec;

use super::port::PortIo;
use crate::io::pci::types::PciTag;

const CONFIG_ADDRESS: u16 = 0xCF8;
const CONFIG_DATA: u16 = 0xCFC;
const CONFIG_ENABLE: u32 = 1 << 31;

/// 記録されたポートアクセス
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortAccess {
    Read8(u16),
    Read16(u16),
    Read32(u16),
    Write8(u16, u8),
    Write16(u16, u16),
    Write32(u16, u32),
}

impl PortAccess {
    fn is_write(&self) -> bool {
        matches!(
            self,
            PortAccess::Write8(..) | PortAccess::Write16(..) | PortAccess::Write32(..)
        )
    }
}

#[derive(Debug, Default)]
struct SimState {
    config_address: u32,
    config: BTreeMap<u32, u32>,
    script8: BTreeMap<u16, VecDeque<u8>>,
    default8: BTreeMap<u16, u8>,
    script32: BTreeMap<u16, VecDeque<u32>>,
    journal: Vec<PortAccess>,
}

/// 共有されたシミュレーションポート空間
#[derive(Clone, Debug, Default)]
pub struct SimPorts {
    state: Arc<Mutex<SimState>>,
}

impl SimPorts {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        let mut state = self.state.lock().expect("sim state poisoned");
        f(&mut state)
    }

    /// コンフィグ空間のダブルワードを設定
    pub fn set_config(&self, tag: PciTag, reg: u8, value: u32) {
        self.with(|s| {
            s.config.insert(tag.raw() | u32::from(reg & !3), value);
        });
    }

    /// コンフィグ空間のダブルワードを取得（未設定は 0xFFFFFFFF）
    pub fn config(&self, tag: PciTag, reg: u8) -> u32 {
        self.with(|s| {
            s.config
                .get(&(tag.raw() | u32::from(reg & !3)))
                .copied()
                .unwrap_or(0xFFFF_FFFF)
        })
    }

    /// ファンクションを追加（ベンダー/デバイス/クラス/ヘッダタイプ）
    pub fn add_function(
        &self,
        tag: PciTag,
        vendor: u16,
        device: u16,
        class: u8,
        subclass: u8,
        header_type: u8,
    ) {
        self.set_config(tag, 0x00, u32::from(vendor) | (u32::from(device) << 16));
        self.set_config(tag, 0x08, (u32::from(class) << 24) | (u32::from(subclass) << 16));
        self.set_config(tag, 0x0C, u32::from(header_type) << 16);
    }

    /// 8ビットポートの読み取り値を順に積む
    pub fn script8(&self, port: u16, values: &[u8]) {
        self.with(|s| s.script8.entry(port).or_default().extend(values.iter().copied()));
    }

    /// 8ビットポートのキューが尽きた後に返す値
    pub fn set_default8(&self, port: u16, value: u8) {
        self.with(|s| {
            s.default8.insert(port, value);
        });
    }

    /// 32ビットポートの読み取り値を順に積む
    pub fn script32(&self, port: u16, values: &[u32]) {
        self.with(|s| s.script32.entry(port).or_default().extend(values.iter().copied()));
    }

    /// 全アクセス
    pub fn accesses(&self) -> Vec<PortAccess> {
        self.with(|s| s.journal.clone())
    }

    /// 書き込みアクセスのみ
    pub fn writes(&self) -> Vec<PortAccess> {
        self.with(|s| s.journal.iter().copied().filter(PortAccess::is_write).collect())
    }

    /// 指定ポートへの8ビット書き込み値
    pub fn writes8_to(&self, port: u16) -> Vec<u8> {
        self.with(|s| {
            s.journal
                .iter()
                .filter_map(|a| match *a {
                    PortAccess::Write8(p, v) if p == port => Some(v),
                    _ => None,
                })
                .collect()
        })
    }

    /// 指定ポートへの32ビット書き込み値
    pub fn writes32_to(&self, port: u16) -> Vec<u32> {
        self.with(|s| {
            s.journal
                .iter()
                .filter_map(|a| match *a {
                    PortAccess::Write32(p, v) if p == port => Some(v),
                    _ => None,
                })
                .collect()
        })
    }

    /// 指定ポートからの8ビット読み取り回数
    pub fn reads8_from(&self, port: u16) -> usize {
        self.with(|s| {
            s.journal
                .iter()
                .filter(|a| matches!(a, PortAccess::Read8(p) if *p == port))
                .count()
        })
    }

    /// ジャーナルを消去
    pub fn clear_journal(&self) {
        self.with(|s| s.journal.clear());
    }

    fn config_dword(s: &SimState) -> u32 {
        if s.config_address & CONFIG_ENABLE == 0 {
            return 0xFFFF_FFFF;
        }
        s.config
            .get(&(s.config_address & !CONFIG_ENABLE & !3))
            .copied()
            .unwrap_or(0xFFFF_FFFF)
    }
}

impl PortIo for SimPorts {
    fn read8(&self, port: u16) -> u8 {
        self.with(|s| {
            s.journal.push(PortAccess::Read8(port));
            if let Some(v) = s.script8.get_mut(&port).and_then(VecDeque::pop_front) {
                return v;
            }
            s.default8.get(&port).copied().unwrap_or(0xFF)
        })
    }

    fn read16(&self, port: u16) -> u16 {
        self.with(|s| {
            s.journal.push(PortAccess::Read16(port));
            0xFFFF
        })
    }

    fn read32(&self, port: u16) -> u32 {
        self.with(|s| {
            s.journal.push(PortAccess::Read32(port));
            if port == CONFIG_DATA {
                return Self::config_dword(s);
            }
            s.script32
                .get_mut(&port)
                .and_then(VecDeque::pop_front)
                .unwrap_or(0)
        })
    }

    fn write8(&self, port: u16, value: u8) {
        self.with(|s| s.journal.push(PortAccess::Write8(port, value)));
    }

    fn write16(&self, port: u16, value: u16) {
        self.with(|s| s.journal.push(PortAccess::Write16(port, value)));
    }

    fn write32(&self, port: u16, value: u32) {
        self.with(|s| {
            s.journal.push(PortAccess::Write32(port, value));
            match port {
                CONFIG_ADDRESS => s.config_address = value,
                CONFIG_DATA if s.config_address & CONFIG_ENABLE != 0 => {
                    let key = s.config_address & !CONFIG_ENABLE & !3;
                    s.config.insert(key, value);
                }
                _ => {}
            }
        });
    }
}
