// ============================================================================
// src/io/ide/engine.rs - ATA Task-File Protocol
// ============================================================================
//!
//! # ATA タスクファイルプロトコル
//!
//! レガシー/PCIネイティブ両方のディスクドライバが共有する PIO プロトコル。
//! 常に1セクタ・28ビットLBAで転送する。
//!
//! ## 注意
//! 書き込みは `start` の中で DRQ を待ってデータを同期的に送り込む。
//! 読み込みは割り込み後の `complete` でデータを取り出す。

use crate::config::{HwConfig, SpinBudget};
use crate::error::{DiskError, WaitStage};
use crate::io::port::PortIo;
use bitflags::bitflags;

use super::disk::{DiskBuffer, SECTOR_DWORDS, SECTOR_SIZE};

// ============================================================================
// IDE Constants
// ============================================================================

/// IDEレジスタオフセット（コマンドブロックベースから）
pub mod regs {
    pub const DATA: u16 = 0; // R/W データ
    pub const ERROR: u16 = 1; // R エラー
    pub const SECTOR_COUNT: u16 = 2; // R/W セクタカウント
    pub const LBA_LOW: u16 = 3; // R/W LBA[0:7]
    pub const LBA_MID: u16 = 4; // R/W LBA[8:15]
    pub const LBA_HIGH: u16 = 5; // R/W LBA[16:23]
    pub const DRIVE: u16 = 6; // R/W ドライブ/ヘッド
    pub const STATUS: u16 = 7; // R ステータス
    pub const COMMAND: u16 = 7; // W コマンド
}

bitflags! {
    /// ステータスレジスタ
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AtaStatus: u8 {
        /// エラー
        const ERR = 0x01;
        /// データ要求
        const DRQ = 0x08;
        /// ドライブ障害
        const DF = 0x20;
        /// 準備完了
        const DRDY = 0x40;
        /// ビジー
        const BSY = 0x80;
    }
}

/// ATAコマンド
pub mod commands {
    pub const READ_SECTORS: u8 = 0x20; // READ SECTORS
    pub const WRITE_SECTORS: u8 = 0x30; // WRITE SECTORS
}

/// ドライブ/ヘッドレジスタの固定ビット（LBAモード）
const DRIVE_LBA: u8 = 0xE0;

/// フローティングバスで読める値
const FLOATING_BUS: u8 = 0xFF;

// ============================================================================
// Probe Result
// ============================================================================

/// プローブ結果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskPresence {
    /// ディスクが応答した
    Present,
    /// 何も接続されていない（ステータスが0のまま、または待機がタイムアウト）
    Absent,
    /// フローティングバス（0xFF）
    FloatingBus,
}

impl DiskPresence {
    pub fn is_present(self) -> bool {
        self == DiskPresence::Present
    }
}

// ============================================================================
// Protocol Engine
// ============================================================================

/// ATAタスクファイルのプロトコルエンジン
#[derive(Clone, Debug)]
pub struct AtaProtocolEngine<P> {
    ports: P,
    /// コマンドブロックベース
    command_base: u16,
    /// コントロール/代替ステータスポート
    control_base: u16,
    wait_budget: SpinBudget,
    drq_budget: SpinBudget,
    probe_attempts: u32,
}

impl<P: PortIo> AtaProtocolEngine<P> {
    pub fn new(ports: P, command_base: u16, control_base: u16, config: &HwConfig) -> Self {
        Self {
            ports,
            command_base,
            control_base,
            wait_budget: config.wait,
            drq_budget: config.drq,
            probe_attempts: config.probe_attempts,
        }
    }

    pub fn command_base(&self) -> u16 {
        self.command_base
    }

    pub fn control_base(&self) -> u16 {
        self.control_base
    }

    pub(crate) fn ports(&self) -> &P {
        &self.ports
    }

    /// レジスタを読み取り
    #[inline]
    fn read_reg(&self, reg: u16) -> u8 {
        self.ports.read8(self.command_base + reg)
    }

    /// レジスタに書き込み
    #[inline]
    fn write_reg(&self, reg: u16, value: u8) {
        #[cfg(feature = "verbose_logging")]
        log::trace!("ide: {:#06x} <- {:#04x}", self.command_base + reg, value);
        self.ports.write8(self.command_base + reg, value);
    }

    /// ステータスを読み取り（読み取りでデバイスの割り込みもクリアされる）
    #[inline]
    pub fn read_status(&self) -> AtaStatus {
        AtaStatus::from_bits_retain(self.read_reg(regs::STATUS))
    }

    /// ディスクが接続されているか調べる
    ///
    /// 失敗してもブートは続行する（ドライバは使えないまま登録される）。
    pub fn probe(&self) -> DiskPresence {
        if let Err(err) = self.wait(false) {
            log::warn!("ide {:#x}: {}", self.command_base, err);
            log::warn!("no IDE disk");
            return DiskPresence::Absent;
        }

        for _ in 0..self.probe_attempts {
            let status = self.read_reg(regs::STATUS);
            if status == FLOATING_BUS {
                log::warn!("floating bus!");
                return DiskPresence::FloatingBus;
            }
            if status != 0 {
                log::info!("IDE disk detected");
                return DiskPresence::Present;
            }
        }

        log::warn!("no IDE disk");
        DiskPresence::Absent
    }

    /// BSY解除かつDRDYになるまで待機
    ///
    /// `check_errors` が真なら、その時点の ERR / DF ビットで失敗を返す。
    pub fn wait(&self, check_errors: bool) -> Result<(), DiskError> {
        let mut spins: u64 = 0;
        let status = loop {
            let status = self.read_status();
            if status & (AtaStatus::BSY | AtaStatus::DRDY) == AtaStatus::DRDY {
                break status;
            }
            spins += 1;
            if self.wait_budget.exhausted(spins) {
                return Err(DiskError::TimedOut { stage: WaitStage::Ready });
            }
            if self.wait_budget.should_warn(spins) {
                log::warn!("waiting a very long time for disk...");
            }
            core::hint::spin_loop();
        };

        if check_errors && status.intersects(AtaStatus::DF | AtaStatus::ERR) {
            return Err(DiskError::MediaError { status: status.bits() });
        }
        Ok(())
    }

    /// DRQがセットされるまで待機
    pub fn wait_data_request(&self) -> Result<(), DiskError> {
        let mut spins: u64 = 0;
        loop {
            if self.read_status().contains(AtaStatus::DRQ) {
                return Ok(());
            }
            spins += 1;
            if self.drq_budget.exhausted(spins) {
                return Err(DiskError::TimedOut { stage: WaitStage::DataRequest });
            }
            if self.drq_budget.should_warn(spins) {
                log::warn!("waiting a long time for DRQ...");
            }
            core::hint::spin_loop();
        }
    }

    /// 転送を開始
    ///
    /// 書き込みの場合はここで512バイトをデータポートへ送り込む。
    pub fn start(&self, buffer: &DiskBuffer, writing: bool) -> Result<(), DiskError> {
        self.wait(false)?;

        let block = buffer.block();
        self.ports.write8(self.control_base, 0);
        self.write_reg(regs::SECTOR_COUNT, 1);
        self.write_reg(regs::LBA_LOW, block as u8);
        self.write_reg(regs::LBA_MID, (block >> 8) as u8);
        self.write_reg(regs::LBA_HIGH, (block >> 16) as u8);
        self.write_reg(
            regs::DRIVE,
            DRIVE_LBA | (buffer.unit().index() << 4) | ((block >> 24) & 0x0F) as u8,
        );

        if writing {
            self.write_reg(regs::COMMAND, commands::WRITE_SECTORS);
            self.wait_data_request()?;
            self.ports
                .write_block32(self.command_base + regs::DATA, &buffer.to_dwords());
        } else {
            self.write_reg(regs::COMMAND, commands::READ_SECTORS);
        }
        Ok(())
    }

    /// 割り込み後に転送を完了
    ///
    /// 書き込みは何もしない（キャッシュフラッシュは発行しない）。
    pub fn complete(&self, dst: &mut [u8; SECTOR_SIZE], writing: bool) -> Result<(), DiskError> {
        if writing {
            return Ok(());
        }
        self.wait(true)?;

        let mut words = [0u32; SECTOR_DWORDS];
        self.ports
            .read_block32(self.command_base + regs::DATA, &mut words);
        for (chunk, word) in dst.chunks_exact_mut(4).zip(words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    /// ステータスを2回読んでデバイス側の割り込みを落とす
    pub fn acknowledge_device(&self) {
        let _ = self.read_status();
        let _ = self.read_status();
    }
}
