// ============================================================================
// src/io/ide/disk.rs - IDE Disk Drivers
// ============================================================================
//!
//! # IDEディスクドライバ
//!
//! [`AtaProtocolEngine`] を包んだ2種類のコントローラドライバ。
//! 違いは割り込みの判定と応答方法のみ。
//!
//! - [`LegacyDisk`]: ISA互換ポート（0x1F0 / 0x3F6, IRQ 14）
//! - [`PciNativeDisk`]: BAR由来のポートとバスマスタステータス
//!
//! システム全体で1台のみ。転送は [`SharedDisk::begin`] で得た
//! [`TransferSession`] を通して行い、ロックは `complete` まで保持される。

use spin::{Mutex, MutexGuard};

use super::engine::{AtaProtocolEngine, DiskPresence};
use crate::config::HwConfig;
use crate::error::DiskError;
use crate::io::pic::{irq_vector, InterruptController};
use crate::io::pin::ExecutionPin;
use crate::io::port::PortIo;

/// セクタサイズ
pub const SECTOR_SIZE: usize = 512;
/// セクタあたりのダブルワード数
pub const SECTOR_DWORDS: usize = SECTOR_SIZE / 4;
/// 28ビットLBAの上限（排他的）
pub const LBA28_LIMIT: u32 = 1 << 28;

/// レガシーIDE コマンドブロック
pub const LEGACY_COMMAND_BASE: u16 = 0x1F0;
/// レガシーIDE コントロールブロック
pub const LEGACY_CONTROL_BASE: u16 = 0x3F6;
/// レガシーIDE IRQ
pub const LEGACY_IRQ: u8 = 14;

/// バスマスタレジスタ
pub mod busmaster {
    /// バスマスタステータスレジスタ（ベースからのオフセット）
    pub const STATUS: u16 = 0x02;
    /// 割り込み保留
    pub const STATUS_INTERRUPT: u8 = 1 << 2;
    /// 転送エラー
    pub const STATUS_ERROR: u8 = 1 << 1;
}

// ============================================================================
// Disk Buffer
// ============================================================================

/// ドライブ選択（マスタ/スレーブ）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DiskUnit {
    Master = 0,
    Slave = 1,
}

impl DiskUnit {
    pub const fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DiskUnit {
    type Error = DiskError;

    fn try_from(unit: u8) -> Result<Self, Self::Error> {
        match unit {
            0 => Ok(DiskUnit::Master),
            1 => Ok(DiskUnit::Slave),
            _ => Err(DiskError::InvalidUnit { unit }),
        }
    }
}

/// 1セクタ分の転送バッファ
///
/// 呼び出し側が所有し、ドライバは `complete` より後まで保持しない。
#[derive(Clone, Debug)]
pub struct DiskBuffer {
    unit: DiskUnit,
    block: u32,
    /// セクタデータ
    pub data: [u8; SECTOR_SIZE],
}

impl DiskBuffer {
    /// ゼロ埋めのバッファを作成（ユニットとLBAを検証）
    pub fn new(unit: u8, block: u32) -> Result<Self, DiskError> {
        let unit = DiskUnit::try_from(unit)?;
        if block >= LBA28_LIMIT {
            return Err(DiskError::LbaOutOfRange { block });
        }
        Ok(Self {
            unit,
            block,
            data: [0; SECTOR_SIZE],
        })
    }

    pub fn unit(&self) -> DiskUnit {
        self.unit
    }

    /// 論理ブロック番号
    pub fn block(&self) -> u32 {
        self.block
    }

    /// データポートへ送る順のダブルワード列（リトルエンディアン）
    pub(crate) fn to_dwords(&self) -> [u32; SECTOR_DWORDS] {
        let mut words = [0u32; SECTOR_DWORDS];
        for (word, chunk) in words.iter_mut().zip(self.data.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words
    }
}

// ============================================================================
// Driver Capability
// ============================================================================

/// ブロックI/O層と割り込みディスパッチに公開する操作
pub trait DiskDriver {
    /// 転送を開始（書き込みならデータもここで送る）
    fn start(&self, buffer: &DiskBuffer, writing: bool) -> Result<(), DiskError>;

    /// 割り込み後に転送を完了（読み込みなら `dst` に格納）
    fn complete(&self, dst: &mut [u8; SECTOR_SIZE], writing: bool) -> Result<(), DiskError>;

    /// このディスクが割り込みを上げているか
    fn has_interrupt(&self) -> bool;

    /// デバイスの割り込みを落とし、EOIを送る
    fn clear_interrupt(&self, pic: &dyn InterruptController) -> Result<(), DiskError>;

    /// IRQ番号
    fn irq(&self) -> u8;

    /// 割り込みベクタ番号
    fn vector(&self) -> u8 {
        irq_vector(self.irq())
    }
}

// ============================================================================
// Legacy (ISA-compatible) Disk
// ============================================================================

/// ISA互換ポートのIDEディスク
#[derive(Clone, Debug)]
pub struct LegacyDisk<P> {
    engine: AtaProtocolEngine<P>,
}

impl<P: PortIo> LegacyDisk<P> {
    pub fn new(ports: P, config: &HwConfig) -> Self {
        Self {
            engine: AtaProtocolEngine::new(ports, LEGACY_COMMAND_BASE, LEGACY_CONTROL_BASE, config),
        }
    }

    pub fn engine(&self) -> &AtaProtocolEngine<P> {
        &self.engine
    }

    pub fn probe(&self) -> DiskPresence {
        self.engine.probe()
    }
}

impl<P: PortIo> DiskDriver for LegacyDisk<P> {
    fn start(&self, buffer: &DiskBuffer, writing: bool) -> Result<(), DiskError> {
        self.engine.start(buffer, writing)
    }

    fn complete(&self, dst: &mut [u8; SECTOR_SIZE], writing: bool) -> Result<(), DiskError> {
        self.engine.complete(dst, writing)
    }

    /// IRQ共有の判別はしない
    fn has_interrupt(&self) -> bool {
        true
    }

    fn clear_interrupt(&self, pic: &dyn InterruptController) -> Result<(), DiskError> {
        self.engine.acknowledge_device();
        pic.end_of_interrupt(LEGACY_IRQ);
        Ok(())
    }

    fn irq(&self) -> u8 {
        LEGACY_IRQ
    }
}

// ============================================================================
// PCI-native Disk
// ============================================================================

/// PCIネイティブモードのIDEディスク（ICH系）
#[derive(Clone, Debug)]
pub struct PciNativeDisk<P> {
    engine: AtaProtocolEngine<P>,
    busmaster_base: u16,
    irq: u8,
}

impl<P: PortIo> PciNativeDisk<P> {
    pub fn new(
        ports: P,
        command_base: u16,
        control_base: u16,
        busmaster_base: u16,
        irq: u8,
        config: &HwConfig,
    ) -> Self {
        Self {
            engine: AtaProtocolEngine::new(ports, command_base, control_base, config),
            busmaster_base,
            irq,
        }
    }

    pub fn engine(&self) -> &AtaProtocolEngine<P> {
        &self.engine
    }

    pub fn busmaster_base(&self) -> u16 {
        self.busmaster_base
    }

    pub fn probe(&self) -> DiskPresence {
        self.engine.probe()
    }

    fn busmaster_status_port(&self) -> u16 {
        self.busmaster_base + busmaster::STATUS
    }
}

impl<P: PortIo> DiskDriver for PciNativeDisk<P> {
    fn start(&self, buffer: &DiskBuffer, writing: bool) -> Result<(), DiskError> {
        self.engine.start(buffer, writing)
    }

    fn complete(&self, dst: &mut [u8; SECTOR_SIZE], writing: bool) -> Result<(), DiskError> {
        self.engine.complete(dst, writing)
    }

    fn has_interrupt(&self) -> bool {
        let status = self.engine.ports().read8(self.busmaster_status_port());
        status & busmaster::STATUS_INTERRUPT != 0
    }

    /// バスマスタのエラービットは致命扱い（EOIも送らない）
    fn clear_interrupt(&self, pic: &dyn InterruptController) -> Result<(), DiskError> {
        self.engine.acknowledge_device();

        let port = self.busmaster_status_port();
        let status = self.engine.ports().read8(port);
        if status & busmaster::STATUS_ERROR != 0 {
            log::error!("IDE busmaster error, status {:#04x}", status);
            return Err(DiskError::MediaFatal { status });
        }
        // 書き戻して割り込み/エラービットをクリア（RWC）
        self.engine.ports().write8(port, status);
        pic.end_of_interrupt(self.irq);
        Ok(())
    }

    fn irq(&self) -> u8 {
        self.irq
    }
}

// ============================================================================
// Installed Disk
// ============================================================================

/// アタッチ済みのディスク（2種類のみ）
#[derive(Clone, Debug)]
pub enum InstalledDisk<P> {
    Legacy(LegacyDisk<P>),
    PciNative(PciNativeDisk<P>),
}

impl<P: PortIo> InstalledDisk<P> {
    pub fn engine(&self) -> &AtaProtocolEngine<P> {
        match self {
            InstalledDisk::Legacy(disk) => disk.engine(),
            InstalledDisk::PciNative(disk) => disk.engine(),
        }
    }

    pub fn probe(&self) -> DiskPresence {
        self.engine().probe()
    }
}

impl<P: PortIo> DiskDriver for InstalledDisk<P> {
    fn start(&self, buffer: &DiskBuffer, writing: bool) -> Result<(), DiskError> {
        match self {
            InstalledDisk::Legacy(disk) => disk.start(buffer, writing),
            InstalledDisk::PciNative(disk) => disk.start(buffer, writing),
        }
    }

    fn complete(&self, dst: &mut [u8; SECTOR_SIZE], writing: bool) -> Result<(), DiskError> {
        match self {
            InstalledDisk::Legacy(disk) => disk.complete(dst, writing),
            InstalledDisk::PciNative(disk) => disk.complete(dst, writing),
        }
    }

    fn has_interrupt(&self) -> bool {
        match self {
            InstalledDisk::Legacy(disk) => disk.has_interrupt(),
            InstalledDisk::PciNative(disk) => disk.has_interrupt(),
        }
    }

    fn clear_interrupt(&self, pic: &dyn InterruptController) -> Result<(), DiskError> {
        match self {
            InstalledDisk::Legacy(disk) => disk.clear_interrupt(pic),
            InstalledDisk::PciNative(disk) => disk.clear_interrupt(pic),
        }
    }

    fn irq(&self) -> u8 {
        match self {
            InstalledDisk::Legacy(disk) => disk.irq(),
            InstalledDisk::PciNative(disk) => disk.irq(),
        }
    }
}

// ============================================================================
// Shared Disk / Transfer Session
// ============================================================================

/// ロックで直列化されたディスク
///
/// 1回の転送（start から complete まで）の間 `disk` のロックを保持し、
/// 各レジスタシーケンスは `X` で現在のCPUに固定して実行する。
/// 割り込みディスパッチは転送ロックを取らず、短い `ack` ロックだけで
/// 割り込みの判定と応答を行う。IRQ はアタッチ後に変わらない。
pub struct SharedDisk<P, X> {
    disk: Mutex<InstalledDisk<P>>,
    interrupt: Mutex<InstalledDisk<P>>,
    irq: u8,
    pin: X,
}

impl<P: PortIo + Clone, X: ExecutionPin> SharedDisk<P, X> {
    pub fn new(disk: InstalledDisk<P>, pin: X) -> Self {
        let irq = disk.irq();
        Self {
            interrupt: Mutex::new(disk.clone()),
            disk: Mutex::new(disk),
            irq,
            pin,
        }
    }
}

impl<P: PortIo, X: ExecutionPin> SharedDisk<P, X> {
    /// IRQ番号
    pub fn irq(&self) -> u8 {
        self.irq
    }

    /// 割り込みベクタ番号
    pub fn vector(&self) -> u8 {
        irq_vector(self.irq)
    }

    /// このディスクが割り込みを上げているか（割り込みハンドラ用）
    pub fn has_interrupt(&self) -> bool {
        self.pin.pinned(|| self.interrupt.lock().has_interrupt())
    }

    /// デバイスの割り込みを落としてEOIを送る（割り込みハンドラ用）
    ///
    /// 転送中でも転送ロックとは競合しない。
    pub fn clear_interrupt(&self, pic: &dyn InterruptController) -> Result<(), DiskError> {
        self.pin.pinned(|| self.interrupt.lock().clear_interrupt(pic))
    }

    /// ロックを取って転送を開始
    ///
    /// 失敗時はロックを解放してエラーを返す。
    pub fn begin(
        &self,
        buffer: &DiskBuffer,
        writing: bool,
    ) -> Result<TransferSession<'_, P, X>, DiskError> {
        let guard = self.disk.lock();
        self.pin.pinned(|| guard.start(buffer, writing))?;
        Ok(TransferSession {
            disk: guard,
            pin: &self.pin,
            writing,
        })
    }
}

/// 進行中の転送（ロック保持中）
pub struct TransferSession<'a, P, X> {
    disk: MutexGuard<'a, InstalledDisk<P>>,
    pin: &'a X,
    writing: bool,
}

impl<P: PortIo, X: ExecutionPin> TransferSession<'_, P, X> {
    pub fn is_write(&self) -> bool {
        self.writing
    }

    /// 転送を完了してロックを解放
    pub fn complete(self, dst: &mut [u8; SECTOR_SIZE]) -> Result<(), DiskError> {
        self.pin.pinned(|| self.disk.complete(dst, self.writing))
    }
}
