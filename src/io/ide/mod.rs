// ============================================================================
// src/io/ide/mod.rs - IDE/ATA Disk Support
// ============================================================================
//!
//! # IDE/ATA ディスク
//!
//! ## モジュール構成
//! - `engine`: タスクファイルプロトコル（プローブ、待機、転送開始/完了）
//! - `disk`: レガシー/PCIネイティブのドライバ、転送セッション

pub mod engine;
pub mod disk;

pub use engine::{AtaProtocolEngine, AtaStatus, DiskPresence};
pub use disk::{
    DiskBuffer, DiskDriver, DiskUnit, InstalledDisk, LegacyDisk, PciNativeDisk, SharedDisk,
    TransferSession, SECTOR_SIZE,
};
