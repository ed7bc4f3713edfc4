// ============================================================================
// src/io/pic.rs - End-Of-Interrupt Collaborator
// ============================================================================
//!
//! 割り込みコントローラへの EOI 送信。
//!
//! ディスクドライバは [`InterruptController`] 経由でのみ EOI を送る。
//! 既定の実装 [`ChainedPic`] はカスケード接続された 8259A に直接ポートで書き込む。

use super::port::PortIo;

/// PIC IRQ 0 にマップされる割り込みベクタ
pub const IRQ_BASE: u8 = 32;

/// マスタPICコマンドポート
const PIC1_COMMAND: u16 = 0x20;
/// スレーブPICコマンドポート
const PIC2_COMMAND: u16 = 0xA0;
/// 非特定EOIコマンド
const PIC_EOI: u8 = 0x20;

/// IRQ番号から割り込みベクタ番号へ
#[inline]
pub const fn irq_vector(irq: u8) -> u8 {
    IRQ_BASE + irq
}

/// EOIを受け付ける割り込みコントローラ
pub trait InterruptController {
    /// `irq` の処理完了を通知
    fn end_of_interrupt(&self, irq: u8);
}

/// カスケード接続された 8259A PIC
#[derive(Clone, Debug)]
pub struct ChainedPic<P> {
    ports: P,
}

impl<P: PortIo> ChainedPic<P> {
    pub const fn new(ports: P) -> Self {
        Self { ports }
    }
}

impl<P: PortIo> InterruptController for ChainedPic<P> {
    fn end_of_interrupt(&self, irq: u8) {
        // スレーブ側の IRQ はスレーブ→マスタの順に EOI
        if irq >= 8 {
            self.ports.write8(PIC2_COMMAND, PIC_EOI);
        }
        self.ports.write8(PIC1_COMMAND, PIC_EOI);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::sim::{PortAccess, SimPorts};

    #[test]
    fn test_slave_irq_acknowledges_both_pics() {
        let ports = SimPorts::new();
        let pic = ChainedPic::new(ports.clone());
        pic.end_of_interrupt(14);
        assert_eq!(
            ports.writes(),
            vec![
                PortAccess::Write8(PIC2_COMMAND, PIC_EOI),
                PortAccess::Write8(PIC1_COMMAND, PIC_EOI),
            ]
        );
    }

    #[test]
    fn test_master_irq_acknowledges_master_only() {
        let ports = SimPorts::new();
        let pic = ChainedPic::new(ports.clone());
        pic.end_of_interrupt(1);
        assert_eq!(ports.writes(), vec![PortAccess::Write8(PIC1_COMMAND, PIC_EOI)]);
    }

    #[test]
    fn test_irq_vector() {
        assert_eq!(irq_vector(14), 46);
    }
}
