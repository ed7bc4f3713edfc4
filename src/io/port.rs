// ============================================================================
// src/io/port.rs - Port I/O Capability
// ============================================================================
//!
//! # ポートI/O抽象
//!
//! PCIコンフィグ空間・ATAタスクファイル・バスマスタ・PIC はすべて
//! I/O ポート経由でアクセスする。ドライバは [`PortIo`] トレイトだけに依存し、
//! 実機では [`X86PortIo`]、テストではシミュレートしたポート空間を注入する。

/// 1/2/4バイトのポートアクセスとブロック転送
pub trait PortIo {
    /// バイトを読み取り
    fn read8(&self, port: u16) -> u8;

    /// ワードを読み取り
    fn read16(&self, port: u16) -> u16;

    /// ダブルワードを読み取り
    fn read32(&self, port: u16) -> u32;

    /// バイトを書き込み
    fn write8(&self, port: u16, value: u8);

    /// ワードを書き込み
    fn write16(&self, port: u16, value: u16);

    /// ダブルワードを書き込み
    fn write32(&self, port: u16, value: u32);

    /// 同一ポートから `buf.len()` 個のダブルワードを読み取り（REP INSD 相当）
    fn read_block32(&self, port: u16, buf: &mut [u32]) {
        for word in buf.iter_mut() {
            *word = self.read32(port);
        }
    }

    /// 同一ポートへ `buf.len()` 個のダブルワードを書き込み（REP OUTSD 相当）
    fn write_block32(&self, port: u16, buf: &[u32]) {
        for &word in buf {
            self.write32(port, word);
        }
    }
}

// ============================================================================
// x86_64 Port I/O
// ============================================================================

#[cfg(target_arch = "x86_64")]
pub use self::x86::X86PortIo;

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::PortIo;
    use x86_64::instructions::port::Port;

    /// IN/OUT 命令による実ポートアクセス
    #[derive(Clone, Copy, Debug)]
    pub struct X86PortIo {
        _private: (),
    }

    impl X86PortIo {
        /// # Safety
        /// 呼び出し元はリング0（またはIOPLでポートアクセスが許可された状態）で
        /// 実行されていなければならない。
        pub const unsafe fn new() -> Self {
            Self { _private: () }
        }
    }

    impl PortIo for X86PortIo {
        #[inline]
        fn read8(&self, port: u16) -> u8 {
            unsafe { Port::<u8>::new(port).read() }
        }

        #[inline]
        fn read16(&self, port: u16) -> u16 {
            unsafe { Port::<u16>::new(port).read() }
        }

        #[inline]
        fn read32(&self, port: u16) -> u32 {
            unsafe { Port::<u32>::new(port).read() }
        }

        #[inline]
        fn write8(&self, port: u16, value: u8) {
            unsafe { Port::<u8>::new(port).write(value) }
        }

        #[inline]
        fn write16(&self, port: u16, value: u16) {
            unsafe { Port::<u16>::new(port).write(value) }
        }

        #[inline]
        fn write32(&self, port: u16, value: u32) {
            unsafe { Port::<u32>::new(port).write(value) }
        }

        /// REP INSDで複数ダブルワードを読み取り
        #[inline]
        fn read_block32(&self, port: u16, buf: &mut [u32]) {
            unsafe {
                core::arch::asm!(
                    "rep insd",
                    in("dx") port,
                    inout("rdi") buf.as_mut_ptr() => _,
                    inout("rcx") buf.len() => _,
                    options(nostack, preserves_flags)
                );
            }
        }

        /// REP OUTSDで複数ダブルワードを書き込み
        #[inline]
        fn write_block32(&self, port: u16, buf: &[u32]) {
            unsafe {
                core::arch::asm!(
                    "rep outsd",
                    in("dx") port,
                    inout("rsi") buf.as_ptr() => _,
                    inout("rcx") buf.len() => _,
                    options(nostack, preserves_flags, readonly)
                );
            }
        }
    }
}
