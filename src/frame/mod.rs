//! Length-prefixed framing for attribute snapshots.
//!
//! Format: `<u32_le_len><frame_bytes...>`

use crate::GateError;

use std::io::{Read, Write};

pub mod cbor;
pub mod postcard;

/// Number of bytes used for the length prefix.
pub const LEN_PREFIX: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    pub max_frame_len: usize,

    /// Drain frame bytes if dst buffer is too small (safe because len <= max_frame_len).
    pub drain_on_small_buffer: bool,

    /// If a frame claims an oversize length, only drain it if len <= drain_oversize_up_to.
    /// 0 = never drain oversize.
    pub drain_oversize_up_to: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_frame_len: 1024 * 1024,
            drain_on_small_buffer: true,
            drain_oversize_up_to: 0,
        }
    }
}

#[derive(Debug)]
pub struct FramedWriter<W: Write> {
    inner: W,
}

impl<W: Write> FramedWriter<W> {
    pub fn new(inner: W) -> Self { Self { inner } }

    pub fn into_inner(self) -> W { self.inner }
    pub fn inner_mut(&mut self) -> &mut W { &mut self.inner }

    /// Writes one frame. Does NOT flush (caller controls flushing).
    pub fn write_frame(&mut self, bytes: &[u8]) -> Result<(), GateError> {
        let len: u32 = bytes
            .len()
            .try_into()
            .map_err(|_| GateError::frame_too_large(bytes.len(), u32::MAX as usize))?;

        self.inner.write_all(&len.to_le_bytes())?;
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), GateError> {
        self.inner.flush()?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct FramedReader<R: Read> {
    inner: R,
    cfg: ReaderConfig,
}

impl<R: Read> FramedReader<R> {
    pub fn new(inner: R) -> Self { Self::with_config(inner, ReaderConfig::default()) }
    pub fn with_max(inner: R, max_frame_len: usize) -> Self {
        Self::with_config(inner, ReaderConfig { max_frame_len, ..Default::default() })
    }
    pub fn with_config(inner: R, cfg: ReaderConfig) -> Self { Self { inner, cfg } }

    pub fn into_inner(self) -> R { self.inner }
    pub fn config(&self) -> ReaderConfig { self.cfg }

    fn drain_exact(&mut self, len: usize) -> Result<(), GateError> {
        let mut sink = std::io::sink();
        std::io::copy(&mut self.inner.by_ref().take(len as u64), &mut sink)?;
        Ok(())
    }

    fn read_len(&mut self) -> Result<usize, GateError> {
        let mut len_buf = [0u8; LEN_PREFIX];
        self.inner.read_exact(&mut len_buf)?;
        let len = u32::from_le_bytes(len_buf) as usize;

        if len > self.cfg.max_frame_len {
            if self.cfg.drain_oversize_up_to != 0 && len <= self.cfg.drain_oversize_up_to {
                self.drain_exact(len)?;
            }
            return Err(GateError::frame_too_large(len, self.cfg.max_frame_len));
        }
        Ok(len)
    }

    /// Reads the next frame into `dst`, resizing it exactly to the frame length.
    pub fn recv_into(&mut self, dst: &mut Vec<u8>) -> Result<(), GateError> {
        let len = self.read_len()?;

        dst.clear();
        dst.try_reserve_exact(len).map_err(|_| GateError::alloc(len))?;
        dst.resize(len, 0u8);
        self.inner.read_exact(dst)?;
        Ok(())
    }

    /// Reads the next frame into a caller-provided slice.
    pub fn read_frame(&mut self, dst: &mut [u8]) -> Result<usize, GateError> {
        let len = self.read_len()?;

        if dst.len() < len {
            if self.cfg.drain_on_small_buffer {
                self.drain_exact(len)?;
            }
            return Err(GateError::buffer_too_small(len));
        }

        self.inner.read_exact(&mut dst[..len])?;
        Ok(len)
    }
}
