use std::fmt;

use bytes::{Bytes, BytesMut};
use cartfs_cache::FrameCache;
use cartfs_client::{CartBus, ClientError, Request, Response};
use cartfs_proto::{Opcode, FRAME_SIZE};
use tracing::{debug, info, trace, warn};

use crate::alloc::{FrameAddr, FrameAllocator};
use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::file::{FileHandle, FileTable, OpenFile};
use crate::span::spans;

/// A powered-on cartridge device presenting byte-stream files.
///
/// Created by [`CartDriver::poweron`] and consumed by
/// [`CartDriver::poweroff`]. All state (open files, allocator cursor,
/// frame cache) lives here; independent drivers share nothing.
///
/// Failures abort the call in progress without rolling back the frames
/// already written: position and length reflect every frame that
/// completed.
#[derive(Debug)]
pub struct CartDriver<B: CartBus> {
    bus: B,
    config: DriverConfig,
    cache: FrameCache,
    files: FileTable,
    alloc: FrameAllocator,
}

impl<B: CartBus> CartDriver<B> {
    /// Initialize the controller and zero every cartridge.
    pub fn poweron(bus: B, config: DriverConfig) -> Result<Self> {
        config.validate()?;
        let cache = FrameCache::new(config.cache_capacity)?;
        let mut driver = Self {
            bus,
            cache,
            files: FileTable::new(config.max_files),
            alloc: FrameAllocator::new(config.max_cartridges, config.frames_per_cartridge),
            config,
        };

        driver.command(Request::init())?;
        driver.zero_all()?;

        info!(
            cartridges = driver.config.max_cartridges,
            cache_frames = driver.config.cache_capacity,
            "device powered on"
        );
        Ok(driver)
    }

    /// Zero every cartridge, close all files and power the controller off.
    ///
    /// Returns the bus so it can be powered on again. On failure the
    /// driver comes back inside the error so the caller can retry.
    pub fn poweroff(mut self) -> std::result::Result<B, PowerOffError<B>> {
        match self.shutdown() {
            Ok(()) => Ok(self.bus),
            Err(source) => Err(PowerOffError {
                driver: Box::new(self),
                source,
            }),
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        self.zero_all()?;
        let closed = self.files.close_all();
        self.command(Request::power_off())?;

        let stats = self.cache.stats();
        self.cache.reset();
        info!(
            closed,
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            "device powered off"
        );
        Ok(())
    }

    /// Open `name`, creating an empty file on first use.
    pub fn open(&mut self, name: &str) -> Result<FileHandle> {
        self.files.open(name)
    }

    pub fn close(&mut self, fd: FileHandle) -> Result<()> {
        self.files.close(fd)
    }

    /// Move the position of an open file. `offset` may equal the length.
    pub fn seek(&mut self, fd: FileHandle, offset: usize) -> Result<()> {
        let file = self.files.get_open_mut(fd)?;
        if offset > file.length {
            return Err(DriverError::InvalidArgument(format!(
                "seek to {offset} past end of {:?} ({} bytes)",
                file.name, file.length
            )));
        }
        file.position = offset;
        Ok(())
    }

    /// Read from the current position into `buf`.
    ///
    /// Stops at end of file; returns the number of bytes copied.
    pub fn read(&mut self, fd: FileHandle, buf: &mut [u8]) -> Result<usize> {
        let file = self.files.get_open(fd)?;
        let start = file.position;
        let end = start.saturating_add(buf.len()).min(file.length);
        if start >= end {
            return Ok(0);
        }

        for span in spans(start, end - start) {
            let addr = self.mapped_frame(fd, span.index)?;
            let block = self.fetch_frame(addr)?;
            buf[span.buf_range()].copy_from_slice(&block[span.frame_range()]);
            self.files.get_open_mut(fd)?.position += span.len;
        }

        debug!(%fd, offset = start, len = end - start, "read");
        Ok(end - start)
    }

    /// Write `buf` at the current position, growing the file as needed.
    ///
    /// Frames past the end of the file are allocated on demand. Returns
    /// `buf.len()` on success.
    pub fn write(&mut self, fd: FileHandle, buf: &[u8]) -> Result<usize> {
        let file = self.files.get_open(fd)?;
        let start = file.position;
        if buf.is_empty() {
            return Ok(0);
        }

        let end = start
            .checked_add(buf.len())
            .ok_or_else(|| DriverError::InvalidArgument("write range overflows".to_string()))?;
        if end.div_ceil(FRAME_SIZE) > self.config.max_file_frames {
            return Err(DriverError::FileTooLarge {
                name: file.name.clone(),
                max_frames: self.config.max_file_frames,
            });
        }

        for span in spans(start, buf.len()) {
            let (addr, mut block) = match self.files.frame_at(fd, span.index) {
                Some(addr) if span.is_full() => (addr, BytesMut::zeroed(FRAME_SIZE)),
                Some(addr) => (addr, BytesMut::from(&self.fetch_frame(addr)?[..])),
                None => {
                    let addr = self.alloc.allocate()?;
                    self.files.get_open_mut(fd)?.frames.push(addr);
                    trace!(%fd, index = span.index, %addr, "allocated frame");
                    (addr, BytesMut::zeroed(FRAME_SIZE))
                }
            };

            block[span.frame_range()].copy_from_slice(&buf[span.buf_range()]);
            self.store_frame(addr, block.freeze())?;

            let file = self.files.get_open_mut(fd)?;
            file.position += span.len;
            file.length = file.length.max(file.position);
        }

        debug!(%fd, offset = start, len = buf.len(), "wrote");
        Ok(buf.len())
    }

    /// Length in bytes of any issued handle, open or closed.
    pub fn len(&self, fd: FileHandle) -> Result<usize> {
        Ok(self.files.get(fd)?.length)
    }

    pub fn position(&self, fd: FileHandle) -> Result<usize> {
        Ok(self.files.get_open(fd)?.position)
    }

    pub fn is_open(&self, fd: FileHandle) -> bool {
        self.files.get(fd).map(|file| file.open).unwrap_or(false)
    }

    pub fn handle_of(&self, name: &str) -> Option<FileHandle> {
        self.files.handle_of(name)
    }

    pub fn files(&self) -> impl Iterator<Item = &OpenFile> {
        self.files.iter()
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn allocator(&self) -> &FrameAllocator {
        &self.alloc
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn zero_all(&mut self) -> Result<()> {
        for cartridge in 0..self.config.max_cartridges {
            self.command(Request::load_cartridge(cartridge))?;
            self.command(Request::zero_cartridge())?;
        }
        Ok(())
    }

    fn mapped_frame(&self, fd: FileHandle, index: usize) -> Result<FrameAddr> {
        match self.files.frame_at(fd, index) {
            Some(addr) => Ok(addr),
            None => Err(DriverError::MissingFrame {
                name: self.files.get(fd)?.name.clone(),
                index,
            }),
        }
    }

    /// Frame content from the cache, or from the controller on a miss.
    fn fetch_frame(&mut self, addr: FrameAddr) -> Result<Bytes> {
        if let Some(block) = self.cache.lookup(addr.cartridge, addr.frame) {
            return Ok(block);
        }

        self.command(Request::load_cartridge(addr.cartridge))?;
        let response = self.command(Request::read_frame(addr.frame))?;
        let block = response.payload.ok_or_else(|| DriverError::Protocol {
            op: Opcode::ReadFrame,
            reason: "response carried no frame".to_string(),
        })?;
        self.cache.insert(addr.cartridge, addr.frame, block.clone())?;
        Ok(block)
    }

    /// Write a frame through to the controller, then cache it.
    fn store_frame(&mut self, addr: FrameAddr, block: Bytes) -> Result<()> {
        self.command(Request::load_cartridge(addr.cartridge))?;
        self.command(Request::write_frame(addr.frame, block.clone()))?;
        self.cache.insert(addr.cartridge, addr.frame, block)?;
        Ok(())
    }

    /// Send one command and check the answer.
    fn command(&mut self, request: Request) -> Result<Response> {
        let sent = request.register;
        let op = sent.opcode().map_err(ClientError::from)?;
        let response = self.bus.request(request)?;

        match response.register.opcode() {
            Ok(got) if got == op => {}
            Ok(got) => {
                return Err(DriverError::Protocol {
                    op,
                    reason: format!("response opcode {got}"),
                })
            }
            Err(err) => {
                return Err(DriverError::Protocol {
                    op,
                    reason: err.to_string(),
                })
            }
        }

        let echo = response.register;
        if echo.cartridge != sent.cartridge || echo.frame != sent.frame {
            return Err(DriverError::Protocol {
                op,
                reason: format!(
                    "response addresses cartridge {} frame {}, request addressed cartridge {} frame {}",
                    echo.cartridge, echo.frame, sent.cartridge, sent.frame
                ),
            });
        }

        if !response.register.is_ok() {
            warn!(
                op = op.name(),
                cartridge = sent.cartridge,
                frame = sent.frame,
                "controller reported failure"
            );
            return Err(DriverError::RemoteFailure {
                op,
                cartridge: sent.cartridge,
                frame: sent.frame,
            });
        }

        if op.receives_frame() {
            match &response.payload {
                Some(payload) if payload.len() == FRAME_SIZE => {}
                Some(payload) => {
                    return Err(DriverError::Protocol {
                        op,
                        reason: format!("frame of {} bytes", payload.len()),
                    })
                }
                None => {
                    return Err(DriverError::Protocol {
                        op,
                        reason: "response carried no frame".to_string(),
                    })
                }
            }
        }

        Ok(response)
    }
}

/// A failed power-off, carrying the driver back to the caller.
///
/// State is left as the completed steps mutated it: files may already be
/// closed and some cartridges zeroed. Calling [`CartDriver::poweroff`]
/// again on the recovered driver repeats the whole sequence.
#[derive(thiserror::Error)]
#[error("power off failed: {source}")]
pub struct PowerOffError<B: CartBus> {
    driver: Box<CartDriver<B>>,
    #[source]
    source: DriverError,
}

impl<B: CartBus> PowerOffError<B> {
    pub fn error(&self) -> &DriverError {
        &self.source
    }

    pub fn into_error(self) -> DriverError {
        self.source
    }

    pub fn into_driver(self) -> CartDriver<B> {
        *self.driver
    }

    pub fn into_parts(self) -> (CartDriver<B>, DriverError) {
        (*self.driver, self.source)
    }
}

impl<B: CartBus> fmt::Debug for PowerOffError<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerOffError")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
