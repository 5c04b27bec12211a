//! Transactional access to one TCAM table.
//!
//! Every table operation is a sequence of register commands: wait for the
//! busy bit to clear, write the operation register, wait again. Multi-page
//! operations repeat that per page in a fixed order. The command/data
//! registers and the sub-block selector are shared state, so one lock is
//! held for the whole sequence.

use std::sync::{Mutex, MutexGuard};

use switch_regs::{BlockAddr, RegError, RegOffset, RegisterBus};
use tracing::{debug, instrument, warn};

use crate::config::{TableGeometry, TcamConfig};
use crate::entry::{CompiledEntry, Slot};
use crate::error::{TcamError, TcamResult};
use crate::layout::{
    self, operation_word, Opcode, Page, PageImages, ACTION_SUB_BLOCK, EXT_SUB_BLOCK,
    GET_NEXT_KEY_REGS, OP_BUSY, OP_ENTRY, REG_DATA_BASE, REG_EXTENSION, REG_OPERATION,
};
use crate::types::{Masked, PortVector};

/// Statistics for TCAM table operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcamStats {
    /// Number of completed flush commands (all or single entry).
    pub flushes: u64,
    /// Number of completed entry loads.
    pub loads: u64,
    /// Number of completed entry reads.
    pub reads: u64,
    /// Number of GET_NEXT commands issued.
    pub get_next: u64,
    /// Number of busy polls that ran out of budget.
    pub busy_timeouts: u64,
    /// Number of failed register accesses.
    pub transport_errors: u64,
}

/// Command phase of a table. Every operation starts and ends in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableState {
    #[default]
    Idle,
    /// Waiting for the previous command to finish before issuing.
    AwaitingBusy,
    /// Command written, waiting for it to complete.
    CommandIssued,
}

struct TableInner<B> {
    bus: B,
    state: TableState,
    stats: TcamStats,
}

/// One TCAM table (ingress or egress) behind a register bus.
pub struct TcamTable<B: RegisterBus> {
    geometry: TableGeometry,
    poll_limit: u32,
    inner: Mutex<TableInner<B>>,
}

impl<B: RegisterBus> TcamTable<B> {
    pub fn new(bus: B, geometry: TableGeometry, poll_limit: u32) -> TcamResult<Self> {
        geometry.validate()?;
        if poll_limit == 0 {
            return Err(TcamError::config("busy poll limit must be non-zero"));
        }
        Ok(Self {
            geometry,
            poll_limit,
            inner: Mutex::new(TableInner {
                bus,
                state: TableState::Idle,
                stats: TcamStats::default(),
            }),
        })
    }

    /// The ingress table described by `config`.
    pub fn ingress(bus: B, config: &TcamConfig) -> TcamResult<Self> {
        Self::new(bus, config.ingress, config.busy_poll_limit)
    }

    /// The egress table described by `config`.
    pub fn egress(bus: B, config: &TcamConfig) -> TcamResult<Self> {
        Self::new(bus, config.egress, config.busy_poll_limit)
    }

    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    pub fn state(&self) -> TcamResult<TableState> {
        Ok(self.lock()?.state)
    }

    pub fn stats(&self) -> TcamResult<TcamStats> {
        Ok(self.lock()?.stats.clone())
    }

    fn lock(&self) -> TcamResult<MutexGuard<'_, TableInner<B>>> {
        self.inner.lock().map_err(|_| TcamError::LockPoisoned)
    }

    /// Runs `f` with the table lock held across all of its operations.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut TableSession<'_, B>) -> TcamResult<T>,
    ) -> TcamResult<T> {
        let mut session = TableSession {
            geometry: &self.geometry,
            poll_limit: self.poll_limit,
            inner: self.lock()?,
        };
        let result = f(&mut session);
        session.inner.state = TableState::Idle;
        result
    }

    #[instrument(skip(self), fields(block = %self.geometry.block_addr()))]
    pub fn flush_all(&self) -> TcamResult<()> {
        self.transaction(|s| s.flush_all())
    }

    #[instrument(skip(self), fields(block = %self.geometry.block_addr()))]
    pub fn flush_entry(&self, slot: u16) -> TcamResult<()> {
        self.transaction(|s| s.flush_entry(slot))
    }

    #[instrument(skip(self, entry), fields(block = %self.geometry.block_addr()))]
    pub fn load_entry(&self, slot: u16, entry: &CompiledEntry) -> TcamResult<()> {
        self.transaction(|s| s.load_entry(slot, entry))
    }

    #[instrument(skip(self), fields(block = %self.geometry.block_addr()))]
    pub fn read_entry(&self, slot: u16) -> TcamResult<Slot> {
        self.transaction(|s| s.read_entry(slot))
    }

    #[instrument(skip(self), fields(block = %self.geometry.block_addr()))]
    pub fn get_next_entry(&self, slot: u16) -> TcamResult<Slot> {
        self.transaction(|s| s.get_next_entry(slot))
    }

    #[instrument(skip(self), fields(block = %self.geometry.block_addr()))]
    pub fn find_entry(&self, slot: u16) -> TcamResult<Slot> {
        self.transaction(|s| s.find_entry(slot))
    }

    #[instrument(skip(self), fields(block = %self.geometry.block_addr()))]
    pub fn add_port(&self, slot: u16, port: u8) -> TcamResult<()> {
        self.transaction(|s| s.add_port(slot, port))
    }

    #[instrument(skip(self), fields(block = %self.geometry.block_addr()))]
    pub fn remove_port(&self, slot: u16, port: u8) -> TcamResult<()> {
        self.transaction(|s| s.remove_port(slot, port))
    }
}

/// Table operations with the lock held. Obtained from
/// [`TcamTable::transaction`].
pub struct TableSession<'a, B> {
    geometry: &'a TableGeometry,
    poll_limit: u32,
    inner: MutexGuard<'a, TableInner<B>>,
}

impl<B: RegisterBus> TableSession<'_, B> {
    pub fn geometry(&self) -> &TableGeometry {
        self.geometry
    }

    fn block(&self) -> BlockAddr {
        self.geometry.block_addr()
    }

    fn transport(&mut self, err: RegError) -> TcamError {
        warn!(block = %self.block(), error = %err, "TCAM register access failed");
        self.inner.stats.transport_errors += 1;
        TcamError::Transport(err)
    }

    fn read(&mut self, offset: RegOffset) -> TcamResult<u16> {
        let block = self.block();
        match self.inner.bus.read_register(block, offset) {
            Ok(value) => Ok(value),
            Err(e) => Err(self.transport(e)),
        }
    }

    fn write(&mut self, offset: RegOffset, value: u16) -> TcamResult<()> {
        let block = self.block();
        match self.inner.bus.write_register(block, offset, value) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.transport(e)),
        }
    }

    /// Spins on the busy bit, at most `poll_limit` reads.
    fn wait_ready(&mut self) -> TcamResult<()> {
        let block = self.block();
        for _ in 0..self.poll_limit {
            let busy = self.inner.bus.read_register_field(
                block,
                REG_OPERATION,
                OP_BUSY.offset,
                OP_BUSY.width,
            );
            match busy {
                Ok(0) => return Ok(()),
                Ok(_) => std::hint::spin_loop(),
                Err(e) => return Err(self.transport(e)),
            }
        }
        warn!(%block, attempts = self.poll_limit, "TCAM busy bit did not clear");
        self.inner.stats.busy_timeouts += 1;
        Err(TcamError::BusyTimeout {
            block,
            attempts: self.poll_limit,
        })
    }

    /// Issues one command and waits for it to complete.
    fn command(&mut self, op: Opcode, page: Page, index: u16) -> TcamResult<()> {
        let result = self.issue(op, page, index);
        self.inner.state = TableState::Idle;
        result
    }

    fn issue(&mut self, op: Opcode, page: Page, index: u16) -> TcamResult<()> {
        self.inner.state = TableState::AwaitingBusy;
        self.wait_ready()?;
        debug!(?op, ?page, index, "TCAM command");
        self.write(REG_OPERATION, operation_word(op, page, index))?;
        self.inner.state = TableState::CommandIssued;
        self.wait_ready()
    }

    fn select_action_sub_block(&mut self) -> TcamResult<()> {
        let block = self.block();
        let result = self.inner.bus.write_register_field(
            block,
            REG_EXTENSION,
            EXT_SUB_BLOCK.offset,
            EXT_SUB_BLOCK.width,
            ACTION_SUB_BLOCK,
        );
        result.map_err(|e| self.transport(e))
    }

    fn write_page(&mut self, page: Page, images: &PageImages) -> TcamResult<()> {
        for (i, value) in images.page(page).iter().enumerate() {
            self.write(REG_DATA_BASE.add(i as u8), *value)?;
        }
        Ok(())
    }

    fn read_page(&mut self, page: Page, images: &mut PageImages) -> TcamResult<()> {
        for i in 0..page.reg_count() {
            images.page_mut(page)[i] = self.read(REG_DATA_BASE.add(i as u8))?;
        }
        Ok(())
    }

    fn has_window_page(&self) -> bool {
        self.geometry.window_pages >= 2
    }

    /// Invalidates every slot of the table.
    pub fn flush_all(&mut self) -> TcamResult<()> {
        self.command(Opcode::FlushAll, Page::Key, 0)?;
        self.inner.stats.flushes += 1;
        Ok(())
    }

    /// Invalidates one slot.
    pub fn flush_entry(&mut self, slot: u16) -> TcamResult<()> {
        self.geometry.check_slot(slot)?;
        self.command(Opcode::FlushEntry, Page::Key, slot)?;
        self.inner.stats.flushes += 1;
        Ok(())
    }

    /// Writes `entry` to `slot`: action page, window page, then the key page
    /// whose sentinel makes the slot valid.
    pub fn load_entry(&mut self, slot: u16, entry: &CompiledEntry) -> TcamResult<()> {
        self.geometry.check_slot(slot)?;
        layout::validate_entry(entry, self.geometry)?;
        let images = PageImages::encode(entry);

        self.select_action_sub_block()?;
        self.write_page(Page::Action, &images)?;
        self.command(Opcode::Load, Page::Action, slot)?;

        if self.has_window_page() {
            self.write_page(Page::Window, &images)?;
            self.command(Opcode::Load, Page::Window, slot)?;
        }

        self.write_page(Page::Key, &images)?;
        self.command(Opcode::Load, Page::Key, slot)?;
        self.inner.stats.loads += 1;
        Ok(())
    }

    /// Reads `slot` back, valid or not.
    pub fn read_entry(&mut self, slot: u16) -> TcamResult<Slot> {
        self.geometry.check_slot(slot)?;
        let mut images = PageImages::empty();

        self.command(Opcode::Read, Page::Key, slot)?;
        self.read_page(Page::Key, &mut images)?;

        if self.has_window_page() {
            self.command(Opcode::Read, Page::Window, slot)?;
            self.read_page(Page::Window, &mut images)?;
        }

        self.select_action_sub_block()?;
        self.command(Opcode::Read, Page::Action, slot)?;
        self.read_page(Page::Action, &mut images)?;

        self.inner.stats.reads += 1;
        let (valid, entry) = images.decode();
        Ok(Slot {
            index: slot,
            valid,
            entry,
        })
    }

    /// Returns the first valid slot after `slot`, wrapping from the last
    /// index to the first.
    pub fn get_next_entry(&mut self, slot: u16) -> TcamResult<Slot> {
        if slot > self.geometry.max_index {
            return Err(TcamError::invalid_argument(format!(
                "slot {} beyond table maximum {}",
                slot, self.geometry.max_index
            )));
        }
        self.command(Opcode::GetNext, Page::Key, slot)?;
        self.inner.stats.get_next += 1;

        let found = OP_ENTRY.get(self.read(REG_OPERATION)?);
        if found == self.geometry.max_index {
            let mut empty = true;
            for i in 0..GET_NEXT_KEY_REGS {
                if self.read(REG_DATA_BASE.add(i as u8))? != 0 {
                    empty = false;
                    break;
                }
            }
            if empty {
                debug!(slot, "no valid entry after slot");
                return Err(TcamError::not_found(slot));
            }
        }
        self.read_entry(found)
    }

    /// Reads `slot` if it holds a valid entry.
    pub fn find_entry(&mut self, slot: u16) -> TcamResult<Slot> {
        self.geometry.check_slot(slot)?;
        let previous = if slot == 0 {
            self.geometry.max_index
        } else {
            slot - 1
        };
        match self.get_next_entry(previous) {
            Ok(found) if found.index == slot => Ok(found),
            Ok(_) | Err(TcamError::NotFound { .. }) => Err(TcamError::not_found(slot)),
            Err(e) => Err(e),
        }
    }

    /// Admits frames received on `port`.
    pub fn add_port(&mut self, slot: u16, port: u8) -> TcamResult<()> {
        self.update_ports(slot, port, |spv| {
            spv.value = spv.value.without(port);
            spv.mask = spv.mask.without(port);
        })
    }

    /// Stops admitting frames received on `port`.
    pub fn remove_port(&mut self, slot: u16, port: u8) -> TcamResult<()> {
        self.update_ports(slot, port, |spv| {
            spv.value = spv.value.without(port);
            spv.mask = spv.mask.with(port);
        })
    }

    fn update_ports(
        &mut self,
        slot: u16,
        port: u8,
        update: impl FnOnce(&mut Masked<PortVector>),
    ) -> TcamResult<()> {
        if port >= PortVector::WIDTH {
            return Err(TcamError::invalid_argument(format!(
                "port {} beyond the {}-port vector",
                port,
                PortVector::WIDTH
            )));
        }
        let mut found = self.find_entry(slot)?;
        update(&mut found.entry.key.spv);
        self.load_entry(slot, &found.entry)
    }
}
