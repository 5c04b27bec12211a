//! Register-level model of a TCAM block.
//!
//! [`TcamSimulator`] answers register reads and writes the way a TCAM block
//! does: writing the operation register with the busy bit set runs the
//! command against per-slot page images. It records every command and can
//! inject the faults a real bus produces, which is what the test suites
//! drive the table state machine against.

use switch_regs::{BlockAddr, RegError, RegOffset, RegResult, RegisterBus};

use crate::config::TableGeometry;
use crate::layout::{
    Opcode, Page, PageImages, ACTION_SUB_BLOCK, EXT_SUB_BLOCK, OP_BUSY, OP_CODE, OP_ENTRY,
    OP_PAGE, PAGE0_REGS, REG_DATA_BASE, REG_EXTENSION, REG_OPERATION,
};

/// One command as executed by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimCommand {
    pub op: Opcode,
    pub page: Page,
    pub index: u16,
}

/// A TCAM block model implementing [`RegisterBus`].
#[derive(Debug, Clone)]
pub struct TcamSimulator {
    block: BlockAddr,
    min_index: u16,
    max_index: u16,
    slots: Vec<PageImages>,
    operation: u16,
    extension: u16,
    data: [u16; PAGE0_REGS],
    busy_delay: u32,
    busy_remaining: u32,
    stuck_busy: bool,
    fail_at: Option<u64>,
    accesses: u64,
    busy_polls: u64,
    commands: Vec<SimCommand>,
}

impl TcamSimulator {
    /// A flushed table of the given geometry.
    pub fn new(geometry: &TableGeometry) -> Self {
        Self {
            block: geometry.block_addr(),
            min_index: geometry.min_index,
            max_index: geometry.max_index,
            slots: vec![PageImages::empty(); geometry.max_index as usize + 1],
            operation: 0,
            extension: 0,
            data: [0; PAGE0_REGS],
            busy_delay: 0,
            busy_remaining: 0,
            stuck_busy: false,
            fail_at: None,
            accesses: 0,
            busy_polls: 0,
            commands: Vec::new(),
        }
    }

    /// Keeps the busy bit set for `polls` reads after every command.
    pub fn set_busy_delay(&mut self, polls: u32) {
        self.busy_delay = polls;
    }

    /// Makes the busy bit read as set until cleared again.
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Fails the `n`-th register access from now (1-based), once.
    pub fn fail_nth_access(&mut self, n: u64) {
        self.fail_at = Some(self.accesses + n);
    }

    /// Register accesses seen so far.
    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    /// Reads of the operation register, i.e. busy polls.
    pub fn busy_polls(&self) -> u64 {
        self.busy_polls
    }

    pub fn commands(&self) -> &[SimCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Raw page images of a slot.
    pub fn slot(&self, index: u16) -> Option<&PageImages> {
        self.slots.get(index as usize)
    }

    pub fn is_valid(&self, index: u16) -> bool {
        self.slot(index).is_some_and(PageImages::is_valid)
    }

    fn access(&mut self, offset: RegOffset) -> RegResult<()> {
        self.accesses += 1;
        if self.fail_at == Some(self.accesses) {
            self.fail_at = None;
            return Err(RegError::access(self.block, offset, "injected fault"));
        }
        Ok(())
    }

    fn check_block(&self, block: BlockAddr, offset: RegOffset) -> RegResult<()> {
        if block != self.block {
            return Err(RegError::NoSuchRegister { block, offset });
        }
        Ok(())
    }

    fn data_index(&self, offset: RegOffset) -> RegResult<usize> {
        let base = REG_DATA_BASE.as_u8();
        match offset.as_u8().checked_sub(base) {
            Some(i) if (i as usize) < PAGE0_REGS => Ok(i as usize),
            _ => Err(RegError::NoSuchRegister {
                block: self.block,
                offset,
            }),
        }
    }

    fn execute(&mut self, word: u16) -> RegResult<()> {
        let block = self.block;
        let fail = |message: &str| RegError::access(block, REG_OPERATION, message);
        let op = Opcode::from_bits(OP_CODE.get(word)).ok_or_else(|| fail("unknown opcode"))?;
        let page = Page::from_bits(OP_PAGE.get(word)).ok_or_else(|| fail("unknown page"))?;
        let index = OP_ENTRY.get(word);
        if op != Opcode::FlushAll && op != Opcode::GetNext && index > self.max_index {
            return Err(fail("entry index beyond table"));
        }
        if page == Page::Action
            && matches!(op, Opcode::Load | Opcode::Read)
            && EXT_SUB_BLOCK.get(self.extension) != ACTION_SUB_BLOCK
        {
            return Err(fail("action page needs sub-block 0"));
        }
        self.commands.push(SimCommand { op, page, index });

        let slot = index as usize;
        let count = page.reg_count();
        let mut found = index;
        match op {
            Opcode::FlushAll => self.slots.fill(PageImages::empty()),
            Opcode::FlushEntry => self.slots[slot] = PageImages::empty(),
            Opcode::Load => {
                self.slots[slot].page_mut(page).copy_from_slice(&self.data[..count]);
            }
            Opcode::Read => {
                self.data = [0; PAGE0_REGS];
                self.data[..count].copy_from_slice(self.slots[slot].page(page));
            }
            Opcode::GetNext => {
                let start = if index >= self.max_index {
                    self.min_index
                } else {
                    (index + 1).max(self.min_index)
                };
                self.data = [0; PAGE0_REGS];
                found = self.max_index;
                let hit = (start..=self.max_index).find(|i| self.slots[*i as usize].is_valid());
                if let Some(hit) = hit {
                    found = hit;
                    self.data.copy_from_slice(&self.slots[hit as usize].key);
                }
            }
        }

        let word = OP_CODE.set(0, op.bits());
        let word = OP_PAGE.set(word, page.bits());
        self.operation = OP_ENTRY.set(word, found);
        self.busy_remaining = self.busy_delay;
        Ok(())
    }
}

impl RegisterBus for TcamSimulator {
    fn read_register(&mut self, block: BlockAddr, offset: RegOffset) -> RegResult<u16> {
        self.check_block(block, offset)?;
        self.access(offset)?;
        if offset == REG_OPERATION {
            self.busy_polls += 1;
            let busy = self.stuck_busy || self.busy_remaining > 0;
            self.busy_remaining = self.busy_remaining.saturating_sub(1);
            return Ok(OP_BUSY.set_flag(self.operation, busy));
        }
        if offset == REG_EXTENSION {
            return Ok(self.extension);
        }
        let i = self.data_index(offset)?;
        Ok(self.data[i])
    }

    fn write_register(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        value: u16,
    ) -> RegResult<()> {
        self.check_block(block, offset)?;
        self.access(offset)?;
        if offset == REG_OPERATION {
            if OP_BUSY.get_flag(value) {
                return self.execute(value);
            }
            self.operation = value;
            return Ok(());
        }
        if offset == REG_EXTENSION {
            self.extension = value;
            return Ok(());
        }
        let i = self.data_index(offset)?;
        self.data[i] = value;
        Ok(())
    }
}
