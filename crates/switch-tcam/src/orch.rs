//! Rule-level TCAM API.
//!
//! [`TcamOrch`] is what the rest of the driver programs rules through. It
//! compiles rules, places cascaded rules across their two slots in a safe
//! order and keeps operation statistics.

use switch_regs::RegisterBus;
use tracing::{debug, info, instrument};

use crate::compile::{self, CompiledRule};
use crate::config::{TableGeometry, TcamConfig};
use crate::entry::{CompiledEntry, Slot};
use crate::error::{TcamError, TcamResult};
use crate::rule::Rule;
use crate::table::{TableSession, TcamTable};

pub use crate::table::TcamStats;

/// TcamOrch - rule-level access to one TCAM table.
pub struct TcamOrch<B: RegisterBus> {
    config: TcamConfig,
    table: TcamTable<B>,
}

impl<B: RegisterBus> TcamOrch<B> {
    /// Creates an orch for the ingress table.
    pub fn ingress(bus: B, config: TcamConfig) -> TcamResult<Self> {
        config.validate()?;
        let table = TcamTable::ingress(bus, &config)?;
        Ok(Self { config, table })
    }

    /// Creates an orch for the egress table.
    pub fn egress(bus: B, config: TcamConfig) -> TcamResult<Self> {
        config.validate()?;
        let table = TcamTable::egress(bus, &config)?;
        Ok(Self { config, table })
    }

    pub fn config(&self) -> &TcamConfig {
        &self.config
    }

    pub fn geometry(&self) -> &TableGeometry {
        self.table.geometry()
    }

    pub fn table(&self) -> &TcamTable<B> {
        &self.table
    }

    /// Returns the statistics.
    pub fn stats(&self) -> TcamResult<TcamStats> {
        self.table.stats()
    }

    pub fn flush_all(&self) -> TcamResult<()> {
        self.table.flush_all()
    }

    pub fn flush_entry(&self, slot: u16) -> TcamResult<()> {
        self.table.flush_entry(slot)
    }

    pub fn load_entry(&self, slot: u16, entry: &CompiledEntry) -> TcamResult<()> {
        self.table.load_entry(slot, entry)
    }

    pub fn read_entry(&self, slot: u16) -> TcamResult<Slot> {
        self.table.read_entry(slot)
    }

    pub fn get_next_entry(&self, slot: u16) -> TcamResult<Slot> {
        self.table.get_next_entry(slot)
    }

    pub fn find_entry(&self, slot: u16) -> TcamResult<Slot> {
        self.table.find_entry(slot)
    }

    pub fn add_port(&self, slot: u16, port: u8) -> TcamResult<()> {
        self.config.check_port(port)?;
        self.table.add_port(slot, port)
    }

    pub fn remove_port(&self, slot: u16, port: u8) -> TcamResult<()> {
        self.config.check_port(port)?;
        self.table.remove_port(slot, port)
    }

    /// Compiles `rule` and loads it at `slot1`, cascading into `slot2` if
    /// the rule's headers need a second window.
    ///
    /// Returns whether `slot2` was used. The continuation entry is loaded
    /// before the entry that points at it.
    #[instrument(skip(self, rule), fields(shape = %rule.shape()))]
    pub fn advanced_config(&self, slot1: u16, slot2: u16, rule: &Rule) -> TcamResult<bool> {
        self.geometry().check_slot(slot1)?;
        let compiled = compile::compile(rule, slot2)?;
        if let Some((target, _)) = compiled.continuation {
            self.geometry().check_slot(target)?;
            if target == slot1 {
                return Err(TcamError::invalid_argument(format!(
                    "rule cascades into its own slot {}",
                    slot1
                )));
            }
        }

        self.table.transaction(|session| load_compiled(session, slot1, &compiled))?;
        let cascaded = compiled.is_cascaded();
        info!(slot1, slot2, cascaded, "TCAM rule configured");
        Ok(cascaded)
    }

    /// Reads the rule at `slot`, following its continuation if it has one.
    /// Returns `None` if the slot holds no valid entry.
    #[instrument(skip(self))]
    pub fn read_rule(&self, slot: u16) -> TcamResult<Option<Rule>> {
        self.table.transaction(|session| {
            let first = match session.find_entry(slot) {
                Ok(found) => found,
                Err(TcamError::NotFound { .. }) => return Ok(None),
                Err(e) => return Err(e),
            };
            let second = continuation(session, &first)?;
            compile::decode(&first.entry, second.as_ref().map(|s| &s.entry)).map(Some)
        })
    }

    /// Flushes the rule at `slot`, then its continuation slot.
    ///
    /// Removal runs in the reverse of load order, so a valid entry never
    /// continues into a flushed slot. A failure after the first flush
    /// leaves at worst an unreferenced continuation entry behind.
    #[instrument(skip(self))]
    pub fn remove_rule(&self, slot: u16) -> TcamResult<()> {
        self.table.transaction(|session| {
            let first = session.find_entry(slot)?;
            session.flush_entry(slot)?;
            if first.entry.action.continue_next {
                let next = u16::from(first.entry.action.next_id);
                debug!(slot, next, "flushing continuation slot");
                session.flush_entry(next)?;
            }
            Ok(())
        })?;
        info!(slot, "TCAM rule removed");
        Ok(())
    }
}

fn load_compiled<B: RegisterBus>(
    session: &mut TableSession<'_, B>,
    slot1: u16,
    compiled: &CompiledRule,
) -> TcamResult<()> {
    if let Some((slot2, second)) = &compiled.continuation {
        session.load_entry(*slot2, second)?;
    }
    session.load_entry(slot1, &compiled.primary)
}

fn continuation<B: RegisterBus>(
    session: &mut TableSession<'_, B>,
    first: &Slot,
) -> TcamResult<Option<Slot>> {
    if !first.entry.action.continue_next {
        return Ok(None);
    }
    let next = u16::from(first.entry.action.next_id);
    let second = session.read_entry(next)?;
    if !second.valid {
        return Err(TcamError::not_found(next));
    }
    Ok(Some(second))
}
