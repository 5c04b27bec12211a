//! Cascading a rule across two physical slots.
//!
//! When a rule's headers reach into the second frame window, the first slot
//! matches window 1 and hands off to the second slot, which matches window 2
//! and carries the rule's action. The second slot's VLAN-id key field holds
//! its own index as the cascade tag.

use tracing::debug;

use crate::entry::{ActionFields, CompiledEntry, KeyMatch, RuleAction};
use crate::error::{TcamError, TcamResult};
use crate::layout::MAX_SLOT_INDEX;
use crate::types::{Masked, ProtocolShape};

const CASCADE_TAG_MASK: u16 = 0xfff;

/// Shapes whose headers can extend past the first window.
pub fn needs_second_slot(shape: ProtocolShape) -> bool {
    shape.is_ipv6() || shape.is_tcp()
}

/// The second slot is only worth loading if it compares something.
pub fn is_second_slot_used(second: &CompiledEntry) -> bool {
    !second.window.is_wildcard()
}

/// Links `first` to `second`, which will live in `slot2`.
///
/// `first` gets the continue marker and `slot2` as next id; `second` gets
/// the cascade tag and the rule action.
pub fn link(
    first: &mut CompiledEntry,
    second: &mut CompiledEntry,
    slot2: u16,
    action: RuleAction,
) -> TcamResult<()> {
    if slot2 > MAX_SLOT_INDEX {
        return Err(TcamError::invalid_argument(format!(
            "cascade slot {} beyond index {}",
            slot2, MAX_SLOT_INDEX
        )));
    }
    first.action = ActionFields {
        continue_next: true,
        next_id: slot2 as u8,
        action: RuleAction::default(),
    };
    second.key = KeyMatch {
        pvid: Masked::new(slot2, CASCADE_TAG_MASK),
        ..KeyMatch::default()
    };
    second.action = ActionFields::terminal(action);
    debug!(slot2, "linked cascade entry");
    Ok(())
}
