//! Binary image of one physical TCAM slot.
//!
//! A [`CompiledEntry`] holds exactly what the hardware stores for a slot:
//! the key header fields, the 48-octet value/mask window and the action
//! fields. [`crate::layout`] moves it to and from the register pages.

use crate::layout::WINDOW_BYTES;
use crate::types::{DpvMode, Masked, PortVector};

/// Key header fields, present once per slot and kept out of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyMatch {
    /// Frame type selector (2 bits), see [`crate::types::FrameType`].
    pub frame_type: Masked<u8>,
    /// Timestamp key bit (1 bit).
    pub time_key: Masked<u8>,
    /// Source port vector (11 bits). Ports are admitted by clearing their
    /// mask bits.
    pub spv: Masked<PortVector>,
    /// VLAN priority (3 bits).
    pub ppri: Masked<u8>,
    /// VLAN id (12 bits). On a continuation slot this carries the slot's own
    /// index as the cascade tag.
    pub pvid: Masked<u16>,
}

/// The value/mask octet pairs of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameWindow {
    pub value: [u8; WINDOW_BYTES],
    pub mask: [u8; WINDOW_BYTES],
}

impl Default for FrameWindow {
    fn default() -> Self {
        Self {
            value: [0; WINDOW_BYTES],
            mask: [0; WINDOW_BYTES],
        }
    }
}

impl FrameWindow {
    /// True if no octet is compared.
    pub fn is_wildcard(&self) -> bool {
        self.mask.iter().all(|m| *m == 0)
    }

    /// True if some octet at or beyond `octets` has a mask bit set.
    pub fn compares_beyond(&self, octets: usize) -> bool {
        self.mask.iter().skip(octets).any(|m| *m != 0)
    }
}

/// What a matching frame is subjected to.
///
/// Every field maps to one register field of the action page; the widths
/// in the comments are enforced before the entry reaches hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleAction {
    pub interrupt: bool,
    pub inc_tcam_counter: bool,
    pub vid_override: bool,
    /// 12 bits.
    pub vid: u16,
    pub qpri_override: bool,
    /// Queue priority, 3 bits.
    pub qpri: u8,
    pub fpri_override: bool,
    /// Frame priority, 3 bits.
    pub fpri: u8,
    pub dpv_mode: DpvMode,
    /// Destination port vector, 11 bits.
    pub dpv: PortVector,
    /// 2 bits.
    pub color_mode: u8,
    pub vtu_page_override: bool,
    pub vtu_page: bool,
    /// 2 bits.
    pub unknown_filter: u8,
    /// 6 bits.
    pub egress_action_pointer: u8,
    pub ld_balance_override: bool,
    /// 3 bits.
    pub ld_balance: u8,
    pub dscp_override: bool,
    /// 6 bits.
    pub dscp: u8,
    pub frame_action_override: bool,
    /// 15 bits.
    pub frame_action: u16,
    /// Counter bank the hit increments, 2 bits.
    pub tcam_counter: u8,
    pub flow_meter_enable: bool,
    /// 6 bits.
    pub flow_meter_id: u8,
    pub stream_filter_enable: bool,
    pub stream_filter_id: u8,
}

impl RuleAction {
    /// Forwards matching frames to exactly the given ports.
    pub fn redirect(ports: PortVector) -> Self {
        Self {
            dpv_mode: DpvMode::Replace,
            dpv: ports,
            ..Self::default()
        }
    }
}

/// Action page of a slot: the rule action plus the continuation reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionFields {
    /// Matching continues in slot `next_id`.
    pub continue_next: bool,
    pub next_id: u8,
    pub action: RuleAction,
}

impl ActionFields {
    /// Terminal action fields carrying `action`.
    pub fn terminal(action: RuleAction) -> Self {
        Self {
            continue_next: false,
            next_id: 0,
            action,
        }
    }
}

/// Everything the hardware stores for one slot apart from the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompiledEntry {
    pub key: KeyMatch,
    pub window: FrameWindow,
    pub action: ActionFields,
}

/// A slot as read back from hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub index: u16,
    /// False when the slot holds the empty sentinel.
    pub valid: bool,
    pub entry: CompiledEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_predicates() {
        let mut w = FrameWindow::default();
        assert!(w.is_wildcard());
        assert!(!w.compares_beyond(0));
        w.mask[30] = 0x01;
        assert!(!w.is_wildcard());
        assert!(w.compares_beyond(22));
        assert!(!w.compares_beyond(31));
    }

    #[test]
    fn test_redirect() {
        let action = RuleAction::redirect(PortVector::single(2));
        assert_eq!(action.dpv_mode, DpvMode::Replace);
        assert!(action.dpv.contains(2));
        assert!(!action.interrupt);
    }
}
