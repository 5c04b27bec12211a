//! Register map of a TCAM block and the page images of a slot.
//!
//! A slot is moved through three pages of data registers:
//!
//! ```text
//! page 0  0x02  ft-mask[15:14] tk-mask[13]            sentinel[7:0]
//!         0x03  ft[15:14]      tk[13]                 spv-mask[10:0]
//!         0x04                 ppri-mask[14:12]       pvid-mask[11:0]
//!         0x05                                        spv[10:0]
//!         0x06                 ppri[14:12]            pvid[11:0]
//!         0x07..=0x1c  window octets 0..=21   mask[15:8] value[7:0]
//! page 1  0x02..=0x1b  window octets 22..=47  mask[15:8] value[7:0]
//! page 2  0x02..=0x09  action fields (sub-block 0 only)
//! ```
//!
//! A mask bit of 1 means "compare"; the same convention holds for every
//! window octet and key field.

use switch_regs::{BitField, RegOffset};

use crate::config::TableGeometry;
use crate::entry::{ActionFields, CompiledEntry, FrameWindow, KeyMatch, RuleAction};
use crate::error::{TcamError, TcamResult};
use crate::types::{DpvMode, Masked, PortVector};

/// Octets in one frame window.
pub const WINDOW_BYTES: usize = 48;
/// Window octets carried by page 0.
pub const PAGE0_OCTETS: usize = 22;
/// Window octets carried by page 1.
pub const PAGE1_OCTETS: usize = WINDOW_BYTES - PAGE0_OCTETS;
/// Largest index the 8-bit entry field can address.
pub const MAX_SLOT_INDEX: u16 = 255;

pub const REG_OPERATION: RegOffset = RegOffset::new(0x00);
pub const REG_EXTENSION: RegOffset = RegOffset::new(0x01);
pub const REG_DATA_BASE: RegOffset = RegOffset::new(0x02);

pub const OP_BUSY: BitField = BitField::new(15, 1);
pub const OP_CODE: BitField = BitField::new(12, 3);
pub const OP_PAGE: BitField = BitField::new(10, 2);
pub const OP_ENTRY: BitField = BitField::new(0, 8);
pub const EXT_SUB_BLOCK: BitField = BitField::new(0, 4);

/// Sub-block that exposes the action page.
pub const ACTION_SUB_BLOCK: u16 = 0;

pub const SENTINEL: BitField = BitField::new(0, 8);
/// Sentinel value of a flushed slot.
pub const SENTINEL_EMPTY: u16 = 0xff;
/// Sentinel value written by a load. Non-zero, so register 0x02 of a valid
/// slot never reads as a GET_NEXT miss.
pub const SENTINEL_VALID: u16 = 0x01;

/// Registers GET_NEXT leaves zeroed when no valid entry follows.
pub const GET_NEXT_KEY_REGS: usize = 3;

pub const PAGE0_REGS: usize = 5 + PAGE0_OCTETS;
pub const PAGE1_REGS: usize = PAGE1_OCTETS;
pub const PAGE2_REGS: usize = 8;

/// Commands accepted by the operation register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    FlushAll,
    FlushEntry,
    Load,
    GetNext,
    Read,
}

impl Opcode {
    pub const fn bits(&self) -> u16 {
        match self {
            Self::FlushAll => 1,
            Self::FlushEntry => 2,
            Self::Load => 3,
            Self::GetNext => 4,
            Self::Read => 5,
        }
    }

    pub const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            1 => Some(Self::FlushAll),
            2 => Some(Self::FlushEntry),
            3 => Some(Self::Load),
            4 => Some(Self::GetNext),
            5 => Some(Self::Read),
            _ => None,
        }
    }
}

/// Register page selected by the operation register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// Key header and window octets 0..=21.
    Key,
    /// Window octets 22..=47.
    Window,
    /// Action fields.
    Action,
}

impl Page {
    pub const fn bits(&self) -> u16 {
        match self {
            Self::Key => 0,
            Self::Window => 1,
            Self::Action => 2,
        }
    }

    pub const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(Self::Key),
            1 => Some(Self::Window),
            2 => Some(Self::Action),
            _ => None,
        }
    }

    /// Number of data registers the page occupies.
    pub const fn reg_count(&self) -> usize {
        match self {
            Self::Key => PAGE0_REGS,
            Self::Window => PAGE1_REGS,
            Self::Action => PAGE2_REGS,
        }
    }
}

/// Builds an operation register word with the busy bit set.
pub const fn operation_word(op: Opcode, page: Page, entry: u16) -> u16 {
    let word = OP_BUSY.set(0, 1);
    let word = OP_CODE.set(word, op.bits());
    let word = OP_PAGE.set(word, page.bits());
    OP_ENTRY.set(word, entry)
}

// Page 0, register index relative to REG_DATA_BASE.
const K_MASK_HDR: usize = 0;
const K_DATA_HDR: usize = 1;
const K_VLAN_MASK: usize = 2;
const K_SPV: usize = 3;
const K_VLAN: usize = 4;
const K_OCTETS: usize = 5;

const FRAME_TYPE: BitField = BitField::new(14, 2);
const TIME_KEY: BitField = BitField::new(13, 1);
const SPV: BitField = BitField::new(0, 11);
const PPRI: BitField = BitField::new(12, 3);
const PVID: BitField = BitField::new(0, 12);

const OCTET_MASK: BitField = BitField::new(8, 8);
const OCTET_VALUE: BitField = BitField::new(0, 8);

// Page 2.
const A_CTRL: usize = 0;
const A_PRI: usize = 1;
const A_DPV: usize = 2;
const A_MISC: usize = 3;
const A_QOS: usize = 4;
const A_FACTION: usize = 5;
const A_METER: usize = 6;
const A_STREAM: usize = 7;

const INTERRUPT: BitField = BitField::new(15, 1);
const INC_TCAM_COUNTER: BitField = BitField::new(14, 1);
const CONTINUE: BitField = BitField::new(13, 1);
const VID_OVERRIDE: BitField = BitField::new(12, 1);
const VID: BitField = BitField::new(0, 12);
const NEXT_ID: BitField = BitField::new(8, 8);
const QPRI_OVERRIDE: BitField = BitField::new(7, 1);
const QPRI: BitField = BitField::new(4, 3);
const FPRI_OVERRIDE: BitField = BitField::new(3, 1);
const FPRI: BitField = BitField::new(0, 3);
const DPV_MODE: BitField = BitField::new(14, 2);
const DPV: BitField = BitField::new(0, 11);
const COLOR_MODE: BitField = BitField::new(12, 2);
const VTU_PAGE_OVERRIDE: BitField = BitField::new(11, 1);
const VTU_PAGE: BitField = BitField::new(10, 1);
const UNKNOWN_FILTER: BitField = BitField::new(8, 2);
const EGRESS_ACTION_POINTER: BitField = BitField::new(0, 6);
const LD_BALANCE_OVERRIDE: BitField = BitField::new(15, 1);
const LD_BALANCE: BitField = BitField::new(12, 3);
const DSCP_OVERRIDE: BitField = BitField::new(6, 1);
const DSCP: BitField = BitField::new(0, 6);
const FRAME_ACTION_OVERRIDE: BitField = BitField::new(15, 1);
const FRAME_ACTION: BitField = BitField::new(0, 15);
const FLOW_METER_ENABLE: BitField = BitField::new(15, 1);
const FLOW_METER_ID: BitField = BitField::new(8, 6);
const TCAM_COUNTER: BitField = BitField::new(0, 2);
const STREAM_FILTER_ENABLE: BitField = BitField::new(15, 1);
const STREAM_FILTER_ID: BitField = BitField::new(0, 8);

/// The three register pages of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageImages {
    pub key: [u16; PAGE0_REGS],
    pub window: [u16; PAGE1_REGS],
    pub action: [u16; PAGE2_REGS],
}

impl PageImages {
    /// Contents of a flushed slot.
    pub const fn empty() -> Self {
        let mut key = [0u16; PAGE0_REGS];
        key[K_MASK_HDR] = SENTINEL.set(0, SENTINEL_EMPTY);
        Self {
            key,
            window: [0; PAGE1_REGS],
            action: [0; PAGE2_REGS],
        }
    }

    /// Registers of one page.
    pub fn page(&self, page: Page) -> &[u16] {
        match page {
            Page::Key => &self.key,
            Page::Window => &self.window,
            Page::Action => &self.action,
        }
    }

    pub fn page_mut(&mut self, page: Page) -> &mut [u16] {
        match page {
            Page::Key => &mut self.key,
            Page::Window => &mut self.window,
            Page::Action => &mut self.action,
        }
    }

    /// True unless the sentinel holds the empty value.
    pub fn is_valid(&self) -> bool {
        SENTINEL.get(self.key[K_MASK_HDR]) != SENTINEL_EMPTY
    }

    /// Packs an entry. The sentinel is set to the valid value.
    pub fn encode(entry: &CompiledEntry) -> Self {
        let mut images = Self {
            key: encode_key_page(&entry.key, &entry.window),
            window: [0; PAGE1_REGS],
            action: encode_action_page(&entry.action),
        };
        for (i, reg) in images.window.iter_mut().enumerate() {
            *reg = encode_octet(&entry.window, PAGE0_OCTETS + i);
        }
        images
    }

    /// Unpacks the pages into an entry and its validity.
    pub fn decode(&self) -> (bool, CompiledEntry) {
        let mut window = FrameWindow::default();
        for i in 0..PAGE0_OCTETS {
            decode_octet(&mut window, i, self.key[K_OCTETS + i]);
        }
        for (i, reg) in self.window.iter().enumerate() {
            decode_octet(&mut window, PAGE0_OCTETS + i, *reg);
        }
        let entry = CompiledEntry {
            key: decode_key_page(&self.key),
            window,
            action: decode_action_page(&self.action),
        };
        (self.is_valid(), entry)
    }
}

fn encode_octet(window: &FrameWindow, octet: usize) -> u16 {
    let word = OCTET_MASK.set(0, window.mask[octet] as u16);
    OCTET_VALUE.set(word, window.value[octet] as u16)
}

fn decode_octet(window: &mut FrameWindow, octet: usize, reg: u16) {
    window.mask[octet] = OCTET_MASK.get(reg) as u8;
    window.value[octet] = OCTET_VALUE.get(reg) as u8;
}

fn encode_key_page(key: &KeyMatch, window: &FrameWindow) -> [u16; PAGE0_REGS] {
    let mut regs = [0u16; PAGE0_REGS];

    let hdr = FRAME_TYPE.set(0, key.frame_type.mask as u16);
    let hdr = TIME_KEY.set(hdr, key.time_key.mask as u16);
    regs[K_MASK_HDR] = SENTINEL.set(hdr, SENTINEL_VALID);

    let hdr = FRAME_TYPE.set(0, key.frame_type.value as u16);
    let hdr = TIME_KEY.set(hdr, key.time_key.value as u16);
    regs[K_DATA_HDR] = SPV.set(hdr, key.spv.mask.bits());

    regs[K_VLAN_MASK] = PVID.set(PPRI.set(0, key.ppri.mask as u16), key.pvid.mask);
    regs[K_SPV] = SPV.set(0, key.spv.value.bits());
    regs[K_VLAN] = PVID.set(PPRI.set(0, key.ppri.value as u16), key.pvid.value);

    for i in 0..PAGE0_OCTETS {
        regs[K_OCTETS + i] = encode_octet(window, i);
    }
    regs
}

fn decode_key_page(regs: &[u16; PAGE0_REGS]) -> KeyMatch {
    let mask_hdr = regs[K_MASK_HDR];
    let data_hdr = regs[K_DATA_HDR];
    KeyMatch {
        frame_type: Masked::new(FRAME_TYPE.get(data_hdr) as u8, FRAME_TYPE.get(mask_hdr) as u8),
        time_key: Masked::new(TIME_KEY.get(data_hdr) as u8, TIME_KEY.get(mask_hdr) as u8),
        spv: Masked::new(
            PortVector::from_bits(SPV.get(regs[K_SPV])),
            PortVector::from_bits(SPV.get(data_hdr)),
        ),
        ppri: Masked::new(
            PPRI.get(regs[K_VLAN]) as u8,
            PPRI.get(regs[K_VLAN_MASK]) as u8,
        ),
        pvid: Masked::new(PVID.get(regs[K_VLAN]), PVID.get(regs[K_VLAN_MASK])),
    }
}

fn encode_action_page(fields: &ActionFields) -> [u16; PAGE2_REGS] {
    let a = &fields.action;
    let mut regs = [0u16; PAGE2_REGS];

    let w = INTERRUPT.set_flag(0, a.interrupt);
    let w = INC_TCAM_COUNTER.set_flag(w, a.inc_tcam_counter);
    let w = CONTINUE.set_flag(w, fields.continue_next);
    let w = VID_OVERRIDE.set_flag(w, a.vid_override);
    regs[A_CTRL] = VID.set(w, a.vid);

    let w = NEXT_ID.set(0, fields.next_id as u16);
    let w = QPRI_OVERRIDE.set_flag(w, a.qpri_override);
    let w = QPRI.set(w, a.qpri as u16);
    let w = FPRI_OVERRIDE.set_flag(w, a.fpri_override);
    regs[A_PRI] = FPRI.set(w, a.fpri as u16);

    regs[A_DPV] = DPV.set(DPV_MODE.set(0, a.dpv_mode.bits()), a.dpv.bits());

    let w = COLOR_MODE.set(0, a.color_mode as u16);
    let w = VTU_PAGE_OVERRIDE.set_flag(w, a.vtu_page_override);
    let w = VTU_PAGE.set_flag(w, a.vtu_page);
    let w = UNKNOWN_FILTER.set(w, a.unknown_filter as u16);
    regs[A_MISC] = EGRESS_ACTION_POINTER.set(w, a.egress_action_pointer as u16);

    let w = LD_BALANCE_OVERRIDE.set_flag(0, a.ld_balance_override);
    let w = LD_BALANCE.set(w, a.ld_balance as u16);
    let w = DSCP_OVERRIDE.set_flag(w, a.dscp_override);
    regs[A_QOS] = DSCP.set(w, a.dscp as u16);

    let w = FRAME_ACTION_OVERRIDE.set_flag(0, a.frame_action_override);
    regs[A_FACTION] = FRAME_ACTION.set(w, a.frame_action);

    let w = FLOW_METER_ENABLE.set_flag(0, a.flow_meter_enable);
    let w = FLOW_METER_ID.set(w, a.flow_meter_id as u16);
    regs[A_METER] = TCAM_COUNTER.set(w, a.tcam_counter as u16);

    let w = STREAM_FILTER_ENABLE.set_flag(0, a.stream_filter_enable);
    regs[A_STREAM] = STREAM_FILTER_ID.set(w, a.stream_filter_id as u16);

    regs
}

fn decode_action_page(regs: &[u16; PAGE2_REGS]) -> ActionFields {
    let ctrl = regs[A_CTRL];
    let pri = regs[A_PRI];
    let misc = regs[A_MISC];
    let qos = regs[A_QOS];
    ActionFields {
        continue_next: CONTINUE.get_flag(ctrl),
        next_id: NEXT_ID.get(pri) as u8,
        action: RuleAction {
            interrupt: INTERRUPT.get_flag(ctrl),
            inc_tcam_counter: INC_TCAM_COUNTER.get_flag(ctrl),
            vid_override: VID_OVERRIDE.get_flag(ctrl),
            vid: VID.get(ctrl),
            qpri_override: QPRI_OVERRIDE.get_flag(pri),
            qpri: QPRI.get(pri) as u8,
            fpri_override: FPRI_OVERRIDE.get_flag(pri),
            fpri: FPRI.get(pri) as u8,
            dpv_mode: DpvMode::from_bits(DPV_MODE.get(regs[A_DPV])),
            dpv: PortVector::from_bits(DPV.get(regs[A_DPV])),
            color_mode: COLOR_MODE.get(misc) as u8,
            vtu_page_override: VTU_PAGE_OVERRIDE.get_flag(misc),
            vtu_page: VTU_PAGE.get_flag(misc),
            unknown_filter: UNKNOWN_FILTER.get(misc) as u8,
            egress_action_pointer: EGRESS_ACTION_POINTER.get(misc) as u8,
            ld_balance_override: LD_BALANCE_OVERRIDE.get_flag(qos),
            ld_balance: LD_BALANCE.get(qos) as u8,
            dscp_override: DSCP_OVERRIDE.get_flag(qos),
            dscp: DSCP.get(qos) as u8,
            frame_action_override: FRAME_ACTION_OVERRIDE.get_flag(regs[A_FACTION]),
            frame_action: FRAME_ACTION.get(regs[A_FACTION]),
            tcam_counter: TCAM_COUNTER.get(regs[A_METER]) as u8,
            flow_meter_enable: FLOW_METER_ENABLE.get_flag(regs[A_METER]),
            flow_meter_id: FLOW_METER_ID.get(regs[A_METER]) as u8,
            stream_filter_enable: STREAM_FILTER_ENABLE.get_flag(regs[A_STREAM]),
            stream_filter_id: STREAM_FILTER_ID.get(regs[A_STREAM]) as u8,
        },
    }
}

fn check_width(name: &str, value: u16, field: BitField) -> TcamResult<()> {
    if field.fits(value) {
        Ok(())
    } else {
        Err(TcamError::invalid_argument(format!(
            "{} value 0x{:x} exceeds its {}-bit field",
            name, value, field.width
        )))
    }
}

/// Checks the key header fields against their register widths.
pub fn validate_key(key: &KeyMatch) -> TcamResult<()> {
    check_width("frame type", key.frame_type.value as u16, FRAME_TYPE)?;
    check_width("frame type mask", key.frame_type.mask as u16, FRAME_TYPE)?;
    check_width("time key", key.time_key.value as u16, TIME_KEY)?;
    check_width("time key mask", key.time_key.mask as u16, TIME_KEY)?;
    check_width("source port vector", key.spv.value.bits(), SPV)?;
    check_width("source port vector mask", key.spv.mask.bits(), SPV)?;
    check_width("VLAN priority", key.ppri.value as u16, PPRI)?;
    check_width("VLAN priority mask", key.ppri.mask as u16, PPRI)?;
    check_width("VLAN id", key.pvid.value, PVID)?;
    check_width("VLAN id mask", key.pvid.mask, PVID)
}

/// Checks the action fields against their register widths.
pub fn validate_action(a: &RuleAction) -> TcamResult<()> {
    check_width("VID", a.vid, VID)?;
    check_width("queue priority", a.qpri as u16, QPRI)?;
    check_width("frame priority", a.fpri as u16, FPRI)?;
    check_width("destination port vector", a.dpv.bits(), DPV)?;
    check_width("color mode", a.color_mode as u16, COLOR_MODE)?;
    check_width("unknown filter", a.unknown_filter as u16, UNKNOWN_FILTER)?;
    check_width(
        "egress action pointer",
        a.egress_action_pointer as u16,
        EGRESS_ACTION_POINTER,
    )?;
    check_width("load balance", a.ld_balance as u16, LD_BALANCE)?;
    check_width("DSCP", a.dscp as u16, DSCP)?;
    check_width("frame action", a.frame_action, FRAME_ACTION)?;
    check_width("TCAM counter", a.tcam_counter as u16, TCAM_COUNTER)?;
    check_width("flow meter id", a.flow_meter_id as u16, FLOW_METER_ID)
}

/// Checks that `entry` survives a load/read cycle on a table of the given
/// geometry bit for bit.
pub fn validate_entry(entry: &CompiledEntry, geometry: &TableGeometry) -> TcamResult<()> {
    validate_key(&entry.key)?;
    validate_action(&entry.action.action)?;
    let octets = geometry.window_octets();
    if entry.window.compares_beyond(octets) || entry.window.value[octets..].iter().any(|v| *v != 0)
    {
        return Err(TcamError::invalid_argument(format!(
            "window uses octets beyond the {} this table holds",
            octets
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_entry() -> CompiledEntry {
        let mut entry = CompiledEntry::default();
        entry.key.frame_type = Masked::new(2, 3);
        entry.key.time_key = Masked::new(1, 1);
        entry.key.spv = Masked::new(PortVector::EMPTY, PortVector::from_bits(0x7fb));
        entry.key.ppri = Masked::new(5, 7);
        entry.key.pvid = Masked::new(0x123, 0xfff);
        for i in 0..WINDOW_BYTES {
            entry.window.value[i] = i as u8;
            entry.window.mask[i] = 0xff - i as u8;
        }
        entry.action.continue_next = true;
        entry.action.next_id = 0xa7;
        entry.action.action = RuleAction {
            interrupt: true,
            vid_override: true,
            vid: 0xabc,
            qpri_override: true,
            qpri: 6,
            fpri: 5,
            dpv_mode: DpvMode::Or,
            dpv: PortVector::from_bits(0x404),
            color_mode: 2,
            vtu_page: true,
            unknown_filter: 3,
            egress_action_pointer: 0x2a,
            ld_balance_override: true,
            ld_balance: 4,
            dscp: 0x2e,
            frame_action: 0x7001,
            tcam_counter: 3,
            flow_meter_enable: true,
            flow_meter_id: 0x3f,
            stream_filter_id: 0xc4,
            ..RuleAction::default()
        };
        entry
    }

    #[test]
    fn test_encode_decode_identity() {
        let entry = sample_entry();
        let images = PageImages::encode(&entry);
        let (valid, decoded) = images.decode();
        assert!(valid);
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_empty_pages_are_invalid() {
        let (valid, entry) = PageImages::empty().decode();
        assert!(!valid);
        assert_eq!(entry, CompiledEntry::default());
    }

    #[test]
    fn test_sentinel_location() {
        let images = PageImages::encode(&CompiledEntry::default());
        assert_eq!(images.key[0] & 0x00ff, SENTINEL_VALID);
        assert_ne!(images.key[0], 0);
        assert_eq!(PageImages::empty().key[0], 0x00ff);
    }

    #[test]
    fn test_octet_register_format() {
        let mut entry = CompiledEntry::default();
        entry.window.value[0] = 0x12;
        entry.window.mask[0] = 0xf0;
        entry.window.value[47] = 0x34;
        entry.window.mask[47] = 0xff;
        let images = PageImages::encode(&entry);
        assert_eq!(images.key[K_OCTETS], 0xf012);
        assert_eq!(images.window[PAGE1_REGS - 1], 0xff34);
    }

    #[test]
    fn test_action_register_format() {
        let mut fields = ActionFields::terminal(RuleAction::redirect(PortVector::single(2)));
        fields.continue_next = true;
        fields.next_id = 9;
        let regs = encode_action_page(&fields);
        assert_eq!(regs[A_CTRL], 0x2000);
        assert_eq!(regs[A_PRI], 0x0900);
        assert_eq!(regs[A_DPV], 0xc004);
    }

    #[test]
    fn test_operation_word() {
        let word = operation_word(Opcode::Load, Page::Action, 0x2a);
        assert_eq!(word, 0x8000 | (3 << 12) | (2 << 10) | 0x2a);
        assert_eq!(Opcode::from_bits(OP_CODE.get(word)), Some(Opcode::Load));
        assert_eq!(Page::from_bits(OP_PAGE.get(word)), Some(Page::Action));
    }

    #[test]
    fn test_validate_rejects_wide_fields() {
        let mut entry = CompiledEntry::default();
        entry.key.pvid = Masked::new(0x1000, 0);
        assert!(validate_entry(&entry, &TableGeometry::INGRESS).is_err());

        let mut entry = CompiledEntry::default();
        entry.action.action.qpri = 8;
        assert!(validate_entry(&entry, &TableGeometry::INGRESS).is_err());

        let mut entry = CompiledEntry::default();
        entry.action.action.dpv = PortVector::from_bits(0x800);
        assert!(validate_entry(&entry, &TableGeometry::INGRESS).is_err());
    }

    #[test]
    fn test_validate_window_against_geometry() {
        let mut entry = CompiledEntry::default();
        entry.window.mask[30] = 0xff;
        assert!(validate_entry(&entry, &TableGeometry::INGRESS).is_ok());
        assert!(validate_entry(&entry, &TableGeometry::EGRESS).is_err());
        entry.window.mask[30] = 0;
        entry.window.value[21] = 0x55;
        assert!(validate_entry(&entry, &TableGeometry::EGRESS).is_ok());
    }
}
