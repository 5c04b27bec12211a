//! Rule compiler: [`Rule`] to slot images and back.

use tracing::debug;

use crate::cascade;
use crate::entry::{ActionFields, CompiledEntry};
use crate::error::{TcamError, TcamResult};
use crate::layout;
use crate::rule::Rule;
use crate::shape::{self, FrameStream};

/// One or two slot images produced from a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledRule {
    /// Image for the rule's own slot.
    pub primary: CompiledEntry,
    /// Target slot and image of the continuation entry, if the rule
    /// cascades.
    pub continuation: Option<(u16, CompiledEntry)>,
}

impl CompiledRule {
    pub fn is_cascaded(&self) -> bool {
        self.continuation.is_some()
    }
}

/// Compiles `rule`. `slot2` is where the continuation entry goes if one is
/// needed; it is ignored otherwise.
pub fn compile(rule: &Rule, slot2: u16) -> TcamResult<CompiledRule> {
    layout::validate_key(&rule.key)?;
    layout::validate_action(&rule.action)?;

    let shape = rule.shape();
    let mut stream = FrameStream::default();
    shape::encode_ethernet(&mut stream, &rule.ethernet, shape);
    shape::encode_headers(&mut stream, &rule.headers)?;
    let (window1, window2) = stream.windows();

    let mut primary = CompiledEntry {
        key: rule.key,
        window: window1,
        action: ActionFields::terminal(rule.action),
    };

    if cascade::needs_second_slot(shape) {
        let mut second = CompiledEntry {
            window: window2,
            ..CompiledEntry::default()
        };
        if cascade::is_second_slot_used(&second) {
            cascade::link(&mut primary, &mut second, slot2, rule.action)?;
            return Ok(CompiledRule {
                primary,
                continuation: Some((slot2, second)),
            });
        }
        debug!(%shape, "second window unused, compiling to one slot");
    }

    // Nothing of window 2 is stored without a continuation slot.
    if window2.value.iter().any(|v| *v != 0) {
        return Err(TcamError::invalid_argument(format!(
            "{} rule sets values under a zero mask in the second window",
            shape
        )));
    }

    Ok(CompiledRule {
        primary,
        continuation: None,
    })
}

/// Rebuilds a rule from its slot images. `second` is required when
/// `first` carries the continue marker.
pub fn decode(first: &CompiledEntry, second: Option<&CompiledEntry>) -> TcamResult<Rule> {
    let (second, action) = if first.action.continue_next {
        let second = second.ok_or_else(|| {
            TcamError::invalid_argument(format!(
                "entry continues into slot {} but no continuation image was given",
                first.action.next_id
            ))
        })?;
        (Some(second), second.action.action)
    } else {
        (None, first.action.action)
    };

    let stream = FrameStream::from_windows(&first.window, second.map(|e| &e.window));
    let shape = shape::decode_shape(&stream)?;
    Ok(Rule {
        key: first.key,
        ethernet: shape::decode_ethernet(&stream),
        headers: shape::decode_headers(&stream, shape),
        action,
    })
}
