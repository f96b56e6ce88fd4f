//! # Protocol Mapping Table
//!
//! Translates the radio's protocol/subtype model into the protocol number,
//! subtype and option byte the module expects on the wire.
//!
//! ## Remapping
//!
//! The radio numbers its protocols from 0 and folds the FrSky variants into a
//! single protocol. The module numbers from 1 and gives FrSkyX (15) and FrSkyV
//! (25) their own slots, so every built-in protocol from 15 upwards is shifted
//! once, and from 25 upwards twice:
//!
//! | Radio | Wire |
//! |-------|------|
//! | Bayang (13) | 14 |
//! | ESky (14) | 16 |
//! | Hontai (23) | 26 |
//! | AFHDS2A (25) | 28 |
//!
//! Family rules run after the shift and replace its result where they apply.

use super::protocol::*;

/// Protocol fields as sent in the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireProtocol {
    /// Module protocol number (before masking to 5 bits)
    pub wire_type: u8,
    /// Subtype (only the low 3 bits are sent)
    pub subtype: u8,
    /// Option byte
    pub option: u8,
    /// Whether the autobind flag may be set in the protocol byte
    pub autobind_bit: bool,
}

/// Inputs a family rule may consult
#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    pub autobind: bool,
    pub mode: ModuleMode,
    /// Channels routed to the module
    pub channel_count: u8,
}

/// Family-specific header adjustment
pub type FamilyRule = fn(&mut WireProtocol, &RuleContext);

/// Family rules, one per [`ProtocolFamily`]
const FAMILY_RULES: [(ProtocolFamily, FamilyRule); 4] = [
    (ProtocolFamily::Generic, generic_rule),
    (ProtocolFamily::Dsm, dsm_rule),
    (ProtocolFamily::Frsky, frsky_rule),
    (ProtocolFamily::Afhds2a, afhds2a_rule),
];

/// Look up the rule for a family
pub fn family_rule(family: ProtocolFamily) -> FamilyRule {
    FAMILY_RULES
        .iter()
        .find(|(f, _)| *f == family)
        .map(|(_, rule)| *rule)
        .unwrap_or(generic_rule)
}

/// Map a radio protocol number (0-based) to the module's protocol number
///
/// # Examples
///
/// ```
/// use multi_bridge::multi::mapping::remap_protocol_index;
///
/// assert_eq!(remap_protocol_index(13), 14);
/// assert_eq!(remap_protocol_index(14), 16);
/// assert_eq!(remap_protocol_index(23), 26);
/// ```
pub fn remap_protocol_index(internal: u8) -> u8 {
    let mut wire_type = internal.saturating_add(1);

    // FrSkyX lives at 15 on the wire
    if wire_type >= 15 {
        wire_type = wire_type.saturating_add(1);
    }

    // FrSkyV lives at 25 on the wire
    if wire_type >= 25 {
        wire_type = wire_type.saturating_add(1);
    }

    wire_type
}

/// Resolve the wire protocol fields for a module
///
/// # Arguments
///
/// * `config` - Module configuration snapshot
/// * `mode` - Current module mode
/// * `channel_count` - Channels routed to the module (DSM option value)
pub fn resolve(config: &ModuleConfiguration, mode: ModuleMode, channel_count: u8) -> WireProtocol {
    let mut wire = WireProtocol {
        wire_type: 0,
        subtype: config.sub_protocol,
        option: config.option as u8,
        autobind_bit: config.autobind,
    };

    match config.protocol {
        ProtocolSelector::Custom(raw) => {
            wire.wire_type = raw;
            // The AFHDS2A check looks at the stored number, custom or not
            if raw == Protocol::Afhds2a.index() {
                let ctx = RuleContext {
                    autobind: config.autobind,
                    mode,
                    channel_count,
                };
                afhds2a_rule(&mut wire, &ctx);
            }
        }
        ProtocolSelector::Builtin(protocol) => {
            wire.wire_type = remap_protocol_index(protocol.index());
            let ctx = RuleContext {
                autobind: config.autobind,
                mode,
                channel_count,
            };
            family_rule(protocol.family())(&mut wire, &ctx);
        }
    }

    wire
}

fn generic_rule(_wire: &mut WireProtocol, _ctx: &RuleContext) {}

fn dsm_rule(wire: &mut WireProtocol, ctx: &RuleContext) {
    // Autobinding is always done in DSMX 11ms
    if ctx.autobind && ctx.mode == ModuleMode::Bind {
        wire.subtype = DSM_SUBTYPE_AUTO;
    }

    wire.option = ctx.channel_count;
    wire.autobind_bit = false;
}

fn frsky_rule(wire: &mut WireProtocol, _ctx: &RuleContext) {
    let (wire_type, subtype) = match wire.subtype {
        FRSKY_SUBTYPE_D8 => (3, 0),
        FRSKY_SUBTYPE_V8 => (25, 0),
        FRSKY_SUBTYPE_D16 => (15, 0),
        FRSKY_SUBTYPE_D16_8CH => (15, 1),
        FRSKY_SUBTYPE_D16_LBT => (15, 2),
        _ => (15, 3),
    };
    wire.wire_type = wire_type;
    wire.subtype = subtype;
}

fn afhds2a_rule(wire: &mut WireProtocol, _ctx: &RuleContext) {
    // Pass telemetry through instead of FrSky D framing
    wire.option |= 0x80;
}
