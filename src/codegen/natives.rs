// This module holds the static, read-only tables describing the target
// machine's native instructions and builtin math operators: per-positional
// parameter roles and constraints, the return slot of each native, the
// sensor-readable property types, the controllable block attributes, and the
// builtin arities. Code generation validates every native/builtin call
// against these tables; nothing here is mutated at runtime.

//! Native and builtin signature tables.

use crate::core::Type;

/// Role and constraint of one positional native parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Evaluated and consumed; the value's type must intersect the given
    /// type.
    Input(Type),
    /// A variable name the native writes into; declared on first use.
    Output(Type),
    /// A literal keyword from the allowed set.
    Config(&'static [&'static str]),
    /// Present but ignored; renders as `_`.
    Unused,
}

const NUM_IN: ParamKind = ParamKind::Input(Type::NUM);

const RADAR_FILTERS: &[&str] = &[
    "any", "enemy", "ally", "player", "attacker", "flying", "boss", "ground",
];
const RADAR_SORTS: &[&str] = &["distance", "health", "shield", "armor", "maxHealth"];
const BUILDING_GROUPS: &[&str] = &[
    "core", "storage", "generator", "turret", "factory", "repair", "battery", "reactor",
];

/// Block attributes assignable through `block.attr = value`, lowering to a
/// `control` instruction.
pub const CONTROLLABLE: &[&str] = &["enabled", "config", "color"];

/// The type a sensor-readable property yields.
pub fn sensor_property(name: &str) -> Option<Type> {
    Some(match name {
        "totalItems" | "itemCapacity" | "totalLiquids" | "liquidCapacity" | "totalPower"
        | "powerCapacity" | "powerNetStored" | "powerNetCapacity" | "powerNetIn"
        | "powerNetOut" | "ammo" | "ammoCapacity" | "health" | "maxHealth" | "heat"
        | "efficiency" | "progress" | "timescale" | "rotation" | "x" | "y" | "shootX"
        | "shootY" | "size" | "dead" | "range" | "shooting" | "boosting" | "mineX"
        | "mineY" | "mining" | "speed" | "flag" | "controlled" | "payloadCount"
        | "enabled" | "color" => Type::NUM,
        "firstItem" => Type::ITEM_TYPE,
        "team" => Type::TEAM,
        "type" | "payloadType" => Type::UNIT_TYPE.or(Type::BLOCK_TYPE),
        "controller" => Type::CONTROLLER,
        "name" => Type::STR,
        "config" => Type::ANY,
        _ => return None,
    })
}

/// Signature of a native by (possibly dotted) name. `sensor.<prop>` entries
/// are synthesized from the sensor-property table.
pub fn signature(name: &str) -> Option<Vec<ParamKind>> {
    if let Some(prop) = name.strip_prefix("sensor.") {
        let typ = sensor_property(prop)?;
        return Some(vec![
            ParamKind::Output(typ),
            ParamKind::Input(Type::BLOCK.or(Type::UNIT)),
        ]);
    }

    let sig: &'static [ParamKind] = match name {
        "read" => &[
            ParamKind::Output(Type::NUM),
            ParamKind::Input(Type::BLOCK),
            NUM_IN,
        ],
        "write" => &[NUM_IN, ParamKind::Input(Type::BLOCK), NUM_IN],

        "draw.clear" => &[NUM_IN; 3],
        "draw.color" => &[NUM_IN; 4],
        "draw.col" => &[NUM_IN],
        "draw.stroke" => &[NUM_IN],
        "draw.line" => &[NUM_IN; 4],
        "draw.rect" => &[NUM_IN; 4],
        "draw.lineRect" => &[NUM_IN; 4],
        "draw.poly" => &[NUM_IN; 5],
        "draw.linePoly" => &[NUM_IN; 5],
        "draw.triangle" => &[NUM_IN; 6],
        "draw.image" => &[
            NUM_IN,
            NUM_IN,
            ParamKind::Input(Type::ITEM_TYPE),
            NUM_IN,
            NUM_IN,
        ],

        "print" => &[ParamKind::Input(Type::ANY)],
        "drawflush" => &[ParamKind::Input(Type::BLOCK)],
        "printflush" => &[ParamKind::Input(Type::BLOCK)],
        "getlink" => &[ParamKind::Output(Type::BLOCK), NUM_IN],

        "control.enabled" => &[ParamKind::Input(Type::BLOCK), NUM_IN],
        "control.shoot" => &[ParamKind::Input(Type::BLOCK), NUM_IN, NUM_IN, NUM_IN],
        "control.shootp" => &[
            ParamKind::Input(Type::BLOCK),
            ParamKind::Input(Type::UNIT),
            NUM_IN,
        ],
        "control.config" => &[ParamKind::Input(Type::BLOCK), NUM_IN],
        "control.color" => &[ParamKind::Input(Type::BLOCK), NUM_IN],

        "radar" => &[
            ParamKind::Config(RADAR_FILTERS),
            ParamKind::Config(RADAR_FILTERS),
            ParamKind::Config(RADAR_FILTERS),
            ParamKind::Config(RADAR_SORTS),
            ParamKind::Input(Type::BLOCK),
            NUM_IN,
            ParamKind::Output(Type::UNIT),
        ],

        "wait" => &[NUM_IN],

        "lookup.block" => &[ParamKind::Output(Type::BLOCK_TYPE), NUM_IN],
        "lookup.unit" => &[ParamKind::Output(Type::UNIT_TYPE), NUM_IN],
        "lookup.item" => &[ParamKind::Output(Type::ITEM_TYPE), NUM_IN],
        "lookup.liquid" => &[ParamKind::Output(Type::LIQUID_TYPE), NUM_IN],

        "packcolor" => &[
            ParamKind::Output(Type::NUM),
            NUM_IN,
            NUM_IN,
            NUM_IN,
            NUM_IN,
        ],

        "ubind" => &[ParamKind::Input(Type::UNIT_TYPE)],

        "ucontrol.idle" => &[],
        "ucontrol.stop" => &[],
        "ucontrol.move" => &[NUM_IN; 2],
        "ucontrol.approach" => &[NUM_IN; 3],
        "ucontrol.boost" => &[NUM_IN],
        "ucontrol.target" => &[NUM_IN; 3],
        "ucontrol.targetp" => &[ParamKind::Input(Type::UNIT), NUM_IN],
        "ucontrol.itemDrop" => &[ParamKind::Input(Type::BLOCK), NUM_IN],
        "ucontrol.itemTake" => &[
            ParamKind::Input(Type::BLOCK),
            ParamKind::Input(Type::ITEM_TYPE),
            NUM_IN,
        ],
        "ucontrol.payDrop" => &[],
        "ucontrol.payTake" => &[NUM_IN],
        "ucontrol.payEnter" => &[],
        "ucontrol.mine" => &[NUM_IN; 2],
        "ucontrol.flag" => &[NUM_IN],
        "ucontrol.build" => &[
            NUM_IN,
            NUM_IN,
            ParamKind::Input(Type::BLOCK_TYPE),
            NUM_IN,
            NUM_IN,
        ],
        "ucontrol.getBlock" => &[
            NUM_IN,
            NUM_IN,
            ParamKind::Output(Type::BLOCK_TYPE),
            ParamKind::Output(Type::BLOCK),
        ],
        "ucontrol.within" => &[NUM_IN, NUM_IN, NUM_IN, ParamKind::Output(Type::NUM)],
        "ucontrol.unbind" => &[],

        "uradar" => &[
            ParamKind::Config(RADAR_FILTERS),
            ParamKind::Config(RADAR_FILTERS),
            ParamKind::Config(RADAR_FILTERS),
            ParamKind::Config(RADAR_SORTS),
            ParamKind::Unused,
            NUM_IN,
            ParamKind::Output(Type::UNIT),
        ],

        "ulocate.ore" => &[
            ParamKind::Unused,
            ParamKind::Unused,
            ParamKind::Input(Type::BLOCK_TYPE),
            ParamKind::Output(Type::NUM),
            ParamKind::Output(Type::NUM),
            ParamKind::Output(Type::NUM),
            ParamKind::Unused,
        ],
        "ulocate.building" => &[
            ParamKind::Config(BUILDING_GROUPS),
            NUM_IN,
            ParamKind::Unused,
            ParamKind::Output(Type::NUM),
            ParamKind::Output(Type::NUM),
            ParamKind::Output(Type::NUM),
            ParamKind::Output(Type::BLOCK),
        ],
        "ulocate.spawn" | "ulocate.damaged" => &[
            ParamKind::Unused,
            ParamKind::Unused,
            ParamKind::Unused,
            ParamKind::Output(Type::NUM),
            ParamKind::Output(Type::NUM),
            ParamKind::Output(Type::NUM),
            ParamKind::Output(Type::BLOCK),
        ],

        _ => return None,
    };
    Some(sig.to_vec())
}

/// The OUTPUT position treated as the call's return slot, where the native
/// has one.
pub fn return_pos(name: &str) -> Option<usize> {
    if name.starts_with("sensor.") {
        return Some(0);
    }
    Some(match name {
        "read" | "getlink" | "packcolor" => 0,
        "lookup.block" | "lookup.unit" | "lookup.item" | "lookup.liquid" => 0,
        "ucontrol.within" => 3,
        "radar" | "uradar" => 6,
        _ => return None,
    })
}

/// Arity of a builtin math operator, lowered to a single `op` instruction.
pub fn builtin_arity(name: &str) -> Option<usize> {
    Some(match name {
        "max" | "min" | "len" => 2,
        "abs" | "log" | "log10" | "ceil" | "floor" | "sqrt" | "sin" | "cos" | "tan"
        | "asin" | "acos" | "atan" | "rand" => 1,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_natives_resolve() {
        assert_eq!(signature("ucontrol.move").unwrap().len(), 2);
        assert_eq!(signature("ulocate.building").unwrap().len(), 7);
        assert!(signature("draw.blur").is_none());
    }

    #[test]
    fn sensor_signatures_are_synthesized() {
        let sig = signature("sensor.health").unwrap();
        assert_eq!(sig.len(), 2);
        assert!(matches!(sig[0], ParamKind::Output(t) if t == Type::NUM));
        assert_eq!(return_pos("sensor.health"), Some(0));
        assert!(signature("sensor.blastRadius").is_none());
    }

    #[test]
    fn return_slots_point_at_outputs() {
        for (name, pos) in [("read", 0), ("radar", 6), ("ucontrol.within", 3)] {
            let sig = signature(name).unwrap();
            assert_eq!(return_pos(name), Some(pos));
            assert!(matches!(sig[pos], ParamKind::Output(_)));
        }
        assert_eq!(return_pos("write"), None);
    }

    #[test]
    fn builtin_arities() {
        assert_eq!(builtin_arity("max"), Some(2));
        assert_eq!(builtin_arity("sqrt"), Some(1));
        assert_eq!(builtin_arity("hypot"), None);
    }
}
