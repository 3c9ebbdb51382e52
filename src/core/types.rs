// This module implements the compiler's value and type model. Type is a
// bitset over the primitive kinds the target machine distinguishes (numbers,
// strings, null, blocks, units, teams, the content-type families and unit
// controllers) with ANY as the union of all of them. Assignability is set
// intersection, not equality: a value fits a declared type whenever the two
// bitsets overlap. Value is the discriminated union produced by expression
// evaluation - literals, null, linker blocks and (possibly const) variables -
// and renders to the operand token its instruction form uses, with numbers
// normalized to integer text whenever they are integral.

//! Value and type model.

use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Bitset type. Compatibility between types is tested by set intersection,
/// never by equality, so unions like `Type::BLOCK.or(Type::UNIT)` work as
/// declared types everywhere a single kind does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type(u16);

impl Type {
    pub const STR: Type = Type(1 << 0);
    pub const NUM: Type = Type(1 << 1);
    pub const NULL: Type = Type(1 << 2);
    pub const BLOCK: Type = Type(1 << 3);
    pub const UNIT: Type = Type(1 << 4);
    pub const TEAM: Type = Type(1 << 5);
    pub const UNIT_TYPE: Type = Type(1 << 6);
    pub const ITEM_TYPE: Type = Type(1 << 7);
    pub const BLOCK_TYPE: Type = Type(1 << 8);
    pub const LIQUID_TYPE: Type = Type(1 << 9);
    pub const CONTROLLER: Type = Type(1 << 10);

    /// Union of every primitive kind.
    pub const ANY: Type = Type((1 << 11) - 1);

    /// Set union.
    pub const fn or(self, other: Type) -> Type {
        Type(self.0 | other.0)
    }

    /// Set intersection.
    pub const fn and(self, other: Type) -> Type {
        Type(self.0 & other.0)
    }

    /// Whether a value of this type is assignable to `declared`:
    /// the intersection of the two sets is non-empty.
    pub const fn compatible(self, declared: Type) -> bool {
        self.0 & declared.0 != 0
    }

    /// Parse a source-level type keyword (`num`, `str`, `Block`,
    /// `unitType`, ...).
    pub fn from_name(name: &str) -> Option<Type> {
        Some(match name {
            "str" => Type::STR,
            "num" => Type::NUM,
            "null" => Type::NULL,
            "Block" | "block" => Type::BLOCK,
            "Unit" | "unit" => Type::UNIT,
            "Team" | "team" => Type::TEAM,
            "UnitType" | "unitType" => Type::UNIT_TYPE,
            "ItemType" | "itemType" => Type::ITEM_TYPE,
            "BlockType" | "blockType" => Type::BLOCK_TYPE,
            "LiquidType" | "liquidType" => Type::LIQUID_TYPE,
            "Controller" | "controller" => Type::CONTROLLER,
            "any" => Type::ANY,
            _ => return None,
        })
    }

    const NAMES: [(Type, &'static str); 11] = [
        (Type::STR, "str"),
        (Type::NUM, "num"),
        (Type::NULL, "null"),
        (Type::BLOCK, "Block"),
        (Type::UNIT, "Unit"),
        (Type::TEAM, "Team"),
        (Type::UNIT_TYPE, "UnitType"),
        (Type::ITEM_TYPE, "ItemType"),
        (Type::BLOCK_TYPE, "BlockType"),
        (Type::LIQUID_TYPE, "LiquidType"),
        (Type::CONTROLLER, "Controller"),
    ];
}

impl BitOr for Type {
    type Output = Type;

    fn bitor(self, rhs: Type) -> Type {
        self.or(rhs)
    }
}

impl BitAnd for Type {
    type Output = Type;

    fn bitand(self, rhs: Type) -> Type {
        self.and(rhs)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Type::ANY {
            return write!(f, "any");
        }
        let mut first = true;
        for (bit, name) in Type::NAMES {
            if self.0 & bit.0 != 0 {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "<none>")?;
        }
        Ok(())
    }
}

/// A named variable. The name is the flat, already-mangled target name; the
/// `constant` flag rejects writes at assignment time.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub typ: Type,
    pub constant: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, typ: Type) -> Self {
        Self {
            name: name.into(),
            typ,
            constant: false,
        }
    }

    pub fn constant(name: impl Into<String>, typ: Type) -> Self {
        Self {
            name: name.into(),
            typ,
            constant: true,
        }
    }
}

/// A value produced by expression evaluation. Immutable once constructed;
/// equality is structural.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Null,
    Block(String),
    Variable(Variable),
}

impl Value {
    pub fn typ(&self) -> Type {
        match self {
            Value::String(_) => Type::STR,
            Value::Number(_) => Type::NUM,
            Value::Null => Type::NULL,
            Value::Block(_) => Type::BLOCK,
            Value::Variable(var) => var.typ,
        }
    }

    pub fn variable(name: impl Into<String>, typ: Type) -> Value {
        Value::Variable(Variable::new(name, typ))
    }
}

/// Render a number the way the target expects it: integral values print
/// without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Null => write!(f, "null"),
            Value::Block(name) => write!(f, "{name}"),
            Value::Variable(var) => write!(f, "{}", var.name),
        }
    }
}
