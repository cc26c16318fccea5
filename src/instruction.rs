//! The fixed 32-instruction opcode set and its `.tie` mnemonic mapping.
//!
//! Byte values in the soup are decoded `mod 32` (spec §4.1); this module owns
//! the canonical mnemonic table, matching PyTierra's `genome_io.NAME_TO_OPCODE`
//! (see SPEC_FULL.md §3 for the numbering rationale).

pub const NUM_INSTRUCTIONS: u8 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Nop0,
    Nop1,
    Not0,
    Shl,
    Zero,
    IfZ,
    SubCAB,
    SubAAC,
    IncA,
    IncB,
    DecC,
    IncC,
    PushA,
    PushB,
    PushC,
    PushD,
    PopA,
    PopB,
    PopC,
    PopD,
    JmpO,
    JmpB,
    Call,
    Ret,
    MovDC,
    MovBA,
    MovII,
    AdrO,
    AdrB,
    AdrF,
    Mal,
    Divide,
}

impl Instruction {
    pub fn from_byte(byte: u8) -> Self {
        use Instruction::*;
        match byte % NUM_INSTRUCTIONS {
            0 => Nop0,
            1 => Nop1,
            2 => Not0,
            3 => Shl,
            4 => Zero,
            5 => IfZ,
            6 => SubCAB,
            7 => SubAAC,
            8 => IncA,
            9 => IncB,
            10 => DecC,
            11 => IncC,
            12 => PushA,
            13 => PushB,
            14 => PushC,
            15 => PushD,
            16 => PopA,
            17 => PopB,
            18 => PopC,
            19 => PopD,
            20 => JmpO,
            21 => JmpB,
            22 => Call,
            23 => Ret,
            24 => MovDC,
            25 => MovBA,
            26 => MovII,
            27 => AdrO,
            28 => AdrB,
            29 => AdrF,
            30 => Mal,
            _ => Divide,
        }
    }

    pub fn to_byte(self) -> u8 {
        use Instruction::*;
        match self {
            Nop0 => 0,
            Nop1 => 1,
            Not0 => 2,
            Shl => 3,
            Zero => 4,
            IfZ => 5,
            SubCAB => 6,
            SubAAC => 7,
            IncA => 8,
            IncB => 9,
            DecC => 10,
            IncC => 11,
            PushA => 12,
            PushB => 13,
            PushC => 14,
            PushD => 15,
            PopA => 16,
            PopB => 17,
            PopC => 18,
            PopD => 19,
            JmpO => 20,
            JmpB => 21,
            Call => 22,
            Ret => 23,
            MovDC => 24,
            MovBA => 25,
            MovII => 26,
            AdrO => 27,
            AdrB => 28,
            AdrF => 29,
            Mal => 30,
            Divide => 31,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Instruction::*;
        match self {
            Nop0 => "nop0",
            Nop1 => "nop1",
            Not0 => "not0",
            Shl => "shl",
            Zero => "zero",
            IfZ => "ifz",
            SubCAB => "subCAB",
            SubAAC => "subAAC",
            IncA => "incA",
            IncB => "incB",
            DecC => "decC",
            IncC => "incC",
            PushA => "pushA",
            PushB => "pushB",
            PushC => "pushC",
            PushD => "pushD",
            PopA => "popA",
            PopB => "popB",
            PopC => "popC",
            PopD => "popD",
            JmpO => "jmpo",
            JmpB => "jmpb",
            Call => "call",
            Ret => "ret",
            MovDC => "movDC",
            MovBA => "movBA",
            MovII => "movii",
            AdrO => "adro",
            AdrB => "adrb",
            AdrF => "adrf",
            Mal => "mal",
            Divide => "divide",
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        use Instruction::*;
        Some(match name {
            "nop0" => Nop0,
            "nop1" => Nop1,
            "not0" => Not0,
            "shl" => Shl,
            "zero" => Zero,
            "ifz" => IfZ,
            "subCAB" => SubCAB,
            "subAAC" => SubAAC,
            "incA" => IncA,
            "incB" => IncB,
            "decC" => DecC,
            "incC" => IncC,
            "pushA" => PushA,
            "pushB" => PushB,
            "pushC" => PushC,
            "pushD" => PushD,
            "popA" => PopA,
            "popB" => PopB,
            "popC" => PopC,
            "popD" => PopD,
            "jmpo" => JmpO,
            "jmpb" => JmpB,
            "call" => Call,
            "ret" => Ret,
            "movDC" => MovDC,
            "movBA" => MovBA,
            "movii" => MovII,
            "adro" => AdrO,
            "adrb" => AdrB,
            "adrf" => AdrF,
            "mal" => Mal,
            "divide" => Divide,
            _ => return None,
        })
    }

    /// Only `nop0`/`nop1` participate in template matching.
    pub fn is_template(self) -> bool {
        matches!(self, Instruction::Nop0 | Instruction::Nop1)
    }

    /// Complement of a template bit: `nop0 <-> nop1`. Non-template callers
    /// should not call this; it panics to surface a logic error early.
    pub fn complement(self) -> Self {
        match self {
            Instruction::Nop0 => Instruction::Nop1,
            Instruction::Nop1 => Instruction::Nop0,
            other => panic!("complement() called on non-template instruction {other:?}"),
        }
    }
}
