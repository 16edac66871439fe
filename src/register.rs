use std::fmt;

/// The four architectural registers. `PC` is register 0 so that the 2-bit
/// `S`/`D` encoding fields address all four registers directly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegisterId {
    Pc = 0,
    In1 = 1,
    In2 = 2,
    Acc = 3,
}

impl RegisterId {
    pub const ALL: [RegisterId; 4] = [
        RegisterId::Pc,
        RegisterId::In1,
        RegisterId::In2,
        RegisterId::Acc,
    ];

    pub fn from_u32(value: u32) -> RegisterId {
        match value & 0b11 {
            0 => RegisterId::Pc,
            1 => RegisterId::In1,
            2 => RegisterId::In2,
            _ => RegisterId::Acc,
        }
    }

    pub fn from_name(name: &str) -> Option<RegisterId> {
        match name {
            "PC" => Some(RegisterId::Pc),
            "IN1" => Some(RegisterId::In1),
            "IN2" => Some(RegisterId::In2),
            "ACC" => Some(RegisterId::Acc),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RegisterId::Pc => "PC",
            RegisterId::In1 => "IN1",
            RegisterId::In2 => "IN2",
            RegisterId::Acc => "ACC",
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four 32-bit registers, initially zero.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct RegisterFile {
    values: [u32; crate::constants::REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile::default()
    }

    pub fn get(&self, id: RegisterId) -> u32 {
        self.values[id as usize]
    }

    pub fn set(&mut self, id: RegisterId, value: u32) {
        self.values[id as usize] = value;
    }
}
