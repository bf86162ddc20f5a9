//! Bytecode walking.
//!
//! Only the invoke instructions are interpreted; every other instruction is
//! stepped over by length. Lengths follow the JVM instruction set, with the
//! three variable-length forms (`tableswitch`, `lookupswitch`, `wide`)
//! decoded explicitly.

use super::pool::ConstantPool;
use crate::error::{Error, Result};

pub(crate) const INVOKEVIRTUAL: u8 = 0xB6;
pub(crate) const INVOKESPECIAL: u8 = 0xB7;
pub(crate) const INVOKESTATIC: u8 = 0xB8;
pub(crate) const INVOKEINTERFACE: u8 = 0xB9;

const TABLESWITCH: u8 = 0xAA;
const LOOKUPSWITCH: u8 = 0xAB;
const WIDE: u8 = 0xC4;
const IINC: u8 = 0x84;

/// A method invocation found in a method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInsn {
    /// The invoke opcode
    pub opcode: u8,
    /// Internal name of the declaring class
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
}

/// Length of the fixed-size instruction starting with `opcode`
fn fixed_length(opcode: u8) -> Option<usize> {
    let len = match opcode {
        0x00..=0x0F => 1,
        0x10 => 2,
        0x11 => 3,
        0x12 => 2,
        0x13 | 0x14 => 3,
        0x15..=0x19 => 2,
        0x1A..=0x35 => 1,
        0x36..=0x3A => 2,
        0x3B..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xA8 => 3,
        0xA9 => 2,
        0xAC..=0xB1 => 1,
        0xB2..=0xB8 => 3,
        0xB9 | 0xBA => 5,
        0xBB => 3,
        0xBC => 2,
        0xBD => 3,
        0xBE | 0xBF => 1,
        0xC0 | 0xC1 => 3,
        0xC2 | 0xC3 => 1,
        0xC5 => 4,
        0xC6 | 0xC7 => 3,
        0xC8 | 0xC9 => 5,
        0xCA | 0xFE | 0xFF => 1,
        _ => return None,
    };
    Some(len)
}

fn read_i32(code: &[u8], at: usize) -> Result<i32> {
    code.get(at..at + 4)
        .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::class_format(at, "truncated switch operand"))
}

/// Length of the instruction at `pc`, including operands and padding
pub(crate) fn instruction_length(code: &[u8], pc: usize) -> Result<usize> {
    let opcode = code[pc];
    match opcode {
        TABLESWITCH => {
            let operands = pc + 1 + (3 - pc % 4);
            let low = read_i32(code, operands + 4)?;
            let high = read_i32(code, operands + 8)?;
            if high < low {
                return Err(Error::class_format(pc, "tableswitch with high < low"));
            }
            let count = (high as i64 - low as i64 + 1) as usize;
            Ok(operands - pc + 12 + count * 4)
        }
        LOOKUPSWITCH => {
            let operands = pc + 1 + (3 - pc % 4);
            let pairs = read_i32(code, operands + 4)?;
            if pairs < 0 {
                return Err(Error::class_format(pc, "lookupswitch with negative npairs"));
            }
            Ok(operands - pc + 8 + pairs as usize * 8)
        }
        WIDE => match code.get(pc + 1) {
            Some(&IINC) => Ok(6),
            Some(_) => Ok(4),
            None => Err(Error::class_format(pc, "truncated wide instruction")),
        },
        other => fixed_length(other)
            .ok_or_else(|| Error::class_format(pc, format!("unknown opcode 0x{:02x}", other))),
    }
}

/// Walks `code` and returns every `invoke{virtual,special,static,interface}` target.
///
/// `invokedynamic` is not reported; its target is a bootstrap method, not a
/// named member.
pub(crate) fn method_invocations(code: &[u8], pool: &ConstantPool) -> Result<Vec<MethodInsn>> {
    let mut invocations = Vec::new();
    let mut pc = 0;

    while pc < code.len() {
        let opcode = code[pc];
        let length = instruction_length(code, pc)?;
        if pc + length > code.len() {
            return Err(Error::class_format(pc, "instruction runs past end of code"));
        }

        if matches!(
            opcode,
            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE
        ) {
            let index = u16::from_be_bytes([code[pc + 1], code[pc + 2]]);
            let (owner, name, descriptor) = pool.member_ref(index)?;
            invocations.push(MethodInsn {
                opcode,
                owner: owner.to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            });
        }

        pc += length;
    }

    Ok(invocations)
}
