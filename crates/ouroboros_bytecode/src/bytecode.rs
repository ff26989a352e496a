//! The compiled-module container the VM consumes.
//!
//! A [`Bytecode`] owns the instruction bytes, the de-duplicated constant
//! pool, the descriptor tables (functions, classes, interfaces, structs,
//! enums, and the ECS trio), and the exception handler table. Descriptors
//! derive serde so tooling can dump compiled modules as JSON.
//!
//! Ownership follows the pipeline: the builder owns the buffer while
//! emission is in progress, `finalize` hands the container to the optimizer,
//! and each pass consumes its input and produces a fresh one.

use serde::{Deserialize, Serialize};

use crate::decode::{decode, Operand};
use crate::value::Constant;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bytecode {
    pub code: Vec<u8>,
    pub constants: Vec<Constant>,
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    pub interfaces: Vec<InterfaceInfo>,
    pub structs: Vec<StructInfo>,
    pub enums: Vec<EnumInfo>,
    pub components: Vec<ComponentInfo>,
    pub systems: Vec<SystemInfo>,
    pub entities: Vec<EntityInfo>,
    pub exception_handlers: Vec<ExceptionHandler>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    /// Byte offset of the first instruction.
    pub start: usize,
    /// Byte offset just past the last instruction.
    pub end: usize,
    pub local_count: usize,
    pub param_count: usize,
    pub is_async: bool,
    pub is_generator: bool,
    /// Contract clause text recorded by the builder, if any.
    pub contracts: Option<ContractInfo>,
}

/// The `requires`/`ensures`/`invariant` clause text of one function,
/// carried for verifiers and debuggers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub requires: Vec<String>,
    pub ensures: Vec<String>,
    pub invariants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    /// Index into [`Bytecode::functions`].
    pub function_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub base: Option<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructInfo {
    pub name: String,
    pub fields: Vec<FieldInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumInfo {
    pub name: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub fields: Vec<FieldInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub name: String,
    /// Component names this system iterates over.
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityInfo {
    pub name: String,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionHandler {
    pub try_start: usize,
    pub try_end: usize,
    pub handler_start: usize,
    pub catch_start: usize,
    pub type_name: Option<String>,
    pub filter_start: Option<usize>,
}

impl Bytecode {
    /// A human-readable instruction listing with resolved jump targets and
    /// constant values; test failures read much better through this.
    pub fn disassemble(&self) -> String {
        let instructions = match decode(&self.code) {
            Ok(instructions) => instructions,
            Err(e) => return format!("<{e}>\n"),
        };
        let mut out = String::new();
        for instruction in &instructions {
            out.push_str(&format!("{:04}  {}", instruction.offset, instruction.opcode));
            match &instruction.operand {
                Operand::None => {}
                Operand::I32(v) => {
                    if let Some(target) = instruction.jump_target() {
                        out.push_str(&format!(" -> {target:04}"));
                    } else if instruction.opcode == crate::opcode::Opcode::LoadConstant {
                        match self.constants.get(*v as usize) {
                            Some(c) => out.push_str(&format!(" #{v} ({c})")),
                            None => out.push_str(&format!(" #{v} (?)")),
                        }
                    } else {
                        out.push_str(&format!(" {v}"));
                    }
                }
                Operand::Bytes(payload) => {
                    out.push_str(&format!(" [{} byte(s)]", payload.len()));
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Instruction;
    use crate::opcode::Opcode;

    #[test]
    fn disassemble_resolves_jumps_and_constants() {
        let mut code = Vec::new();
        Instruction::new(0, Opcode::LoadConstant, Operand::I32(0)).encode_into(&mut code);
        Instruction::new(5, Opcode::JumpIfTrue, Operand::I32(1)).encode_into(&mut code);
        Instruction::new(10, Opcode::Nop, Operand::None).encode_into(&mut code);
        let bytecode = Bytecode {
            code,
            constants: vec![Constant::Int(42)],
            ..Default::default()
        };
        let listing = bytecode.disassemble();
        assert!(listing.contains("LoadConstant #0 (42)"));
        assert!(listing.contains("JumpIfTrue -> 0011"));
    }

    #[test]
    fn disassemble_reports_malformed_streams() {
        let bytecode = Bytecode {
            code: vec![0xFF],
            ..Default::default()
        };
        assert!(bytecode.disassemble().contains("malformed bytecode"));
    }

    #[test]
    fn descriptors_serialize_to_json() {
        let bytecode = Bytecode {
            functions: vec![FunctionInfo {
                name: "main".into(),
                start: 0,
                end: 10,
                local_count: 2,
                param_count: 0,
                is_async: false,
                is_generator: false,
                contracts: None,
            }],
            ..Default::default()
        };
        let json = serde_json::to_string(&bytecode).expect("serializes");
        assert!(json.contains("\"main\""));
        let back: Bytecode = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back.functions[0].end, 10);
    }
}
