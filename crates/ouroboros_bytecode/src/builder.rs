//! The mutable bytecode builder.
//!
//! Three related duties: append instructions, manage labels and forward
//! jumps, and track nested loops for `break`/`continue`. The builder owns
//! the byte buffer exclusively until [`BytecodeBuilder::finalize`] hands the
//! assembled [`Bytecode`] to the optimizer.
//!
//! Jump operands are relative to the end of the operand (see
//! [`crate::decode`]); a forward jump is emitted with a placeholder and
//! patched once its target offset is known. `finalize` refuses to produce
//! bytecode while any placeholder is unpatched — no partial bytecode ever
//! escapes the builder.

use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::bytecode::{
    Bytecode, ClassInfo, ComponentInfo, ContractInfo, EntityInfo, EnumInfo, ExceptionHandler,
    FunctionInfo, InterfaceInfo, StructInfo, SystemInfo,
};
use crate::opcode::{Opcode, OperandClass};
use crate::value::Constant;

/// A structural mistake while building: unpatched jumps at finalize,
/// loop controls outside a loop, contract bookkeeping for a function that
/// does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    pub message: String,
}

impl BuildError {
    fn new(message: impl Into<String>) -> Self {
        BuildError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bytecode build error: {}", self.message)
    }
}

impl std::error::Error for BuildError {}

#[derive(Debug, Default)]
pub struct BytecodeBuilder {
    code: Vec<u8>,
    constants: Vec<Constant>,
    functions: Vec<FunctionInfo>,
    classes: Vec<ClassInfo>,
    interfaces: Vec<InterfaceInfo>,
    structs: Vec<StructInfo>,
    enums: Vec<EnumInfo>,
    components: Vec<ComponentInfo>,
    systems: Vec<SystemInfo>,
    entities: Vec<EntityInfo>,
    exception_handlers: Vec<ExceptionHandler>,
    labels: HashMap<String, usize>,
    /// Operand offsets of jumps still awaiting `patch_jump`.
    pending: BTreeSet<usize>,
    // Three parallel stacks, one frame per nested loop.
    loop_starts: Vec<usize>,
    break_sites: Vec<Vec<usize>>,
    continue_sites: Vec<Vec<usize>>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The offset the next instruction will be emitted at.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    /// Appends a zero-operand instruction.
    pub fn emit(&mut self, opcode: Opcode) {
        debug_assert_eq!(opcode.operand_class(), OperandClass::None);
        self.code.push(opcode as u8);
    }

    /// Appends an instruction with its 4-byte little-endian operand.
    pub fn emit_with(&mut self, opcode: Opcode, operand: i32) {
        debug_assert_eq!(opcode.operand_class(), OperandClass::I32);
        self.code.push(opcode as u8);
        self.code.extend_from_slice(&operand.to_le_bytes());
    }

    /// Appends a raw-byte escape (`NativeInstruction`, `RawBytes`) with its
    /// length-prefixed payload.
    pub fn emit_bytes(&mut self, opcode: Opcode, payload: &[u8]) {
        debug_assert_eq!(opcode.operand_class(), OperandClass::Bytes);
        self.code.push(opcode as u8);
        self.code
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.code.extend_from_slice(payload);
    }

    // ------------------------------------------------------------------
    // Jumps
    // ------------------------------------------------------------------

    /// Emits a jump with a placeholder operand; returns the patch site.
    pub fn emit_jump(&mut self, opcode: Opcode) -> usize {
        debug_assert!(opcode.is_jump());
        self.code.push(opcode as u8);
        let site = self.code.len();
        self.code.extend_from_slice(&0i32.to_le_bytes());
        self.pending.insert(site);
        site
    }

    /// Emits a jump straight to a known absolute target.
    pub fn emit_jump_to(&mut self, opcode: Opcode, target: usize) {
        debug_assert!(opcode.is_jump());
        self.code.push(opcode as u8);
        let operand_end = self.code.len() + 4;
        let delta = target as i64 - operand_end as i64;
        self.code.extend_from_slice(&(delta as i32).to_le_bytes());
    }

    /// Overwrites the placeholder at `site` so the jump lands on the
    /// current offset.
    pub fn patch_jump(&mut self, site: usize) -> Result<(), BuildError> {
        self.patch_jump_to(site, self.offset())
    }

    fn patch_jump_to(&mut self, site: usize, target: usize) -> Result<(), BuildError> {
        if !self.pending.remove(&site) {
            return Err(BuildError::new(format!(
                "offset {site} is not a pending jump site"
            )));
        }
        let delta = target as i64 - (site as i64 + 4);
        self.code[site..site + 4].copy_from_slice(&(delta as i32).to_le_bytes());
        Ok(())
    }

    /// Emits the back-edge of a loop: an unconditional jump to `target`,
    /// which precedes the jump.
    pub fn emit_loop(&mut self, target: usize) {
        self.emit_jump_to(Opcode::Jump, target);
    }

    // ------------------------------------------------------------------
    // Loop tracking
    // ------------------------------------------------------------------

    /// Opens a loop frame; the current offset becomes the loop's start.
    pub fn mark_loop_start(&mut self) {
        self.loop_starts.push(self.offset());
        self.break_sites.push(Vec::new());
        self.continue_sites.push(Vec::new());
    }

    /// Emits a forward jump recorded on the innermost break list.
    pub fn emit_break(&mut self) -> Result<(), BuildError> {
        let site = self.emit_jump(Opcode::Jump);
        match self.break_sites.last_mut() {
            Some(frame) => {
                frame.push(site);
                Ok(())
            }
            None => Err(BuildError::new("'break' outside of a loop")),
        }
    }

    /// Emits a forward jump recorded on the innermost continue list.
    pub fn emit_continue(&mut self) -> Result<(), BuildError> {
        let site = self.emit_jump(Opcode::Jump);
        match self.continue_sites.last_mut() {
            Some(frame) => {
                frame.push(site);
                Ok(())
            }
            None => Err(BuildError::new("'continue' outside of a loop")),
        }
    }

    /// Closes the innermost loop frame: break sites patch to the current
    /// offset, continue sites patch to the loop's start.
    pub fn end_loop(&mut self) -> Result<(), BuildError> {
        let start = self
            .loop_starts
            .pop()
            .ok_or_else(|| BuildError::new("'end_loop' without a matching 'mark_loop_start'"))?;
        let breaks = self.break_sites.pop().unwrap_or_default();
        let continues = self.continue_sites.pop().unwrap_or_default();
        let exit = self.offset();
        for site in breaks {
            self.patch_jump_to(site, exit)?;
        }
        for site in continues {
            self.patch_jump_to(site, start)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Constant pool and labels
    // ------------------------------------------------------------------

    /// Interns a constant, returning the index of a structurally equal
    /// existing entry when there is one.
    pub fn add_constant(&mut self, value: Constant) -> usize {
        if let Some(index) = self.constants.iter().position(|c| *c == value) {
            return index;
        }
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Records the current offset under `name`.
    pub fn define_label(&mut self, name: &str) {
        self.labels.insert(name.to_string(), self.offset());
    }

    pub fn label_offset(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    // ------------------------------------------------------------------
    // Descriptor tables
    // ------------------------------------------------------------------

    pub fn add_function(&mut self, function: FunctionInfo) -> usize {
        self.functions.push(function);
        self.functions.len() - 1
    }

    /// Attaches contract clause text to an already-added function.
    pub fn set_function_contracts(
        &mut self,
        index: usize,
        contracts: ContractInfo,
    ) -> Result<(), BuildError> {
        match self.functions.get_mut(index) {
            Some(function) => {
                function.contracts = Some(contracts);
                Ok(())
            }
            None => Err(BuildError::new(format!(
                "no function at index {index} to attach contracts to"
            ))),
        }
    }

    pub fn add_class(&mut self, class: ClassInfo) -> usize {
        self.classes.push(class);
        self.classes.len() - 1
    }

    pub fn add_interface(&mut self, interface: InterfaceInfo) -> usize {
        self.interfaces.push(interface);
        self.interfaces.len() - 1
    }

    pub fn add_struct(&mut self, s: StructInfo) -> usize {
        self.structs.push(s);
        self.structs.len() - 1
    }

    pub fn add_enum(&mut self, e: EnumInfo) -> usize {
        self.enums.push(e);
        self.enums.len() - 1
    }

    pub fn add_component(&mut self, component: ComponentInfo) -> usize {
        self.components.push(component);
        self.components.len() - 1
    }

    pub fn add_system(&mut self, system: SystemInfo) -> usize {
        self.systems.push(system);
        self.systems.len() - 1
    }

    pub fn add_entity(&mut self, entity: EntityInfo) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn register_exception_handler(&mut self, handler: ExceptionHandler) {
        self.exception_handlers.push(handler);
    }

    // ------------------------------------------------------------------
    // Finalize
    // ------------------------------------------------------------------

    /// Verifies every jump was patched and releases the assembled bytecode.
    pub fn finalize(self) -> Result<Bytecode, BuildError> {
        if !self.pending.is_empty() {
            let sites: Vec<String> = self.pending.iter().map(|s| s.to_string()).collect();
            return Err(BuildError::new(format!(
                "unpatched jump operand(s) at offset(s) {}",
                sites.join(", ")
            )));
        }
        if !self.loop_starts.is_empty() {
            return Err(BuildError::new(format!(
                "{} loop frame(s) left open",
                self.loop_starts.len()
            )));
        }
        Ok(Bytecode {
            code: self.code,
            constants: self.constants,
            functions: self.functions,
            classes: self.classes,
            interfaces: self.interfaces,
            structs: self.structs,
            enums: self.enums,
            components: self.components,
            systems: self.systems,
            entities: self.entities,
            exception_handlers: self.exception_handlers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    #[test]
    fn constant_pool_deduplicates_structurally() {
        let mut builder = BytecodeBuilder::new();
        let a = builder.add_constant(Constant::Int(5));
        let b = builder.add_constant(Constant::Str("hi".into()));
        let c = builder.add_constant(Constant::Int(5));
        assert_eq!(a, c);
        assert_ne!(a, b);
        let bytecode = builder.finalize().expect("clean build");
        assert_eq!(bytecode.constants.len(), 2);
    }

    #[test]
    fn forward_jump_patches_to_the_intended_target() {
        let mut builder = BytecodeBuilder::new();
        let site = builder.emit_jump(Opcode::JumpIfFalse);
        builder.emit(Opcode::Pop);
        builder.emit(Opcode::Nop);
        builder.patch_jump(site).expect("pending site");
        builder.emit(Opcode::Halt);
        let bytecode = builder.finalize().expect("all patched");

        let instructions = decode(&bytecode.code).expect("valid stream");
        // The jump lands past Pop and Nop, on Halt.
        assert_eq!(instructions[0].jump_target(), Some(7));
        assert_eq!(instructions[3].opcode, Opcode::Halt);
        assert_eq!(instructions[3].offset, 7);
    }

    #[test]
    fn emit_loop_produces_a_negative_back_edge() {
        let mut builder = BytecodeBuilder::new();
        let start = builder.offset();
        builder.emit(Opcode::Nop);
        builder.emit_loop(start);
        let bytecode = builder.finalize().expect("clean build");
        let instructions = decode(&bytecode.code).expect("valid stream");
        assert_eq!(instructions[1].jump_target(), Some(start));
        assert!(instructions[1].operand.as_i32().unwrap() < 0);
    }

    #[test]
    fn break_and_continue_patch_through_the_loop_frame() {
        let mut builder = BytecodeBuilder::new();
        builder.mark_loop_start();
        let start = builder.offset();
        builder.emit(Opcode::Nop);
        builder.emit_break().expect("inside loop");
        builder.emit_continue().expect("inside loop");
        builder.emit_loop(start);
        builder.end_loop().expect("frame closes");
        builder.emit(Opcode::Halt);
        let bytecode = builder.finalize().expect("all patched");

        let instructions = decode(&bytecode.code).expect("valid stream");
        let exit = instructions.last().unwrap().offset;
        // Break jumps to the loop exit, continue back to the start.
        assert_eq!(instructions[1].jump_target(), Some(exit));
        assert_eq!(instructions[2].jump_target(), Some(start));
    }

    #[test]
    fn break_outside_a_loop_is_an_error() {
        let mut builder = BytecodeBuilder::new();
        let err = builder.emit_break().expect_err("no loop frame");
        assert!(err.message.contains("break"));
    }

    #[test]
    fn finalize_lists_every_unpatched_site() {
        let mut builder = BytecodeBuilder::new();
        let first = builder.emit_jump(Opcode::Jump);
        let second = builder.emit_jump(Opcode::JumpIfTrue);
        let err = builder.finalize().expect_err("two pending sites");
        assert!(err.message.contains(&first.to_string()));
        assert!(err.message.contains(&second.to_string()));
    }

    #[test]
    fn patching_a_non_pending_site_is_an_error() {
        let mut builder = BytecodeBuilder::new();
        let err = builder.patch_jump(3).expect_err("nothing pending");
        assert!(err.message.contains("not a pending"));
    }

    #[test]
    fn labels_record_offsets() {
        let mut builder = BytecodeBuilder::new();
        builder.emit(Opcode::Nop);
        builder.define_label("loop_head");
        builder.emit(Opcode::Nop);
        assert_eq!(builder.label_offset("loop_head"), Some(1));
        assert_eq!(builder.label_offset("missing"), None);
    }

    #[test]
    fn contracts_attach_to_existing_functions_only() {
        let mut builder = BytecodeBuilder::new();
        let index = builder.add_function(FunctionInfo {
            name: "area".into(),
            start: 0,
            end: 0,
            local_count: 0,
            param_count: 2,
            is_async: false,
            is_generator: false,
            contracts: None,
        });
        builder
            .set_function_contracts(
                index,
                ContractInfo {
                    requires: vec!["w > 0".into()],
                    ensures: vec![],
                    invariants: vec![],
                },
            )
            .expect("function exists");
        assert!(builder.set_function_contracts(9, ContractInfo::default()).is_err());

        let bytecode = builder.finalize().expect("clean build");
        let contracts = bytecode.functions[0].contracts.as_ref().expect("attached");
        assert_eq!(contracts.requires, vec!["w > 0".to_string()]);
    }

    #[test]
    fn emit_bytes_length_prefixes_the_payload() {
        let mut builder = BytecodeBuilder::new();
        builder.emit_bytes(Opcode::NativeInstruction, &[0x0F, 0xA2]);
        let bytecode = builder.finalize().expect("clean build");
        let instructions = decode(&bytecode.code).expect("valid stream");
        assert_eq!(
            instructions[0].operand,
            crate::decode::Operand::Bytes(vec![0x0F, 0xA2])
        );
    }
}
