//! JSON round-trips for the serde-derived surfaces: compiled modules
//! (descriptor tables included) and diagnostics.

use ouroboros_base::{Diagnostic, Severity};
use ouroboros_bytecode::bytecode::{ContractInfo, ExceptionHandler, FunctionInfo};
use ouroboros_bytecode::opcode::Opcode;
use ouroboros_bytecode::{Bytecode, BytecodeBuilder, Constant};

fn sample_module() -> Bytecode {
    let mut builder = BytecodeBuilder::new();
    let greeting = builder.add_constant(Constant::Str("hello".into())) as i32;
    builder.emit_with(Opcode::LoadConstant, greeting);
    builder.emit(Opcode::Return);
    let end = builder.offset();
    let index = builder.add_function(FunctionInfo {
        name: "greet".into(),
        start: 0,
        end,
        local_count: 0,
        param_count: 0,
        is_async: false,
        is_generator: false,
        contracts: None,
    });
    builder
        .set_function_contracts(
            index,
            ContractInfo {
                requires: vec!["true".into()],
                ensures: vec![],
                invariants: vec![],
            },
        )
        .expect("function exists");
    builder.register_exception_handler(ExceptionHandler {
        try_start: 0,
        try_end: end,
        handler_start: end,
        catch_start: end,
        type_name: Some("Error".into()),
        filter_start: None,
    });
    builder.finalize().expect("clean build")
}

#[test]
fn bytecode_round_trips_through_json() {
    let module = sample_module();
    let json = serde_json::to_string(&module).expect("module serializes");
    let back: Bytecode = serde_json::from_str(&json).expect("module deserializes");

    assert_eq!(back.code, module.code);
    assert_eq!(back.constants, module.constants);
    assert_eq!(back.functions.len(), 1);
    assert_eq!(back.functions[0].name, "greet");
    assert_eq!(back.functions[0].end, module.functions[0].end);
    assert_eq!(
        back.functions[0].contracts,
        Some(ContractInfo {
            requires: vec!["true".into()],
            ensures: vec![],
            invariants: vec![],
        })
    );
    assert_eq!(back.exception_handlers[0].type_name.as_deref(), Some("Error"));
    assert_eq!(back.exception_handlers[0].filter_start, None);
}

#[test]
fn constant_pool_tags_survive_json() {
    // Double and Decimal share a payload type; the tag must keep them apart.
    let constants = vec![
        Constant::Double(1.5),
        Constant::Decimal(1.5),
        Constant::Long(7),
        Constant::Char('µ'),
        Constant::Null,
    ];
    let json = serde_json::to_string(&constants).expect("pool serializes");
    let back: Vec<Constant> = serde_json::from_str(&json).expect("pool deserializes");
    assert_eq!(back, constants);
    assert_ne!(back[0], back[1]);
}

#[test]
fn diagnostics_round_trip_through_json() {
    let diagnostic = Diagnostic::error("'x' is not defined in this scope", 2, 7)
        .with_help("did you mean 'xs'?");
    let json = serde_json::to_string(&diagnostic).expect("diagnostic serializes");
    assert!(json.contains("\"Error\""));
    let back: Diagnostic = serde_json::from_str(&json).expect("diagnostic deserializes");
    assert_eq!(back, diagnostic);
    assert_eq!(back.severity, Severity::Error);
    assert_eq!(back.help.as_deref(), Some("did you mean 'xs'?"));
}
