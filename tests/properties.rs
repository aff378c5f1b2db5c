//! Property tests for the invariants that must hold across every width and
//! every operand, rather than at a handful of hand-picked boundary values.

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

use bc_vm::interpreter::builder::{FunctionBuilder, ModuleBuilder};
use bc_vm::prelude::*;

fn width_from_tag(tag: u8) -> Width {
    Width::from_tag(tag % 5).unwrap()
}

fn run_binary(op: BinOp, width: Width, a: u64, b: u64) -> Result<u64, VmError> {
    let func = FunctionBuilder::new()
        .values(1)
        .constant(a)
        .constant(b)
        .block(vec![
            Instruction::Binary { op, width, lhs: 1, rhs: 2, dest: 0 },
            Instruction::Ret { width, src: 0 },
        ])
        .finish();
    let module = ModuleBuilder::new().function(func).finish();
    let mut ctx = ExecutionContext::with_null_host(module.function(0).unwrap());
    bc_vm::execute(&module, &mut ctx, 0, 0).map(|outcome| outcome.value())
}

fn run_compare(op: CmpOp, width: Width, a: u64, b: u64) -> bool {
    let func = FunctionBuilder::new()
        .values(1)
        .constant(a)
        .constant(b)
        .block(vec![
            Instruction::Compare { op, width, lhs: 1, rhs: 2, dest: 0 },
            Instruction::Ret { width: Width::I1, src: 0 },
        ])
        .finish();
    let module = ModuleBuilder::new().function(func).finish();
    let mut ctx = ExecutionContext::with_null_host(module.function(0).unwrap());
    bc_vm::execute(&module, &mut ctx, 0, 0).unwrap().value() != 0
}

fn run_select(width: Width, cond: bool, a: u64, b: u64) -> u64 {
    let func = FunctionBuilder::new()
        .values(1)
        .constant(cond as u64)
        .constant(a)
        .constant(b)
        .block(vec![
            Instruction::Select { width, cond: 1, if_true: 2, if_false: 3, dest: 0 },
            Instruction::Ret { width, src: 0 },
        ])
        .finish();
    let module = ModuleBuilder::new().function(func).finish();
    let mut ctx = ExecutionContext::with_null_host(module.function(0).unwrap());
    bc_vm::execute(&module, &mut ctx, 0, 0).unwrap().value()
}

fn run_zext(src_width: Width, v: u64) -> u64 {
    let func = FunctionBuilder::new()
        .values(1)
        .constant(v)
        .block(vec![
            Instruction::Cast {
                op: CastOp::Zext { src_width },
                src: 1,
                dest: 0,
                dest_width: Width::I64,
            },
            Instruction::Ret { width: Width::I64, src: 0 },
        ])
        .finish();
    let module = ModuleBuilder::new().function(func).finish();
    let mut ctx = ExecutionContext::with_null_host(module.function(0).unwrap());
    bc_vm::execute(&module, &mut ctx, 0, 0).unwrap().value()
}

#[quickcheck]
fn zext_equals_the_source_interpreted_as_unsigned(tag: u8, v: u64) -> bool {
    let width = width_from_tag(tag);
    run_zext(width, v) == (v & width.mask())
}

#[quickcheck]
fn select_picks_the_true_operand_when_condition_is_set(tag: u8, a: u64, b: u64) -> bool {
    let width = width_from_tag(tag);
    run_select(width, true, a, b) == (a & width.mask())
}

#[quickcheck]
fn select_picks_the_false_operand_when_condition_is_clear(tag: u8, a: u64, b: u64) -> bool {
    let width = width_from_tag(tag);
    run_select(width, false, a, b) == (b & width.mask())
}

#[quickcheck]
fn add_is_congruent_modulo_the_operand_width(tag: u8, a: u64, b: u64) -> bool {
    let width = width_from_tag(tag);
    let expected = a.wrapping_add(b) & width.mask();
    run_binary(BinOp::Add, width, a, b).unwrap() == expected
}

#[quickcheck]
fn sub_is_congruent_modulo_the_operand_width(tag: u8, a: u64, b: u64) -> bool {
    let width = width_from_tag(tag);
    let expected = a.wrapping_sub(b) & width.mask();
    run_binary(BinOp::Sub, width, a, b).unwrap() == expected
}

#[quickcheck]
fn mul_is_congruent_modulo_the_operand_width(tag: u8, a: u64, b: u64) -> bool {
    let width = width_from_tag(tag);
    let expected = a.wrapping_mul(b) & width.mask();
    run_binary(BinOp::Mul, width, a, b).unwrap() == expected
}

#[quickcheck]
fn udiv_urem_satisfy_the_division_identity(tag: u8, a: u64, b: u64) -> TestResult {
    let width = width_from_tag(tag);
    let mask = width.mask();
    let (am, bm) = (a & mask, b & mask);
    if bm == 0 {
        return TestResult::discard();
    }
    let quotient = run_binary(BinOp::UDiv, width, a, b).unwrap();
    let remainder = run_binary(BinOp::URem, width, a, b).unwrap();
    TestResult::from_bool(quotient * bm + remainder == am)
}

#[quickcheck]
fn udiv_by_zero_is_always_a_divide_by_zero_error(tag: u8, a: u64) -> bool {
    let width = width_from_tag(tag);
    matches!(
        run_binary(BinOp::UDiv, width, a, 0).unwrap_err(),
        VmError::Bytecode(BytecodeError::DivideByZero)
    )
}

#[quickcheck]
fn icmp_eq_is_reflexive(tag: u8, v: u64) -> bool {
    let width = width_from_tag(tag);
    run_compare(CmpOp::Eq, width, v, v)
}

#[quickcheck]
fn icmp_ult_is_irreflexive(tag: u8, v: u64) -> bool {
    let width = width_from_tag(tag);
    !run_compare(CmpOp::Ult, width, v, v)
}

#[quickcheck]
fn and_or_xor_are_width_independent_bitwise_ops(a: u64, b: u64) -> bool {
    // At i64 width, masking is a no-op, so the bitwise ops should match the
    // plain Rust operators exactly.
    run_binary(BinOp::And, Width::I64, a, b).unwrap() == (a & b)
        && run_binary(BinOp::Or, Width::I64, a, b).unwrap() == (a | b)
        && run_binary(BinOp::Xor, Width::I64, a, b).unwrap() == (a ^ b)
}

#[quickcheck]
fn value_index_out_of_range_is_always_rejected(region_cells: u8, index: u8) -> TestResult {
    let bound = region_cells as u32;
    let index = index as u32;
    if index < bound {
        return TestResult::discard();
    }
    let region = vec![0u8; bound as usize * 8];
    TestResult::from_bool(matches!(
        bc_vm::value::read_u8(&region, index, bound),
        Err(ArgumentError::ValueIndexOutOfRange { .. })
    ))
}

#[quickcheck]
fn spill_stack_allocations_freed_in_lifo_order_always_succeed(sizes: Vec<u16>) -> TestResult {
    use bc_vm::stack::SpillStack;

    let sizes: Vec<usize> = sizes.iter().map(|&n| (n as usize % 4096) + 1).collect();
    if sizes.is_empty() {
        return TestResult::discard();
    }

    let mut stack = SpillStack::new();
    let mut handles = Vec::with_capacity(sizes.len());
    for &size in &sizes {
        match stack.alloc(size) {
            Ok(handle) => handles.push(handle),
            Err(_) => return TestResult::discard(),
        }
    }

    for handle in handles.into_iter().rev() {
        if stack.free(handle).is_err() {
            return TestResult::failed();
        }
    }

    TestResult::from_bool(stack.is_empty())
}
