//! The outer fetch-dispatch-advance loop.
//!
//! Everything width-specific lives in [`super::alu`] and [`super::cast`];
//! everything that changes the driver's four pieces of state lives in
//! [`super::flow`]. This module is just the instruction fetch and the
//! per-family `match`, plus the post-increment rule from §4.4: every
//! instruction advances the cursor by one except the four that set it
//! themselves (`BRANCH`, `JMP`, `CALL_DIRECT`, `RET`).

use tracing::trace;

use crate::context::ExecutionContext;
use crate::error::{BytecodeError, VmError};
use crate::interpreter::{alu, cast, Interpreter};
use crate::module::{CastOp, Instruction};
use crate::state::ExecuteState;
use crate::value;

/// Runs `interp` to completion against `context`, starting from whatever
/// `(current_func, current_block, inst_cursor)` it was constructed with.
pub(super) fn dispatch_loop(interp: &mut Interpreter<'_>, context: &mut ExecutionContext) -> Result<(), VmError> {
    loop {
        if let Some(budget) = context.instruction_budget {
            if interp.instructions_executed >= budget {
                return Err(VmError::Bytecode(BytecodeError::InstructionBudgetExhausted { budget }));
            }
        }
        interp.instructions_executed += 1;

        let block = interp.current_block_ref()?;
        let inst = block
            .instructions
            .get(interp.inst_cursor as usize)
            .ok_or(VmError::Bytecode(BytecodeError::MalformedControlFlow { block: interp.current_block }))?
            .clone();

        trace!(func = interp.current_func, block = interp.current_block, inst = interp.inst_cursor, "step");

        let mut advance = true;

        match inst {
            Instruction::Binary { op, width, lhs, rhs, dest } => {
                let bound = interp.current_region_bound()?;
                let a = value::read(interp.region(context), lhs, bound, width)?;
                let b = value::read(interp.region(context), rhs, bound, width)?;
                let result = alu::eval_binary(op, width, a, b)?;
                value::write(interp.region_mut(context), dest, bound, width, result)?;
            }

            Instruction::Compare { op, width, lhs, rhs, dest } => {
                let bound = interp.current_region_bound()?;
                let a = value::read(interp.region(context), lhs, bound, width)?;
                let b = value::read(interp.region(context), rhs, bound, width)?;
                let result = alu::eval_compare(op, width, a, b);
                value::write_i1(interp.region_mut(context), dest, bound, result)?;
            }

            Instruction::Cast { op, src, dest, dest_width } => {
                let bound = interp.current_region_bound()?;
                match op {
                    CastOp::Sext { src_width, sext_bits } => {
                        let raw = value::read(interp.region(context), src, bound, src_width)?;
                        let extended = cast::eval_sext(raw, sext_bits);
                        value::write(interp.region_mut(context), dest, bound, dest_width, extended)?;
                    }
                    CastOp::Zext { src_width } | CastOp::Trunc { src_width } => {
                        let raw = value::read(interp.region(context), src, bound, src_width)?;
                        value::write(interp.region_mut(context), dest, bound, dest_width, raw)?;
                    }
                }
            }

            Instruction::Copy { width, src, dest } => {
                let bound = interp.current_region_bound()?;
                let v = value::read(interp.region(context), src, bound, width)?;
                value::write(interp.region_mut(context), dest, bound, width, v)?;
            }

            Instruction::Select { width, cond, if_true, if_false, dest } => {
                let bound = interp.current_region_bound()?;
                let cond_true = value::read_i1(interp.region(context), cond, bound)?;
                let chosen = if cond_true { if_true } else { if_false };
                let v = value::read(interp.region(context), chosen, bound, width)?;
                value::write(interp.region_mut(context), dest, bound, width, v)?;
            }

            Instruction::Branch { cond, if_true, if_false } => {
                let bound = interp.current_region_bound()?;
                let cond_true = value::read_i1(interp.region(context), cond, bound)?;
                interp.jump_to(if cond_true { if_true } else { if_false })?;
                advance = false;
            }

            Instruction::Jmp { target } => {
                interp.jump_to(target)?;
                advance = false;
            }

            Instruction::CallDirect { func, args, dest, dest_width } => {
                interp.call_direct(context, func, &args, dest, dest_width)?;
                advance = false;
            }

            Instruction::Ret { width, src } => {
                advance = false;
                if let ExecuteState::Return = interp.ret(context, width, src)? {
                    return Ok(());
                }
            }
        }

        if advance {
            interp.inst_cursor += 1;
        }
    }
}
