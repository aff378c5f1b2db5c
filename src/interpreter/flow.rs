//! Control-flow driver: basic-block jumps, direct calls and returns.
//!
//! These are the only places the dispatch loop's four pieces of state
//! (current function, current basic block, instruction cursor, current
//! value region) change outside of a plain sequential advance.

use tracing::{debug, error};

use crate::consts::CELL_SIZE;
use crate::context::ExecutionContext;
use crate::error::{ArgumentError, BytecodeError, VmError};
use crate::interpreter::frame::ActivationFrame;
use crate::interpreter::Interpreter;
use crate::module::{BlockId, FuncId, ValueId};
use crate::state::{ExecuteState, ProgramOutcome};
use crate::value::{self, Width};

impl<'m> Interpreter<'m> {
    /// Validates `target` against the current function's block table and
    /// resets the instruction cursor to its start, per §4.4.
    pub(crate) fn jump_to(&mut self, target: BlockId) -> Result<(), VmError> {
        let bound = self.function(self.current_func)?.blocks.len() as u32;
        if target >= bound {
            return Err(VmError::Bytecode(BytecodeError::InvalidBasicBlock { block: target, bound }));
        }
        self.current_block = target;
        self.inst_cursor = 0;
        Ok(())
    }

    /// `OP_CALL_DIRECT`: validates the callee, marshals actual arguments
    /// into a freshly allocated value region, pushes an activation frame
    /// recording the caller's resumption site, and switches the driver to
    /// the callee's entry block.
    pub(crate) fn call_direct(
        &mut self,
        context: &mut ExecutionContext,
        func: FuncId,
        args: &[ValueId],
        dest: ValueId,
        dest_width: Width,
    ) -> Result<(), VmError> {
        let module = self.module;
        let callee = module
            .function(func)
            .ok_or(ArgumentError::FunctionIdOutOfRange { function: func, bound: module.num_functions() })?;

        if callee.num_args != args.len() as u32 {
            return Err(VmError::Argument(ArgumentError::CallArityMismatch {
                expected: callee.num_args,
                provided: args.len() as u32,
            }));
        }

        let callee_bound = callee.region_len();
        let num_args = callee.num_args;
        let const_base = callee.num_values as usize;
        let constants = callee.constants.clone();

        // Capture the actual arguments before touching the spill stack: the
        // caller's region may itself live in the spill stack, so the read
        // and the allocation cannot safely overlap in time.
        let caller_bound = self.current_region_bound()?;
        let mut actuals = Vec::with_capacity(args.len());
        {
            let caller_region = self.region(context);
            for &value_id in args {
                actuals.push(value::read_cell_raw(caller_region, value_id, caller_bound)?);
            }
        }

        debug!(func, num_args, "executing call");

        let handle = self.spill_stack.alloc(callee_bound as usize * CELL_SIZE)?;
        let callee_region = self.spill_stack.region_mut(handle);
        callee_region.fill(0);
        for (i, cell) in actuals.into_iter().enumerate() {
            value::write_cell_raw(callee_region, i as u32, callee_bound, cell)?;
        }
        for (i, constant) in constants.iter().enumerate() {
            let index = const_base as u32 + i as u32;
            value::write_u64(callee_region, index, callee_bound, *constant)?;
        }

        self.call_stack.push(ActivationFrame {
            caller_func: self.current_func,
            caller_block: self.current_block,
            caller_inst: self.inst_cursor + 1,
            return_slot: dest,
            return_width: dest_width,
            value_region: handle,
        });

        self.current_func = func;
        self.current_region = Some(handle);
        self.jump_to(0)
    }

    /// `OP_RET`: captures the returned value, pops the activation frame (if
    /// any), and either signals clean termination (entry function
    /// returning) or resumes the caller at its recorded resumption site.
    pub(crate) fn ret(&mut self, context: &mut ExecutionContext, width: Width, src: ValueId) -> Result<ExecuteState, VmError> {
        let bound = self.current_region_bound()?;
        let value = value::read(self.region(context), src, bound, width)?;

        let frame = match self.call_stack.pop() {
            None => {
                self.last_outcome = Some(ProgramOutcome::new(width, value));
                return Ok(ExecuteState::Return);
            }
            Some(frame) => frame,
        };

        if let Err(err) = self.spill_stack.free(frame.value_region) {
            error!(%err, "activation frame free refused out of LIFO order; frame leaked");
        }

        self.current_func = frame.caller_func;
        self.current_block = frame.caller_block;
        self.inst_cursor = frame.caller_inst;
        self.current_region = self.call_stack.last().map(|f| f.value_region);

        let caller_bound = self.current_region_bound()?;
        value::write(self.region_mut(context), frame.return_slot, caller_bound, frame.return_width, value)?;

        Ok(ExecuteState::Proceed)
    }
}
