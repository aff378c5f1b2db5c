//! [`Interpreter`] implementation

use crate::context::ExecutionContext;
use crate::error::{ArgumentError, BytecodeError, VmError};
use crate::interpreter::frame::CallStack;
use crate::module::{FuncId, Module};
use crate::stack::{SpillStack, StackHandle};
use crate::state::ProgramOutcome;

pub(crate) mod alu;
pub mod builder;
pub(crate) mod cast;
mod executors;
pub(crate) mod flow;
pub(crate) mod frame;

/// Bytecode interpreter: owns the call stack and spill stack for a single
/// invocation. Constructed fresh per [`crate::execute`] call; never reused
/// across invocations.
pub struct Interpreter<'m> {
    module: &'m Module,
    call_stack: CallStack,
    spill_stack: SpillStack,
    /// The function whose value region is currently active.
    current_func: FuncId,
    /// The basic block currently executing.
    current_block: u32,
    /// Index of the next instruction to execute within `current_block`.
    inst_cursor: u32,
    /// The active value region: `None` for the entry activation (its
    /// region lives in the [`ExecutionContext`]), `Some` for a callee
    /// frame's region carved out of the spill stack.
    current_region: Option<StackHandle>,
    instructions_executed: u64,
    /// Set by `RET` when it unwinds the entry activation; consumed by
    /// [`Interpreter::run`] once the dispatch loop halts.
    last_outcome: Option<ProgramOutcome>,
}

impl<'m> Interpreter<'m> {
    pub(crate) fn new(module: &'m Module, entry_function: FuncId) -> Self {
        Interpreter {
            module,
            call_stack: CallStack::new(),
            spill_stack: SpillStack::new(),
            current_func: entry_function,
            current_block: 0,
            inst_cursor: 0,
            current_region: None,
            instructions_executed: 0,
            last_outcome: None,
        }
    }

    /// Byte slice for the currently active value region.
    pub(crate) fn region<'a>(&'a self, context: &'a ExecutionContext) -> &'a [u8] {
        match self.current_region {
            None => &context.value_region,
            Some(handle) => self.spill_stack.region(handle),
        }
    }

    /// Mutable byte slice for the currently active value region.
    pub(crate) fn region_mut<'a>(&'a mut self, context: &'a mut ExecutionContext) -> &'a mut [u8] {
        match self.current_region {
            None => &mut context.value_region,
            Some(handle) => self.spill_stack.region_mut(handle),
        }
    }

    /// Runs to completion, returning the entry function's returned value.
    /// The spill stack is unconditionally torn down before returning,
    /// whether execution succeeded or failed.
    pub(crate) fn run(
        &mut self,
        context: &mut ExecutionContext,
        entry_instruction: u32,
    ) -> Result<ProgramOutcome, VmError> {
        self.inst_cursor = entry_instruction;
        let result = executors::dispatch_loop(self, context)
            .map(|()| self.last_outcome.take().expect("RET did not record a program outcome before halting"));
        self.spill_stack.destroy();
        result
    }

    fn function(&self, func: FuncId) -> Result<&crate::module::Function, VmError> {
        self.module
            .function(func)
            .ok_or(VmError::Argument(ArgumentError::FunctionIdOutOfRange {
                function: func,
                bound: self.module.num_functions(),
            }))
    }

    fn current_block_ref(&self) -> Result<&crate::module::BasicBlock, VmError> {
        let func = self.function(self.current_func)?;
        func.block(self.current_block)
            .ok_or(VmError::Bytecode(BytecodeError::InvalidBasicBlock {
                block: self.current_block,
                bound: func.blocks.len() as u32,
            }))
    }

    /// Number of cells in the currently active value region.
    fn current_region_bound(&self) -> Result<u32, VmError> {
        Ok(self.function(self.current_func)?.region_len())
    }
}
