//! Runtime interpreter error implementation

use thiserror::Error;

/// Top-level error returned from [`crate::execute`].
///
/// Mirrors the three status families the dispatcher can terminate on:
/// a checked bytecode fault, a precondition violated by the host/verifier,
/// or spill-stack exhaustion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// A checked runtime fault raised while executing well-formed bytecode.
    #[error("bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),
    /// A precondition the verifier is assumed to guarantee did not hold.
    #[error("argument error: {0}")]
    Argument(#[from] ArgumentError),
    /// The spill stack could not satisfy an allocation.
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] StackError),
}

/// Faults that arise from otherwise well-formed bytecode hitting a checked
/// runtime condition -- division by zero, a malformed control-flow edge,
/// and the like.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BytecodeError {
    /// `UDIV`/`UREM`/`SDIV`/`SREM` with a zero divisor.
    #[error("division by zero")]
    DivideByZero,
    /// `SDIV`/`SREM` of `i64::MIN` by `-1`: the mathematical result does not
    /// fit in the operand width.
    #[error("signed division overflow")]
    SignedDivisionOverflow,
    /// A shift amount greater than or equal to the operand's bit width.
    #[error("shift amount {amount} out of range for {width}-bit operand")]
    ShiftAmountOutOfRange {
        /// The requested shift amount.
        amount: u64,
        /// Width of the shifted operand, in bits.
        width: u32,
    },
    /// The dispatcher reached an opcode it has no case for.
    #[error("unreachable opcode {opcode:#x} in dispatcher")]
    UnreachableOpcode {
        /// Raw packed opcode discriminant.
        opcode: u16,
    },
    /// A branch or jump referenced a basic block id past the function's
    /// block table.
    #[error("invalid basic block id {block} (function has {bound} blocks)")]
    InvalidBasicBlock {
        /// The out-of-range id.
        block: u32,
        /// Number of basic blocks in the function.
        bound: u32,
    },
    /// A basic block fell off its instruction list without a terminator.
    #[error("malformed control flow: basic block {block} has no terminator")]
    MalformedControlFlow {
        /// The offending basic block id.
        block: u32,
    },
    /// A spill-stack allocation request exceeded the chunk size.
    #[error("stack allocation of {requested} bytes exceeds chunk capacity {capacity}")]
    OversizeStackAllocation {
        /// Bytes requested.
        requested: usize,
        /// Per-chunk capacity.
        capacity: usize,
    },
    /// `RET` executed with no enclosing call frame to return to.
    #[error("return with empty call stack")]
    ReturnWithEmptyStack,
    /// The dispatcher consumed its instruction budget before halting.
    #[error("instruction budget of {budget} exhausted")]
    InstructionBudgetExhausted {
        /// The configured budget.
        budget: u64,
    },
}

/// Violations of preconditions the verifier is assumed to enforce. The
/// interpreter checks them unconditionally rather than compiling them out
/// in release builds.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentError {
    /// A value index fell outside its region's bound.
    #[error("value index {index} out of range (region has {bound} slots)")]
    ValueIndexOutOfRange {
        /// The out-of-range index.
        index: u32,
        /// Number of slots in the region.
        bound: u32,
    },
    /// `CALL_DIRECT` supplied a different number of arguments than the
    /// callee declares parameters.
    #[error("call arity mismatch: callee expects {expected} arguments, got {provided}")]
    CallArityMismatch {
        /// Parameter count declared by the callee.
        expected: u32,
        /// Argument count supplied at the call site.
        provided: u32,
    },
    /// `CALL_DIRECT` referenced a function id past the module's function
    /// table.
    #[error("function id {function} out of range ({bound} functions defined)")]
    FunctionIdOutOfRange {
        /// The out-of-range id.
        function: u32,
        /// Number of functions in the module.
        bound: u32,
    },
    /// The dispatcher encountered an opcode with no implementation.
    #[error("unimplemented opcode {opcode:#x}")]
    UnimplementedOpcode {
        /// Raw packed opcode discriminant.
        opcode: u16,
    },
}

/// Errors from the chunked spill-stack allocator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The requested block does not fit within a single chunk.
    #[error("allocation of {requested} bytes exceeds chunk capacity {capacity}")]
    AllocationTooLarge {
        /// Bytes requested.
        requested: usize,
        /// Per-chunk capacity.
        capacity: usize,
    },
    /// A free call did not target the most recent allocation.
    #[error("stack free out of order: expected top-of-stack block of size {expected}, got {actual}")]
    FreeOutOfOrder {
        /// Size recorded for the current top-of-stack block.
        expected: usize,
        /// Size the caller claims to be freeing.
        actual: usize,
    },
    /// A free call was made on an empty stack.
    #[error("stack free on empty stack")]
    FreeOnEmptyStack,
}
