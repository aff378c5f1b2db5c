//! Small assembly helpers for building [`Module`]/[`Function`]/[`BasicBlock`]
//! values by hand -- test and embedder scaffolding, not a bytecode file
//! parser (which remains out of scope for this crate).
//!
//! Non-consuming builder style: methods take and return `&mut Self` so a
//! caller can chain pushes before handing the accumulated value off with
//! [`FunctionBuilder::finish`] or [`ModuleBuilder::finish`].

use crate::module::{BasicBlock, Function, Instruction, Module};

/// Accumulates [`BasicBlock`]s and constants into a [`Function`].
#[derive(Debug, Default)]
pub struct FunctionBuilder {
    num_args: u32,
    num_values: u32,
    constants: Vec<u64>,
    blocks: Vec<BasicBlock>,
}

impl FunctionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the argument count. Arguments occupy value indices
    /// `[0, num_args)` and must also be counted in `num_values`.
    pub fn args(&mut self, num_args: u32) -> &mut Self {
        self.num_args = num_args;
        self
    }

    /// Sets the total local count (including arguments).
    pub fn values(&mut self, num_values: u32) -> &mut Self {
        self.num_values = num_values;
        self
    }

    /// Appends a constant; constants occupy the region immediately after
    /// the locals, in push order.
    pub fn constant(&mut self, value: u64) -> &mut Self {
        self.constants.push(value);
        self
    }

    /// Appends a basic block built from `instructions`. Block ids are
    /// assigned by push order, starting at 0.
    pub fn block(&mut self, instructions: Vec<Instruction>) -> &mut Self {
        self.blocks.push(BasicBlock { instructions });
        self
    }

    pub fn finish(&mut self) -> Function {
        Function {
            num_args: self.num_args,
            num_values: self.num_values,
            constants: std::mem::take(&mut self.constants),
            blocks: std::mem::take(&mut self.blocks),
        }
    }
}

/// Accumulates [`Function`]s into a [`Module`].
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    functions: Vec<Function>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a function; function ids are assigned by push order,
    /// starting at 0.
    pub fn function(&mut self, function: Function) -> &mut Self {
        self.functions.push(function);
        self
    }

    pub fn finish(&mut self) -> Module {
        Module { functions: std::mem::take(&mut self.functions) }
    }
}
