//! Execution context: the entry-level value region plus the host-services
//! seam.

use std::any::Any;

use crate::error::ArgumentError;
use crate::module::Function;

/// The trait seam through which an embedder would expose scanned-artifact
/// access and match reporting to bytecode programs, via an indirect-call
/// mechanism this crate does not implement. Supplied only so
/// [`ExecutionContext`] has somewhere to put it; the interpreter itself
/// never calls through this trait.
pub trait HostServices: Any {
    /// Downcasting hook for embedders that need to recover their concrete
    /// host-services type from a `&dyn HostServices`.
    fn as_any(&self) -> &dyn Any;
}

/// A `HostServices` implementation with no capabilities, used by tests and
/// standalone embedders that never perform indirect calls.
#[derive(Debug, Default)]
pub struct NullHostServices;

impl HostServices for NullHostServices {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Everything [`crate::execute`] needs besides the module and entry point:
/// the entry function's value region, host services, and optional dispatch
/// limits.
pub struct ExecutionContext {
    /// Locals zero-initialized, constants copied from the entry function;
    /// sized to `entry_function.region_len()` cells.
    pub(crate) value_region: Vec<u8>,
    host_services: Box<dyn HostServices>,
    /// When set, the dispatch loop halts with
    /// [`crate::error::BytecodeError::InstructionBudgetExhausted`] once this
    /// many instructions have executed.
    pub instruction_budget: Option<u64>,
}

impl ExecutionContext {
    /// Builds a context whose value region is sized and pre-populated for
    /// `entry_function`: locals zeroed, constants copied in, per §3/§4.3.
    pub fn new(entry_function: &Function, host_services: Box<dyn HostServices>) -> Self {
        let mut value_region = vec![0u8; entry_function.region_len() as usize * crate::consts::CELL_SIZE];
        let const_base = entry_function.num_values as usize;
        for (i, constant) in entry_function.constants.iter().enumerate() {
            let off = (const_base + i) * crate::consts::CELL_SIZE;
            value_region[off..off + crate::consts::CELL_SIZE].copy_from_slice(&constant.to_le_bytes());
        }

        ExecutionContext {
            value_region,
            host_services,
            instruction_budget: None,
        }
    }

    /// Builds a context with [`NullHostServices`].
    pub fn with_null_host(entry_function: &Function) -> Self {
        Self::new(entry_function, Box::new(NullHostServices))
    }

    /// Sets the optional instruction budget, builder-style.
    pub fn with_instruction_budget(mut self, budget: u64) -> Self {
        self.instruction_budget = Some(budget);
        self
    }

    pub fn host_services(&self) -> &dyn HostServices {
        self.host_services.as_ref()
    }

    /// Writes an entry-function actual argument into its value region
    /// before the first call to [`crate::execute`]. The embedder is
    /// responsible for populating the entry function's formal arguments
    /// this way; the interpreter itself never does (only `CALL_DIRECT`
    /// marshals arguments, and only for callees, not the entry function).
    pub fn set_arg(&mut self, index: u32, value: u64) -> Result<(), ArgumentError> {
        let bound = (self.value_region.len() / crate::consts::CELL_SIZE) as u32;
        crate::value::write_u64(&mut self.value_region, index, bound, value)
    }
}
