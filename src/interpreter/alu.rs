//! Width-polymorphic arithmetic, bitwise, shift and compare semantics.
//!
//! These are pure functions over already width-qualified operands (the
//! dispatcher reads operands through [`crate::value::read`] before calling
//! in here, so `lhs`/`rhs` arrive zero-extended to `u64`). Every result is
//! returned un-masked; the dispatcher writes it back through
//! [`crate::value::write`], which masks to the destination width.

use crate::error::BytecodeError;
use crate::module::{BinOp, CmpOp};
use crate::value::{sign_extend, Width};

/// Evaluates a [`BinOp`] at `width`, given zero-extended operands.
pub fn eval_binary(op: BinOp, width: Width, lhs: u64, rhs: u64) -> Result<u64, BytecodeError> {
    let bits = width.bits();
    Ok(match op {
        BinOp::Add => lhs.wrapping_add(rhs),
        BinOp::Sub => lhs.wrapping_sub(rhs),
        BinOp::Mul => lhs.wrapping_mul(rhs),

        BinOp::UDiv => {
            if rhs == 0 {
                return Err(BytecodeError::DivideByZero);
            }
            lhs / rhs
        }
        BinOp::URem => {
            if rhs == 0 {
                return Err(BytecodeError::DivideByZero);
            }
            lhs % rhs
        }

        BinOp::SDiv => {
            let (a, b) = signed_operands(lhs, rhs, bits)?;
            (a.wrapping_div(b)) as u64
        }
        BinOp::SRem => {
            let (a, b) = signed_operands(lhs, rhs, bits)?;
            (a.wrapping_rem(b)) as u64
        }

        BinOp::Shl => {
            let amount = checked_shift_amount(rhs, bits)?;
            lhs.wrapping_shl(amount)
        }
        BinOp::LShr => {
            let amount = checked_shift_amount(rhs, bits)?;
            (lhs & width.mask()).wrapping_shr(amount)
        }
        BinOp::AShr => {
            let amount = checked_shift_amount(rhs, bits)?;
            (sign_extend(lhs, bits) >> amount) as u64
        }

        BinOp::And => lhs & rhs,
        BinOp::Or => lhs | rhs,
        BinOp::Xor => lhs ^ rhs,
    })
}

/// Evaluates a [`CmpOp`] at `width`, given zero-extended operands. Always
/// produces an i1 result (`true`/`false`, written by the caller as 0/1).
pub fn eval_compare(op: CmpOp, width: Width, lhs: u64, rhs: u64) -> bool {
    let bits = width.bits();
    match op {
        CmpOp::Eq => lhs == rhs,
        CmpOp::Ne => lhs != rhs,
        CmpOp::Ugt => lhs > rhs,
        CmpOp::Uge => lhs >= rhs,
        CmpOp::Ult => lhs < rhs,
        CmpOp::Ule => lhs <= rhs,
        CmpOp::Sgt => sign_extend(lhs, bits) > sign_extend(rhs, bits),
        CmpOp::Sge => sign_extend(lhs, bits) >= sign_extend(rhs, bits),
        CmpOp::Slt => sign_extend(lhs, bits) < sign_extend(rhs, bits),
        CmpOp::Sle => sign_extend(lhs, bits) <= sign_extend(rhs, bits),
    }
}

/// Sign-extends `lhs`/`rhs` to 64-bit signed values and rejects the
/// divide-by-zero and most-negative-by-minus-one cases, per §4.5: the
/// overflow pair is checked on the *widened* 64-bit values, so it can only
/// actually fire at i64 width.
fn signed_operands(lhs: u64, rhs: u64, bits: u32) -> Result<(i64, i64), BytecodeError> {
    let a = sign_extend(lhs, bits);
    let b = sign_extend(rhs, bits);
    if b == 0 {
        return Err(BytecodeError::DivideByZero);
    }
    if a == i64::MIN && b == -1 {
        return Err(BytecodeError::SignedDivisionOverflow);
    }
    Ok((a, b))
}

/// Validates a shift amount against the operand width, returning it as a
/// `u32` suitable for the standard shift operators. The bound is inclusive:
/// a shift amount equal to the operand width is legal (per §4.5), only an
/// amount greater than the width is rejected.
fn checked_shift_amount(rhs: u64, bits: u32) -> Result<u32, BytecodeError> {
    if rhs > bits as u64 {
        return Err(BytecodeError::ShiftAmountOutOfRange { amount: rhs, width: bits });
    }
    Ok(rhs as u32)
}
