//! Elementwise arithmetic, operators, and math functions.
//!
//! Array/array operators broadcast. Array/scalar operators fold the scalar
//! into the unary op instead of broadcasting a rank-0 array.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::array::NDArray;
use crate::dispatch::{map_unary, zip_binary};
use crate::provider::{provider, BinaryOp, UnaryOp};

impl NDArray {
    /// Apply a provider unary op to every element.
    pub fn map_op(&self, op: UnaryOp) -> NDArray {
        map_unary(provider(), op, self)
    }

    /// Apply a provider binary op elementwise, broadcasting `other`.
    pub fn zip_op(&self, op: BinaryOp, other: &NDArray) -> NDArray {
        zip_binary(provider(), op, self, other)
    }

    /// Apply an arbitrary closure to every element. The result is contiguous.
    pub fn map_elements<F>(&self, f: F) -> NDArray
    where
        F: Fn(f32) -> f32,
    {
        NDArray::new(self.shape(), self.elements().into_iter().map(f).collect())
    }

    /// `self ^ exponent` for every element.
    pub fn powf(&self, exponent: f32) -> NDArray {
        self.map_op(UnaryOp::PowScalar(exponent))
    }

    /// `self ^ exponent` elementwise, broadcasting.
    pub fn pow(&self, exponent: &NDArray) -> NDArray {
        self.zip_op(BinaryOp::Pow, exponent)
    }

    /// `base ^ exponent` for every element of `exponent`.
    pub fn scalar_pow(base: f32, exponent: &NDArray) -> NDArray {
        exponent.map_op(UnaryOp::ScalarPow(base))
    }

    /// Clamp every element into `[low, high]`.
    pub fn clip(&self, low: f32, high: f32) -> NDArray {
        assert!(low <= high, "clip bounds {} > {}", low, high);
        self.map_op(UnaryOp::Clip { low, high })
    }

    /// Raise every element below `low` to `low`.
    pub fn clip_low(&self, low: f32) -> NDArray {
        self.map_op(UnaryOp::Clip {
            low,
            high: f32::INFINITY,
        })
    }

    /// Lower every element above `high` to `high`.
    pub fn clip_high(&self, high: f32) -> NDArray {
        self.map_op(UnaryOp::Clip {
            low: f32::NEG_INFINITY,
            high,
        })
    }
}

macro_rules! impl_unary_methods {
    ($($name:ident => $op:ident),* $(,)?) => {
        impl NDArray {
            $(
                #[doc = concat!("Elementwise `", stringify!($name), "`.")]
                pub fn $name(&self) -> NDArray {
                    self.map_op(UnaryOp::$op)
                }
            )*
        }
    };
}

impl_unary_methods!(
    sqrt => Sqrt,
    exp => Exp,
    log => Log,
    sin => Sin,
    cos => Cos,
    tan => Tan,
    asin => Asin,
    acos => Acos,
    atan => Atan,
    sinh => Sinh,
    cosh => Cosh,
    tanh => Tanh,
    abs => Abs,
    floor => Floor,
    ceil => Ceil,
    round => Round,
    square => Square,
    recip => Recip,
);

/// Elementwise minimum with broadcasting.
pub fn minimum(a: &NDArray, b: &NDArray) -> NDArray {
    a.zip_op(BinaryOp::Min, b)
}

/// Elementwise maximum with broadcasting.
pub fn maximum(a: &NDArray, b: &NDArray) -> NDArray {
    a.zip_op(BinaryOp::Max, b)
}

/// Magnitude of `magnitude` with the sign of `sign`, with broadcasting.
pub fn copysign(magnitude: &NDArray, sign: &NDArray) -> NDArray {
    magnitude.zip_op(BinaryOp::CopySign, sign)
}

/// `magnitude` with the sign of each element of `sign`; shaped like `sign`.
pub fn copysign_scalar(magnitude: f32, sign: &NDArray) -> NDArray {
    sign.map_elements(|s| magnitude.copysign(s))
}

// ============================================================================
// Operators
// ============================================================================

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident,
     $op:ident, $rhs_scalar:ident, $lhs_scalar:ident) => {
        impl $trait<&NDArray> for &NDArray {
            type Output = NDArray;
            fn $method(self, rhs: &NDArray) -> NDArray {
                self.zip_op(BinaryOp::$op, rhs)
            }
        }

        impl $trait<NDArray> for NDArray {
            type Output = NDArray;
            fn $method(self, rhs: NDArray) -> NDArray {
                self.zip_op(BinaryOp::$op, &rhs)
            }
        }

        impl $trait<&NDArray> for NDArray {
            type Output = NDArray;
            fn $method(self, rhs: &NDArray) -> NDArray {
                self.zip_op(BinaryOp::$op, rhs)
            }
        }

        impl $trait<NDArray> for &NDArray {
            type Output = NDArray;
            fn $method(self, rhs: NDArray) -> NDArray {
                self.zip_op(BinaryOp::$op, &rhs)
            }
        }

        impl $trait<f32> for &NDArray {
            type Output = NDArray;
            fn $method(self, rhs: f32) -> NDArray {
                self.map_op(UnaryOp::$rhs_scalar(rhs))
            }
        }

        impl $trait<f32> for NDArray {
            type Output = NDArray;
            fn $method(self, rhs: f32) -> NDArray {
                self.map_op(UnaryOp::$rhs_scalar(rhs))
            }
        }

        impl $trait<&NDArray> for f32 {
            type Output = NDArray;
            fn $method(self, rhs: &NDArray) -> NDArray {
                rhs.map_op(UnaryOp::$lhs_scalar(self))
            }
        }

        impl $trait<NDArray> for f32 {
            type Output = NDArray;
            fn $method(self, rhs: NDArray) -> NDArray {
                rhs.map_op(UnaryOp::$lhs_scalar(self))
            }
        }

        impl $assign_trait<&NDArray> for NDArray {
            fn $assign_method(&mut self, rhs: &NDArray) {
                *self = self.zip_op(BinaryOp::$op, rhs);
            }
        }

        impl $assign_trait<NDArray> for NDArray {
            fn $assign_method(&mut self, rhs: NDArray) {
                *self = self.zip_op(BinaryOp::$op, &rhs);
            }
        }

        impl $assign_trait<f32> for NDArray {
            fn $assign_method(&mut self, rhs: f32) {
                *self = self.map_op(UnaryOp::$rhs_scalar(rhs));
            }
        }
    };
}

impl_binary_operator!(Add, add, AddAssign, add_assign, Add, AddScalar, AddScalar);
impl_binary_operator!(Sub, sub, SubAssign, sub_assign, Sub, SubScalar, ScalarSub);
impl_binary_operator!(Mul, mul, MulAssign, mul_assign, Mul, MulScalar, MulScalar);
impl_binary_operator!(Div, div, DivAssign, div_assign, Div, DivScalar, ScalarDiv);

impl Neg for &NDArray {
    type Output = NDArray;
    fn neg(self) -> NDArray {
        self.map_op(UnaryOp::Neg)
    }
}

impl Neg for NDArray {
    type Output = NDArray;
    fn neg(self) -> NDArray {
        self.map_op(UnaryOp::Neg)
    }
}
