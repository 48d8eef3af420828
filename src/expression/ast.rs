//! Typed expression tree and its numeric evaluation

use std::f64::consts::{E, PI};

use crate::error::EvaluationError;

/// Coordinate vocabulary a formula may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    X,
    Y,
    Z,
    R,
    /// Spherical radius, derived from x, y, z
    Rho,
    /// Elevation angle, derived
    Theta,
    /// Azimuth, derived
    Phi,
}

impl Variable {
    pub const ALL: [Variable; 7] = [
        Variable::X,
        Variable::Y,
        Variable::Z,
        Variable::R,
        Variable::Rho,
        Variable::Theta,
        Variable::Phi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variable::X => "x",
            Variable::Y => "y",
            Variable::Z => "z",
            Variable::R => "r",
            Variable::Rho => "rho",
            Variable::Theta => "theta",
            Variable::Phi => "phi",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

/// Evaluation context: the three Cartesian coordinates plus the caller's `r`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64, r: f64) -> Self {
        Self { x, y, z, r }
    }

    /// Derived variables are computed here, only for the nodes that ask
    fn value(&self, var: Variable) -> f64 {
        match var {
            Variable::X => self.x,
            Variable::Y => self.y,
            Variable::Z => self.z,
            Variable::R => self.r,
            Variable::Rho => (self.x * self.x + self.y * self.y + self.z * self.z).sqrt(),
            Variable::Theta => self.z.atan2((self.x * self.x + self.y * self.y).sqrt()),
            Variable::Phi => self.y.atan2(self.x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// One-argument functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Cot,
    Sec,
    Csc,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Csch,
    Coth,
    Asinh,
    Acosh,
    Atanh,
    Sqrt,
    Abs,
    Ln,
    Log10,
    Exp,
    Sgn,
    Floor,
    Ceil,
    Round,
    /// Heaviside step, 1 for x >= 0
    Step,
}

/// Two-argument functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function2 {
    /// atan2(y, x)
    Atan2,
    /// |a| carrying the sign of b
    Sign,
}

/// What a non-variable identifier resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Builtin {
    Unary(Function),
    Binary(Function2),
    /// `sign` accepts one argument (sgn) or two (sign transfer)
    Sign,
    Constant(f64),
}

pub(crate) fn builtin(name: &str) -> Option<Builtin> {
    use Function::*;

    if name.eq_ignore_ascii_case("pi") {
        return Some(Builtin::Constant(PI));
    }
    let unary = match name {
        "e" => return Some(Builtin::Constant(E)),
        "atan2" => return Some(Builtin::Binary(Function2::Atan2)),
        "sign" => return Some(Builtin::Sign),
        "sin" => Sin,
        "cos" => Cos,
        "tan" => Tan,
        "cot" => Cot,
        "sec" => Sec,
        "csc" => Csc,
        "asin" => Asin,
        "acos" => Acos,
        "atan" => Atan,
        "sinh" => Sinh,
        "cosh" => Cosh,
        "tanh" => Tanh,
        "sech" => Sech,
        "csch" => Csch,
        "coth" => Coth,
        "asinh" => Asinh,
        "acosh" => Acosh,
        "atanh" => Atanh,
        "sqrt" => Sqrt,
        "abs" => Abs,
        "log" | "ln" => Ln,
        "log10" => Log10,
        "exp" => Exp,
        "sgn" => Sgn,
        "floor" => Floor,
        "ceil" => Ceil,
        "round" => Round,
        "h" | "step" => Step,
        _ => return None,
    };
    Some(Builtin::Unary(unary))
}

fn domain(function: &'static str, reason: &'static str) -> EvaluationError {
    EvaluationError::Domain { function, reason }
}

impl Function {
    pub fn name(self) -> &'static str {
        use Function::*;
        match self {
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Cot => "cot",
            Sec => "sec",
            Csc => "csc",
            Asin => "asin",
            Acos => "acos",
            Atan => "atan",
            Sinh => "sinh",
            Cosh => "cosh",
            Tanh => "tanh",
            Sech => "sech",
            Csch => "csch",
            Coth => "coth",
            Asinh => "asinh",
            Acosh => "acosh",
            Atanh => "atanh",
            Sqrt => "sqrt",
            Abs => "abs",
            Ln => "ln",
            Log10 => "log10",
            Exp => "exp",
            Sgn => "sgn",
            Floor => "floor",
            Ceil => "ceil",
            Round => "round",
            Step => "h",
        }
    }

    fn apply(self, x: f64) -> Result<f64, EvaluationError> {
        use Function::*;
        let value = match self {
            Sin => x.sin(),
            Cos => x.cos(),
            Tan => {
                let c = x.cos();
                if c == 0.0 {
                    return Err(domain("tan", "infinite for x = pi/2 + n*pi"));
                }
                x.sin() / c
            }
            Cot => {
                let s = x.sin();
                if s == 0.0 {
                    return Err(domain("cot", "infinite for x = n*pi"));
                }
                x.cos() / s
            }
            Sec => {
                let c = x.cos();
                if c == 0.0 {
                    return Err(domain("sec", "infinite for x = pi/2 + n*pi"));
                }
                1.0 / c
            }
            Csc => {
                let s = x.sin();
                if s == 0.0 {
                    return Err(domain("csc", "infinite for x = n*pi"));
                }
                1.0 / s
            }
            Asin => {
                if x.abs() > 1.0 {
                    return Err(domain("asin", "undefined for |x| > 1"));
                }
                x.asin()
            }
            Acos => {
                if x.abs() > 1.0 {
                    return Err(domain("acos", "undefined for |x| > 1"));
                }
                x.acos()
            }
            Atan => x.atan(),
            Sinh => x.sinh(),
            Cosh => x.cosh(),
            Tanh => x.tanh(),
            Sech => 1.0 / x.cosh(),
            Csch => {
                if x == 0.0 {
                    return Err(domain("csch", "infinite for x = 0"));
                }
                1.0 / x.sinh()
            }
            Coth => {
                if x == 0.0 {
                    return Err(domain("coth", "infinite for x = 0"));
                }
                1.0 / x.tanh()
            }
            Asinh => x.asinh(),
            Acosh => {
                if x < 1.0 {
                    return Err(domain("acosh", "complex value for x < 1"));
                }
                x.acosh()
            }
            Atanh => {
                if x.abs() >= 1.0 {
                    return Err(domain("atanh", "undefined for |x| >= 1"));
                }
                x.atanh()
            }
            Sqrt => {
                if x < 0.0 {
                    return Err(domain("sqrt", "undefined for x < 0"));
                }
                x.sqrt()
            }
            Abs => x.abs(),
            Ln => {
                if x <= 0.0 {
                    return Err(domain("ln", "undefined for x <= 0"));
                }
                x.ln()
            }
            Log10 => {
                if x <= 0.0 {
                    return Err(domain("log10", "undefined for x <= 0"));
                }
                x.log10()
            }
            Exp => x.exp(),
            Sgn => sgn(x),
            Floor => x.floor(),
            Ceil => x.ceil(),
            Round => x.round(),
            Step => {
                if x >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        };
        Ok(value)
    }
}

impl Function2 {
    pub fn name(self) -> &'static str {
        match self {
            Function2::Atan2 => "atan2",
            Function2::Sign => "sign",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Function2::Atan2 => a.atan2(b),
            Function2::Sign => {
                if b < 0.0 {
                    -a.abs()
                } else {
                    a.abs()
                }
            }
        }
    }
}

fn sgn(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl BinaryOp {
    fn apply(self, a: f64, b: f64) -> Result<f64, EvaluationError> {
        match self {
            BinaryOp::Add => Ok(a + b),
            BinaryOp::Sub => Ok(a - b),
            BinaryOp::Mul => Ok(a * b),
            BinaryOp::Div => {
                if b == 0.0 {
                    Err(EvaluationError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            }
            BinaryOp::Pow => pow(a, b),
        }
    }
}

fn pow(base: f64, exponent: f64) -> Result<f64, EvaluationError> {
    let integral = exponent.fract() == 0.0;
    if base < 0.0 && !integral {
        return Err(domain(
            "pow",
            "undefined for negative base with non-integer exponent",
        ));
    }
    if base == 0.0 && exponent < 0.0 {
        return Err(EvaluationError::DivisionByZero);
    }
    if integral && exponent.abs() <= i32::MAX as f64 {
        Ok(base.powi(exponent as i32))
    } else {
        Ok(base.powf(exponent))
    }
}

/// Compiled formula tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Var(Variable),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call(Function, Box<Expr>),
    Call2(Function2, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn eval(&self, point: &Point) -> Result<f64, EvaluationError> {
        match self {
            Expr::Number(v) => Ok(*v),
            Expr::Var(var) => Ok(point.value(*var)),
            Expr::Neg(inner) => Ok(-inner.eval(point)?),
            Expr::Binary { op, lhs, rhs } => op.apply(lhs.eval(point)?, rhs.eval(point)?),
            Expr::Call(f, arg) => f.apply(arg.eval(point)?),
            Expr::Call2(f, a, b) => Ok(f.apply(a.eval(point)?, b.eval(point)?)),
        }
    }

    /// Whether `var` appears anywhere in the tree
    pub fn references(&self, var: Variable) -> bool {
        match self {
            Expr::Number(_) => false,
            Expr::Var(v) => *v == var,
            Expr::Neg(inner) | Expr::Call(_, inner) => inner.references(var),
            Expr::Binary { lhs, rhs, .. } | Expr::Call2(_, lhs, rhs) => {
                lhs.references(var) || rhs.references(var)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_variables() {
        let p = Point::new(3.0, 4.0, 0.0, 0.0);
        assert_eq!(p.value(Variable::Rho), 5.0);
        assert_eq!(p.value(Variable::Theta), 0.0);
        assert!((p.value(Variable::Phi) - (4.0f64).atan2(3.0)).abs() < 1e-15);
    }

    #[test]
    fn test_domain_errors() {
        assert!(matches!(
            Function::Ln.apply(-1.0),
            Err(EvaluationError::Domain { function: "ln", .. })
        ));
        assert!(Function::Acosh.apply(0.5).is_err());
        assert_eq!(pow(0.0, -1.0), Err(EvaluationError::DivisionByZero));
        assert!(pow(-8.0, 1.0 / 3.0).is_err());
        assert_eq!(pow(-2.0, 3.0), Ok(-8.0));
    }

    #[test]
    fn test_sign_functions() {
        assert_eq!(Function::Sgn.apply(0.0), Ok(0.0));
        assert_eq!(Function::Sgn.apply(-3.0), Ok(-1.0));
        assert_eq!(Function2::Sign.apply(-3.0, 2.0), 3.0);
        assert_eq!(Function2::Sign.apply(3.0, -2.0), -3.0);
        assert_eq!(Function::Step.apply(0.0), Ok(1.0));
        assert_eq!(Function::Step.apply(-1e-9), Ok(0.0));
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin("PI"), Some(Builtin::Constant(PI)));
        assert_eq!(builtin("Pi"), Some(Builtin::Constant(PI)));
        assert_eq!(builtin("log"), Some(Builtin::Unary(Function::Ln)));
        assert_eq!(builtin("SIN"), None);
        assert_eq!(builtin("foo"), None);
    }
}
