//! Concrete payoff node types.

use crate::payoff::{PathContext, Payoff, PayoffRef, union_times};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Numeric truthiness used by conditional and logical nodes.
#[inline]
fn is_true(value: f64) -> bool {
    value > 0.0
}

#[inline]
fn from_bool(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// Deterministic amount, independent of the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAmount {
    pub amount: f64,
}

impl FixedAmount {
    pub fn new(amount: f64) -> Self {
        Self { amount }
    }
}

impl Payoff for FixedAmount {
    fn observation_time(&self) -> f64 {
        0.0
    }

    fn at(&self, _ctx: &PathContext<'_>) -> f64 {
        self.amount
    }

    fn observation_times(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// Underlying asset level observed at a fixed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Asset {
    pub time: f64,
}

impl Asset {
    pub fn new(time: f64) -> Self {
        Self { time }
    }
}

impl Payoff for Asset {
    fn observation_time(&self) -> f64 {
        self.time
    }

    fn at(&self, ctx: &PathContext<'_>) -> f64 {
        ctx.path().asset(self.time)
    }

    fn observation_times(&self) -> Vec<f64> {
        vec![self.time]
    }
}

/// Linear combination `a * x + y`; `y` is optional.
#[derive(Debug, Clone)]
pub struct Axpy {
    a: f64,
    x: PayoffRef,
    y: Option<PayoffRef>,
}

impl Axpy {
    pub fn new(a: f64, x: PayoffRef, y: Option<PayoffRef>) -> Self {
        Self { a, x, y }
    }
}

impl Payoff for Axpy {
    fn observation_time(&self) -> f64 {
        match &self.y {
            Some(y) => self.x.observation_time().max(y.observation_time()),
            None => self.x.observation_time(),
        }
    }

    fn at(&self, ctx: &PathContext<'_>) -> f64 {
        let ax = self.a * self.x.at(ctx);
        match &self.y {
            Some(y) => ax + y.at(ctx),
            None => ax,
        }
    }

    fn observation_times(&self) -> Vec<f64> {
        match &self.y {
            Some(y) => union_times(&self.x.observation_times(), &y.observation_times()),
            None => self.x.observation_times(),
        }
    }
}

// Binary nodes share the same shape: two children, latest observation time,
// union of time sets. Only the combining function differs.
macro_rules! binary_node {
    ($(#[$doc:meta])* $name:ident, |$x:ident, $y:ident| $body:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            x: PayoffRef,
            y: PayoffRef,
        }

        impl $name {
            pub fn new(x: PayoffRef, y: PayoffRef) -> Self {
                Self { x, y }
            }
        }

        impl Payoff for $name {
            fn observation_time(&self) -> f64 {
                self.x.observation_time().max(self.y.observation_time())
            }

            fn at(&self, ctx: &PathContext<'_>) -> f64 {
                let $x = self.x.at(ctx);
                let $y = self.y.at(ctx);
                $body
            }

            fn observation_times(&self) -> Vec<f64> {
                union_times(&self.x.observation_times(), &self.y.observation_times())
            }
        }
    };
}

binary_node!(
    /// Product `x * y`.
    Mult,
    |x, y| x * y
);

binary_node!(
    /// Quotient `x / y`; division by zero follows IEEE 754.
    Division,
    |x, y| x / y
);

binary_node!(
    /// Pathwise minimum.
    Min,
    |x, y| x.min(y)
);

binary_node!(
    /// Pathwise maximum.
    Max,
    |x, y| x.max(y)
);

/// Selects `x` when the condition is positive, `y` otherwise.
///
/// Only the selected branch is evaluated.
#[derive(Debug, Clone)]
pub struct IfThenElse {
    condition: PayoffRef,
    x: PayoffRef,
    y: PayoffRef,
}

impl IfThenElse {
    pub fn new(condition: PayoffRef, x: PayoffRef, y: PayoffRef) -> Self {
        Self { condition, x, y }
    }
}

impl Payoff for IfThenElse {
    fn observation_time(&self) -> f64 {
        self.condition
            .observation_time()
            .max(self.x.observation_time())
            .max(self.y.observation_time())
    }

    fn at(&self, ctx: &PathContext<'_>) -> f64 {
        if is_true(self.condition.at(ctx)) {
            self.x.at(ctx)
        } else {
            self.y.at(ctx)
        }
    }

    fn observation_times(&self) -> Vec<f64> {
        let xy = union_times(&self.x.observation_times(), &self.y.observation_times());
        union_times(&self.condition.observation_times(), &xy)
    }
}

/// Comparison and boolean operators understood by [`Logical`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    pub fn apply(self, x: f64, y: f64) -> bool {
        match self {
            Self::Eq => x == y,
            Self::Ne => x != y,
            Self::Lt => x < y,
            Self::Le => x <= y,
            Self::Gt => x > y,
            Self::Ge => x >= y,
            Self::And => is_true(x) && is_true(y),
            Self::Or => is_true(x) || is_true(y),
        }
    }
}

impl FromStr for LogicalOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "&&" => Ok(Self::And),
            "||" => Ok(Self::Or),
            other => Err(format!("unknown logical operator '{other}'")),
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Comparison or boolean combination yielding `1.0` or `0.0`.
#[derive(Debug, Clone)]
pub struct Logical {
    x: PayoffRef,
    y: PayoffRef,
    op: LogicalOp,
}

impl Logical {
    pub fn new(x: PayoffRef, y: PayoffRef, op: LogicalOp) -> Self {
        Self { x, y, op }
    }

    pub fn op(&self) -> LogicalOp {
        self.op
    }
}

impl Payoff for Logical {
    fn observation_time(&self) -> f64 {
        self.x.observation_time().max(self.y.observation_time())
    }

    fn at(&self, ctx: &PathContext<'_>) -> f64 {
        from_bool(self.op.apply(self.x.at(ctx), self.y.at(ctx)))
    }

    fn observation_times(&self) -> Vec<f64> {
        union_times(&self.x.observation_times(), &self.y.observation_times())
    }
}

/// Moves the settlement of `x` to `pay_time`.
///
/// The undiscounted value is unchanged; discounting happens at `pay_time`.
#[derive(Debug, Clone)]
pub struct Pay {
    x: PayoffRef,
    pay_time: f64,
}

impl Pay {
    pub fn new(x: PayoffRef, pay_time: f64) -> Self {
        Self { x, pay_time }
    }
}

impl Payoff for Pay {
    fn observation_time(&self) -> f64 {
        self.pay_time
    }

    fn at(&self, ctx: &PathContext<'_>) -> f64 {
        self.x.at(ctx)
    }

    fn observation_times(&self) -> Vec<f64> {
        union_times(&self.x.observation_times(), &[self.pay_time])
    }
}

static NEXT_CACHE_ID: AtomicUsize = AtomicUsize::new(0);

/// Memoises `x` within one path evaluation.
///
/// The memo is stored in the [`PathContext`], so a shared `Cache` node is safe
/// to evaluate on many paths concurrently.
#[derive(Debug, Clone)]
pub struct Cache {
    id: usize,
    x: PayoffRef,
}

impl Cache {
    pub fn new(x: PayoffRef) -> Self {
        Self {
            id: NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed),
            x,
        }
    }
}

impl Payoff for Cache {
    fn observation_time(&self) -> f64 {
        self.x.observation_time()
    }

    fn at(&self, ctx: &PathContext<'_>) -> f64 {
        if let Some(v) = ctx.cached(self.id) {
            return v;
        }
        let v = self.x.at(ctx);
        ctx.store(self.id, v);
        v
    }

    fn observation_times(&self) -> Vec<f64> {
        self.x.observation_times()
    }
}

/// Value of `x` as seen at `time`: `x * N(time) / N(t_x)`.
#[derive(Debug, Clone)]
pub struct PayoffAt {
    x: PayoffRef,
    time: f64,
}

impl PayoffAt {
    pub fn new(x: PayoffRef, time: f64) -> Self {
        Self { x, time }
    }
}

impl Payoff for PayoffAt {
    fn observation_time(&self) -> f64 {
        self.time
    }

    fn at(&self, ctx: &PathContext<'_>) -> f64 {
        let path = ctx.path();
        self.x.at(ctx) * path.numeraire(self.time) / path.numeraire(self.x.observation_time())
    }

    fn observation_times(&self) -> Vec<f64> {
        union_times(&self.x.observation_times(), &[self.time])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mc::{ConstantPath, GridPath};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn fixed(v: f64) -> PayoffRef {
        Arc::new(FixedAmount::new(v))
    }

    #[derive(Debug)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Payoff for Counting {
        fn observation_time(&self) -> f64 {
            0.0
        }
        fn at(&self, _ctx: &PathContext<'_>) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst) as f64 + 1.0
        }
        fn observation_times(&self) -> Vec<f64> {
            Vec::new()
        }
    }

    #[test]
    fn arithmetic_nodes() {
        let path = ConstantPath::new(100.0, 0.0);
        let ctx = PathContext::new(&path);
        assert_eq!(Axpy::new(-1.0, fixed(3.0), Some(fixed(5.0))).at(&ctx), 2.0);
        assert_eq!(Axpy::new(-1.0, fixed(3.0), None).at(&ctx), -3.0);
        assert_eq!(Mult::new(fixed(2.0), fixed(4.0)).at(&ctx), 8.0);
        assert_eq!(Division::new(fixed(1.0), fixed(4.0)).at(&ctx), 0.25);
        assert!(Division::new(fixed(1.0), fixed(0.0)).at(&ctx).is_infinite());
        assert_eq!(Min::new(fixed(2.0), fixed(4.0)).at(&ctx), 2.0);
        assert_eq!(Max::new(fixed(2.0), fixed(4.0)).at(&ctx), 4.0);
    }

    #[test]
    fn logical_ops_yield_indicator() {
        let path = ConstantPath::new(100.0, 0.0);
        let ctx = PathContext::new(&path);
        let cases = [
            ("==", 1.0, 1.0, 1.0),
            ("!=", 1.0, 1.0, 0.0),
            ("<", 1.0, 2.0, 1.0),
            ("<=", 2.0, 2.0, 1.0),
            (">", 1.0, 2.0, 0.0),
            (">=", 3.0, 2.0, 1.0),
            ("&&", 1.0, 0.0, 0.0),
            ("||", 1.0, 0.0, 1.0),
        ];
        for (sym, x, y, expected) in cases {
            let op: LogicalOp = sym.parse().unwrap();
            assert_eq!(op.symbol(), sym);
            assert_eq!(Logical::new(fixed(x), fixed(y), op).at(&ctx), expected, "{sym}");
        }
        assert!("<>".parse::<LogicalOp>().is_err());
    }

    #[test]
    fn if_then_else_uses_positive_truthiness() {
        let path = ConstantPath::new(100.0, 0.0);
        let ctx = PathContext::new(&path);
        assert_eq!(IfThenElse::new(fixed(1.0), fixed(10.0), fixed(20.0)).at(&ctx), 10.0);
        assert_eq!(IfThenElse::new(fixed(0.0), fixed(10.0), fixed(20.0)).at(&ctx), 20.0);
        assert_eq!(IfThenElse::new(fixed(-1.0), fixed(10.0), fixed(20.0)).at(&ctx), 20.0);
    }

    #[test]
    fn pay_discounts_at_payment_time() {
        let path = ConstantPath::new(100.0, 0.05);
        let ctx = PathContext::new(&path);
        let paid = Pay::new(fixed(100.0), 2.0);
        assert_eq!(paid.at(&ctx), 100.0);
        assert_eq!(paid.observation_times(), vec![2.0]);
        assert_relative_eq!(paid.discounted_at(&ctx), 100.0 * (-0.1f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn payoff_at_rescales_by_numeraire() {
        let path = ConstantPath::new(100.0, 0.05);
        let ctx = PathContext::new(&path);
        let paid: PayoffRef = Arc::new(Pay::new(fixed(100.0), 2.0));
        let seen = PayoffAt::new(paid, 1.0);
        assert_relative_eq!(seen.at(&ctx), 100.0 * (-0.05f64).exp(), epsilon = 1e-12);
        assert_eq!(seen.observation_times(), vec![1.0, 2.0]);
    }

    #[test]
    fn asset_reads_path_grid() {
        let path = GridPath::new(vec![0.0, 1.0, 2.0], vec![100.0, 110.0, 120.0], 0.0).unwrap();
        let ctx = PathContext::new(&path);
        assert_eq!(Asset::new(1.0).at(&ctx), 110.0);
        assert_eq!(Asset::new(1.5).at(&ctx), 110.0);
        assert_eq!(Asset::new(2.0).observation_times(), vec![2.0]);
    }

    #[test]
    fn cache_evaluates_once_per_path() {
        let counting = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let cached: PayoffRef = Arc::new(Cache::new(counting.clone()));
        let sum = Axpy::new(1.0, cached.clone(), Some(cached));

        let path = ConstantPath::new(100.0, 0.0);
        let ctx = PathContext::new(&path);
        assert_eq!(sum.at(&ctx), 2.0);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

        // A fresh context is a fresh path.
        let ctx = PathContext::new(&path);
        assert_eq!(sum.at(&ctx), 4.0);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn composite_times_are_unions() {
        let a: PayoffRef = Arc::new(Asset::new(1.0));
        let b: PayoffRef = Arc::new(Asset::new(0.5));
        let m = Mult::new(a.clone(), b.clone());
        assert_eq!(m.observation_times(), vec![0.5, 1.0]);
        assert_eq!(m.observation_time(), 1.0);
        let ite = IfThenElse::new(fixed(1.0), a, Arc::new(Asset::new(3.0)));
        assert_eq!(ite.observation_times(), vec![1.0, 3.0]);
    }
}
