//! The allow-listed function table available to expressions.
//!
//! Nothing outside this table can be called. Each entry declares its arity,
//! which is checked before the implementation runs.

use rand::{Rng, rngs::StdRng};
use rand_distr::Normal;

use crate::expr::{Value, broadcast, floor_mod};

/// Upper bound on the length of any array a function may allocate.
pub const MAX_GENERATED_LEN: usize = 10_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionError {
    Unknown,
    Invalid(String),
}

type FnResult = Result<Value, String>;
type FnImpl = fn(&[Value], &mut StdRng) -> FnResult;

#[derive(Debug, Clone, Copy)]
enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
            Arity::AtLeast(n) => count >= n,
        }
    }

    fn describe(self) -> String {
        match self {
            Arity::Exact(n) => format!("{n}"),
            Arity::Between(lo, hi) => format!("{lo} to {hi}"),
            Arity::AtLeast(n) => format!("at least {n}"),
        }
    }
}

struct Function {
    name: &'static str,
    arity: Arity,
    apply: FnImpl,
}

const fn entry(name: &'static str, arity: Arity, apply: FnImpl) -> Function {
    Function { name, arity, apply }
}

static FUNCTIONS: &[Function] = &[
    // elementwise
    entry("sqrt", Arity::Exact(1), sqrt),
    entry("sin", Arity::Exact(1), sin),
    entry("cos", Arity::Exact(1), cos),
    entry("tan", Arity::Exact(1), tan),
    entry("asin", Arity::Exact(1), asin),
    entry("acos", Arity::Exact(1), acos),
    entry("atan", Arity::Exact(1), atan),
    entry("sinh", Arity::Exact(1), sinh),
    entry("cosh", Arity::Exact(1), cosh),
    entry("tanh", Arity::Exact(1), tanh),
    entry("sinc", Arity::Exact(1), sinc),
    entry("log", Arity::Exact(1), log),
    entry("log10", Arity::Exact(1), log10),
    entry("exp", Arity::Exact(1), exp),
    entry("floor", Arity::Exact(1), floor),
    entry("ceil", Arity::Exact(1), ceil),
    entry("abs", Arity::Exact(1), abs),
    entry("radians", Arity::Exact(1), radians),
    entry("degrees", Arity::Exact(1), degrees),
    entry("int", Arity::Exact(1), int),
    entry("float", Arity::Exact(1), float),
    entry("round", Arity::Between(1, 2), round),
    entry("atan2", Arity::Exact(2), atan2),
    entry("hypot", Arity::Exact(2), hypot),
    entry("mod", Arity::Exact(2), modulo),
    entry("clip", Arity::Exact(3), clip),
    // reductions
    entry("min", Arity::AtLeast(1), min),
    entry("max", Arity::AtLeast(1), max),
    entry("sum", Arity::Exact(1), sum),
    entry("prod", Arity::Exact(1), prod),
    entry("mean", Arity::Exact(1), mean),
    entry("average", Arity::Between(1, 2), average),
    entry("median", Arity::Exact(1), median),
    entry("std", Arity::Exact(1), std_dev),
    entry("len", Arity::Exact(1), len),
    entry("dot", Arity::Exact(2), dot),
    entry("all", Arity::Exact(1), all),
    entry("any", Arity::Exact(1), any),
    // array producers
    entry("arange", Arity::Between(1, 3), arange),
    entry("linspace", Arity::Between(2, 3), linspace),
    entry("ones", Arity::Exact(1), ones),
    entry("zeros", Arity::Exact(1), zeros),
    entry("array", Arity::AtLeast(1), array),
    entry("cumsum", Arity::Exact(1), cumsum),
    entry("cumprod", Arity::Exact(1), cumprod),
    entry("diff", Arity::Exact(1), diff),
    entry("sort", Arity::Exact(1), sort),
    entry("interp", Arity::Exact(3), interp),
    // random
    entry("random", Arity::Between(0, 1), random),
    entry("uniform", Arity::Between(2, 3), uniform),
    entry("normal", Arity::Between(2, 3), normal),
];

pub fn is_function(name: &str) -> bool {
    FUNCTIONS.iter().any(|f| f.name == name)
}

/// Names of every callable function, in table order.
pub fn function_names() -> impl Iterator<Item = &'static str> {
    FUNCTIONS.iter().map(|f| f.name)
}

pub fn call(name: &str, args: &[Value], rng: &mut StdRng) -> Result<Value, FunctionError> {
    let function = FUNCTIONS
        .iter()
        .find(|f| f.name == name)
        .ok_or(FunctionError::Unknown)?;
    if !function.arity.accepts(args.len()) {
        return Err(FunctionError::Invalid(format!(
            "expected {} argument(s), got {}",
            function.arity.describe(),
            args.len()
        )));
    }
    (function.apply)(args, rng).map_err(FunctionError::Invalid)
}

fn map_checked(value: &Value, f: impl Fn(f64) -> f64) -> FnResult {
    let result = value.map(&f);
    let input = value.as_slice();
    let output = result.as_slice();
    if let Some((x, _)) = input
        .iter()
        .zip(output.iter())
        .find(|(x, y)| y.is_nan() && !x.is_nan())
    {
        return Err(format!("math domain error for input {x}"));
    }
    Ok(result)
}

fn sqrt(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::sqrt)
}

fn sin(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::sin)
}

fn cos(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::cos)
}

fn tan(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::tan)
}

fn asin(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::asin)
}

fn acos(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::acos)
}

fn atan(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::atan)
}

fn sinh(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::sinh)
}

fn cosh(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::cosh)
}

fn tanh(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::tanh)
}

// Normalized sinc, sin(pi x) / (pi x).
fn sinc(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], |x| {
        if x == 0.0 {
            1.0
        } else {
            let px = std::f64::consts::PI * x;
            px.sin() / px
        }
    })
}

fn log(args: &[Value], _: &mut StdRng) -> FnResult {
    positive_only(&args[0], "log")?;
    map_checked(&args[0], f64::ln)
}

fn log10(args: &[Value], _: &mut StdRng) -> FnResult {
    positive_only(&args[0], "log10")?;
    map_checked(&args[0], f64::log10)
}

fn positive_only(value: &Value, name: &str) -> Result<(), String> {
    match value.as_slice().iter().find(|x| **x <= 0.0) {
        Some(x) => Err(format!("math domain error: {name}({x})")),
        None => Ok(()),
    }
}

fn exp(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::exp)
}

fn floor(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::floor)
}

fn ceil(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::ceil)
}

fn abs(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::abs)
}

fn radians(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::to_radians)
}

fn degrees(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::to_degrees)
}

fn int(args: &[Value], _: &mut StdRng) -> FnResult {
    map_checked(&args[0], f64::trunc)
}

fn float(args: &[Value], _: &mut StdRng) -> FnResult {
    Ok(args[0].clone())
}

// Ties round to even.
fn round(args: &[Value], _: &mut StdRng) -> FnResult {
    let decimals = match args.get(1) {
        Some(value) => scalar_arg(value, "decimals")?,
        None => 0.0,
    };
    if decimals.fract() != 0.0 {
        return Err("decimals must be an integer".to_string());
    }
    let scale = 10f64.powi(decimals as i32);
    map_checked(&args[0], |x| (x * scale).round_ties_even() / scale)
}

fn atan2(args: &[Value], _: &mut StdRng) -> FnResult {
    broadcast(&args[0], &args[1], f64::atan2)
}

fn hypot(args: &[Value], _: &mut StdRng) -> FnResult {
    broadcast(&args[0], &args[1], f64::hypot)
}

fn modulo(args: &[Value], _: &mut StdRng) -> FnResult {
    if args[1].as_slice().iter().any(|b| *b == 0.0) {
        return Err("modulo by zero".to_string());
    }
    broadcast(&args[0], &args[1], floor_mod)
}

fn clip(args: &[Value], _: &mut StdRng) -> FnResult {
    let floored = broadcast(&args[0], &args[1], f64::max)?;
    broadcast(&floored, &args[2], f64::min)
}

fn non_empty<'v>(value: &'v Value, what: &str) -> Result<std::borrow::Cow<'v, [f64]>, String> {
    let values = value.as_slice();
    if values.is_empty() {
        return Err(format!("{what} of an empty array"));
    }
    Ok(values)
}

fn scalar_arg(value: &Value, name: &str) -> Result<f64, String> {
    match value {
        Value::Scalar(v) => Ok(*v),
        Value::Array(_) => Err(format!("'{name}' must be a scalar")),
    }
}

fn count_arg(value: &Value, name: &str) -> Result<usize, String> {
    let raw = scalar_arg(value, name)?;
    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 {
        return Err(format!("'{name}' must be a non-negative integer, got {raw}"));
    }
    if raw > MAX_GENERATED_LEN as f64 {
        return Err(format!(
            "'{name}' of {raw} exceeds the limit of {MAX_GENERATED_LEN} values"
        ));
    }
    Ok(raw as usize)
}

fn nan_aware(acc: f64, x: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if acc.is_nan() || x.is_nan() {
        f64::NAN
    } else {
        pick(acc, x)
    }
}

fn min(args: &[Value], _: &mut StdRng) -> FnResult {
    let values = args.iter().flat_map(|a| a.as_slice().into_owned()).collect::<Vec<_>>();
    if values.is_empty() {
        return Err("min of an empty array".to_string());
    }
    Ok(Value::Scalar(
        values
            .iter()
            .fold(f64::INFINITY, |acc, x| nan_aware(acc, *x, f64::min)),
    ))
}

fn max(args: &[Value], _: &mut StdRng) -> FnResult {
    let values = args.iter().flat_map(|a| a.as_slice().into_owned()).collect::<Vec<_>>();
    if values.is_empty() {
        return Err("max of an empty array".to_string());
    }
    Ok(Value::Scalar(
        values
            .iter()
            .fold(f64::NEG_INFINITY, |acc, x| nan_aware(acc, *x, f64::max)),
    ))
}

fn sum(args: &[Value], _: &mut StdRng) -> FnResult {
    Ok(Value::Scalar(args[0].as_slice().iter().sum()))
}

fn prod(args: &[Value], _: &mut StdRng) -> FnResult {
    Ok(Value::Scalar(args[0].as_slice().iter().product()))
}

fn mean(args: &[Value], _: &mut StdRng) -> FnResult {
    let values = non_empty(&args[0], "mean")?;
    Ok(Value::Scalar(
        values.iter().sum::<f64>() / values.len() as f64,
    ))
}

fn average(args: &[Value], rng: &mut StdRng) -> FnResult {
    let Some(weights) = args.get(1) else {
        return mean(args, rng);
    };
    let values = non_empty(&args[0], "average")?;
    let weights = weights.as_slice();
    if weights.len() != values.len() {
        return Err(format!(
            "weights have length {} but values have length {}",
            weights.len(),
            values.len()
        ));
    }
    let total = weights.iter().sum::<f64>();
    if total == 0.0 {
        return Err("weights sum to zero".to_string());
    }
    let weighted = values
        .iter()
        .zip(weights.iter())
        .map(|(v, w)| v * w)
        .sum::<f64>();
    Ok(Value::Scalar(weighted / total))
}

fn median(args: &[Value], _: &mut StdRng) -> FnResult {
    let mut values = non_empty(&args[0], "median")?.into_owned();
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    Ok(Value::Scalar(median))
}

// Population standard deviation.
fn std_dev(args: &[Value], _: &mut StdRng) -> FnResult {
    let values = non_empty(&args[0], "std")?;
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Ok(Value::Scalar(variance.sqrt()))
}

fn len(args: &[Value], _: &mut StdRng) -> FnResult {
    match &args[0] {
        Value::Array(values) => Ok(Value::Scalar(values.len() as f64)),
        Value::Scalar(_) => Err("len() of a scalar".to_string()),
    }
}

fn dot(args: &[Value], _: &mut StdRng) -> FnResult {
    let products = broadcast(&args[0], &args[1], |a, b| a * b)?;
    match (&args[0], &args[1]) {
        (Value::Array(_), Value::Array(_)) => Ok(Value::Scalar(products.as_slice().iter().sum())),
        _ => Ok(products),
    }
}

fn all(args: &[Value], _: &mut StdRng) -> FnResult {
    let flag = args[0].as_slice().iter().all(|v| *v != 0.0);
    Ok(Value::Scalar(if flag { 1.0 } else { 0.0 }))
}

fn any(args: &[Value], _: &mut StdRng) -> FnResult {
    let flag = args[0].as_slice().iter().any(|v| *v != 0.0);
    Ok(Value::Scalar(if flag { 1.0 } else { 0.0 }))
}

fn arange(args: &[Value], _: &mut StdRng) -> FnResult {
    let (start, stop, step) = match args {
        [stop] => (0.0, scalar_arg(stop, "stop")?, 1.0),
        [start, stop] => (scalar_arg(start, "start")?, scalar_arg(stop, "stop")?, 1.0),
        [start, stop, step] => (
            scalar_arg(start, "start")?,
            scalar_arg(stop, "stop")?,
            scalar_arg(step, "step")?,
        ),
        _ => return Err("expected 1 to 3 arguments".to_string()),
    };
    if step == 0.0 {
        return Err("step must not be zero".to_string());
    }
    if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
        return Err("arguments must be finite".to_string());
    }
    let count = ((stop - start) / step).ceil().max(0.0);
    if count > MAX_GENERATED_LEN as f64 {
        return Err(format!(
            "would produce {count} values, more than the limit of {MAX_GENERATED_LEN}"
        ));
    }
    let count = count as usize;
    Ok(Value::Array(
        (0..count).map(|i| start + i as f64 * step).collect(),
    ))
}

fn linspace(args: &[Value], _: &mut StdRng) -> FnResult {
    let start = scalar_arg(&args[0], "start")?;
    let stop = scalar_arg(&args[1], "stop")?;
    let num = match args.get(2) {
        Some(value) => count_arg(value, "num")?,
        None => 50,
    };
    let values = match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut values = (0..num).map(|i| start + i as f64 * step).collect::<Vec<_>>();
            values[num - 1] = stop;
            values
        }
    };
    Ok(Value::Array(values))
}

fn ones(args: &[Value], _: &mut StdRng) -> FnResult {
    Ok(Value::Array(vec![1.0; count_arg(&args[0], "n")?]))
}

fn zeros(args: &[Value], _: &mut StdRng) -> FnResult {
    Ok(Value::Array(vec![0.0; count_arg(&args[0], "n")?]))
}

fn array(args: &[Value], _: &mut StdRng) -> FnResult {
    Ok(Value::Array(
        args.iter().flat_map(|a| a.as_slice().into_owned()).collect(),
    ))
}

fn cumsum(args: &[Value], _: &mut StdRng) -> FnResult {
    let mut total = 0.0;
    Ok(Value::Array(
        args[0]
            .as_slice()
            .iter()
            .map(|v| {
                total += v;
                total
            })
            .collect(),
    ))
}

fn cumprod(args: &[Value], _: &mut StdRng) -> FnResult {
    let mut total = 1.0;
    Ok(Value::Array(
        args[0]
            .as_slice()
            .iter()
            .map(|v| {
                total *= v;
                total
            })
            .collect(),
    ))
}

// Produces one value fewer than its input.
fn diff(args: &[Value], _: &mut StdRng) -> FnResult {
    let values = args[0].as_slice();
    Ok(Value::Array(values.windows(2).map(|w| w[1] - w[0]).collect()))
}

fn sort(args: &[Value], _: &mut StdRng) -> FnResult {
    let mut values = args[0].as_slice().into_owned();
    values.sort_by(f64::total_cmp);
    Ok(Value::Array(values))
}

// Piecewise-linear interpolation; `xp` is expected to be increasing and
// queries outside its range clamp to the end values of `fp`.
fn interp(args: &[Value], _: &mut StdRng) -> FnResult {
    let xp = args[1].as_slice();
    let fp = args[2].as_slice();
    if xp.is_empty() {
        return Err("xp must not be empty".to_string());
    }
    if xp.len() != fp.len() {
        return Err(format!(
            "xp and fp must have the same length ({} vs {})",
            xp.len(),
            fp.len()
        ));
    }
    let last = xp.len() - 1;
    Ok(args[0].map(|x| {
        if x.is_nan() {
            f64::NAN
        } else if x <= xp[0] {
            fp[0]
        } else if x >= xp[last] {
            fp[last]
        } else {
            let upper = xp.partition_point(|v| *v <= x);
            let lower = upper - 1;
            let span = xp[upper] - xp[lower];
            if span == 0.0 {
                fp[lower]
            } else {
                fp[lower] + (x - xp[lower]) * (fp[upper] - fp[lower]) / span
            }
        }
    }))
}

fn draw(count: Option<&Value>, mut sample: impl FnMut() -> f64) -> FnResult {
    match count {
        Some(n) => {
            let n = count_arg(n, "size")?;
            Ok(Value::Array((0..n).map(|_| sample()).collect()))
        }
        None => Ok(Value::Scalar(sample())),
    }
}

fn random(args: &[Value], rng: &mut StdRng) -> FnResult {
    draw(args.first(), || rng.random::<f64>())
}

fn uniform(args: &[Value], rng: &mut StdRng) -> FnResult {
    let low = scalar_arg(&args[0], "low")?;
    let high = scalar_arg(&args[1], "high")?;
    if !(low.is_finite() && high.is_finite()) {
        return Err("bounds must be finite".to_string());
    }
    draw(args.get(2), || low + (high - low) * rng.random::<f64>())
}

fn normal(args: &[Value], rng: &mut StdRng) -> FnResult {
    let loc = scalar_arg(&args[0], "loc")?;
    let scale = scalar_arg(&args[1], "scale")?;
    let distribution = Normal::new(loc, scale).map_err(|err| format!("{err}"))?;
    draw(args.get(2), || rng.sample(distribution))
}
