//! Validation predicates for parameter writes

use num_traits::Zero;
use std::fmt::Display;
use std::sync::Arc;

use crate::any::TypedValue;

/// A predicate over candidate values of type `T`
pub trait Constrain<T>: Send + Sync {
    /// `Err(reason)` rejects the value
    fn check(&self, value: &T) -> Result<(), String>;
}

/// Type-erased constraint stored in a descriptor
pub type ConstraintFn = Arc<dyn Fn(&TypedValue) -> Result<(), String> + Send + Sync>;

pub(crate) fn erase<T, C>(constraint: C) -> ConstraintFn
where
    T: 'static,
    C: Constrain<T> + 'static,
{
    Arc::new(move |value: &TypedValue| match value.downcast_ref::<T>() {
        Some(v) => constraint.check(v),
        None => Err(format!(
            "constraint expects {}, got {}",
            std::any::type_name::<T>(),
            value.type_name()
        )),
    })
}

/// Value must be greater than zero
#[derive(Clone, Copy, Debug, Default)]
pub struct Positive;

impl<T: PartialOrd + Zero + Display> Constrain<T> for Positive {
    fn check(&self, value: &T) -> Result<(), String> {
        if *value > T::zero() {
            Ok(())
        } else {
            Err(format!("{} must be greater than 0", value))
        }
    }
}

/// Value must be zero or greater
#[derive(Clone, Copy, Debug, Default)]
pub struct NonNegative;

impl<T: PartialOrd + Zero + Display> Constrain<T> for NonNegative {
    fn check(&self, value: &T) -> Result<(), String> {
        if *value >= T::zero() {
            Ok(())
        } else {
            Err(format!("{} must be greater than or equal to 0", value))
        }
    }
}

/// Value must be below the bound
#[derive(Clone, Copy, Debug)]
pub struct LessThan<T>(pub T);

impl<T: PartialOrd + Display + Send + Sync> Constrain<T> for LessThan<T> {
    fn check(&self, value: &T) -> Result<(), String> {
        if *value < self.0 {
            Ok(())
        } else {
            Err(format!("{} must be less than {}", value, self.0))
        }
    }
}

/// Value must not exceed the bound
#[derive(Clone, Copy, Debug)]
pub struct LessThanOrEqual<T>(pub T);

impl<T: PartialOrd + Display + Send + Sync> Constrain<T> for LessThanOrEqual<T> {
    fn check(&self, value: &T) -> Result<(), String> {
        if *value <= self.0 {
            Ok(())
        } else {
            Err(format!("{} must be less than or equal to {}", value, self.0))
        }
    }
}

/// Value must be above the bound
#[derive(Clone, Copy, Debug)]
pub struct GreaterThan<T>(pub T);

impl<T: PartialOrd + Display + Send + Sync> Constrain<T> for GreaterThan<T> {
    fn check(&self, value: &T) -> Result<(), String> {
        if *value > self.0 {
            Ok(())
        } else {
            Err(format!("{} must be greater than {}", value, self.0))
        }
    }
}

/// Value must be at least the bound
#[derive(Clone, Copy, Debug)]
pub struct GreaterThanOrEqual<T>(pub T);

impl<T: PartialOrd + Display + Send + Sync> Constrain<T> for GreaterThanOrEqual<T> {
    fn check(&self, value: &T) -> Result<(), String> {
        if *value >= self.0 {
            Ok(())
        } else {
            Err(format!("{} must be greater than or equal to {}", value, self.0))
        }
    }
}

/// Value must lie in `[low, high]`
#[derive(Clone, Copy, Debug)]
pub struct WithinRange<T> {
    /// Inclusive lower bound
    pub low: T,
    /// Inclusive upper bound
    pub high: T,
}

impl<T: PartialOrd + Display + Send + Sync> Constrain<T> for WithinRange<T> {
    fn check(&self, value: &T) -> Result<(), String> {
        if *value >= self.low && *value <= self.high {
            Ok(())
        } else {
            Err(format!(
                "{} must be within [{}, {}]",
                value, self.low, self.high
            ))
        }
    }
}

/// Closure-backed constraint, see [`predicate`]
pub struct Predicate<F>(F);

impl<T, F> Constrain<T> for Predicate<F>
where
    F: Fn(&T) -> Result<(), String> + Send + Sync,
{
    fn check(&self, value: &T) -> Result<(), String> {
        (self.0)(value)
    }
}

/// Wrap a closure as a constraint
pub fn predicate<T, F>(f: F) -> Predicate<F>
where
    F: Fn(&T) -> Result<(), String> + Send + Sync,
{
    Predicate(f)
}

/// Conjunction of constraints; reports every failing reason
pub struct Constraint<T> {
    checks: Vec<Box<dyn Constrain<T>>>,
}

impl<T: 'static> Constraint<T> {
    /// Empty conjunction, accepts everything
    pub fn new() -> Self {
        Constraint { checks: Vec::new() }
    }

    /// Add a predicate
    pub fn and(mut self, check: impl Constrain<T> + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }
}

impl<T: 'static> Default for Constraint<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Constrain<T> for Constraint<T> {
    fn check(&self, value: &T) -> Result<(), String> {
        let failures: Vec<String> = self
            .checks
            .iter()
            .filter_map(|c| c.check(value).err())
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_constraints() {
        assert!(Positive.check(&1.5f64).is_ok());
        assert_eq!(Positive.check(&0i64).unwrap_err(), "0 must be greater than 0");
        assert!(NonNegative.check(&0i32).is_ok());
        assert!(LessThan(3usize).check(&3).is_err());
        assert!(LessThanOrEqual(3usize).check(&3).is_ok());
        assert!(GreaterThanOrEqual(-1.0).check(&-1.0).is_ok());
        assert!(WithinRange { low: 0.0, high: 1.0 }.check(&1.2).is_err());
    }

    #[test]
    fn test_conjunction_reports_all_failures() {
        let c = Constraint::new().and(Positive).and(LessThan(10.0));
        assert!(c.check(&5.0).is_ok());
        assert_eq!(
            c.check(&-20.0).unwrap_err(),
            "-20 must be greater than 0"
        );
        let c = Constraint::new().and(GreaterThan(5)).and(LessThan(0));
        assert_eq!(
            c.check(&3).unwrap_err(),
            "3 must be greater than 5, 3 must be less than 0"
        );
    }

    #[test]
    fn test_erased_constraint_checks_type() {
        let erased = erase::<f64, _>(Positive);
        assert!(erased(&TypedValue::new(2.0f64)).is_ok());
        assert!(erased(&TypedValue::new(-2.0f64)).is_err());
        assert!(erased(&TypedValue::new(2i32)).is_err());

        let even = erase::<i64, _>(predicate(|v: &i64| {
            if v % 2 == 0 {
                Ok(())
            } else {
                Err(format!("{} is odd", v))
            }
        }));
        assert_eq!(even(&TypedValue::new(3i64)).unwrap_err(), "3 is odd");
    }
}
