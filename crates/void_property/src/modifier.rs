//! Modifiers - transforms applied while a property is read or written
//!
//! A stack property runs its modifiers bottom to top on get and top to
//! bottom on set. Modifiers may be shared between several properties.

use std::fmt;
use std::sync::Arc;

use void_core::TypeUid;

use crate::any::{Any, AnyType};
use crate::evaluation::Evaluation;

/// A get/set transformation or validation layer
pub trait Modifier: Send + Sync {
    /// Name for logging
    fn name(&self) -> &str {
        "modifier"
    }

    /// Transform the value produced by the value stack
    fn process_on_get(&self, _value: &mut Any) -> Evaluation {
        Evaluation::CONTINUE
    }

    /// Transform or veto a value about to be committed.
    /// `current` is the last observable value of the property.
    fn process_on_set(&self, _new_value: &mut Any, _current: &Any) -> Evaluation {
        Evaluation::CONTINUE
    }

    /// Whether this modifier understands values of `uid`; others skip it
    fn is_compatible(&self, _uid: TypeUid) -> bool {
        true
    }
}

impl fmt::Debug for dyn Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modifier({})", self.name())
    }
}

/// Clamps values into `[min, max]` on both paths
#[derive(Debug, Clone)]
pub struct ClampModifier<T> {
    min: T,
    max: T,
}

impl<T: AnyType + PartialOrd> ClampModifier<T> {
    /// Create a clamp; `min` and `max` are swapped if given in reverse
    pub fn new(min: T, max: T) -> Self {
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    fn clamp(&self, value: &mut Any) -> Evaluation {
        let clamped = match value.get_ref::<T>() {
            Some(v) if *v < self.min => self.min.clone(),
            Some(v) if *v > self.max => self.max.clone(),
            _ => return Evaluation::CONTINUE,
        };
        Evaluation::continue_if(value.set(clamped).changed())
    }
}

impl<T: AnyType + PartialOrd> Modifier for ClampModifier<T> {
    fn name(&self) -> &str {
        "clamp"
    }

    fn process_on_get(&self, value: &mut Any) -> Evaluation {
        self.clamp(value)
    }

    fn process_on_set(&self, new_value: &mut Any, _current: &Any) -> Evaluation {
        self.clamp(new_value)
    }

    fn is_compatible(&self, uid: TypeUid) -> bool {
        uid == TypeUid::of::<T>()
    }
}

/// Which evaluation paths a modifier participates in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierPath {
    Get,
    Set,
    Both,
}

impl ModifierPath {
    fn on_get(self) -> bool {
        matches!(self, Self::Get | Self::Both)
    }

    fn on_set(self) -> bool {
        matches!(self, Self::Set | Self::Both)
    }
}

/// Multiplies `f32`/`f64` values by a constant factor
#[derive(Debug, Clone, Copy)]
pub struct ScaleModifier {
    factor: f64,
    path: ModifierPath,
}

impl ScaleModifier {
    /// Scale on the given path(s)
    pub fn new(factor: f64, path: ModifierPath) -> Self {
        Self { factor, path }
    }

    /// Scale only when reading
    pub fn on_get(factor: f64) -> Self {
        Self::new(factor, ModifierPath::Get)
    }

    /// Scale only when writing
    pub fn on_set(factor: f64) -> Self {
        Self::new(factor, ModifierPath::Set)
    }

    /// The factor
    pub fn factor(&self) -> f64 {
        self.factor
    }

    fn scale(&self, value: &mut Any) -> Evaluation {
        let result = if let Some(v) = value.get::<f64>() {
            value.set(v * self.factor)
        } else if let Some(v) = value.get::<f32>() {
            value.set((v as f64 * self.factor) as f32)
        } else {
            return Evaluation::CONTINUE;
        };
        Evaluation::continue_if(result.changed())
    }
}

impl Modifier for ScaleModifier {
    fn name(&self) -> &str {
        "scale"
    }

    fn process_on_get(&self, value: &mut Any) -> Evaluation {
        if self.path.on_get() {
            self.scale(value)
        } else {
            Evaluation::CONTINUE
        }
    }

    fn process_on_set(&self, new_value: &mut Any, _current: &Any) -> Evaluation {
        if self.path.on_set() {
            self.scale(new_value)
        } else {
            Evaluation::CONTINUE
        }
    }

    fn is_compatible(&self, uid: TypeUid) -> bool {
        uid == TypeUid::of::<f64>() || uid == TypeUid::of::<f32>()
    }
}

/// Rejects every write
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyModifier;

impl Modifier for ReadOnlyModifier {
    fn name(&self) -> &str {
        "read-only"
    }

    fn process_on_set(&self, _new_value: &mut Any, _current: &Any) -> Evaluation {
        Evaluation::ERROR
    }
}

type GetFn = Arc<dyn Fn(&mut Any) -> Evaluation + Send + Sync>;
type SetFn = Arc<dyn Fn(&mut Any, &Any) -> Evaluation + Send + Sync>;

/// Modifier built from closures
#[derive(Clone, Default)]
pub struct FnModifier {
    name: String,
    on_get: Option<GetFn>,
    on_set: Option<SetFn>,
}

impl FnModifier {
    /// Create an empty modifier
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_get: None,
            on_set: None,
        }
    }

    /// Set the get-path transform
    pub fn with_get<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Any) -> Evaluation + Send + Sync + 'static,
    {
        self.on_get = Some(Arc::new(f));
        self
    }

    /// Set the set-path transform
    pub fn with_set<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Any, &Any) -> Evaluation + Send + Sync + 'static,
    {
        self.on_set = Some(Arc::new(f));
        self
    }
}

impl Modifier for FnModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_on_get(&self, value: &mut Any) -> Evaluation {
        self.on_get.as_ref().map_or(Evaluation::CONTINUE, |f| f(value))
    }

    fn process_on_set(&self, new_value: &mut Any, current: &Any) -> Evaluation {
        self.on_set
            .as_ref()
            .map_or(Evaluation::CONTINUE, |f| f(new_value, current))
    }
}

impl fmt::Debug for FnModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModifier")
            .field("name", &self.name)
            .field("on_get", &self.on_get.is_some())
            .field("on_set", &self.on_set.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Action;

    #[test]
    fn test_clamp() {
        let clamp = ClampModifier::new(0.0f64, 10.0);
        let mut value = Any::new(12.0f64);
        let eval = clamp.process_on_set(&mut value, &Any::new(0.0f64));
        assert!(eval.is_changed());
        assert_eq!(value.get::<f64>(), Some(10.0));

        let mut inside = Any::new(5.0f64);
        assert_eq!(clamp.process_on_get(&mut inside), Evaluation::CONTINUE);
        assert!(!clamp.is_compatible(TypeUid::of::<f32>()));
    }

    #[test]
    fn test_clamp_swaps_reversed_bounds() {
        let clamp = ClampModifier::new(10i32, 0);
        let mut value = Any::new(-3i32);
        clamp.process_on_get(&mut value);
        assert_eq!(value.get::<i32>(), Some(0));
    }

    #[test]
    fn test_scale_paths() {
        let scale = ScaleModifier::on_get(2.0);
        let mut value = Any::new(3.0f32);
        assert!(scale.process_on_get(&mut value).is_changed());
        assert_eq!(value.get::<f32>(), Some(6.0));
        assert_eq!(
            scale.process_on_set(&mut value, &Any::new(0.0f32)),
            Evaluation::CONTINUE
        );
    }

    #[test]
    fn test_read_only_vetoes() {
        let mut value = Any::new(1i32);
        let eval = ReadOnlyModifier.process_on_set(&mut value, &Any::new(0i32));
        assert_eq!(eval.action(), Action::Error);
    }

    #[test]
    fn test_fn_modifier() {
        let negate = FnModifier::new("negate").with_get(|value| {
            let v = value.get_or_default::<i32>();
            Evaluation::continue_if(value.set(-v).changed())
        });
        let mut value = Any::new(4i32);
        negate.process_on_get(&mut value);
        assert_eq!(value.get::<i32>(), Some(-4));
        assert_eq!(negate.name(), "negate");
    }
}
