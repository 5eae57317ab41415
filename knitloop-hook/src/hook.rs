use std::sync::Arc;

use crate::error::HookError;

/// Actions run before and after a unit of work of type `T`.
///
/// An error from `before` tells the caller to skip the unit; what "skip"
/// means is up to the caller.
pub trait Hook<T>: Send + Sync {
    fn before(&self, value: &T) -> Result<(), HookError>;

    fn after(&self, value: &T) -> Result<(), HookError>;
}

/// Shared, type-erased hook.
pub type SharedHook<T> = Arc<dyn Hook<T>>;

impl<T, H> Hook<T> for Arc<H>
where
    H: Hook<T> + ?Sized,
{
    fn before(&self, value: &T) -> Result<(), HookError> {
        (**self).before(value)
    }

    fn after(&self, value: &T) -> Result<(), HookError> {
        (**self).after(value)
    }
}

impl<T, H> Hook<T> for Box<H>
where
    H: Hook<T> + ?Sized,
{
    fn before(&self, value: &T) -> Result<(), HookError> {
        (**self).before(value)
    }

    fn after(&self, value: &T) -> Result<(), HookError> {
        (**self).after(value)
    }
}

/// Hook whose actions always succeed. Used when no hooks are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

impl<T> Hook<T> for NoHook {
    fn before(&self, _value: &T) -> Result<(), HookError> {
        Ok(())
    }

    fn after(&self, _value: &T) -> Result<(), HookError> {
        Ok(())
    }
}

type HookFn<T> = Box<dyn Fn(&T) -> Result<(), HookError> + Send + Sync>;

/// Hook whose actions are supplied as closures.
pub struct FuncHook<T> {
    before_fn: HookFn<T>,
    after_fn: HookFn<T>,
}

impl<T> FuncHook<T> {
    pub fn new<B, A>(before: B, after: A) -> Self
    where
        B: Fn(&T) -> Result<(), HookError> + Send + Sync + 'static,
        A: Fn(&T) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            before_fn: Box::new(before),
            after_fn: Box::new(after),
        }
    }
}

impl<T> Hook<T> for FuncHook<T> {
    fn before(&self, value: &T) -> Result<(), HookError> {
        (self.before_fn)(value)
    }

    fn after(&self, value: &T) -> Result<(), HookError> {
        (self.after_fn)(value)
    }
}

impl<T> std::fmt::Debug for FuncHook<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuncHook").finish_non_exhaustive()
    }
}
