use crate::error::AugmentError;
use crate::rng::worker_coin;
use anyhow::{ensure, Context, Result};
use std::marker::PhantomData;

/// One augmentation step, mapping an input `I` (an image, a tensor, ...)
/// to an output `O`.
///
/// Steps hold only their parameters. Randomized steps draw from the calling
/// thread's worker RNG (see [`crate::rng`]), so `apply` takes `&self` and a
/// single pipeline can serve many loader threads.
///
/// Steps compose with `.then(...)` into a statically typed [`Chain`], e.g.
/// `image -> image -> tensor`. `then()` needs:
/// 1. **Matching types**: `self: Transform<I, O>`, `next: Transform<O, M>`
/// 2. **A sized receiver**: box a trait object first (`Box<dyn Transform>` is itself a `Transform`)
/// 3. **Sendable values**: intermediate and output types must be `Send`
pub trait Transform<I, O>: Send + Sync {
    /// Runs the step once. Errors carry an [`AugmentError`] when the input is malformed.
    fn apply(&self, input: I) -> Result<O>;

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain {
            first: self,
            second: next,
            _marker: PhantomData,
        }
    }
}

/// Boxed transforms are transforms too, so dynamically assembled steps
/// (see [`crate::pipeline`]) compose with concrete ones.
impl<I, O, T> Transform<I, O> for Box<T>
where
    T: Transform<I, O> + ?Sized,
{
    fn apply(&self, input: I) -> Result<O> {
        (**self).apply(input)
    }
}

/// Two steps run back to back; `M` is the type handed from `A` to `B`.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    /// Same as `first.then(second)`.
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        self.first
            .apply(input)
            .and_then(|mid| self.second.apply(mid))
            .with_context(|| {
                format!(
                    "Augmentation chain failed: {} → {} → {}",
                    std::any::type_name::<A>(),
                    std::any::type_name::<B>(),
                    std::any::type_name::<O>()
                )
            })
    }
}

// ============================================================================
// RandomApply
// ============================================================================

/// Applies the wrapped transform with probability `p`, otherwise passes the
/// input through untouched. Each call is an independent Bernoulli trial.
///
/// # Example
/// ```ignore
/// let maybe_blur = RandomApply::new(GaussianBlur::with_kernel_size(23)?, 0.5)?;
/// let out = maybe_blur.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomApply<T> {
    transform: T,
    p: f64,
}

impl<T> RandomApply<T> {
    pub fn new(transform: T, p: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&p),
            AugmentError::config(format!(
                "Probability must be in [0.0, 1.0] range (got {})",
                p
            ))
        );
        Ok(Self { transform, p })
    }

    pub fn probability(&self) -> f64 {
        self.p
    }
}

impl<I, T> Transform<I, I> for RandomApply<T>
where
    T: Transform<I, I>,
{
    fn apply(&self, input: I) -> Result<I> {
        if worker_coin(self.p) {
            self.transform.apply(input)
        } else {
            Ok(input)
        }
    }
}
