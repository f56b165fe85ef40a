use std::time::Duration;

use time::OffsetDateTime;

pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime;
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;

    /// Time elapsed since `earlier`, clamped to zero when the clock went backwards.
    fn elapsed_since(&self, earlier: OffsetDateTime) -> Duration {
        (self.now() - earlier).try_into().unwrap_or(Duration::ZERO)
    }
}
