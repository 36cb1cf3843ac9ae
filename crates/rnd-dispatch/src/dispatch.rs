//! The outcome of one override point.

/// What the caller of an override point should do.
///
/// `Override` carries the replacement result and means the caller must not
/// run its own default computation. `Fallthrough` means the default runs
/// and nothing is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch<T> {
    Override(T),
    #[default]
    Fallthrough,
}

impl<T> Dispatch<T> {
    /// Whether the caller's default implementation must be skipped.
    pub fn should_skip_default(&self) -> bool {
        matches!(self, Dispatch::Override(_))
    }

    /// The replacement result, or the caller's default computed lazily.
    pub fn resolve(self, default: impl FnOnce() -> T) -> T {
        match self {
            Dispatch::Override(value) => value,
            Dispatch::Fallthrough => default(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Dispatch<U> {
        match self {
            Dispatch::Override(value) => Dispatch::Override(f(value)),
            Dispatch::Fallthrough => Dispatch::Fallthrough,
        }
    }

    pub fn as_ref(&self) -> Dispatch<&T> {
        match self {
            Dispatch::Override(value) => Dispatch::Override(value),
            Dispatch::Fallthrough => Dispatch::Fallthrough,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Dispatch::Override(value) => Some(value),
            Dispatch::Fallthrough => None,
        }
    }

    /// The replacement result paired with the skip flag, for callers that
    /// speak the boolean-plus-out-parameter convention.
    pub fn into_parts(self) -> (Option<T>, bool) {
        let skip = self.should_skip_default();
        (self.into_option(), skip)
    }
}

impl<T> From<Option<T>> for Dispatch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Dispatch::Override(value),
            None => Dispatch::Fallthrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_skips_default() {
        let d = Dispatch::Override(3);
        assert!(d.should_skip_default());
        assert_eq!(d.resolve(|| panic!("default must not run")), 3);
    }

    #[test]
    fn fallthrough_runs_default() {
        let d: Dispatch<i32> = Dispatch::Fallthrough;
        assert!(!d.should_skip_default());
        let mut ran = false;
        let value = d.resolve(|| {
            ran = true;
            7
        });
        assert!(ran);
        assert_eq!(value, 7);
    }

    #[test]
    fn map_and_parts() {
        assert_eq!(Dispatch::Override(2).map(|v| v * 2), Dispatch::Override(4));
        assert_eq!(Dispatch::<i32>::Fallthrough.map(|v| v * 2), Dispatch::Fallthrough);
        assert_eq!(Dispatch::Override("x").into_parts(), (Some("x"), true));
        assert_eq!(Dispatch::<&str>::Fallthrough.into_parts(), (None, false));
        assert_eq!(Dispatch::from(Some(1)), Dispatch::Override(1));
        assert_eq!(Dispatch::<i32>::default(), Dispatch::Fallthrough);
    }
}
