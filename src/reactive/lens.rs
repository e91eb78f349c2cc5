//! Lenses - Typed field accessors.
//!
//! A [`Lens`] names one field of a state shape and knows how to read it.
//! Projections key their caches by the lens name, so a lens is the unit of
//! memoization. Use [`lenses!`](crate::lenses) to generate one lens per field.

use std::fmt;

/// Named accessor for field `F` of `S`.
pub struct Lens<S, F> {
    name: &'static str,
    get: fn(&S) -> F,
}

impl<S, F> Clone for Lens<S, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, F> Copy for Lens<S, F> {}

impl<S, F> fmt::Debug for Lens<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lens").field(&self.name).finish()
    }
}

impl<S, F> Lens<S, F> {
    /// Create a lens. `name` must be unique per field of `S`.
    pub const fn new(name: &'static str, get: fn(&S) -> F) -> Self {
        Self { name, get }
    }

    /// Field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the field.
    pub fn get(&self, source: &S) -> F {
        (self.get)(source)
    }
}

/// Generate one [`Lens`] per field as associated constants.
///
/// The constants carry the field's own name, so `State::count` is the lens
/// for `state.count`. Field types must be `Clone`.
///
/// ```ignore
/// #[derive(Clone)]
/// struct State { count: i32, user: Shared<User> }
///
/// spark_rx::lenses!(State { count: i32, user: Shared<User> });
///
/// let count = store.state().stream(State::count);
/// let name = store.state().field(State::user).stream(User::name);
/// ```
#[macro_export]
macro_rules! lenses {
    ($ty:ty { $($field:ident : $fty:ty),* $(,)? }) => {
        #[allow(non_upper_case_globals, dead_code)]
        impl $ty {
            $(
                pub const $field: $crate::reactive::Lens<$ty, $fty> =
                    $crate::reactive::Lens::new(
                        stringify!($field),
                        |source: &$ty| ::std::clone::Clone::clone(&source.$field),
                    );
            )*
        }
    };
}
