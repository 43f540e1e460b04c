//! Macros for ergonomic machine construction.

/// Generate a state identity enum and its `StateId` implementation.
///
/// The enum derives everything `StateId` requires; the crate using the
/// macro must depend on `serde` with the `derive` feature.
///
/// # Example
///
/// ```
/// use solid_state::core::StateId;
/// use solid_state::state_ids;
///
/// state_ids! {
///     pub enum Telephone {
///         Idle,
///         Ringing,
///         Conversation,
///     }
/// }
///
/// assert_eq!(Telephone::Ringing.name(), "Ringing");
/// ```
#[macro_export]
macro_rules! state_ids {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::StateId for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}
