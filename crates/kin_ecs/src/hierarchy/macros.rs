/// Declares polymorphic component types.
///
/// Each declaration produces an ordinary struct plus the
/// [`Component`](crate::component::Component) and
/// [`Polymorphic`](crate::hierarchy::Polymorphic) impls. Parents are embedded
/// as leading named fields; a declaration without a parent list is a
/// polymorphic root. The struct is forced to `#[repr(C, align(4))]`, which is
/// what allows storage cells to tag pointers to it.
///
/// # Examples
///
/// ```
/// use kin_ecs::inherit;
///
/// inherit! {
///     /// A hierarchy root.
///     pub struct Shape {
///         pub sides: u32,
///     }
///
///     pub struct Polygon: (pub shape: Shape) {
///         pub regular: bool,
///     }
///
///     // Multiple parents: one embedded field per parent.
///     pub struct Tile: (pub shape: Shape) {}
/// }
///
/// let polygon = Polygon {
///     shape: Shape { sides: 3 },
///     regular: true,
/// };
/// assert_eq!(polygon.shape.sides, 3);
/// assert!(polygon.regular);
///
/// let tile = Tile {
///     shape: Shape { sides: 4 },
/// };
/// assert_eq!(tile.shape.sides, 4);
/// ```
#[macro_export]
macro_rules! inherit {
    ($(
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident $(: ($($pvis:vis $pfield:ident : $Parent:ty),+ $(,)?))? {
            $($(#[$fmeta:meta])* $fvis:vis $ffield:ident : $fty:ty),* $(,)?
        }
    )+) => {$(
        $(#[$meta])*
        #[repr(C, align(4))]
        $vis struct $Name {
            $($($pvis $pfield: $Parent,)+)?
            $($(#[$fmeta])* $fvis $ffield: $fty,)*
        }

        unsafe impl $crate::component::Component for $Name {}

        // SAFETY: every direct parent is an embedded field reported with its
        // real offset, and the repr above guarantees tag alignment.
        unsafe impl $crate::hierarchy::Polymorphic for $Name {
            #[allow(unused_variables, reason = "roots have no parents to visit")]
            fn visit_parents(walker: &mut $crate::hierarchy::ParentWalker<'_>) {
                $($(
                    walker.parent::<$Parent>(::core::mem::offset_of!($Name, $pfield));
                )+)?
            }
        }
    )+};
}
