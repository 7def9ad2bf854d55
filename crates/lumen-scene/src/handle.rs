//! Index handles into backend-owned arenas.

macro_rules! index_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Position in the owning arena.
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

index_handle!(
    /// A mesh uploaded to the backend's mesh store.
    MeshHandle
);
index_handle!(
    /// A material in [`Scene::materials`](crate::Scene::materials).
    MaterialHandle
);
index_handle!(
    /// A 2D texture or cubemap in the backend's texture store.
    TextureHandle
);
