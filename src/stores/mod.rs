pub mod profiles;
pub mod variant_vectors;

pub use profiles::{InMemoryProfileStore, PgProfileStore, ProfileStore, StoredProfile};
pub use variant_vectors::{
    InMemoryVariantVectorStore, PgVariantVectorStore, SeededVector, VariantCandidate,
    VariantVectorStore,
};
