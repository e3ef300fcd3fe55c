pub mod content;
pub mod definition;
pub mod error;
pub mod profile;
pub mod validator;

pub use content::{ContentConstraint, ContentDefinition, ContentRequirement};
pub use definition::{
    AttributeSpec, ElementSpec, ExpectedAttributeDefinition, ExpectedElementDefinition, ExtraRule,
    ExtraRuleSpec,
};
pub use error::ProfileError;
pub use profile::{
    METADATA_PROFILE_SCHEMA, METADATA_PROFILE_SCHEMA_VERSION, MetadataProfile, ProfileFile,
    ProfileHeader,
};
pub use validator::validate;
