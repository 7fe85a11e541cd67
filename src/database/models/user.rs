use crate::database::schema::{FieldKind, FieldSpec, ResourceSchema};

pub const PASSWORD_FIELD: &str = "password";

pub const ROLES: &[&str] = &["user", "publisher", "admin"];

pub static USERS: ResourceSchema = ResourceSchema {
    collection: "users",
    label: "user",
    fields: &[
        FieldSpec::new("name", FieldKind::String).required("Please add a name"),
        FieldSpec::new("email", FieldKind::String)
            .required("Please add an email")
            .unique(),
        FieldSpec::new("role", FieldKind::String)
            .one_of(ROLES)
            .default_str("user"),
        FieldSpec::new(PASSWORD_FIELD, FieldKind::String)
            .required("Please add a password")
            .min_length(6)
            .hidden(),
    ],
};
