use crate::database::schema::{FieldKind, FieldSpec, ResourceSchema};

pub const CAREERS: &[&str] = &[
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

pub static BOOTCAMPS: ResourceSchema = ResourceSchema {
    collection: "bootcamps",
    label: "bootcamp",
    fields: &[
        FieldSpec::new("name", FieldKind::String)
            .required("Please add a name")
            .max_length(50)
            .unique(),
        FieldSpec::new("description", FieldKind::String)
            .required("Please add a description")
            .max_length(500),
        FieldSpec::new("website", FieldKind::String),
        FieldSpec::new("phone", FieldKind::String).max_length(20),
        FieldSpec::new("email", FieldKind::String),
        FieldSpec::new("address", FieldKind::String),
        FieldSpec::new("careers", FieldKind::StringArray).one_of(CAREERS),
        FieldSpec::new("averageRating", FieldKind::Number),
        FieldSpec::new("averageCost", FieldKind::Number),
        FieldSpec::new("photo", FieldKind::String).default_str(DEFAULT_PHOTO),
        FieldSpec::new("housing", FieldKind::Boolean).default_bool(false),
        FieldSpec::new("jobAssistance", FieldKind::Boolean).default_bool(false),
        FieldSpec::new("jobGuarantee", FieldKind::Boolean).default_bool(false),
        FieldSpec::new("acceptGi", FieldKind::Boolean).default_bool(false),
        FieldSpec::new("user", FieldKind::Reference).system(),
    ],
};
