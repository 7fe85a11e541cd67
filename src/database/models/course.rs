use crate::database::schema::{FieldKind, FieldSpec, ResourceSchema};

pub const SKILL_LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];

pub static COURSES: ResourceSchema = ResourceSchema {
    collection: "courses",
    label: "course",
    fields: &[
        FieldSpec::new("title", FieldKind::String).required("Please add a course title"),
        FieldSpec::new("description", FieldKind::String).required("Please add a description"),
        FieldSpec::new("weeks", FieldKind::String).required("Please add number of weeks"),
        FieldSpec::new("tuition", FieldKind::Number).required("Please add a tuition cost"),
        FieldSpec::new("minimumSkill", FieldKind::String)
            .required("Please add a minimum skill")
            .one_of(SKILL_LEVELS),
        FieldSpec::new("scholarshipAvailable", FieldKind::Boolean).default_bool(false),
        FieldSpec::new("bootcamp", FieldKind::Reference).system(),
        FieldSpec::new("user", FieldKind::Reference).system(),
    ],
};
