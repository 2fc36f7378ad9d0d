//! Forms shipped with the engine.

use crate::schema::{Schema, SchemaError};

const EVENT_REGISTRATION: &str = include_str!("../forms/event_registration.json");
const JOB_APPLICATION: &str = include_str!("../forms/job_application.json");

/// Names accepted by [`builtin`].
pub const BUILTIN_FORMS: &[&str] = &["event-registration", "job-application"];

pub fn builtin(name: &str) -> Result<Schema, SchemaError> {
    match name {
        "event-registration" => Schema::from_json(EVENT_REGISTRATION),
        "job-application" => Schema::from_json(JOB_APPLICATION),
        other => Err(SchemaError::UnknownBuiltin(other.to_string())),
    }
}

pub fn event_registration() -> Result<Schema, SchemaError> {
    builtin("event-registration")
}

pub fn job_application() -> Result<Schema, SchemaError> {
    builtin("job-application")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_loads() {
        for name in BUILTIN_FORMS {
            let schema = builtin(name).expect("builtin schema");
            assert_eq!(schema.id(), *name);
        }
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        assert!(matches!(
            builtin("survey"),
            Err(SchemaError::UnknownBuiltin(_))
        ));
    }
}
