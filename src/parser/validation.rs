// ABOUTME: Schema validation for raw template documents
// ABOUTME: Collects every structural violation plus tooling warnings before interpolation

use serde_json::{Map, Value};

use super::error::{ParserError, Result, SchemaViolation};

pub const TEMPLATE_VERSION: &str = "1";

const TOP_LEVEL_FIELDS: [&str; 6] = [
    "version",
    "name",
    "description",
    "destination",
    "variables",
    "message",
];

const DECLARATION_FIELDS: [&str; 3] = ["description", "default", "required"];

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<SchemaViolation>,
    pub warnings: Vec<String>,
    pub is_valid: bool,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            is_valid: true,
        }
    }

    fn error(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(SchemaViolation::new(field, reason));
    }

    /// Turn a failed report into a schema error, keeping warnings on success
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid {
            Ok(self.warnings)
        } else {
            Err(ParserError::SchemaInvalid {
                violations: self.errors,
            })
        }
    }
}

pub struct SchemaValidator {
    strict_mode: bool,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self { strict_mode: false }
    }

    /// In strict mode unknown top-level fields are errors instead of warnings
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Validate a raw parsed document against the template shape
    pub fn validate(&self, document: &Value) -> ValidationReport {
        let mut report = ValidationReport::new();

        let Some(root) = document.as_object() else {
            report.error("$", "template must be a mapping");
            report.is_valid = false;
            return report;
        };

        self.validate_version(root, &mut report);
        self.validate_name(root, &mut report);
        self.validate_description(root, &mut report);
        self.validate_destination(root, &mut report);
        self.validate_variables(root, &mut report);
        self.validate_message(root, &mut report);
        self.check_unknown_fields(root, &mut report);

        report.is_valid = report.errors.is_empty();
        report
    }

    fn validate_version(&self, root: &Map<String, Value>, report: &mut ValidationReport) {
        match root.get("version") {
            None => report.error("version", "is required"),
            Some(Value::String(version)) if version == TEMPLATE_VERSION => {}
            Some(Value::Number(number)) if number.as_u64() == Some(1) => {}
            Some(other) => report.error(
                "version",
                format!("unsupported version {}, expected \"{}\"", other, TEMPLATE_VERSION),
            ),
        }
    }

    fn validate_name(&self, root: &Map<String, Value>, report: &mut ValidationReport) {
        match root.get("name") {
            None => report.error("name", "is required"),
            Some(Value::String(name)) if name.trim().is_empty() => {
                report.error("name", "cannot be empty")
            }
            Some(Value::String(_)) => {}
            Some(_) => report.error("name", "must be a string"),
        }
    }

    fn validate_description(&self, root: &Map<String, Value>, report: &mut ValidationReport) {
        match root.get("description") {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => report.error("description", "must be a string"),
        }
    }

    fn validate_destination(&self, root: &Map<String, Value>, report: &mut ValidationReport) {
        let destination = match root.get("destination") {
            None => return report.error("destination", "is required"),
            Some(Value::Object(destination)) => destination,
            Some(_) => return report.error("destination", "must be a mapping"),
        };

        match destination.get("service") {
            None => report.error("destination.service", "is required"),
            Some(Value::String(service)) if service.trim().is_empty() => {
                report.error("destination.service", "cannot be empty")
            }
            Some(Value::String(_)) => {}
            Some(_) => report.error("destination.service", "must be a string"),
        }
    }

    fn validate_variables(&self, root: &Map<String, Value>, report: &mut ValidationReport) {
        let variables = match root.get("variables") {
            None | Some(Value::Null) => return,
            Some(Value::Object(variables)) => variables,
            Some(_) => return report.error("variables", "must be a mapping"),
        };

        for (name, declaration) in variables {
            let field = format!("variables.{}", name);
            if name.trim().is_empty() {
                report.error("variables", "variable names cannot be empty");
                continue;
            }

            let Some(declaration) = declaration.as_object() else {
                report.error(field, "declaration must be a mapping");
                continue;
            };

            match declaration.get("description") {
                None | Some(Value::Null) | Some(Value::String(_)) => {}
                Some(_) => report.error(format!("{}.description", field), "must be a string"),
            }
            match declaration.get("default") {
                None | Some(Value::Null) | Some(Value::String(_)) => {}
                Some(_) => report.error(format!("{}.default", field), "must be a string"),
            }
            match declaration.get("required") {
                None | Some(Value::Null) | Some(Value::Bool(_)) => {}
                Some(_) => report.error(format!("{}.required", field), "must be a boolean"),
            }

            for key in declaration.keys() {
                if !DECLARATION_FIELDS.contains(&key.as_str()) {
                    report.error(format!("{}.{}", field, key), "unknown field");
                }
            }

            let has_default = matches!(declaration.get("default"), Some(Value::String(_)));
            if has_default && declaration.get("required") == Some(&Value::Bool(true)) {
                report.warnings.push(format!(
                    "variable '{}' is marked required but has a default; the default always applies",
                    name
                ));
            }
        }
    }

    fn validate_message(&self, root: &Map<String, Value>, report: &mut ValidationReport) {
        match root.get("message") {
            None => report.error("message", "is required"),
            Some(Value::Object(_)) => {}
            Some(_) => report.error("message", "must be a mapping"),
        }
    }

    fn check_unknown_fields(&self, root: &Map<String, Value>, report: &mut ValidationReport) {
        for key in root.keys() {
            if TOP_LEVEL_FIELDS.contains(&key.as_str()) {
                continue;
            }
            if self.strict_mode {
                report.error(key.clone(), "unknown field");
            } else {
                report
                    .warnings
                    .push(format!("unknown top-level field '{}' is ignored", key));
            }
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}
