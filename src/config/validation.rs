use crate::config::{Config, Operation};
use crate::error::{OrgBridgeError, Result};
use crate::soql::SoqlQuery;
use std::collections::HashSet;

/// Validates a loaded configuration before any plan is built. All problems
/// are collected first so one run surfaces every mistake.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        if config.objects.is_empty() {
            errors.push("At least one object must be configured".to_string());
        }

        if config.source.describe_label() == config.target.describe_label() {
            errors.push(format!(
                "Source and target endpoints are identical: {}",
                config.source.describe_label()
            ));
        }

        let mut seen: HashSet<String> = HashSet::new();
        for (i, object) in config.objects.iter().enumerate() {
            let query = match SoqlQuery::parse(&object.query) {
                Ok(q) => q,
                Err(e) => {
                    errors.push(format!("Object {}: {}", i, e));
                    continue;
                }
            };

            if !seen.insert(query.object.clone()) {
                errors.push(format!(
                    "Object '{}' is declared more than once",
                    query.object
                ));
            }

            if object.operation == Operation::Delete
                && object.delete_query.is_none()
                && query.where_clause.is_none()
            {
                errors.push(format!(
                    "Object '{}': delete operation needs a delete_query or a filtered query",
                    query.object
                ));
            }

            if let Some(dq) = &object.delete_query {
                if let Err(e) = SoqlQuery::parse(dq) {
                    errors.push(format!("Object '{}' delete_query: {}", query.object, e));
                }
            }

            if let Some(ext) = &object.external_id {
                if ext.is_empty() {
                    errors.push(format!("Object '{}': empty external_id", query.object));
                }
            }

            for mock in &object.mock_fields {
                if crate::mock::MockPattern::parse(&mock.pattern).is_none() {
                    errors.push(format!(
                        "Object '{}': unknown mock pattern '{}' for field '{}'",
                        query.object, mock.pattern, mock.field
                    ));
                }
            }
        }

        if config.settings.bulk_threshold == 0 {
            errors.push("settings.bulk_threshold must be > 0".to_string());
        }
        if config.settings.rest_batch_size == 0 || config.settings.bulk_batch_size == 0 {
            errors.push("engine batch sizes must be > 0".to_string());
        }

        if !errors.is_empty() {
            return Err(OrgBridgeError::Validation(errors.join("; ")));
        }

        Ok(())
    }
}
