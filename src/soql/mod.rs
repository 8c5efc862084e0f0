pub mod chunker;

pub use chunker::*;

use crate::error::{OrgBridgeError, Result};
use serde::{Deserialize, Serialize};

/// Aggregate column name the count-only projection reports under
pub const COUNT_FIELD: &str = "expr0";

/// Structured query over one object. Queries are parsed once from the plan
/// document and recomposed per shape (full / count-only / chunked), never
/// manipulated as strings downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoqlQuery {
    pub object: String,
    pub fields: Vec<String>,
    pub where_clause: Option<String>,
    pub limit: Option<usize>,
}

impl SoqlQuery {
    pub fn all_records(object: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            object: object.into(),
            fields,
            where_clause: None,
            limit: None,
        }
    }

    /// Parse a `SELECT <fields> FROM <object> [WHERE <raw>] [LIMIT <n>]`
    /// statement. The WHERE body is kept raw; only the outer shape is
    /// structured.
    pub fn parse(query: &str) -> Result<Self> {
        let trimmed = query.trim();
        let lower = trimmed.to_lowercase();

        if !lower.starts_with("select ") {
            return Err(OrgBridgeError::Initialization(format!(
                "Malformed query, expected SELECT: '{}'",
                query
            )));
        }

        let from_pos = lower.find(" from ").ok_or_else(|| {
            OrgBridgeError::Initialization(format!("Malformed query, missing FROM: '{}'", query))
        })?;

        // A FROM directly after the keyword ("SELECT FROM x") puts the
        // match before the projection slice starts.
        let fields_part = if from_pos < 7 { "" } else { &trimmed[7..from_pos] };
        let fields: Vec<String> = fields_part
            .split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            return Err(OrgBridgeError::Initialization(format!(
                "Malformed query, empty field list: '{}'",
                query
            )));
        }

        let rest = trimmed[from_pos + 6..].trim();
        let rest_lower = rest.to_lowercase();

        let where_pos = rest_lower.find(" where ");
        let limit_pos = rest_lower.rfind(" limit ");

        let object_end = where_pos.or(limit_pos).unwrap_or(rest.len());
        let object = rest[..object_end].trim().to_string();
        if object.is_empty() || object.contains(' ') {
            return Err(OrgBridgeError::Initialization(format!(
                "Malformed query, bad object name: '{}'",
                query
            )));
        }

        let mut limit = None;
        let mut where_clause = None;

        if let Some(lp) = limit_pos {
            let limit_str = rest[lp + 7..].trim();
            limit = Some(limit_str.parse::<usize>().map_err(|_| {
                OrgBridgeError::Initialization(format!(
                    "Malformed query, bad LIMIT value: '{}'",
                    query
                ))
            })?);
        }

        if let Some(wp) = where_pos {
            let where_end = limit_pos.unwrap_or(rest.len());
            let clause = rest[wp + 7..where_end].trim();
            if !clause.is_empty() {
                where_clause = Some(clause.to_string());
            }
        }

        Ok(Self {
            object,
            fields,
            where_clause,
            limit,
        })
    }

    /// Same filters and limit, different projection
    pub fn with_fields(&self, fields: Vec<String>) -> Self {
        Self {
            object: self.object.clone(),
            fields,
            where_clause: self.where_clause.clone(),
            limit: self.limit,
        }
    }

    /// Count-only shape: same filters, single aggregate projection
    pub fn count_query(&self) -> Self {
        Self {
            object: self.object.clone(),
            fields: vec!["COUNT(Id) expr0".to_string()],
            where_clause: self.where_clause.clone(),
            limit: None,
        }
    }

    /// Serialize back to statement text
    pub fn compose(&self) -> String {
        let mut out = format!("SELECT {} FROM {}", self.fields.join(", "), self.object);
        if let Some(w) = &self.where_clause {
            out.push_str(" WHERE ");
            out.push_str(w);
        }
        if let Some(l) = self.limit {
            out.push_str(&format!(" LIMIT {}", l));
        }
        out
    }

    pub fn has_filter(&self) -> bool {
        self.where_clause.is_some() || self.limit.is_some()
    }
}
