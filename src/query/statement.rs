use serde_json::Value;
use std::fmt;

/// Right-hand side of a `SET` assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum SetExpression {
    /// `path = path + amount` (or `- amount` when negative).
    Add(i64),
    /// `path = ARRAY_APPEND(path, element)`.
    ArrayAppend(Value),
}

/// One item of the `RETURNING` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// The value at `path`, keyed by its last segment.
    Field(String),
    /// `path[-1] AS alias`.
    LastElement { path: String, alias: String },
    /// `meta(alias).id`, keyed as `id`.
    MetaId,
}

impl Projection {
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }

    pub fn last_element(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::LastElement {
            path: path.into(),
            alias: alias.into(),
        }
    }

    /// Key under which the projected value appears in a returned row.
    pub fn output_key(&self) -> &str {
        match self {
            Self::Field(path) => path.rsplit('.').next().unwrap_or(path),
            Self::LastElement { alias, .. } => alias,
            Self::MetaId => crate::core::ID_FIELD,
        }
    }
}

/// Builder for single-key update-and-return statements.
///
/// ```
/// use bucketlink::query::{Projection, SetExpression, UpdateStatement};
///
/// let statement = UpdateStatement::new("crowd", "stats")
///     .use_keys("s1")
///     .set("enrollments_count", SetExpression::Add(1))
///     .returning(Projection::field("enrollments_count"))
///     .returning(Projection::MetaId);
///
/// assert_eq!(
///     statement.build(),
///     "UPDATE crowd stats USE KEYS \"s1\" SET enrollments_count = enrollments_count + 1 \
///      RETURNING enrollments_count, meta(stats).id"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    keyspace: String,
    alias: String,
    key: String,
    set_clause: Vec<(String, SetExpression)>,
    returning: Vec<Projection>,
}

impl UpdateStatement {
    pub fn new(keyspace: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            alias: alias.into(),
            key: String::new(),
            set_clause: Vec::new(),
            returning: Vec::new(),
        }
    }

    pub fn use_keys(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn set(mut self, path: impl Into<String>, expression: SetExpression) -> Self {
        self.set_clause.push((path.into(), expression));
        self
    }

    pub fn returning(mut self, projection: Projection) -> Self {
        self.returning.push(projection);
        self
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn assignments(&self) -> &[(String, SetExpression)] {
        &self.set_clause
    }

    pub fn projections(&self) -> &[Projection] {
        &self.returning
    }

    pub fn build(&self) -> String {
        let set_parts: Vec<String> = self
            .set_clause
            .iter()
            .map(|(path, expression)| match expression {
                SetExpression::Add(amount) if *amount < 0 => {
                    format!("{path} = {path} - {}", amount.unsigned_abs())
                }
                SetExpression::Add(amount) => format!("{path} = {path} + {amount}"),
                SetExpression::ArrayAppend(element) => {
                    format!("{path} = ARRAY_APPEND({path}, {element})")
                }
            })
            .collect();

        let returning_parts: Vec<String> = self
            .returning
            .iter()
            .map(|projection| match projection {
                Projection::Field(path) => path.clone(),
                Projection::LastElement { path, alias } => format!("{path}[-1] AS {alias}"),
                Projection::MetaId => format!("meta({}).id", self.alias),
            })
            .collect();

        let returning_part = if returning_parts.is_empty() {
            String::new()
        } else {
            format!(" RETURNING {}", returning_parts.join(", "))
        };

        format!(
            "UPDATE {} {} USE KEYS {} SET {}{}",
            self.keyspace,
            self.alias,
            quote_key(&self.key),
            set_parts.join(", "),
            returning_part
        )
    }
}

impl fmt::Display for UpdateStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

fn quote_key(key: &str) -> String {
    Value::String(key.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counter_statement() {
        let sql = UpdateStatement::new("crowd", "result")
            .use_keys("r1")
            .set("contributions_count", SetExpression::Add(1))
            .returning(Projection::field("contributions_count"))
            .returning(Projection::MetaId)
            .build();

        assert_eq!(
            sql,
            "UPDATE crowd result USE KEYS \"r1\" SET contributions_count = contributions_count + 1 \
             RETURNING contributions_count, meta(result).id"
        );
    }

    #[test]
    fn test_decrement_renders_minus() {
        let sql = UpdateStatement::new("crowd", "stats")
            .use_keys("s1")
            .set("enrollments_count", SetExpression::Add(-1))
            .build();

        assert_eq!(
            sql,
            "UPDATE crowd stats USE KEYS \"s1\" SET enrollments_count = enrollments_count - 1"
        );
    }

    #[test]
    fn test_array_append_statement() {
        let sql = UpdateStatement::new("crowd", "result")
            .use_keys("r1")
            .set(
                "results.yes",
                SetExpression::ArrayAppend(json!({"lat": 1, "lng": 2})),
            )
            .returning(Projection::last_element("results.yes", "location"))
            .returning(Projection::MetaId)
            .build();

        assert_eq!(
            sql,
            "UPDATE crowd result USE KEYS \"r1\" SET results.yes = ARRAY_APPEND(results.yes, {\"lat\":1,\"lng\":2}) \
             RETURNING results.yes[-1] AS location, meta(result).id"
        );
    }

    #[test]
    fn test_key_is_escaped() {
        let sql = UpdateStatement::new("crowd", "result")
            .use_keys("r\"1")
            .set("n", SetExpression::Add(1))
            .build();

        assert!(sql.contains("USE KEYS \"r\\\"1\""));
    }

    #[test]
    fn test_output_keys() {
        assert_eq!(Projection::field("results.yes").output_key(), "yes");
        assert_eq!(Projection::field("count").output_key(), "count");
        assert_eq!(
            Projection::last_element("results.no", "location").output_key(),
            "location"
        );
        assert_eq!(Projection::MetaId.output_key(), "id");
    }
}
