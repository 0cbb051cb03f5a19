use crate::Value;

/// SQL parameter container.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Params {
    /// No parameters.
    #[default]
    Empty,
    /// Positional values mapped to `?` placeholders.
    Positional(Vec<Value>),
    /// Named values mapped to `:name` style placeholders; the prefix (`:`,
    /// `@`, `$`) is optional.
    Named(Vec<(String, Value)>),
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(values: [Value; N]) -> Self {
        Self::Positional(values.into())
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Value); N]> for Params {
    fn from(pairs: [(K, Value); N]) -> Self {
        Self::Named(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}

/// What a statement of a command is expected to produce.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatementKind {
    /// An update count.
    Update,
    /// A result set.
    Query,
    /// A procedure call whose output rows form the callable result.
    Call,
}

/// Single statement of a command.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
    pub kind: StatementKind,
}

impl Statement {
    pub fn update<P: Into<Params>>(sql: impl Into<String>, params: P) -> Self {
        Self::new(sql, params, StatementKind::Update)
    }

    pub fn query<P: Into<Params>>(sql: impl Into<String>, params: P) -> Self {
        Self::new(sql, params, StatementKind::Query)
    }

    pub fn call<P: Into<Params>>(sql: impl Into<String>, params: P) -> Self {
        Self::new(sql, params, StatementKind::Call)
    }

    fn new<P: Into<Params>>(sql: impl Into<String>, params: P, kind: StatementKind) -> Self {
        Self {
            sql: sql.into(),
            params: params.into(),
            kind,
        }
    }

    pub fn wants_rows(&self) -> bool {
        self.kind != StatementKind::Update
    }
}

#[cfg(test)]
mod tests {
    use crate::{Params, Statement, StatementKind, Value};

    #[test]
    fn named_from_pairs() {
        let params: Params = [("name", Value::text("kit"))].into();
        match params {
            Params::Named(values) => assert_eq!(values[0].0, "name"),
            _ => panic!("expected named"),
        }
    }

    #[test]
    fn statement_kinds() {
        assert!(!Statement::update("DELETE FROM t", ()).wants_rows());
        assert!(Statement::query("SELECT 1", ()).wants_rows());
        let call = Statement::call("SELECT * FROM out_params", [Value::from(1_i64)]);
        assert_eq!(call.kind, StatementKind::Call);
        assert!(call.wants_rows());
    }
}
