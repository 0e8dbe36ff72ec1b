//! Builder for the search endpoint's `facets` filter expression.
//!
//! # Design
//! A filter is a conjunction of groups, and each group is a disjunction of
//! clauses (conjunctive normal form). This is exactly what the search backend
//! accepts, so the builder is a closed two-level structure rather than a
//! general boolean tree:
//!
//! ```text
//! [["categories=fabric","categories=quilt"],["versions=1.19.4"]]
//!  \______________ OR ________________/   AND  \___ OR ___/
//! ```
//!
//! Output is a pure function of insertion order. Keys and values are written
//! verbatim: a `"`, `,` or `]` inside a value is not escaped and will produce
//! an expression the server rejects.

use std::fmt;

/// Comparison operator of a single facet clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl FacetOp {
    pub fn symbol(self) -> &'static str {
        match self {
            FacetOp::Equal => "=",
            FacetOp::NotEqual => "!=",
            FacetOp::Less => "<",
            FacetOp::LessOrEqual => "<=",
            FacetOp::Greater => ">",
            FacetOp::GreaterOrEqual => ">=",
        }
    }
}

impl fmt::Display for FacetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Comparisons of one facet key against one or more values.
///
/// Every value passed to an operator method becomes its own clause, so
/// `FacetProp::categories().equal(["fabric", "quilt"])` renders as
/// `"categories=fabric","categories=quilt"`. Clauses keep the operator that
/// produced them, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetProp {
    key: String,
    clauses: Vec<(FacetOp, String)>,
}

impl FacetProp {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            clauses: Vec::new(),
        }
    }

    pub fn project_type() -> Self {
        Self::new("project_type")
    }

    pub fn versions() -> Self {
        Self::new("versions")
    }

    pub fn categories() -> Self {
        Self::new("categories")
    }

    pub fn client_side() -> Self {
        Self::new("client_side")
    }

    pub fn server_side() -> Self {
        Self::new("server_side")
    }

    pub fn open_source() -> Self {
        Self::new("open_source")
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Operator and value of each clause, in insertion order.
    pub fn clauses(&self) -> &[(FacetOp, String)] {
        &self.clauses
    }

    pub fn equal<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(FacetOp::Equal, values)
    }

    pub fn not_equal<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(FacetOp::NotEqual, values)
    }

    pub fn less<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(FacetOp::Less, values)
    }

    pub fn less_or_equal<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(FacetOp::LessOrEqual, values)
    }

    pub fn greater<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(FacetOp::Greater, values)
    }

    pub fn greater_or_equal<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(FacetOp::GreaterOrEqual, values)
    }

    fn push<I, S>(mut self, op: FacetOp, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses
            .extend(values.into_iter().map(|value| (op, value.into())));
        self
    }
}

/// Renders the clauses joined by `,`, each as `"<key><op><value>"`.
impl fmt::Display for FacetProp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (op, value)) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "\"{}{}{}\"", self.key, op, value)?;
        }
        Ok(())
    }
}

/// AND of OR-groups of facet clauses.
///
/// Each call to [`Facets::and`] adds one group; every clause of every prop in
/// that group is an alternative. An empty group is kept and renders as `[]`,
/// as does a group whose props have no clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    groups: Vec<Vec<FacetProp>>,
}

impl Facets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder whose first group is `props`.
    pub fn with_group(props: impl IntoIterator<Item = FacetProp>) -> Self {
        Self::new().and(props)
    }

    pub fn and(mut self, props: impl IntoIterator<Item = FacetProp>) -> Self {
        self.groups.push(props.into_iter().collect());
        self
    }

    pub fn groups(&self) -> &[Vec<FacetProp>] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl fmt::Display for Facets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str("[")?;
            // Props without clauses contribute nothing, separator included.
            let members = group.iter().filter(|prop| !prop.clauses.is_empty());
            for (j, prop) in members.enumerate() {
                if j > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{prop}")?;
            }
            f.write_str("]")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_operator_renders_its_symbol() {
        let cases = [
            (FacetProp::new("k").equal(["v"]), r#""k=v""#),
            (FacetProp::new("k").not_equal(["v"]), r#""k!=v""#),
            (FacetProp::new("k").less(["v"]), r#""k<v""#),
            (FacetProp::new("k").less_or_equal(["v"]), r#""k<=v""#),
            (FacetProp::new("k").greater(["v"]), r#""k>v""#),
            (FacetProp::new("k").greater_or_equal(["v"]), r#""k>=v""#),
        ];
        for (prop, expected) in cases {
            assert_eq!(prop.to_string(), expected);
        }
    }

    #[test]
    fn one_clause_per_value() {
        let prop = FacetProp::versions().greater(["1.18", "1.19", "1.20"]);
        assert_eq!(prop.clauses().len(), 3);
        assert!(prop.clauses().iter().all(|(op, _)| *op == FacetOp::Greater));
        assert_eq!(
            prop.to_string(),
            r#""versions>1.18","versions>1.19","versions>1.20""#
        );
    }

    #[test]
    fn repeated_calls_accumulate() {
        let prop = FacetProp::categories().equal(["a"]).equal(["b"]);
        assert_eq!(prop.to_string(), r#""categories=a","categories=b""#);
    }

    #[test]
    fn mixed_operators_keep_call_order() {
        let prop = FacetProp::categories()
            .equal(["fabric"])
            .not_equal(["forge"])
            .equal(["quilt"]);
        assert_eq!(
            prop.to_string(),
            r#""categories=fabric","categories!=forge","categories=quilt""#
        );
    }

    #[test]
    fn empty_value_is_accepted() {
        let prop = FacetProp::new("license").equal([""]);
        assert_eq!(prop.to_string(), r#""license=""#);
    }

    #[test]
    fn no_values_renders_nothing() {
        let prop = FacetProp::open_source().equal(Vec::<String>::new());
        assert!(prop.clauses().is_empty());
        assert_eq!(prop.to_string(), "");
    }

    #[test]
    fn named_constructors_bind_keys() {
        assert_eq!(FacetProp::project_type().key(), "project_type");
        assert_eq!(FacetProp::versions().key(), "versions");
        assert_eq!(FacetProp::categories().key(), "categories");
        assert_eq!(FacetProp::client_side().key(), "client_side");
        assert_eq!(FacetProp::server_side().key(), "server_side");
        assert_eq!(FacetProp::open_source().key(), "open_source");
    }

    #[test]
    fn empty_builder_is_bare_brackets() {
        let facets = Facets::new();
        assert!(facets.is_empty());
        assert_eq!(facets.to_string(), "[]");
    }

    #[test]
    fn single_clause() {
        let facets = Facets::with_group([FacetProp::new("key").equal(["value"])]);
        assert_eq!(facets.to_string(), r#"[["key=value"]]"#);
    }

    #[test]
    fn groups_are_anded_and_values_ored() {
        let facets = Facets::new()
            .and([FacetProp::new("k1").equal(["a", "b"])])
            .and([FacetProp::new("k2").equal(["c", "d"])]);
        assert_eq!(facets.to_string(), r#"[["k1=a","k1=b"],["k2=c","k2=d"]]"#);
    }

    #[test]
    fn search_example() {
        let facets = Facets::new()
            .and([FacetProp::project_type().equal(["mod"])])
            .and([
                FacetProp::categories().equal(["fabric"]),
                FacetProp::categories().equal(["quilt"]),
            ])
            .and([FacetProp::versions().equal(["1.19.4"])]);
        assert_eq!(
            facets.to_string(),
            r#"[["project_type=mod"],["categories=fabric","categories=quilt"],["versions=1.19.4"]]"#
        );
    }

    #[test]
    fn empty_group_is_kept() {
        let facets = Facets::new()
            .and([FacetProp::versions().equal(["1.20"])])
            .and(Vec::<FacetProp>::new());
        assert_eq!(facets.groups().len(), 2);
        assert_eq!(facets.to_string(), r#"[["versions=1.20"],[]]"#);
    }

    #[test]
    fn props_without_clauses_leave_no_separator() {
        let mixed = Facets::with_group([
            FacetProp::categories().equal(Vec::<String>::new()),
            FacetProp::categories().equal(["fabric"]),
        ]);
        assert_eq!(mixed.to_string(), r#"[["categories=fabric"]]"#);

        let trailing = Facets::with_group([
            FacetProp::categories().equal(["fabric"]),
            FacetProp::open_source(),
            FacetProp::categories().equal(["quilt"]),
        ]);
        assert_eq!(
            trailing.to_string(),
            r#"[["categories=fabric","categories=quilt"]]"#
        );

        let only_empty = Facets::with_group([FacetProp::open_source(), FacetProp::versions()]);
        assert_eq!(only_empty.groups()[0].len(), 2);
        assert_eq!(only_empty.to_string(), "[[]]");
    }

    #[test]
    fn serialization_is_repeatable() {
        let facets = Facets::with_group([FacetProp::server_side().not_equal(["unsupported"])]);
        let before = facets.clone();
        let first = facets.to_string();
        let second = facets.to_string();
        assert_eq!(first, second);
        assert_eq!(facets, before);
    }

    #[test]
    fn insertion_order_is_significant() {
        let a = Facets::new()
            .and([FacetProp::versions().equal(["1.20"])])
            .and([FacetProp::project_type().equal(["mod"])]);
        let b = Facets::new()
            .and([FacetProp::project_type().equal(["mod"])])
            .and([FacetProp::versions().equal(["1.20"])]);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn values_are_not_escaped() {
        let facets = Facets::with_group([FacetProp::new("title").equal([r#"a"b"#])]);
        assert_eq!(facets.to_string(), r#"[["title=a"b"]]"#);
    }

    #[test]
    fn builder_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Facets>();
        assert_send_sync::<FacetProp>();
    }
}
