//! Query expressions for [`super::memory::MemoryDocumentStore`].
//!
//! The syntax is a small Lucene-style subset (see `query.pest`). Terms are
//! matched exactly and case-sensitively against [`DataValue::as_term`], with
//! no analysis.
//!
//! Negated clauses inside a disjunction behave like Lucene's prohibited
//! clauses: `section:news -status:archived` means "news, but not archived",
//! and a query made only of negations matches every document except the
//! excluded ones.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::data::DataValue;
use crate::error::{DocMergeError, Result};
use crate::store::StoredFields;

#[derive(Parser)]
#[grammar = "store/query.pest"]
struct QueryGrammar;

/// A parsed store query.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreQuery {
    All,
    Term { field: String, value: String },
    Prefix { field: String, prefix: String },
    Exists { field: String },
    And(Vec<StoreQuery>),
    Or(Vec<StoreQuery>),
    Not(Box<StoreQuery>),
}

impl StoreQuery {
    pub fn parse(expression: &str) -> Result<Self> {
        let mut pairs = QueryGrammar::parse(Rule::query, expression)
            .map_err(|e| DocMergeError::query_parse(expression, e.to_string()))?;

        let root = pairs
            .next()
            .and_then(|query| query.into_inner().next())
            .ok_or_else(|| DocMergeError::query_parse(expression, "empty query"))?;

        build(root, expression)
    }

    pub fn matches(&self, fields: &StoredFields) -> bool {
        match self {
            StoreQuery::All => true,
            StoreQuery::Term { field, value } => fields.has_term(field, value),
            StoreQuery::Prefix { field, prefix } => fields
                .values(field)
                .filter_map(DataValue::as_term)
                .any(|term| term.starts_with(prefix.as_str())),
            StoreQuery::Exists { field } => fields.contains(field),
            StoreQuery::And(clauses) => clauses.iter().all(|c| c.matches(fields)),
            StoreQuery::Or(clauses) => clauses.iter().any(|c| c.matches(fields)),
            StoreQuery::Not(inner) => !inner.matches(fields),
        }
    }
}

fn build(pair: Pair<Rule>, expression: &str) -> Result<StoreQuery> {
    match pair.as_rule() {
        Rule::or_expr => {
            let clauses = pair
                .into_inner()
                .filter(|p| p.as_rule() != Rule::or_op)
                .map(|p| build(p, expression))
                .collect::<Result<Vec<_>>>()?;
            Ok(disjunction(clauses))
        }
        Rule::and_expr => {
            let mut clauses = pair
                .into_inner()
                .filter(|p| p.as_rule() != Rule::and_op)
                .map(|p| build(p, expression))
                .collect::<Result<Vec<_>>>()?;
            if clauses.len() == 1 {
                Ok(clauses.remove(0))
            } else {
                Ok(StoreQuery::And(clauses))
            }
        }
        Rule::unary => {
            let mut inner = pair.into_inner();
            let first = next_pair(inner.next(), expression)?;
            if first.as_rule() == Rule::not_op {
                let operand = next_pair(inner.next(), expression)?;
                Ok(StoreQuery::Not(Box::new(build(operand, expression)?)))
            } else {
                build(first, expression)
            }
        }
        Rule::group => build(next_pair(pair.into_inner().next(), expression)?, expression),
        Rule::match_all => Ok(StoreQuery::All),
        Rule::field_clause => {
            let mut inner = pair.into_inner();
            let field = next_pair(inner.next(), expression)?.as_str().to_string();
            let value = next_pair(inner.next(), expression)?;
            match value.as_rule() {
                Rule::term => Ok(StoreQuery::Term {
                    field,
                    value: value.as_str().to_string(),
                }),
                Rule::phrase => {
                    let text = value.into_inner().next().map(|p| p.as_str()).unwrap_or("");
                    Ok(StoreQuery::Term {
                        field,
                        value: text.to_string(),
                    })
                }
                Rule::prefix => {
                    let prefix = next_pair(value.into_inner().next(), expression)?;
                    Ok(StoreQuery::Prefix {
                        field,
                        prefix: prefix.as_str().to_string(),
                    })
                }
                Rule::exists => Ok(StoreQuery::Exists { field }),
                other => Err(DocMergeError::query_parse(
                    expression,
                    format!("unexpected field value {other:?}"),
                )),
            }
        }
        other => Err(DocMergeError::query_parse(
            expression,
            format!("unexpected {other:?}"),
        )),
    }
}

fn next_pair<'i>(pair: Option<Pair<'i, Rule>>, expression: &str) -> Result<Pair<'i, Rule>> {
    pair.ok_or_else(|| DocMergeError::query_parse(expression, "incomplete expression"))
}

/// Combine disjunction clauses, treating negations as exclusions.
fn disjunction(clauses: Vec<StoreQuery>) -> StoreQuery {
    let (negative, mut positive): (Vec<_>, Vec<_>) = clauses
        .into_iter()
        .partition(|c| matches!(c, StoreQuery::Not(_)));

    let include = match positive.len() {
        0 => None,
        1 => positive.pop(),
        _ => Some(StoreQuery::Or(positive)),
    };

    match (include, negative.len()) {
        (Some(include), 0) => include,
        (None, 1) => negative.into_iter().next().unwrap_or(StoreQuery::All),
        (None, _) => StoreQuery::And(negative),
        (Some(include), _) => {
            let mut clauses = vec![include];
            clauses.extend(negative);
            StoreQuery::And(clauses)
        }
    }
}
