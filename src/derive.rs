use rand::rngs::StdRng;

use crate::{
    error::ThreshError,
    expr::{self, Bindings, Expr, Value},
};

/// Right-hand side that removes a column instead of computing one.
pub const REMOVE_SENTINEL: &str = "None";

#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    Compute { expression: String, parsed: Expr },
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColumn {
    pub name: String,
    pub derivation: Derivation,
}

impl DerivedColumn {
    /// Parses `name=expression`. The expression is parsed eagerly so syntax
    /// errors surface before anything is evaluated.
    pub fn parse(spec: &str) -> Result<Self, ThreshError> {
        let invalid = |reason: &str| ThreshError::InvalidDescriptor {
            descriptor: spec.to_string(),
            reason: reason.to_string(),
        };
        let mut parts = spec.splitn(2, '=');
        let name = parts
            .next()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("no column label given"))?;
        if name.chars().any(char::is_whitespace) {
            return Err(invalid("column labels cannot contain whitespace"));
        }
        let expression = parts
            .next()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("no expression given"))?;

        let derivation = if expression == REMOVE_SENTINEL {
            Derivation::Remove
        } else {
            if !is_identifier(name) {
                return Err(invalid(
                    "computed column labels must be identifiers (letters, digits and '_', not starting with a digit)",
                ));
            }
            Derivation::Compute {
                expression: expression.to_string(),
                parsed: expr::parse(expression)?,
            }
        };
        Ok(DerivedColumn {
            name: name.to_string(),
            derivation,
        })
    }

    pub fn is_removal(&self) -> bool {
        matches!(self.derivation, Derivation::Remove)
    }

    /// Evaluates the expression; removals evaluate to `None`.
    pub fn evaluate(
        &self,
        bindings: &Bindings<'_>,
        rng: &mut StdRng,
    ) -> Result<Option<Value>, ThreshError> {
        match &self.derivation {
            Derivation::Remove => Ok(None),
            Derivation::Compute { expression, parsed } => {
                expr::evaluate_parsed(parsed, expression, bindings, rng).map(Some)
            }
        }
    }
}

/// Whether `label` can be referenced from a later expression. Removals
/// accept any label so oddly named input columns can still be dropped.
pub fn is_identifier(label: &str) -> bool {
    let mut chars = label.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !matches!(label, "and" | "or" | "not")
}
