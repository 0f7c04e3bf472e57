//! # Semantic Contexts
//!
//! The predicate guard attached to a configuration. Configuration sets only
//! need three things from it: structural equality (two configurations merge
//! only under equal guards), the [`SemanticContext::Always`] sentinel (sets
//! track whether any guard is non-trivial), and a textual form for
//! diagnostics and deterministic ordering.
//!
//! Evaluating predicates belongs to the prediction engine and is not done
//! here.

use smallvec::SmallVec;
use std::fmt;
use std::sync::{Arc, OnceLock};

type Operands = SmallVec<[Arc<SemanticContext>; 2]>;

/// A predicate expression guarding a configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticContext {
    /// Unconditionally true
    Always,

    /// A user predicate, identified by its rule and index within the rule
    Predicate {
        rule_index: u32,
        pred_index: u32,
        /// Whether evaluation depends on the rule invocation context
        ctx_dependent: bool,
    },

    /// Operator precedence check `precedence >= _p`
    Precedence { precedence: i32 },

    /// All operands must hold
    And(Operands),

    /// At least one operand must hold
    Or(Operands),
}

static ALWAYS: OnceLock<Arc<SemanticContext>> = OnceLock::new();

impl SemanticContext {
    /// The shared always-true sentinel
    #[must_use]
    pub fn always() -> Arc<Self> {
        Arc::clone(ALWAYS.get_or_init(|| Arc::new(Self::Always)))
    }

    /// A user predicate
    #[must_use]
    pub fn predicate(rule_index: u32, pred_index: u32, ctx_dependent: bool) -> Arc<Self> {
        Arc::new(Self::Predicate {
            rule_index,
            pred_index,
            ctx_dependent,
        })
    }

    /// A precedence predicate
    #[must_use]
    pub fn precedence(precedence: i32) -> Arc<Self> {
        Arc::new(Self::Precedence { precedence })
    }

    /// Whether this is the always-true sentinel
    #[must_use]
    pub const fn is_always(&self) -> bool {
        matches!(self, Self::Always)
    }

    /// Conjunction of two contexts
    ///
    /// `Always` is the identity; nested conjunctions are flattened and
    /// duplicate operands dropped.
    #[must_use]
    pub fn and(left: &Arc<Self>, right: &Arc<Self>) -> Arc<Self> {
        if left.is_always() {
            return Arc::clone(right);
        }
        if right.is_always() || left == right {
            return Arc::clone(left);
        }
        let mut operands = Operands::new();
        for side in [left, right] {
            match &**side {
                Self::And(inner) => inner.iter().for_each(|op| push_unique(&mut operands, op)),
                _ => push_unique(&mut operands, side),
            }
        }
        Arc::new(Self::And(operands))
    }

    /// Disjunction of two contexts
    ///
    /// `Always` absorbs; nested disjunctions are flattened and duplicate
    /// operands dropped.
    #[must_use]
    pub fn or(left: &Arc<Self>, right: &Arc<Self>) -> Arc<Self> {
        if left.is_always() || right.is_always() {
            return Self::always();
        }
        if left == right {
            return Arc::clone(left);
        }
        let mut operands = Operands::new();
        for side in [left, right] {
            match &**side {
                Self::Or(inner) => inner.iter().for_each(|op| push_unique(&mut operands, op)),
                _ => push_unique(&mut operands, side),
            }
        }
        Arc::new(Self::Or(operands))
    }
}

fn push_unique(operands: &mut Operands, candidate: &Arc<SemanticContext>) {
    if !operands.iter().any(|op| op == candidate) {
        operands.push(Arc::clone(candidate));
    }
}

impl fmt::Display for SemanticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("{true}?"),
            Self::Predicate {
                rule_index,
                pred_index,
                ctx_dependent,
            } => {
                write!(f, "{{{rule_index}:{pred_index}}}?")?;
                if *ctx_dependent {
                    f.write_str("@")?;
                }
                Ok(())
            }
            Self::Precedence { precedence } => write!(f, "{{{precedence}>=prec}}?"),
            Self::And(operands) => write_joined(f, operands, "&&"),
            Self::Or(operands) => write_joined(f, operands, "||"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, operands: &Operands, separator: &str) -> fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{operand}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_sentinel() {
        assert!(SemanticContext::always().is_always());
        assert!(Arc::ptr_eq(
            &SemanticContext::always(),
            &SemanticContext::always()
        ));
        assert!(!SemanticContext::predicate(0, 0, false).is_always());
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(
            SemanticContext::predicate(1, 2, false),
            SemanticContext::predicate(1, 2, false)
        );
        assert_ne!(
            SemanticContext::predicate(1, 2, false),
            SemanticContext::predicate(1, 3, false)
        );
    }

    #[test]
    fn test_and_or_simplification() {
        let always = SemanticContext::always();
        let p = SemanticContext::predicate(0, 1, false);
        let q = SemanticContext::predicate(0, 2, false);

        assert_eq!(SemanticContext::and(&always, &p), p);
        assert_eq!(SemanticContext::and(&p, &p), p);
        assert!(SemanticContext::or(&p, &always).is_always());

        let both = SemanticContext::and(&p, &q);
        let again = SemanticContext::and(&both, &p);
        assert_eq!(both, again);
        assert_eq!(both.to_string(), "{0:1}?&&{0:2}?");

        let either = SemanticContext::or(&p, &q);
        assert_eq!(either.to_string(), "{0:1}?||{0:2}?");
    }

    #[test]
    fn test_display() {
        assert_eq!(SemanticContext::Always.to_string(), "{true}?");
        assert_eq!(SemanticContext::predicate(3, 0, true).to_string(), "{3:0}?@");
        assert_eq!(SemanticContext::precedence(2).to_string(), "{2>=prec}?");
    }
}
