//! Stage damage composition.
//!
//! A stage may list several damage entries; they are folded into a single
//! composite expression, one group per damage type and category, and handed to
//! the host's damage evaluator in one call.
//!
//! ```text
//! [1d6 poison, 1d4 poison, 2 persistent fire]
//!     → {(1d6 + 1d4)[poison],(2)[persistent,fire]}
//! ```
//!
//! Rolling is the evaluator's job. The only arithmetic done here is
//! [`expected_value`], the mean used to rank persistent damage.

use std::fmt;

use crate::error::{ErrorSeverity, StatusError};
use crate::state::{DamageCategory, DamageEntry};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("damage formula is empty")]
    Empty,

    #[error("malformed damage formula `{formula}`: {reason}")]
    Malformed { formula: String, reason: &'static str },

    #[error("damage formula `{formula}` could not be evaluated: {reason}")]
    Unevaluable { formula: String, reason: String },
}

impl StatusError for FormulaError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "FORMULA_EMPTY",
            Self::Malformed { .. } => "FORMULA_MALFORMED",
            Self::Unevaluable { .. } => "FORMULA_UNEVALUABLE",
        }
    }
}

/// Result reported by a damage evaluator.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageResult {
    pub total: i64,
    pub breakdown: String,
}

/// Formulas of one damage type and category.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageGroup {
    pub damage_type: String,
    pub category: Option<DamageCategory>,
    pub formulas: Vec<String>,
}

impl DamageGroup {
    /// The group's formulas joined into one sum.
    pub fn formula(&self) -> String {
        self.formulas.join(" + ")
    }
}

impl fmt::Display for DamageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            Some(category) => write!(f, "({})[{},{}]", self.formula(), category, self.damage_type),
            None => write!(f, "({})[{}]", self.formula(), self.damage_type),
        }
    }
}

/// All of a stage's damage as one expression.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompositeDamage {
    pub groups: Vec<DamageGroup>,
}

impl fmt::Display for CompositeDamage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, group) in self.groups.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{group}")?;
        }
        write!(f, "}}")
    }
}

/// Folds damage entries into a composite, grouping by type and category in
/// first-seen order.
///
/// Returns `Ok(None)` when there is no damage to deal.
pub fn compose(entries: &[DamageEntry]) -> Result<Option<CompositeDamage>, FormulaError> {
    let mut groups: Vec<DamageGroup> = Vec::new();

    for entry in entries {
        let formula = validate_formula(&entry.formula)?;
        let damage_type = entry.damage_type.trim();
        if damage_type.is_empty() {
            return Err(FormulaError::Malformed {
                formula: entry.formula.clone(),
                reason: "missing damage type",
            });
        }

        match groups
            .iter_mut()
            .find(|g| g.damage_type == damage_type && g.category == entry.category)
        {
            Some(group) => group.formulas.push(formula.to_string()),
            None => groups.push(DamageGroup {
                damage_type: damage_type.to_string(),
                category: entry.category,
                formulas: vec![formula.to_string()],
            }),
        }
    }

    Ok((!groups.is_empty()).then_some(CompositeDamage { groups }))
}

fn validate_formula(formula: &str) -> Result<&str, FormulaError> {
    let trimmed = formula.trim();
    if trimmed.is_empty() {
        return Err(FormulaError::Empty);
    }

    let malformed = |reason| FormulaError::Malformed {
        formula: formula.to_string(),
        reason,
    };

    let mut depth = 0i32;
    for ch in trimmed.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(malformed("unbalanced parentheses"));
                }
            }
            c if c.is_ascii_alphanumeric() || c.is_whitespace() => {}
            '+' | '-' | '*' | '/' | '@' | '.' | '_' => {}
            _ => return Err(malformed("unexpected character")),
        }
    }
    if depth != 0 {
        return Err(malformed("unbalanced parentheses"));
    }
    if trimmed.ends_with(['+', '-', '*', '/']) {
        return Err(malformed("dangling operator"));
    }

    Ok(trimmed)
}

/// Mean of a simple dice expression: sums and differences of `NdM` terms and
/// integer constants.
pub fn expected_value(formula: &str) -> Result<f64, FormulaError> {
    let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(FormulaError::Empty);
    }

    let malformed = |reason| FormulaError::Malformed {
        formula: formula.to_string(),
        reason,
    };

    let mut total = 0.0;
    let mut sign = 1.0;
    let mut term = String::new();
    let mut terms = Vec::new();
    for ch in compact.chars() {
        match ch {
            '+' | '-' => {
                if term.is_empty() {
                    return Err(malformed("dangling operator"));
                }
                terms.push((sign, std::mem::take(&mut term)));
                sign = if ch == '-' { -1.0 } else { 1.0 };
            }
            _ => term.push(ch),
        }
    }
    if term.is_empty() {
        return Err(malformed("dangling operator"));
    }
    terms.push((sign, term));

    for (sign, term) in terms {
        total += sign * term_mean(&term).ok_or_else(|| FormulaError::Unevaluable {
            formula: formula.to_string(),
            reason: format!("unsupported term `{term}`"),
        })?;
    }

    Ok(total)
}

fn term_mean(term: &str) -> Option<f64> {
    match term.split_once(['d', 'D']) {
        Some((count, faces)) => {
            let count: u32 = if count.is_empty() { 1 } else { count.parse().ok()? };
            let faces: u32 = faces.parse().ok()?;
            if faces == 0 {
                return None;
            }
            Some(f64::from(count) * (f64::from(faces) + 1.0) / 2.0)
        }
        None => term.parse::<i64>().ok().map(|value| value as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_type_and_category() {
        let entries = [
            DamageEntry::new("1d6", "poison"),
            DamageEntry::new("2", "fire").with_category(DamageCategory::Persistent),
            DamageEntry::new("1d4", "poison"),
        ];

        let composite = compose(&entries).unwrap().expect("damage present");
        assert_eq!(composite.groups.len(), 2);
        assert_eq!(composite.groups[0].formula(), "1d6 + 1d4");
        assert_eq!(
            composite.to_string(),
            "{(1d6 + 1d4)[poison],(2)[persistent,fire]}"
        );
    }

    #[test]
    fn no_entries_means_no_damage() {
        assert_eq!(compose(&[]).unwrap(), None);
    }

    #[test]
    fn malformed_formulas_are_rejected() {
        let unbalanced = [DamageEntry::new("(1d6", "poison")];
        assert!(matches!(
            compose(&unbalanced),
            Err(FormulaError::Malformed { .. })
        ));

        let empty = [DamageEntry::new("  ", "poison")];
        assert_eq!(compose(&empty), Err(FormulaError::Empty));

        let untyped = [DamageEntry::new("1d6", "")];
        assert!(compose(&untyped).is_err());
    }

    #[test]
    fn expected_value_of_dice_and_constants() {
        assert_eq!(expected_value("1d6").unwrap(), 3.5);
        assert_eq!(expected_value("2d6 + 3").unwrap(), 10.0);
        assert_eq!(expected_value("d8-1").unwrap(), 3.5);
        assert!(expected_value("1d0").is_err());
        assert!(expected_value("1d6+").is_err());
        assert!(expected_value("").is_err());
    }
}
