//! Deterministic damage evaluation.

use async_trait::async_trait;
use status_core::{CompositeDamage, DamageResult, FormulaError, expected_value};

use crate::api::DamageEvaluator;

/// Evaluates every group to its rounded-down mean.
///
/// Useful for previews and tests where rolled dice would make results
/// unstable. Only `NdM` terms and integer constants are understood; anything
/// else is reported as unevaluable.
#[derive(Debug, Default, Clone, Copy)]
pub struct AverageDamageEvaluator;

#[async_trait]
impl DamageEvaluator for AverageDamageEvaluator {
    async fn evaluate(&self, damage: &CompositeDamage) -> Result<DamageResult, FormulaError> {
        let mut total = 0i64;
        let mut parts = Vec::with_capacity(damage.groups.len());

        for group in &damage.groups {
            let mut mean = 0.0;
            for formula in &group.formulas {
                mean += expected_value(formula)?;
            }
            let amount = (mean.floor() as i64).max(0);
            total += amount;
            match group.category {
                Some(category) => parts.push(format!("{amount} {category} {}", group.damage_type)),
                None => parts.push(format!("{amount} {}", group.damage_type)),
            }
        }

        Ok(DamageResult {
            total,
            breakdown: parts.join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use status_core::{DamageCategory, DamageEntry, compose};

    #[tokio::test]
    async fn sums_rounded_group_means() {
        let damage = compose(&[
            DamageEntry::new("1d6", "poison"),
            DamageEntry::new("1d4", "poison"),
            DamageEntry::new("1d6", "fire").with_category(DamageCategory::Persistent),
        ])
        .unwrap()
        .unwrap();

        let result = AverageDamageEvaluator.evaluate(&damage).await.unwrap();
        assert_eq!(result.total, 9);
        assert_eq!(result.breakdown, "6 poison, 3 persistent fire");
    }

    #[tokio::test]
    async fn unsupported_terms_are_unevaluable() {
        let damage = compose(&[DamageEntry::new("1d6*2", "poison")])
            .unwrap()
            .unwrap();

        assert!(matches!(
            AverageDamageEvaluator.evaluate(&damage).await,
            Err(FormulaError::Unevaluable { .. })
        ));
    }
}
