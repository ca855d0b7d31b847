//! Saving-throw vocabulary shared by hazards and the recovery roll.

use strum::{Display, EnumIter, EnumString};

/// Saving throw a hazard is resisted with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SaveType {
    Fortitude,
    Reflex,
    Will,
}

/// Outcome of a check against a DC.
///
/// Ordered from worst to best so `>=` comparisons read naturally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "camelCase")]
pub enum DegreeOfSuccess {
    CriticalFailure,
    Failure,
    Success,
    CriticalSuccess,
}

impl DegreeOfSuccess {
    /// Degree for a check total against `dc`.
    ///
    /// Beating the DC by 10 or more is a critical success, missing it by 10 or
    /// more a critical failure. A natural 20 improves the result one step and
    /// a natural 1 worsens it one step.
    pub fn from_check(total: i32, dc: i32, natural: u8) -> Self {
        let base = if total >= dc.saturating_add(10) {
            Self::CriticalSuccess
        } else if total >= dc {
            Self::Success
        } else if total <= dc.saturating_sub(10) {
            Self::CriticalFailure
        } else {
            Self::Failure
        };

        match natural {
            20 => base.improved(),
            1 => base.worsened(),
            _ => base,
        }
    }

    pub fn is_success(self) -> bool {
        self >= Self::Success
    }

    pub fn improved(self) -> Self {
        match self {
            Self::CriticalFailure => Self::Failure,
            Self::Failure => Self::Success,
            Self::Success | Self::CriticalSuccess => Self::CriticalSuccess,
        }
    }

    pub fn worsened(self) -> Self {
        match self {
            Self::CriticalFailure | Self::Failure => Self::CriticalFailure,
            Self::Success => Self::Failure,
            Self::CriticalSuccess => Self::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn degree_thresholds() {
        assert_eq!(DegreeOfSuccess::from_check(25, 15, 10), DegreeOfSuccess::CriticalSuccess);
        assert_eq!(DegreeOfSuccess::from_check(15, 15, 10), DegreeOfSuccess::Success);
        assert_eq!(DegreeOfSuccess::from_check(14, 15, 10), DegreeOfSuccess::Failure);
        assert_eq!(DegreeOfSuccess::from_check(5, 15, 10), DegreeOfSuccess::CriticalFailure);
    }

    #[test]
    fn natural_rolls_shift_one_step() {
        assert_eq!(DegreeOfSuccess::from_check(14, 15, 20), DegreeOfSuccess::Success);
        assert_eq!(DegreeOfSuccess::from_check(16, 15, 1), DegreeOfSuccess::Failure);
        assert_eq!(DegreeOfSuccess::from_check(40, 15, 20), DegreeOfSuccess::CriticalSuccess);
    }

    #[test]
    fn extreme_dcs_saturate() {
        assert_eq!(
            DegreeOfSuccess::from_check(15, i32::MAX, 10),
            DegreeOfSuccess::CriticalFailure
        );
        assert_eq!(
            DegreeOfSuccess::from_check(i32::MAX, i32::MAX, 10),
            DegreeOfSuccess::CriticalSuccess
        );
        assert_eq!(
            DegreeOfSuccess::from_check(0, i32::MIN, 10),
            DegreeOfSuccess::CriticalSuccess
        );
    }

    #[test]
    fn save_type_parses_case_insensitively() {
        assert_eq!(SaveType::from_str("Fortitude").unwrap(), SaveType::Fortitude);
        assert_eq!(SaveType::Will.to_string(), "will");
        assert!(DegreeOfSuccess::Success.is_success());
        assert!(!DegreeOfSuccess::Failure.is_success());
    }
}
