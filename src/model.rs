// File: ./src/model.rs
// Domain types for the exchange-rate and rounding configuration screen.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use strum::EnumIter;

/// Editable state of the rate screen. `original_value` is seeded exactly
/// once per screen activation from the authoritative remote value and is
/// never mutated afterwards; only `current_value` follows user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSnapshot {
    original_value: String,
    current_value: String,
}

impl RateSnapshot {
    pub fn new(remote_value: impl Into<String>) -> Self {
        let original = remote_value.into();
        Self {
            current_value: original.clone(),
            original_value: original,
        }
    }

    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    pub fn current_value(&self) -> &str {
        &self.current_value
    }

    pub fn set_current(&mut self, value: impl Into<String>) {
        self.current_value = value.into();
    }

    /// True when the user-edited value differs from the loaded one.
    pub fn is_dirty(&self) -> bool {
        self.current_value.trim() != self.original_value
    }

    /// True when a prior rate existed on the server to diff against.
    /// A fresh install reports an empty rate; saving then is always a
    /// simple update because there is nothing to cascade from.
    pub fn has_original(&self) -> bool {
        !self.original_value.is_empty()
    }
}

/// Returns true when `value` is a non-empty, syntactically valid decimal.
/// This must hold before any dispatch is attempted.
pub fn is_valid_rate(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && v.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
}

/// System-wide rounding of monetary totals (sale/consultation totals).
///
/// `Normal` rounds to the nearest whole unit; `ExcessN` rounds up to the
/// nearest multiple of N strictly above the amount, unless the amount is
/// already an exact multiple. The arithmetic is applied by the backend;
/// the client only surfaces and round-trips the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum RoundingOption {
    Normal,
    Excess5,
    Excess10,
    Excess20,
    Excess50,
}

impl RoundingOption {
    /// Name used by `PUT /redondeo/updateRedondeo` and returned by
    /// `GET /redondeo`.
    pub fn wire_name(&self) -> &'static str {
        match self {
            RoundingOption::Normal => "Normal",
            RoundingOption::Excess5 => "Excess5",
            RoundingOption::Excess10 => "Excess10",
            RoundingOption::Excess20 => "Excess20",
            RoundingOption::Excess50 => "Excess50",
        }
    }

    /// Unknown names decode to `None` (policy stays unconfigured) rather
    /// than failing the whole screen load.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim() {
            "Normal" => Some(RoundingOption::Normal),
            "Excess5" => Some(RoundingOption::Excess5),
            "Excess10" => Some(RoundingOption::Excess10),
            "Excess20" => Some(RoundingOption::Excess20),
            "Excess50" => Some(RoundingOption::Excess50),
            _ => None,
        }
    }
}

impl fmt::Display for RoundingOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingOption::Normal => write!(f, "Normal"),
            RoundingOption::Excess5 => write!(f, "Excess 5"),
            RoundingOption::Excess10 => write!(f, "Excess 10"),
            RoundingOption::Excess20 => write!(f, "Excess 20"),
            RoundingOption::Excess50 => write!(f, "Excess 50"),
        }
    }
}

/// Current rounding policy as configured on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingPolicy {
    pub option: RoundingOption,
    /// When true, the positive difference introduced by rounding up is
    /// credited to the performing user's bonus ledger (handled elsewhere);
    /// when false, the excess is absorbed without credit.
    pub credit_excess_to_bonus: bool,
}

/// Direction of the cascading cost recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeTarget {
    Cup,
    Usd,
}

impl CascadeTarget {
    /// `tipo` discriminator expected by `PUT /moneda/updateMoneda`.
    pub fn tipo(&self) -> &'static str {
        match self {
            CascadeTarget::Cup => "cambiar cup",
            CascadeTarget::Usd => "cambiar usd",
        }
    }
}

impl fmt::Display for CascadeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeTarget::Cup => write!(f, "CUP"),
            CascadeTarget::Usd => write!(f, "USD"),
        }
    }
}

/// Ephemeral record of a cascading change awaiting timed confirmation.
/// At most one exists at a time; it is consumed on confirm and discarded
/// on cancel or screen teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChangeRequest {
    pub target: CascadeTarget,
    pub rate_value: String,
    pub remaining_seconds: u32,
}

/// Lenient boolean decode for backend fields that arrive as any of
/// `true`, `"true"`, `1`, `"1"` depending on the server version.
pub fn flexible_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1"
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn snapshot_dirtiness() {
        let mut snap = RateSnapshot::new("420");
        assert!(!snap.is_dirty());
        assert!(snap.has_original());

        snap.set_current("430");
        assert!(snap.is_dirty());

        // Whitespace-only edits are not a change
        snap.set_current(" 420 ");
        assert!(!snap.is_dirty());

        let empty = RateSnapshot::new("");
        assert!(!empty.has_original());
    }

    #[test]
    fn rate_validation() {
        assert!(is_valid_rate("420"));
        assert!(is_valid_rate(" 24.5 "));
        assert!(is_valid_rate("0.001"));
        assert!(!is_valid_rate(""));
        assert!(!is_valid_rate("   "));
        assert!(!is_valid_rate("abc"));
        assert!(!is_valid_rate("12,5")); // comma is not a valid decimal separator
        assert!(!is_valid_rate("inf"));
        assert!(!is_valid_rate("NaN"));
    }

    #[test]
    fn rounding_option_wire_roundtrip() {
        for option in RoundingOption::iter() {
            assert_eq!(RoundingOption::from_wire(option.wire_name()), Some(option));
        }
        assert_eq!(RoundingOption::from_wire("Exeso 5"), None);
        assert_eq!(RoundingOption::from_wire(""), None);
    }

    #[test]
    fn flexible_bool_accepts_server_variants() {
        assert!(flexible_bool(&json!(true)));
        assert!(flexible_bool(&json!("true")));
        assert!(flexible_bool(&json!("True")));
        assert!(flexible_bool(&json!(1)));
        assert!(flexible_bool(&json!("1")));

        assert!(!flexible_bool(&json!(false)));
        assert!(!flexible_bool(&json!("false")));
        assert!(!flexible_bool(&json!(0)));
        assert!(!flexible_bool(&json!("0")));
        assert!(!flexible_bool(&json!(null)));
    }
}
