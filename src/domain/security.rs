//! Security classification for Taiwan securities transaction tax.
//!
//! Ordinary shares pay 0.3% on sale. Plain bond ETFs are exempt; leveraged and
//! inverse bond ETFs pay 0.1%.

use crate::domain::{Decimal, Symbol};
use rust_decimal::Decimal as RustDecimal;
use serde::Serialize;

const KNOWN_BOND_ETFS: &[&str] = &[
    "00679B", "00687B", "00694B", "00696B", "00697B", "00751B", "00753B", "00754B", "00755B",
    "00756B", "00760B", "00761B", "00762B", "00763B", "00764B", "00765B", "00766B", "00767B",
    "00768B", "00769B", "00770B", "00771B", "00772B", "00773B", "00774B", "00775B", "00776B",
    "00777B", "00778B", "00779B",
];

const KNOWN_LEVERAGED_INVERSE_BOND_ETFS: &[&str] =
    &["00680L", "00681L", "00682L", "00683R", "00684R", "00685R"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityClass {
    Stock,
    BondEtf,
    LeveragedBondEtf,
}

impl SecurityClass {
    /// Classify by listing code, with the display name as a secondary hint.
    pub fn classify(symbol: &Symbol, name: Option<&str>) -> Self {
        let code = symbol.as_str();
        if KNOWN_LEVERAGED_INVERSE_BOND_ETFS.contains(&code) {
            return SecurityClass::LeveragedBondEtf;
        }
        if KNOWN_BOND_ETFS.contains(&code) {
            return SecurityClass::BondEtf;
        }
        if !looks_like_bond_etf(code) {
            return SecurityClass::Stock;
        }

        let name = name.unwrap_or_default().to_uppercase();
        let leveraged = code.ends_with('L')
            || ["2X", "LEVERAGED", "槓桿"].iter().any(|m| name.contains(m));
        let inverse = code.ends_with('R')
            || ["INVERSE", "SHORT", "反向"].iter().any(|m| name.contains(m));

        if leveraged || inverse {
            SecurityClass::LeveragedBondEtf
        } else {
            SecurityClass::BondEtf
        }
    }

    /// Sell-side transaction tax rate in percent.
    pub fn default_tax_rate(&self) -> Decimal {
        match self {
            SecurityClass::Stock => Decimal::new(RustDecimal::new(3, 1)),
            SecurityClass::BondEtf => Decimal::zero(),
            SecurityClass::LeveragedBondEtf => Decimal::new(RustDecimal::new(1, 1)),
        }
    }

    pub fn is_bond_etf(&self) -> bool {
        !matches!(self, SecurityClass::Stock)
    }
}

/// `00` + three digits + one of B/L/R.
fn looks_like_bond_etf(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 6
        && code.starts_with("00")
        && bytes[2..5].iter().all(|b| b.is_ascii_digit())
        && matches!(bytes[5], b'B' | b'L' | b'R')
}
